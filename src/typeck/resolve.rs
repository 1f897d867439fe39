use std::collections::HashSet;

use crate::diagnostics::UnbedError;
use crate::parser::ast::{Expr, FieldDecl, InterfaceElem, Signature, TypeExpr};
use crate::span::{Span, Spanned};

use super::env::{unsafe_member, Entity};
use super::info::Mode;
use super::types::{is_exported, Field, IfaceMethod, IfaceMethodId, TypeId, Types};
use super::Checker;

impl<'a> Checker<'a> {
    pub(crate) fn resolve_type(&mut self, te: &Spanned<TypeExpr>) -> Result<TypeId, UnbedError> {
        match &te.node {
            TypeExpr::Name(name) => match self.lookup(name, te.span)? {
                Some(Entity::Type(ty)) => Ok(ty),
                Some(_) => Err(self.err(format!("{name} is not a type"), te.span)),
                None => Err(self.err(format!("undefined: {name}"), te.span)),
            },
            TypeExpr::Qualified { pkg, name } => self.qualified_type(pkg, name),
            TypeExpr::Pointer(inner) => {
                let elem = self.resolve_type(inner)?;
                Ok(self.types.pointer(elem))
            }
            TypeExpr::Slice(inner) => {
                let elem = self.resolve_type(inner)?;
                Ok(self.types.slice(elem))
            }
            TypeExpr::Array { len, elem } => {
                let Some(len) = len else {
                    return Err(self.err("invalid use of [...] array (outside a composite literal)", te.span));
                };
                let n = self.array_len(len)?;
                let elem = self.resolve_type(elem)?;
                Ok(self.types.array(n, elem))
            }
            TypeExpr::Map { key, value } => {
                let key = self.resolve_type(key)?;
                let value = self.resolve_type(value)?;
                Ok(self.types.map(key, value))
            }
            TypeExpr::Func(sig) => self.signature(sig),
            TypeExpr::Struct(fields) => self.struct_type(fields),
            TypeExpr::Interface(elems) => self.interface_type(elems, te.span),
        }
    }

    fn qualified_type(&mut self, pkg: &Spanned<String>, name: &Spanned<String>) -> Result<TypeId, UnbedError> {
        let path = match self.lookup(&pkg.node, pkg.span)? {
            Some(Entity::Package(path)) => path,
            Some(_) => return Err(self.err(format!("{}.{} is not a type", pkg.node, name.node), pkg.span)),
            None => return Err(self.err(format!("undefined: {}", pkg.node), pkg.span)),
        };
        let entity = if path == "unsafe" {
            unsafe_member(self.types, &name.node)
        } else if let Some(scope) = self.imports.get(&path) {
            if !is_exported(&name.node) {
                return Err(self.err(format!("name {} not exported by package {}", name.node, scope.name), name.span));
            }
            scope.lookup(&name.node).cloned()
        } else {
            return Ok(Types::OPAQUE);
        };
        match entity {
            Some(Entity::Type(ty)) => Ok(ty),
            Some(_) => Err(self.err(format!("{}.{} is not a type", pkg.node, name.node), name.span)),
            None => Err(self.err(format!("undefined: {}.{}", pkg.node, name.node), name.span)),
        }
    }

    /// A function type. A variadic final parameter `...T` has type `[]T`.
    pub(crate) fn signature(&mut self, sig: &Signature) -> Result<TypeId, UnbedError> {
        let mut params = Vec::with_capacity(sig.params.len());
        for (i, p) in sig.params.iter().enumerate() {
            let ty = self.resolve_type(&p.ty)?;
            if sig.variadic && i + 1 == sig.params.len() {
                params.push(self.types.slice(ty));
            } else {
                params.push(ty);
            }
        }
        let mut results = Vec::with_capacity(sig.results.len());
        for r in &sig.results {
            results.push(self.resolve_type(&r.ty)?);
        }
        Ok(self.types.func(params, results, sig.variadic))
    }

    fn struct_type(&mut self, decls: &[FieldDecl]) -> Result<TypeId, UnbedError> {
        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for decl in decls {
            let ty = self.resolve_type(&decl.ty)?;
            if decl.is_embedded() {
                let name = decl.ty.node.embedded_name().unwrap_or("_").to_string();
                if !seen.insert(name.clone()) {
                    return Err(self.err(format!("{name} redeclared"), decl.ty.span));
                }
                fields.push(Field { name, ty, embedded: true, pkg: self.path.clone() });
                continue;
            }
            for name in &decl.names {
                if name.node != "_" && !seen.insert(name.node.clone()) {
                    return Err(self.err(format!("{} redeclared", name.node), name.span));
                }
                fields.push(Field { name: name.node.clone(), ty, embedded: false, pkg: self.path.clone() });
            }
        }
        Ok(self.types.new_struct(fields))
    }

    fn interface_type(&mut self, elems: &[InterfaceElem], span: Span) -> Result<TypeId, UnbedError> {
        let mut methods: Vec<IfaceMethodId> = Vec::new();
        let mut names = HashSet::new();
        let mut opaque = false;

        for elem in elems {
            if let InterfaceElem::Method { name, sig } = elem {
                let sig = self.signature(sig)?;
                if !names.insert(name.node.clone()) {
                    return Err(self.err(format!("duplicate method {}", name.node), name.span));
                }
                let id = self.types.add_iface_method(IfaceMethod { name: name.node.clone(), pkg: self.path.clone(), sig });
                methods.push(id);
            }
        }

        for elem in elems {
            let InterfaceElem::Embed(te) = elem else { continue };
            let ty = self.resolve_type(te)?;
            if self.types.is_opaque(ty) {
                opaque = true;
                continue;
            }
            self.ensure_underlying(ty)?;
            let Some(iid) = self.types.interface_of(ty) else {
                return Err(self.err(format!("cannot embed non-interface type {}", self.types.display(ty)), te.span));
            };
            let embedded = self.types.interface(iid).clone();
            opaque |= embedded.opaque;
            for m in embedded.methods {
                let method = self.types.iface_method(m);
                if names.insert(method.name.clone()) {
                    methods.push(m);
                } else {
                    let existing = methods.iter().find(|id| self.types.iface_method(**id).name == method.name);
                    if existing.is_some_and(|id| self.types.iface_method(*id).sig != method.sig) {
                        return Err(self.err(format!("duplicate method {}", method.name), span));
                    }
                }
            }
        }

        Ok(self.types.new_interface(methods, opaque))
    }

    /// Length of an array type. `None` when the constant's value is not known.
    fn array_len(&mut self, len: &Spanned<Expr>) -> Result<Option<u64>, UnbedError> {
        let op = self.expr(len)?;
        if self.types.is_opaque(op.ty) {
            return Ok(None);
        }
        if op.mode != Mode::Constant {
            return Err(self.err("array length must be a constant", len.span));
        }
        match op.val {
            Some(n) if n < 0 => Err(self.err(format!("invalid array length {n}"), len.span)),
            Some(n) => Ok(Some(n as u64)),
            None => Ok(None),
        }
    }
}
