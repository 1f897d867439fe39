use std::collections::HashSet;

use crate::diagnostics::UnbedError;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};

use super::env::Entity;
use super::types::{MethodDef, TypeId, TypeKind, Types};
use super::{Checker, Global, GlobalDecl, GlobalState};

impl<'a> Checker<'a> {
    pub(super) fn collect_decls(&mut self, file_idx: usize, file: &'a File) -> Result<(), UnbedError> {
        let mut last_init: Option<&'a Spanned<ValueSpec>> = None;
        for decl in &file.decls {
            match decl {
                Decl::Type(spec) => {
                    let name = &spec.node.name;
                    if spec.node.alias {
                        self.declare_global(name, file_idx, GlobalDecl::Type(spec), GlobalState::Pending)?;
                    } else {
                        let named = self.types.new_named(&name.node, &self.path);
                        self.declare_global(name, file_idx, GlobalDecl::Type(spec), GlobalState::Done(Entity::Type(named)))?;
                        self.pending_named.insert(named, (file_idx, spec));
                        self.named_decls.push((named, spec));
                    }
                }
                Decl::Var(spec) => {
                    for name in &spec.node.names {
                        self.declare_global(name, file_idx, GlobalDecl::Var(spec), GlobalState::Pending)?;
                    }
                    self.value_specs.push((file_idx, GlobalDecl::Var(spec)));
                }
                Decl::Const(spec) => {
                    if !spec.node.values.is_empty() || spec.node.iota == 0 {
                        last_init = Some(spec);
                    }
                    let init = last_init.unwrap_or(spec);
                    let decl = GlobalDecl::Const { spec, init };
                    for name in &spec.node.names {
                        self.declare_global(name, file_idx, decl, GlobalState::Pending)?;
                    }
                    self.value_specs.push((file_idx, decl));
                }
                Decl::Func(func) => {
                    if func.node.recv.is_some() {
                        self.methods.push((file_idx, func));
                        continue;
                    }
                    let name = &func.node.name;
                    if name.node == "init" {
                        if !func.node.sig.params.is_empty() || !func.node.sig.results.is_empty() {
                            return Err(self.err("func init must have no arguments and no return values", name.span));
                        }
                    } else {
                        self.declare_global(name, file_idx, GlobalDecl::Func(func), GlobalState::Pending)?;
                    }
                    self.funcs.push((file_idx, func));
                }
            }
        }
        Ok(())
    }

    fn declare_global(
        &mut self,
        name: &Spanned<String>,
        file: usize,
        decl: GlobalDecl<'a>,
        state: GlobalState,
    ) -> Result<(), UnbedError> {
        if name.node == "_" {
            return Ok(());
        }
        if self.globals.contains_key(&name.node) {
            return Err(self.err(format!("{} redeclared in this block", name.node), name.span));
        }
        self.globals.insert(name.node.clone(), Global { file, decl, state });
        Ok(())
    }

    /// Resolve a package-level name on first use.
    pub(super) fn resolve_global(&mut self, name: &str, span: Span) -> Result<Entity, UnbedError> {
        let Some(global) = self.globals.get(name) else {
            return Err(self.err(format!("undefined: {name}"), span));
        };
        let (file, decl) = (global.file, global.decl);
        match &global.state {
            GlobalState::Done(entity) => return Ok(entity.clone()),
            GlobalState::InProgress => {
                let msg = match decl {
                    GlobalDecl::Type(_) => format!("invalid recursive type alias {name}"),
                    _ => format!("initialization cycle: {name} refers to itself"),
                };
                return Err(self.err(msg, span));
            }
            GlobalState::Pending => {}
        }
        self.set_state(name, GlobalState::InProgress);

        match decl {
            GlobalDecl::Type(spec) => {
                let ty = self.in_file(file, |c| c.resolve_type(&spec.node.ty))?;
                self.set_state(name, GlobalState::Done(Entity::Type(ty)));
            }
            GlobalDecl::Func(func) => {
                let sig = self.in_file(file, |c| c.signature(&func.node.sig))?;
                self.set_state(name, GlobalState::Done(Entity::Func(sig)));
            }
            GlobalDecl::Var(_) | GlobalDecl::Const { .. } => self.resolve_value_spec(file, decl)?,
        }

        match &self.globals[name].state {
            GlobalState::Done(entity) => Ok(entity.clone()),
            _ => Err(self.err(format!("{name} could not be resolved"), span)),
        }
    }

    fn set_state(&mut self, name: &str, state: GlobalState) {
        if let Some(global) = self.globals.get_mut(name) {
            global.state = state;
        }
    }

    fn resolve_value_spec(&mut self, file: usize, decl: GlobalDecl<'a>) -> Result<(), UnbedError> {
        match decl {
            GlobalDecl::Var(spec) => {
                let tys = self.in_file(file, |c| c.var_spec_types(spec))?;
                for (name, ty) in spec.node.names.iter().zip(tys) {
                    self.set_state(&name.node, GlobalState::Done(Entity::Var(ty)));
                }
            }
            GlobalDecl::Const { spec, init } => {
                let values = self.in_file(file, |c| c.const_spec_values(spec, init))?;
                for (name, (ty, val)) in spec.node.names.iter().zip(values) {
                    self.set_state(&name.node, GlobalState::Done(Entity::Const(ty, val)));
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(super) fn resolve_all_globals(&mut self) -> Result<(), UnbedError> {
        let mut names: Vec<(String, Span)> = self
            .globals
            .iter()
            .filter(|(_, g)| matches!(g.state, GlobalState::Pending))
            .map(|(name, g)| (name.clone(), decl_span(&g.decl)))
            .collect();
        names.sort_by_key(|(_, span)| (span.file_id, span.start));
        for (name, span) in names {
            self.resolve_global(&name, span)?;
        }

        // Specs where every name is blank are never looked up.
        let specs = self.value_specs.clone();
        for (file, decl) in specs {
            let names = match decl {
                GlobalDecl::Var(spec) | GlobalDecl::Const { spec, .. } => &spec.node.names,
                _ => continue,
            };
            if names.iter().all(|n| n.node == "_") {
                self.resolve_value_spec(file, decl)?;
            }
        }
        Ok(())
    }

    /// Resolve the underlying type of a package-level defined type, following
    /// `type A B` chains and rejecting cycles among them.
    pub(crate) fn ensure_underlying(&mut self, ty: TypeId) -> Result<(), UnbedError> {
        let Some((file, spec)) = self.pending_named.get(&ty).copied() else {
            return Ok(());
        };
        if !self.resolving_named.insert(ty) {
            return Err(self.err(format!("invalid recursive type {}", spec.node.name.node), spec.node.name.span));
        }
        let rhs = self.in_file(file, |c| c.resolve_type(&spec.node.ty))?;
        self.ensure_underlying(rhs)?;
        self.types.set_underlying(ty, rhs);
        self.pending_named.remove(&ty);
        self.resolving_named.remove(&ty);
        Ok(())
    }

    /// A struct may not contain itself by value, directly or through arrays.
    pub(super) fn check_value_cycles(&self) -> Result<(), UnbedError> {
        for (ty, spec) in &self.named_decls {
            let mut visited = HashSet::new();
            if contains_by_value(self.types, *ty, *ty, &mut visited) {
                return Err(self.err(format!("invalid recursive type {}", spec.node.name.node), spec.node.name.span));
            }
        }
        Ok(())
    }

    pub(super) fn register_methods(&mut self) -> Result<(), UnbedError> {
        let methods = self.methods.clone();
        for (file, func) in methods {
            let Some(recv) = &func.node.recv else { continue };
            let base = &recv.base;
            let recv_ty = match self.in_file(file, |c| c.lookup(&base.node, base.span))? {
                Some(Entity::Type(ty)) => ty,
                Some(_) => return Err(self.err(format!("{} is not a type", base.node), base.span)),
                None => return Err(self.err(format!("undefined: {}", base.node), base.span)),
            };
            let named_id = match self.types.as_named(recv_ty) {
                Some(id) if self.types.named(id).pkg == self.path => id,
                _ => {
                    return Err(self.err(
                        format!("cannot define new methods on non-local type {}", self.types.display(recv_ty)),
                        base.span,
                    ));
                }
            };
            let under = self.types.underlying(recv_ty);
            if matches!(self.types.kind(under), TypeKind::Pointer(_) | TypeKind::Interface(_)) {
                return Err(self.err(
                    format!("invalid receiver type {} (pointer or interface type)", base.node),
                    base.span,
                ));
            }

            let name = &func.node.name;
            let sig = self.in_file(file, |c| c.signature(&func.node.sig))?;
            if name.node == "_" {
                continue;
            }
            let named = self.types.named(named_id);
            if named.methods.iter().any(|m| self.types.method(*m).name == name.node) {
                return Err(self.err(format!("method {}.{} already declared", base.node, name.node), name.span));
            }
            if let Some(sid) = self.types.struct_of(recv_ty) {
                if self.types.strukt(sid).fields.iter().any(|f| f.name == name.node) {
                    return Err(self.err(format!("field and method with the same name {}", name.node), name.span));
                }
            }
            self.types.add_method(MethodDef {
                name: name.node.clone(),
                pkg: self.path.clone(),
                recv: named_id,
                pointer_recv: recv.pointer,
                sig,
            });
        }
        Ok(())
    }

    pub(super) fn check_bodies(&mut self) -> Result<(), UnbedError> {
        let funcs = self.funcs.clone();
        for (file, func) in funcs {
            let Some(body) = &func.node.body else { continue };
            self.in_file(file, |c| {
                let sig = c.signature(&func.node.sig)?;
                c.func_body(&func.node.sig, sig, None, body)
            })?;
        }

        let methods = self.methods.clone();
        for (file, func) in methods {
            let (Some(body), Some(recv)) = (&func.node.body, &func.node.recv) else { continue };
            self.in_file(file, |c| {
                let base = match c.lookup(&recv.base.node, recv.base.span)? {
                    Some(Entity::Type(ty)) => ty,
                    _ => return Err(c.err(format!("undefined: {}", recv.base.node), recv.base.span)),
                };
                let recv_ty = if recv.pointer { c.types.pointer(base) } else { base };
                let sig = c.signature(&func.node.sig)?;
                c.func_body(&func.node.sig, sig, Some((recv, recv_ty)), body)
            })?;
        }
        Ok(())
    }
}

fn decl_span(decl: &GlobalDecl<'_>) -> Span {
    match decl {
        GlobalDecl::Type(spec) => spec.span,
        GlobalDecl::Var(spec) => spec.span,
        GlobalDecl::Const { spec, .. } => spec.span,
        GlobalDecl::Func(func) => func.span,
    }
}

fn contains_by_value(types: &Types, from: TypeId, target: TypeId, visited: &mut HashSet<TypeId>) -> bool {
    match types.kind(types.underlying(from)) {
        TypeKind::Struct(sid) => types
            .strukt(*sid)
            .fields
            .iter()
            .any(|f| value_reaches(types, f.ty, target, visited)),
        TypeKind::Array { elem, .. } => value_reaches(types, *elem, target, visited),
        _ => false,
    }
}

fn value_reaches(types: &Types, ty: TypeId, target: TypeId, visited: &mut HashSet<TypeId>) -> bool {
    if ty == target {
        return true;
    }
    match types.kind(ty) {
        TypeKind::Named(_) => visited.insert(ty) && contains_by_value(types, ty, target, visited),
        TypeKind::Struct(_) | TypeKind::Array { .. } => contains_by_value(types, ty, target, visited),
        _ => false,
    }
}
