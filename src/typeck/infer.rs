use crate::diagnostics::UnbedError;
use crate::parser::ast::*;
use crate::parser::unquote;
use crate::span::{Span, Spanned};

use super::env::{unsafe_member, Builtin, Entity};
use super::info::{Mode, QualifiedUse, Selection, SelectionKind, Unresolved};
use super::lookup::{lookup_field_or_method, LookupResult};
use super::types::{is_exported, BasicKind, FuncType, Object, StructId, TypeId, TypeKind, Types};
use super::{Checker, Operand};

impl<'a> Checker<'a> {
    pub(crate) fn expr(&mut self, e: &Spanned<Expr>) -> Result<Operand, UnbedError> {
        self.expr_with_hint(e, None)
    }

    /// Check `e`, recording its type and mode. `hint` is the type expected by
    /// the context; elided composite literals take it as their type.
    pub(crate) fn expr_with_hint(&mut self, e: &Spanned<Expr>, hint: Option<TypeId>) -> Result<Operand, UnbedError> {
        let op = self.expr_kind(e, hint)?;
        self.record(e.id(), &op);
        Ok(op)
    }

    /// Check an expression that must produce exactly one value.
    pub(crate) fn value(&mut self, e: &Spanned<Expr>, hint: Option<TypeId>) -> Result<Operand, UnbedError> {
        let op = self.expr_with_hint(e, hint)?;
        self.single_value(op, e.span)
    }

    fn single_value(&self, op: Operand, span: Span) -> Result<Operand, UnbedError> {
        match op.mode {
            Mode::NoValue => Err(self.err("function call (no value) used as value", span)),
            Mode::Type => Err(self.err(format!("{} (type) is not an expression", self.types.display(op.ty)), span)),
            Mode::Builtin(b) => Err(self.err(format!("{} (built-in) must be called", b.name()), span)),
            Mode::Package => Err(self.err("use of package without selector", span)),
            _ if matches!(self.types.kind(op.ty), TypeKind::Tuple(_)) => {
                Err(self.err("multiple-value expression in single-value context", span))
            }
            _ => Ok(op),
        }
    }

    /// Check `e` as a value that will be stored in a location of type `target`.
    pub(crate) fn assign_to(&mut self, e: &Spanned<Expr>, target: TypeId, context: &str) -> Result<Operand, UnbedError> {
        let op = self.value(e, Some(target))?;
        if !self.assignable(op.ty, target) {
            return Err(self.err(
                format!(
                    "cannot use value of type {} as {} value in {context}",
                    self.types.display(op.ty),
                    self.types.display(target)
                ),
                e.span,
            ));
        }
        Ok(op)
    }

    /// Assignability, without checking interface method sets.
    pub(crate) fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        let t = &self.types;
        if from == to || t.is_opaque(from) || t.is_opaque(to) || from == Types::INVALID || to == Types::INVALID {
            return true;
        }
        let to_under = t.underlying(to);
        if let TypeKind::Basic(k) = t.kind(from) {
            if k.is_untyped() {
                return match t.kind(to_under) {
                    TypeKind::Basic(target) => match k {
                        BasicKind::UntypedBool => target.is_boolean(),
                        BasicKind::UntypedString => target.is_string(),
                        BasicKind::UntypedNil => *target == BasicKind::UnsafePointer,
                        _ => target.is_numeric(),
                    },
                    TypeKind::Interface(_) => true,
                    TypeKind::Pointer(_) | TypeKind::Slice(_) | TypeKind::Map { .. } | TypeKind::Func(_) => {
                        *k == BasicKind::UntypedNil
                    }
                    TypeKind::Opaque => true,
                    _ => false,
                };
            }
        }
        if t.interface_of(to).is_some() {
            return true;
        }
        t.underlying(from) == to_under && (t.as_named(from).is_none() || t.as_named(to).is_none())
    }

    fn expr_kind(&mut self, e: &Spanned<Expr>, hint: Option<TypeId>) -> Result<Operand, UnbedError> {
        match &e.node.kind {
            ExprKind::Ident(name) => self.ident(name, e.span),
            ExprKind::IntLit(text) => {
                let val = parse_int(text);
                Ok(Operand::constant(self.types.basic(BasicKind::UntypedInt), val))
            }
            ExprKind::FloatLit(_) => Ok(Operand::constant(self.types.basic(BasicKind::UntypedFloat), None)),
            ExprKind::RuneLit(text) => {
                let val = rune_value(text);
                Ok(Operand::constant(self.types.basic(BasicKind::UntypedRune), val))
            }
            ExprKind::StringLit(_) => Ok(Operand::constant(self.types.basic(BasicKind::UntypedString), None)),
            ExprKind::CompositeLit { ty, elements } => self.composite(ty.as_deref(), elements, hint, e.span),
            ExprKind::FuncLit { sig, body } => {
                let sig_ty = self.signature(sig)?;
                self.func_body(sig, sig_ty, None, body)?;
                Ok(Operand::value(sig_ty))
            }
            ExprKind::Paren(inner) => self.expr_with_hint(inner, hint),
            ExprKind::Selector { object, field } => self.selector(e, object, field),
            ExprKind::Index { object, index } => self.index(object, index),
            ExprKind::Slice { object, low, high, max } => {
                self.slice_expr(object, [low.as_deref(), high.as_deref(), max.as_deref()], e.span)
            }
            ExprKind::TypeAssert { object, ty } => {
                let x = self.value(object, None)?;
                if !self.types.is_opaque(x.ty) && self.types.interface_of(x.ty).is_none() {
                    return Err(self.err(
                        format!("invalid operation: {} is not an interface", self.types.display(x.ty)),
                        object.span,
                    ));
                }
                let target = self.resolve_type(ty)?;
                Ok(Operand::value(target))
            }
            ExprKind::Call { func, args, spread } => self.call(func, args, *spread, hint, e.span),
            ExprKind::Unary { op, operand } => self.unary(*op, operand, hint, e.span),
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, hint, e.span),
            ExprKind::Type(te) => {
                let ty = self.resolve_type(te)?;
                Ok(Operand::type_(ty))
            }
        }
    }

    fn ident(&mut self, name: &str, span: Span) -> Result<Operand, UnbedError> {
        if name == "_" {
            return Err(self.err("cannot use _ as value", span));
        }
        match self.lookup(name, span)? {
            Some(Entity::Package(_)) => Err(self.err(format!("use of package {name} without selector"), span)),
            Some(entity) => self.entity_operand(entity, name, span),
            None => Err(self.err(format!("undefined: {name}"), span)),
        }
    }

    fn entity_operand(&self, entity: Entity, name: &str, span: Span) -> Result<Operand, UnbedError> {
        Ok(match entity {
            Entity::Type(ty) => Operand::type_(ty),
            Entity::Var(ty) => Operand::variable(ty),
            Entity::Const(ty, val) => Operand::constant(ty, val),
            Entity::Func(ty) => Operand::value(ty),
            Entity::Builtin(b) => Operand { mode: Mode::Builtin(b), ty: Types::INVALID, val: None },
            Entity::Nil => Operand::value(self.types.basic(BasicKind::UntypedNil)),
            Entity::Iota => match self.iota {
                Some(v) => Operand::constant(self.types.basic(BasicKind::UntypedInt), Some(v)),
                None => return Err(self.err("cannot use iota outside constant declaration", span)),
            },
            Entity::Package(_) => return Err(self.err(format!("use of package {name} without selector"), span)),
        })
    }

    fn selector(&mut self, e: &Spanned<Expr>, object: &Spanned<Expr>, field: &Spanned<String>) -> Result<Operand, UnbedError> {
        if let ExprKind::Ident(name) = &object.node.kind {
            if let Some(Entity::Package(path)) = self.lookup(name, object.span)? {
                self.record(object.id(), &Operand { mode: Mode::Package, ty: Types::INVALID, val: None });
                self.infos[self.cur_file]
                    .uses
                    .insert(e.id(), QualifiedUse { package: path.clone(), name: field.node.clone() });
                return self.qualified(&path, name, field);
            }
        }

        let x = self.expr(object)?;
        match x.mode {
            Mode::NoValue | Mode::Builtin(_) | Mode::Package => {
                return Err(self.err(format!("invalid selector .{}", field.node), field.span));
            }
            _ => {}
        }
        let (base, _) = self.types.deref(x.ty);
        self.ensure_underlying(base)?;
        if self.types.is_opaque(base) || self.types.is_opaque(self.types.underlying(base)) {
            return Ok(if x.mode == Mode::Variable { Operand::variable(Types::OPAQUE) } else { Operand::value(Types::OPAQUE) });
        }

        if x.mode == Mode::Type {
            return self.method_expr(e, x.ty, field);
        }

        let addressable = x.mode == Mode::Variable;
        match lookup_field_or_method(self.types, x.ty, addressable, &self.path, &field.node) {
            LookupResult::Found { obj, index, indirect } => {
                let (kind, ty) = match obj {
                    Object::Field(fid) => (SelectionKind::FieldVal, self.types.field(fid).ty),
                    Object::Method(m) => (SelectionKind::MethodVal, self.types.method(m).sig),
                    Object::IfaceMethod(m) => (SelectionKind::MethodVal, self.types.iface_method(m).sig),
                };
                self.infos[self.cur_file]
                    .selections
                    .insert(e.id(), Selection { kind, recv: x.ty, obj, index, indirect });
                let variable = kind == SelectionKind::FieldVal && (addressable || indirect);
                Ok(if variable { Operand::variable(ty) } else { Operand::value(ty) })
            }
            LookupResult::Opaque { known, external } => {
                self.infos[self.cur_file].unresolved.insert(e.id(), Unresolved { recv: x.ty, known, external });
                Ok(if addressable { Operand::variable(Types::OPAQUE) } else { Operand::value(Types::OPAQUE) })
            }
            LookupResult::NotAddressable => Err(self.err(
                format!("cannot call pointer method {} on {}", field.node, self.types.display(x.ty)),
                field.span,
            )),
            LookupResult::Ambiguous => Err(self.err(
                format!("ambiguous selector {}.{}", self.types.display(x.ty), field.node),
                field.span,
            )),
            LookupResult::NotFound => {
                let ty = self.types.display(x.ty);
                Err(self.err(
                    format!("{ty}.{f} undefined (type {ty} has no field or method {f})", f = field.node),
                    field.span,
                ))
            }
        }
    }

    /// `T.m` or `(*T).m`: a function whose first parameter is the receiver.
    fn method_expr(&mut self, e: &Spanned<Expr>, recv: TypeId, field: &Spanned<String>) -> Result<Operand, UnbedError> {
        let result = lookup_field_or_method(self.types, recv, false, &self.path, &field.node);
        let (obj, index, indirect, sig) = match result {
            LookupResult::Found { obj: Object::Method(m), index, indirect } => (Object::Method(m), index, indirect, self.types.method(m).sig),
            LookupResult::Found { obj: Object::IfaceMethod(m), index, indirect } => {
                (Object::IfaceMethod(m), index, indirect, self.types.iface_method(m).sig)
            }
            LookupResult::Opaque { known, external } => {
                self.infos[self.cur_file].unresolved.insert(e.id(), Unresolved { recv, known, external });
                return Ok(Operand::value(Types::OPAQUE));
            }
            LookupResult::NotAddressable => {
                let ty = self.types.display(recv);
                return Err(self.err(
                    format!("invalid method expression {ty}.{f} (needs pointer receiver (*{ty}).{f})", f = field.node),
                    field.span,
                ));
            }
            LookupResult::Ambiguous => {
                return Err(self.err(format!("ambiguous selector {}.{}", self.types.display(recv), field.node), field.span));
            }
            LookupResult::Found { .. } | LookupResult::NotFound => {
                let ty = self.types.display(recv);
                return Err(self.err(
                    format!("{ty}.{f} undefined (type {ty} has no method {f})", f = field.node),
                    field.span,
                ));
            }
        };
        self.infos[self.cur_file]
            .selections
            .insert(e.id(), Selection { kind: SelectionKind::MethodExpr, recv, obj, index, indirect });

        let Some(FuncType { params, results, variadic }) = self.types.func_of(sig).cloned() else {
            return Ok(Operand::value(Types::OPAQUE));
        };
        let mut with_recv = Vec::with_capacity(params.len() + 1);
        with_recv.push(recv);
        with_recv.extend(params);
        Ok(Operand::value(self.types.func(with_recv, results, variadic)))
    }

    fn qualified(&mut self, path: &str, pkg: &str, name: &Spanned<String>) -> Result<Operand, UnbedError> {
        let entity = if path == "unsafe" {
            unsafe_member(self.types, &name.node)
        } else if let Some(scope) = self.imports.get(path) {
            if !is_exported(&name.node) {
                return Err(self.err(format!("name {} not exported by package {pkg}", name.node), name.span));
            }
            scope.lookup(&name.node).cloned()
        } else {
            return Ok(Operand::variable(Types::OPAQUE));
        };
        match entity {
            Some(entity) => self.entity_operand(entity, &name.node, name.span),
            None => Err(self.err(format!("undefined: {pkg}.{}", name.node), name.span)),
        }
    }

    fn index(&mut self, object: &Spanned<Expr>, index: &Spanned<Expr>) -> Result<Operand, UnbedError> {
        let x = self.value(object, None)?;
        if self.types.is_opaque(x.ty) {
            self.value(index, None)?;
            return Ok(Operand::variable(Types::OPAQUE));
        }
        let under = self.types.underlying(x.ty);
        match self.types.kind(under).clone() {
            TypeKind::Map { key, value } => {
                self.assign_to(index, key, "map index")?;
                Ok(Operand::value(value))
            }
            TypeKind::Slice(elem) => {
                self.int_index(index)?;
                Ok(Operand::variable(elem))
            }
            TypeKind::Array { elem, .. } => {
                self.int_index(index)?;
                Ok(if x.mode == Mode::Variable { Operand::variable(elem) } else { Operand::value(elem) })
            }
            TypeKind::Pointer(p) => match self.types.kind(self.types.underlying(p)).clone() {
                TypeKind::Array { elem, .. } => {
                    self.int_index(index)?;
                    Ok(Operand::variable(elem))
                }
                _ => Err(self.err(format!("invalid operation: cannot index {}", self.types.display(x.ty)), object.span)),
            },
            TypeKind::Basic(k) if k.is_string() => {
                self.int_index(index)?;
                Ok(Operand::value(self.types.basic(BasicKind::Uint8)))
            }
            _ => Err(self.err(format!("invalid operation: cannot index {}", self.types.display(x.ty)), object.span)),
        }
    }

    fn int_index(&mut self, e: &Spanned<Expr>) -> Result<(), UnbedError> {
        let op = self.value(e, None)?;
        let ok = self.types.is_opaque(op.ty)
            || self
                .types
                .basic_of(op.ty)
                .is_some_and(|k| k.is_integer() || k == BasicKind::UntypedFloat);
        if !ok {
            return Err(self.err(
                format!("invalid argument: index of type {} must be integer", self.types.display(op.ty)),
                e.span,
            ));
        }
        if op.val.is_some_and(|v| v < 0) {
            return Err(self.err("invalid argument: index must not be negative", e.span));
        }
        Ok(())
    }

    fn slice_expr(&mut self, object: &Spanned<Expr>, bounds: [Option<&Spanned<Expr>>; 3], span: Span) -> Result<Operand, UnbedError> {
        let x = self.value(object, None)?;
        for bound in bounds.into_iter().flatten() {
            self.int_index(bound)?;
        }
        if self.types.is_opaque(x.ty) {
            return Ok(Operand::value(Types::OPAQUE));
        }
        let under = self.types.underlying(x.ty);
        match self.types.kind(under).clone() {
            TypeKind::Basic(BasicKind::UntypedString) => Ok(Operand::value(self.types.basic(BasicKind::String))),
            TypeKind::Basic(BasicKind::String) | TypeKind::Slice(_) => Ok(Operand::value(x.ty)),
            TypeKind::Array { elem, .. } => {
                if x.mode != Mode::Variable {
                    return Err(self.err("invalid operation: slice of unaddressable value", span));
                }
                Ok(Operand::value(self.types.slice(elem)))
            }
            TypeKind::Pointer(p) => match self.types.kind(self.types.underlying(p)).clone() {
                TypeKind::Array { elem, .. } => Ok(Operand::value(self.types.slice(elem))),
                _ => Err(self.err(format!("cannot slice {}", self.types.display(x.ty)), span)),
            },
            _ => Err(self.err(format!("cannot slice {}", self.types.display(x.ty)), span)),
        }
    }

    fn call(
        &mut self,
        func: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        spread: bool,
        hint: Option<TypeId>,
        span: Span,
    ) -> Result<Operand, UnbedError> {
        let f = self.expr(func)?;
        match f.mode {
            Mode::Type => return self.conversion(f.ty, args, span),
            Mode::Builtin(b) => return self.builtin(b, args, spread, hint, span),
            Mode::NoValue | Mode::Package => {
                return Err(self.err("invalid operation: cannot call non-function", func.span));
            }
            _ => {}
        }
        if self.types.is_opaque(f.ty) {
            for arg in args {
                self.expr(arg)?;
            }
            return Ok(Operand::value(Types::OPAQUE));
        }
        let Some(sig) = self.types.func_of(f.ty).cloned() else {
            return Err(self.err(
                format!("invalid operation: cannot call non-function of type {}", self.types.display(f.ty)),
                func.span,
            ));
        };
        self.call_args(&sig, args, spread, span)?;
        Ok(match sig.results.as_slice() {
            [] => Operand::no_value(),
            [single] => Operand::value(*single),
            _ => Operand::value(self.types.tuple(sig.results.clone())),
        })
    }

    fn call_args(&mut self, sig: &FuncType, args: &[Spanned<Expr>], spread: bool, span: Span) -> Result<(), UnbedError> {
        // f(g()) where g returns several values
        if let [only] = args {
            if sig.params.len() > 1 || sig.variadic {
                let op = self.expr(only)?;
                if let TypeKind::Tuple(elems) = self.types.kind(op.ty).clone() {
                    let fixed = if sig.variadic { sig.params.len() - 1 } else { sig.params.len() };
                    if elems.len() < fixed || (!sig.variadic && elems.len() > fixed) {
                        return Err(self.err("wrong number of arguments in call", span));
                    }
                    return Ok(());
                }
                return self.check_arg(sig, 0, only, &op, spread);
            }
        }

        let fixed = if sig.variadic { sig.params.len() - 1 } else { sig.params.len() };
        if args.len() < fixed {
            return Err(self.err("not enough arguments in call", span));
        }
        if (!sig.variadic || spread) && args.len() > sig.params.len() {
            return Err(self.err("too many arguments in call", span));
        }
        if spread && args.len() != sig.params.len() {
            return Err(self.err("can only use ... with final argument in list", span));
        }
        for (i, arg) in args.iter().enumerate() {
            let target = self.param_type(sig, i, spread);
            self.assign_to(arg, target, "argument")?;
        }
        Ok(())
    }

    fn check_arg(&mut self, sig: &FuncType, i: usize, arg: &Spanned<Expr>, op: &Operand, spread: bool) -> Result<(), UnbedError> {
        let fixed = if sig.variadic { sig.params.len() - 1 } else { sig.params.len() };
        if fixed > 1 {
            return Err(self.err("not enough arguments in call", arg.span));
        }
        let target = self.param_type(sig, i, spread);
        if !self.assignable(op.ty, target) {
            return Err(self.err(
                format!("cannot use value of type {} as {} value in argument", self.types.display(op.ty), self.types.display(target)),
                arg.span,
            ));
        }
        Ok(())
    }

    fn param_type(&self, sig: &FuncType, i: usize, spread: bool) -> TypeId {
        let last = sig.params.len().saturating_sub(1);
        if sig.variadic && i >= last {
            let slice = sig.params[last];
            if spread {
                return slice;
            }
            return match self.types.kind(slice) {
                TypeKind::Slice(elem) => *elem,
                _ => slice,
            };
        }
        sig.params.get(i).copied().unwrap_or(Types::INVALID)
    }

    fn conversion(&mut self, target: TypeId, args: &[Spanned<Expr>], span: Span) -> Result<Operand, UnbedError> {
        let [arg] = args else {
            let msg = if args.is_empty() { "missing argument in conversion" } else { "too many arguments in conversion" };
            return Err(self.err(format!("{msg} to {}", self.types.display(target)), span));
        };
        let op = self.value(arg, Some(target))?;
        if op.mode == Mode::Constant && self.types.basic_of(target).is_some() {
            return Ok(Operand::constant(target, op.val));
        }
        Ok(Operand::value(target))
    }

    fn builtin(
        &mut self,
        b: Builtin,
        args: &[Spanned<Expr>],
        spread: bool,
        hint: Option<TypeId>,
        span: Span,
    ) -> Result<Operand, UnbedError> {
        let min_args = match b {
            Builtin::Recover | Builtin::Print | Builtin::Println => 0,
            Builtin::Append | Builtin::Cap | Builtin::Clear | Builtin::Close | Builtin::Imag | Builtin::Len => 1,
            Builtin::Make | Builtin::Max | Builtin::Min | Builtin::New | Builtin::Panic | Builtin::Real => 1,
            Builtin::Offsetof | Builtin::Sizeof | Builtin::Alignof => 1,
            Builtin::Complex | Builtin::Copy | Builtin::Delete => 2,
        };
        if args.len() < min_args {
            return Err(self.err(format!("not enough arguments for {}", b.name()), span));
        }
        let int = self.types.basic(BasicKind::Int);
        let uintptr = self.types.basic(BasicKind::Uintptr);

        match b {
            Builtin::Len | Builtin::Cap => {
                let x = self.value(&args[0], None)?;
                let (base, _) = self.types.deref(self.types.underlying(x.ty));
                if let TypeKind::Array { len: Some(n), .. } = self.types.kind(self.types.underlying(base)) {
                    return Ok(Operand::constant(int, Some(*n as i128)));
                }
                if x.mode == Mode::Constant {
                    return Ok(Operand::constant(int, None));
                }
                Ok(Operand::value(int))
            }
            Builtin::Append => {
                let s = self.value(&args[0], hint)?;
                let elem = match self.types.kind(self.types.underlying(s.ty)) {
                    TypeKind::Slice(elem) => Some(*elem),
                    _ => None,
                };
                for (i, arg) in args.iter().enumerate().skip(1) {
                    match elem {
                        Some(elem) if !(spread && i + 1 == args.len()) => {
                            self.assign_to(arg, elem, "argument to append")?;
                        }
                        _ => {
                            self.value(arg, None)?;
                        }
                    }
                }
                Ok(Operand::value(s.ty))
            }
            Builtin::Make => {
                let t = self.expr(&args[0])?;
                if t.mode != Mode::Type && !self.types.is_opaque(t.ty) {
                    return Err(self.err("make: first argument is not a type", args[0].span));
                }
                for arg in &args[1..] {
                    self.int_index(arg)?;
                }
                Ok(Operand::value(t.ty))
            }
            Builtin::New => {
                let t = self.expr(&args[0])?;
                if t.mode != Mode::Type && !self.types.is_opaque(t.ty) {
                    return Err(self.err("new: argument is not a type", args[0].span));
                }
                Ok(Operand::value(self.types.pointer(t.ty)))
            }
            Builtin::Copy => {
                for arg in args {
                    self.value(arg, None)?;
                }
                Ok(Operand::value(int))
            }
            Builtin::Delete => {
                let m = self.value(&args[0], None)?;
                match self.types.kind(self.types.underlying(m.ty)).clone() {
                    TypeKind::Map { key, .. } => {
                        self.assign_to(&args[1], key, "argument to delete")?;
                    }
                    _ => {
                        self.value(&args[1], None)?;
                    }
                }
                Ok(Operand::no_value())
            }
            Builtin::Clear | Builtin::Close | Builtin::Panic | Builtin::Print | Builtin::Println => {
                for arg in args {
                    self.value(arg, None)?;
                }
                Ok(Operand::no_value())
            }
            Builtin::Complex => {
                for arg in args {
                    self.value(arg, None)?;
                }
                Ok(Operand::value(self.types.basic(BasicKind::Complex128)))
            }
            Builtin::Real | Builtin::Imag => {
                self.value(&args[0], None)?;
                Ok(Operand::value(self.types.basic(BasicKind::Float64)))
            }
            Builtin::Min | Builtin::Max => {
                let mut ops = Vec::with_capacity(args.len());
                for arg in args {
                    ops.push(self.value(arg, hint)?);
                }
                let ty = ops
                    .iter()
                    .map(|o| o.ty)
                    .find(|t| !self.types.is_untyped(*t))
                    .unwrap_or(ops[0].ty);
                if ops.iter().all(|o| o.mode == Mode::Constant) {
                    let vals: Option<Vec<i128>> = ops.iter().map(|o| o.val).collect();
                    let val = vals.and_then(|v| match b {
                        Builtin::Min => v.into_iter().min(),
                        _ => v.into_iter().max(),
                    });
                    return Ok(Operand::constant(ty, val));
                }
                Ok(Operand::value(ty))
            }
            Builtin::Recover => Ok(Operand::value(self.types.any_type())),
            Builtin::Offsetof => {
                let [arg] = args else {
                    return Err(self.err("too many arguments for unsafe.Offsetof", span));
                };
                self.value(arg, None)?;
                let inner = unparen(arg);
                let is_field = matches!(inner.node.kind, ExprKind::Selector { .. })
                    && self.infos[self.cur_file]
                        .selections
                        .get(&inner.id())
                        .is_some_and(|s| s.kind == SelectionKind::FieldVal);
                if !is_field {
                    return Err(self.err("invalid argument: unsafe.Offsetof requires a field selector", arg.span));
                }
                Ok(Operand::constant(uintptr, None))
            }
            Builtin::Sizeof | Builtin::Alignof => {
                self.value(&args[0], None)?;
                Ok(Operand::constant(uintptr, None))
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Spanned<Expr>, hint: Option<TypeId>, span: Span) -> Result<Operand, UnbedError> {
        match op {
            UnaryOp::Addr => {
                let elem_hint = hint.and_then(|h| match self.types.kind(self.types.underlying(h)) {
                    TypeKind::Pointer(elem) => Some(*elem),
                    _ => None,
                });
                let x = self.value(operand, elem_hint)?;
                let is_lit = matches!(unparen(operand).node.kind, ExprKind::CompositeLit { .. });
                if x.mode != Mode::Variable && !is_lit && !self.types.is_opaque(x.ty) {
                    return Err(self.err("invalid operation: cannot take address of value", span));
                }
                Ok(Operand::value(self.types.pointer(x.ty)))
            }
            UnaryOp::Deref => {
                let x = self.expr(operand)?;
                if x.mode == Mode::Type {
                    return Ok(Operand::type_(self.types.pointer(x.ty)));
                }
                let x = self.single_value(x, operand.span)?;
                if self.types.is_opaque(x.ty) {
                    return Ok(Operand::variable(Types::OPAQUE));
                }
                match self.types.kind(self.types.underlying(x.ty)) {
                    TypeKind::Pointer(elem) => Ok(Operand::variable(*elem)),
                    _ => Err(self.err(
                        format!("invalid operation: cannot indirect value of type {}", self.types.display(x.ty)),
                        span,
                    )),
                }
            }
            UnaryOp::Not => {
                let x = self.value(operand, hint)?;
                if !self.types.is_opaque(x.ty) && !self.types.basic_of(x.ty).is_some_and(|k| k.is_boolean()) {
                    return Err(self.err(format!("invalid operation: operator ! not defined on {}", self.types.display(x.ty)), span));
                }
                Ok(Operand { mode: x.mode_if_constant(), ty: x.ty, val: x.val.map(|v| 1 - v) })
            }
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::BitNot => {
                let x = self.value(operand, hint)?;
                let kind = self.types.basic_of(x.ty);
                if !self.types.is_opaque(x.ty) && !kind.is_some_and(|k| k.is_numeric()) {
                    return Err(self.err(format!("invalid operation: unary operator not defined on {}", self.types.display(x.ty)), span));
                }
                let val = match op {
                    UnaryOp::Neg => x.val.and_then(|v| v.checked_neg()),
                    UnaryOp::BitNot if kind.is_some_and(|k| k.is_untyped() || is_signed(k)) => x.val.map(|v| !v),
                    UnaryOp::BitNot => None,
                    _ => x.val,
                };
                Ok(Operand { mode: x.mode_if_constant(), ty: x.ty, val })
            }
        }
    }

    fn binary(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        hint: Option<TypeId>,
        span: Span,
    ) -> Result<Operand, UnbedError> {
        if op.is_shift() {
            return self.shift(op, lhs, rhs, hint, span);
        }

        let operand_hint = if op.is_comparison() { None } else { hint };
        let x = self.value(lhs, operand_hint)?;
        let y_hint = if self.types.is_untyped(x.ty) { operand_hint } else { Some(x.ty) };
        let y = self.value(rhs, y_hint)?;
        let both_const = x.mode == Mode::Constant && y.mode == Mode::Constant;
        let mode = if both_const { Mode::Constant } else { Mode::Value };

        if op.is_comparison() {
            if !self.assignable(x.ty, y.ty) && !self.assignable(y.ty, x.ty) {
                return Err(self.mismatched(x.ty, y.ty, span));
            }
            let val = match (x.val, y.val) {
                (Some(a), Some(b)) if both_const => Some(compare(op, a, b) as i128),
                _ => None,
            };
            return Ok(Operand { mode, ty: self.types.basic(BasicKind::UntypedBool), val });
        }

        if self.types.is_opaque(x.ty) || self.types.is_opaque(y.ty) {
            return Ok(Operand::value(Types::OPAQUE));
        }
        let ty = self.binary_type(x.ty, y.ty, span)?;
        let kind = self.types.basic_of(ty);

        if op.is_logical() {
            if !kind.is_some_and(|k| k.is_boolean()) {
                return Err(self.err(format!("invalid operation: operator not defined on {}", self.types.display(ty)), span));
            }
            let val = match (x.val, y.val) {
                (Some(a), Some(b)) => Some(match op {
                    BinOp::And => (a != 0 && b != 0) as i128,
                    _ => (a != 0 || b != 0) as i128,
                }),
                _ => None,
            };
            return Ok(Operand { mode, ty, val });
        }

        let defined = match op {
            BinOp::Add => kind.is_some_and(|k| k.is_numeric() || k.is_string()),
            BinOp::Sub | BinOp::Mul | BinOp::Div => kind.is_some_and(|k| k.is_numeric()),
            _ => kind.is_some_and(|k| k.is_integer()),
        };
        if !defined {
            return Err(self.err(format!("invalid operation: operator not defined on {}", self.types.display(ty)), span));
        }
        if matches!(op, BinOp::Div | BinOp::Mod) && y.val == Some(0) && kind.is_some_and(|k| k.is_integer()) {
            return Err(self.err("invalid operation: division by zero", rhs.span));
        }
        let val = match (x.val, y.val) {
            (Some(a), Some(b)) if both_const && kind.is_some_and(|k| k.is_integer()) => fold(op, a, b),
            _ => None,
        };
        Ok(Operand { mode, ty, val })
    }

    fn shift(&mut self, op: BinOp, lhs: &Spanned<Expr>, rhs: &Spanned<Expr>, hint: Option<TypeId>, span: Span) -> Result<Operand, UnbedError> {
        let x = self.value(lhs, hint)?;
        let y = self.value(rhs, None)?;
        if !self.types.is_opaque(y.ty) && !self.types.basic_of(y.ty).is_some_and(|k| k.is_integer() || k == BasicKind::UntypedFloat) {
            return Err(self.err("invalid operation: shift count must be integer", rhs.span));
        }
        if self.types.is_opaque(x.ty) {
            return Ok(Operand::value(Types::OPAQUE));
        }
        if !self.types.basic_of(x.ty).is_some_and(|k| k.is_integer() || k == BasicKind::UntypedFloat) {
            return Err(self.err(format!("invalid operation: shifted operand of type {}", self.types.display(x.ty)), span));
        }
        if x.mode == Mode::Constant && y.mode == Mode::Constant {
            let val = match (x.val, y.val) {
                (Some(a), Some(b)) if (0..127).contains(&b) => match op {
                    BinOp::Shl => a.checked_shl(b as u32),
                    _ => Some(a >> b),
                },
                _ => None,
            };
            return Ok(Operand::constant(x.ty, val));
        }
        // A non-constant shift of an untyped constant takes its type from context.
        let ty = if self.types.is_untyped(x.ty) {
            hint.filter(|h| !self.types.is_untyped(*h)).unwrap_or_else(|| self.types.default_type(x.ty))
        } else {
            x.ty
        };
        Ok(Operand::value(ty))
    }

    /// Result type of a binary operation on `x` and `y`.
    fn binary_type(&self, x: TypeId, y: TypeId, span: Span) -> Result<TypeId, UnbedError> {
        let (xu, yu) = (self.types.is_untyped(x), self.types.is_untyped(y));
        match (xu, yu) {
            (true, true) => match (self.types.basic_of(x), self.types.basic_of(y)) {
                (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(self.types.basic(BasicKind::wider_untyped(a, b))),
                _ if x == y => Ok(x),
                _ => Err(self.mismatched(x, y, span)),
            },
            (true, false) if self.assignable(x, y) => Ok(y),
            (false, true) if self.assignable(y, x) => Ok(x),
            (false, false) if x == y => Ok(x),
            _ => Err(self.mismatched(x, y, span)),
        }
    }

    fn mismatched(&self, x: TypeId, y: TypeId, span: Span) -> UnbedError {
        self.err(
            format!("invalid operation: mismatched types {} and {}", self.types.display(x), self.types.display(y)),
            span,
        )
    }

    fn composite(
        &mut self,
        ty: Option<&Spanned<Expr>>,
        elements: &[Element],
        hint: Option<TypeId>,
        span: Span,
    ) -> Result<Operand, UnbedError> {
        let (lit_ty, base) = match ty {
            Some(t) => {
                let ty = match open_array_elem(t) {
                    Some(elem) => {
                        let elem = self.resolve_type(elem)?;
                        let n = self.open_array_len(elements)?;
                        let arr = self.types.array(n, elem);
                        self.record(t.id(), &Operand::type_(arr));
                        arr
                    }
                    None => {
                        let op = self.expr(t)?;
                        if op.mode != Mode::Type && !self.types.is_opaque(op.ty) {
                            return Err(self.err("invalid composite literal type: not a type", t.span));
                        }
                        op.ty
                    }
                };
                (ty, ty)
            }
            None => {
                let Some(hint) = hint else {
                    return Err(self.err("invalid composite literal type: missing type", span));
                };
                // An elided `&T` inside a literal of pointers.
                match self.types.kind(self.types.underlying(hint)) {
                    TypeKind::Pointer(elem) if self.types.as_named(hint).is_none() => (hint, *elem),
                    _ => (hint, hint),
                }
            }
        };

        self.ensure_underlying(base)?;
        let under = self.types.underlying(base);
        match self.types.kind(under).clone() {
            TypeKind::Opaque => {
                for el in elements {
                    if let Some(key) = &el.key {
                        if key.ident_name().is_none() {
                            self.expr_with_hint(key, Some(Types::OPAQUE))?;
                        }
                    }
                    self.expr_with_hint(&el.value, Some(Types::OPAQUE))?;
                }
            }
            TypeKind::Struct(sid) => self.struct_elements(sid, base, elements, span)?,
            TypeKind::Array { len, elem } => {
                self.indexed_elements(elem, len, elements)?;
            }
            TypeKind::Slice(elem) => {
                self.indexed_elements(elem, None, elements)?;
            }
            TypeKind::Map { key, value } => {
                for el in elements {
                    let Some(k) = &el.key else {
                        return Err(self.err("missing key in map literal", el.value.span));
                    };
                    self.assign_to(k, key, "map literal")?;
                    self.assign_to(&el.value, value, "map literal")?;
                }
            }
            _ => {
                return Err(self.err(format!("invalid composite literal type {}", self.types.display(base)), span));
            }
        }
        Ok(Operand::value(lit_ty))
    }

    fn struct_elements(&mut self, sid: StructId, ty: TypeId, elements: &[Element], span: Span) -> Result<(), UnbedError> {
        let fields = self.types.strukt(sid).fields.clone();
        let keyed = elements.first().is_some_and(|el| el.key.is_some());
        if keyed {
            for el in elements {
                let Some(name) = el.key.as_ref().and_then(|k| k.ident_name()) else {
                    return Err(self.err("mixture of field:value and value elements in struct literal", el.value.span));
                };
                let Some(field) = fields.iter().find(|f| f.name == name && (is_exported(name) || f.pkg == self.path)) else {
                    return Err(self.err(
                        format!("unknown field {name} in struct literal of type {}", self.types.display(ty)),
                        el.value.span,
                    ));
                };
                self.assign_to(&el.value, field.ty, "struct literal")?;
            }
            return Ok(());
        }
        if elements.iter().any(|el| el.key.is_some()) {
            return Err(self.err("mixture of field:value and value elements in struct literal", span));
        }
        if !elements.is_empty() && elements.len() < fields.len() {
            return Err(self.err(format!("too few values in struct literal of type {}", self.types.display(ty)), span));
        }
        if elements.len() > fields.len() {
            return Err(self.err(format!("too many values in struct literal of type {}", self.types.display(ty)), span));
        }
        for (el, field) in elements.iter().zip(&fields) {
            if !is_exported(&field.name) && field.pkg != self.path {
                return Err(self.err(
                    format!("implicit assignment to unexported field {} in struct literal", field.name),
                    el.value.span,
                ));
            }
            self.assign_to(&el.value, field.ty, "struct literal")?;
        }
        Ok(())
    }

    fn indexed_elements(&mut self, elem: TypeId, len: Option<u64>, elements: &[Element]) -> Result<(), UnbedError> {
        let mut next: i128 = 0;
        for el in elements {
            if let Some(key) = &el.key {
                let k = self.value(key, None)?;
                if k.mode != Mode::Constant {
                    return Err(self.err("index must be non-negative integer constant", key.span));
                }
                if let Some(v) = k.val {
                    next = v;
                }
            }
            if let Some(n) = len {
                if next >= n as i128 {
                    return Err(self.err(format!("index {next} out of bounds [0:{n}]"), el.value.span));
                }
            }
            self.assign_to(&el.value, elem, "array or slice literal")?;
            next += 1;
        }
        Ok(())
    }

    /// Length of `[...]T{...}`: one past the highest index.
    fn open_array_len(&mut self, elements: &[Element]) -> Result<Option<u64>, UnbedError> {
        let mut next: i128 = 0;
        let mut max: i128 = 0;
        for el in elements {
            if let Some(key) = &el.key {
                let k = self.value(key, None)?;
                match k.val {
                    Some(v) => next = v,
                    None => return Ok(None),
                }
            }
            next += 1;
            max = max.max(next);
        }
        Ok(Some(max as u64))
    }
}

impl Operand {
    fn mode_if_constant(&self) -> Mode {
        if self.mode == Mode::Constant { Mode::Constant } else { Mode::Value }
    }
}

fn open_array_elem(t: &Spanned<Expr>) -> Option<&Spanned<TypeExpr>> {
    match &t.node.kind {
        ExprKind::Type(te) => match &te.node {
            TypeExpr::Array { len: None, elem } => Some(elem),
            _ => None,
        },
        _ => None,
    }
}

fn is_signed(k: BasicKind) -> bool {
    matches!(
        k,
        BasicKind::Int | BasicKind::Int8 | BasicKind::Int16 | BasicKind::Int32 | BasicKind::Int64
    )
}

fn compare(op: BinOp, a: i128, b: i128) -> bool {
    match op {
        BinOp::Eq => a == b,
        BinOp::Neq => a != b,
        BinOp::Lt => a < b,
        BinOp::Gt => a > b,
        BinOp::LtEq => a <= b,
        _ => a >= b,
    }
}

fn fold(op: BinOp, a: i128, b: i128) -> Option<i128> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => a.checked_div(b),
        BinOp::Mod => a.checked_rem(b),
        BinOp::BitAnd => Some(a & b),
        BinOp::BitOr => Some(a | b),
        BinOp::BitXor => Some(a ^ b),
        BinOp::AndNot => Some(a & !b),
        _ => None,
    }
}

/// Value of an integer literal, or `None` if it does not fit.
pub(crate) fn parse_int(text: &str) -> Option<i128> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i128::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i128::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

/// Code point of a rune literal such as `'a'` or `'\n'`.
pub(crate) fn rune_value(text: &str) -> Option<i128> {
    let body = text.strip_prefix('\'')?.strip_suffix('\'')?;
    if body == "\\'" {
        return Some('\'' as i128);
    }
    if body == "\"" {
        return Some('"' as i128);
    }
    let s = unquote(&format!("\"{body}\"")).ok()?;
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x_FF"), Some(255));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0"), Some(0));
    }

    #[test]
    fn rune_literals() {
        assert_eq!(rune_value("'a'"), Some(97));
        assert_eq!(rune_value(r"'\n'"), Some(10));
        assert_eq!(rune_value(r"'\''"), Some(39));
        assert_eq!(rune_value("'é'"), Some(0xe9));
    }

    #[test]
    fn constant_folding() {
        assert_eq!(fold(BinOp::Add, 2, 3), Some(5));
        assert_eq!(fold(BinOp::AndNot, 0b111, 0b010), Some(0b101));
        assert_eq!(fold(BinOp::Div, 1, 0), None);
        assert!(compare(BinOp::LtEq, 2, 2));
    }
}
