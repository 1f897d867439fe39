use crate::diagnostics::UnbedError;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};

use super::env::Entity;
use super::info::Mode;
use super::types::{BasicKind, FuncType, TypeId, TypeKind, Types};
use super::Checker;

impl<'a> Checker<'a> {
    /// Check a function or method body. Parameters share the body's scope;
    /// enclosing locals stay visible so closures see what they capture.
    pub(crate) fn func_body(
        &mut self,
        sig: &Signature,
        sig_ty: TypeId,
        recv: Option<(&Receiver, TypeId)>,
        body: &Spanned<Block>,
    ) -> Result<(), UnbedError> {
        let Some(func) = self.types.func_of(sig_ty).cloned() else {
            return Ok(());
        };
        self.locals.push_scope();
        self.results.push(func.results.clone());
        let out = self
            .declare_params(sig, &func, recv)
            .and_then(|()| self.stmts(&body.node.stmts));
        self.results.pop();
        self.locals.pop_scope();
        out
    }

    fn declare_params(&mut self, sig: &Signature, func: &FuncType, recv: Option<(&Receiver, TypeId)>) -> Result<(), UnbedError> {
        if let Some((recv, ty)) = recv {
            if let Some(name) = &recv.name {
                self.define_local(name, Entity::Var(ty))?;
            }
        }
        for (param, ty) in sig.params.iter().zip(&func.params) {
            if let Some(name) = &param.name {
                self.define_local(name, Entity::Var(*ty))?;
            }
        }
        for (param, ty) in sig.results.iter().zip(&func.results) {
            if let Some(name) = &param.name {
                self.define_local(name, Entity::Var(*ty))?;
            }
        }
        Ok(())
    }

    fn define_local(&mut self, name: &Spanned<String>, entity: Entity) -> Result<(), UnbedError> {
        if !self.locals.define(&name.node, entity) {
            return Err(self.err(format!("{} redeclared in this block", name.node), name.span));
        }
        Ok(())
    }

    fn stmts(&mut self, stmts: &[Spanned<Stmt>]) -> Result<(), UnbedError> {
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, UnbedError>) -> Result<T, UnbedError> {
        self.locals.push_scope();
        let out = f(self);
        self.locals.pop_scope();
        out
    }

    fn stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), UnbedError> {
        match &stmt.node {
            Stmt::Block(block) => self.scoped(|c| c.stmts(&block.node.stmts)),
            Stmt::Decl(decls) => self.local_decls(decls),
            Stmt::ShortVarDecl { names, values } => self.short_var_decl(names, values, stmt.span),
            Stmt::Assign { lhs, op: None, rhs } => {
                let mut targets = Vec::with_capacity(lhs.len());
                for target in lhs {
                    targets.push(self.assign_target(target)?);
                }
                self.assign_rhs(rhs, lhs.len(), &targets, stmt.span)?;
                Ok(())
            }
            Stmt::Assign { lhs, op: Some(op), rhs } => {
                let ([target], [value]) = (lhs.as_slice(), rhs.as_slice()) else {
                    return Err(self.err("assignment operation requires single-valued expressions", stmt.span));
                };
                let t = self.assign_target(target)?.unwrap_or(Types::INVALID);
                let hint = if op.is_shift() { None } else { Some(t) };
                let y = self.value(value, hint)?;
                if !op.is_shift() && !self.assignable(y.ty, t) {
                    return Err(self.err(
                        format!(
                            "invalid operation: mismatched types {} and {}",
                            self.types.display(t),
                            self.types.display(y.ty)
                        ),
                        stmt.span,
                    ));
                }
                Ok(())
            }
            Stmt::IncDec { target, .. } => {
                let t = self.assign_target(target)?.unwrap_or(Types::INVALID);
                if !self.types.is_opaque(t) && !self.types.basic_of(t).is_some_and(|k| k.is_numeric()) {
                    return Err(self.err(
                        format!("invalid operation: non-numeric type {}", self.types.display(t)),
                        target.span,
                    ));
                }
                Ok(())
            }
            Stmt::Expr(e) => {
                self.expr(e)?;
                if !self.is_call(e) {
                    return Err(self.err("expression is not used", e.span));
                }
                Ok(())
            }
            Stmt::Return(values) => {
                let want = self.results.last().cloned().unwrap_or_default();
                if values.is_empty() {
                    return Ok(());
                }
                if want.is_empty() {
                    return Err(self.err("too many return values", stmt.span));
                }
                let hints: Vec<Option<TypeId>> = want.iter().copied().map(Some).collect();
                self.assign_rhs(values, want.len(), &hints, stmt.span)?;
                Ok(())
            }
            Stmt::If { init, cond, then_block, else_branch } => self.scoped(|c| {
                if let Some(init) = init {
                    c.stmt(init)?;
                }
                c.condition(cond, "if statement")?;
                c.scoped(|c| c.stmts(&then_block.node.stmts))?;
                if let Some(els) = else_branch {
                    c.stmt(els)?;
                }
                Ok(())
            }),
            Stmt::For { init, cond, post, body } => self.scoped(|c| {
                if let Some(init) = init {
                    c.stmt(init)?;
                }
                if let Some(cond) = cond {
                    c.condition(cond, "for loop")?;
                }
                if let Some(post) = post {
                    c.stmt(post)?;
                }
                c.scoped(|c| c.stmts(&body.node.stmts))
            }),
            Stmt::ForRange { key, value, define, iterable, body } => self.scoped(|c| {
                let x = c.value(iterable, None)?;
                let (key_ty, value_ty) = c.range_types(x.ty, iterable.span)?;
                if value.is_some() && value_ty.is_none() {
                    return Err(c.err(
                        format!("range over {} permits only one iteration variable", c.types.display(x.ty)),
                        iterable.span,
                    ));
                }
                let vars = [(key.as_ref(), Some(key_ty)), (value.as_ref(), value_ty)];
                for (var, ty) in vars {
                    let (Some(var), Some(ty)) = (var, ty) else { continue };
                    if *define {
                        let Some(name) = var.ident_name() else {
                            return Err(c.err("non-name on left side of :=", var.span));
                        };
                        let name = Spanned::new(name.to_string(), var.span);
                        c.define_local(&name, Entity::Var(ty))?;
                    } else if let Some(target) = c.assign_target(var)? {
                        if !c.assignable(ty, target) {
                            return Err(c.err(
                                format!(
                                    "cannot assign {} to {} in range",
                                    c.types.display(ty),
                                    c.types.display(target)
                                ),
                                var.span,
                            ));
                        }
                    }
                }
                c.scoped(|c| c.stmts(&body.node.stmts))
            }),
            Stmt::Switch { init, tag, cases } => self.scoped(|c| {
                if let Some(init) = init {
                    c.stmt(init)?;
                }
                let tag_ty = match tag {
                    Some(tag) => {
                        let t = c.value(tag, None)?;
                        Some(c.types.default_type(t.ty))
                    }
                    None => None,
                };
                if cases.iter().filter(|cc| cc.node.is_default).count() > 1 {
                    return Err(c.err("multiple defaults in switch", stmt.span));
                }
                for case in cases {
                    for e in &case.node.exprs {
                        match tag_ty {
                            Some(t) => {
                                let v = c.value(e, Some(t))?;
                                if !c.assignable(v.ty, t) && !c.assignable(t, v.ty) {
                                    return Err(c.err(
                                        format!(
                                            "invalid case: mismatched types {} and {}",
                                            c.types.display(v.ty),
                                            c.types.display(t)
                                        ),
                                        e.span,
                                    ));
                                }
                            }
                            None => c.condition(e, "case")?,
                        }
                    }
                    c.scoped(|c| c.stmts(&case.node.body))?;
                }
                Ok(())
            }),
            Stmt::Branch(_) | Stmt::Empty => Ok(()),
            Stmt::Go(e) | Stmt::Defer(e) => {
                self.expr(e)?;
                if !self.is_call(e) {
                    let what = if matches!(stmt.node, Stmt::Go(_)) { "go" } else { "defer" };
                    return Err(self.err(format!("expression in {what} must be function call"), e.span));
                }
                Ok(())
            }
        }
    }

    /// A call that is not a conversion.
    fn is_call(&self, e: &Spanned<Expr>) -> bool {
        match &unparen(e).node.kind {
            ExprKind::Call { func, .. } => self.infos[self.cur_file].mode_of(func.id()) != Some(Mode::Type),
            _ => false,
        }
    }

    fn condition(&mut self, cond: &Spanned<Expr>, what: &str) -> Result<(), UnbedError> {
        let op = self.value(cond, None)?;
        if !self.types.is_opaque(op.ty) && !self.types.basic_of(op.ty).is_some_and(|k| k.is_boolean()) {
            return Err(self.err(format!("non-boolean condition in {what}"), cond.span));
        }
        Ok(())
    }

    fn short_var_decl(&mut self, names: &[Spanned<String>], values: &[Spanned<Expr>], span: Span) -> Result<(), UnbedError> {
        let hints: Vec<Option<TypeId>> = names
            .iter()
            .map(|n| match self.locals.lookup(&n.node) {
                Some(Entity::Var(ty)) if self.locals.defined_in_current(&n.node) => Some(*ty),
                _ => None,
            })
            .collect();
        let tys = self.assign_rhs(values, names.len(), &hints, span)?;
        let nil = self.types.basic(BasicKind::UntypedNil);
        let mut any_new = false;
        for ((name, ty), hint) in names.iter().zip(tys).zip(hints) {
            if name.node == "_" || hint.is_some() {
                continue;
            }
            if self.locals.defined_in_current(&name.node) {
                return Err(self.err(format!("cannot assign to {}", name.node), name.span));
            }
            if ty == nil {
                return Err(self.err("use of untyped nil in assignment", name.span));
            }
            any_new = true;
            let ty = self.types.default_type(ty);
            self.define_local(name, Entity::Var(ty))?;
        }
        if !any_new {
            return Err(self.err("no new variables on left side of :=", span));
        }
        Ok(())
    }

    /// Check the right-hand side of an assignment to `n` locations. `hints`
    /// holds the location types where known. Returns the value types.
    fn assign_rhs(
        &mut self,
        rhs: &[Spanned<Expr>],
        n: usize,
        hints: &[Option<TypeId>],
        span: Span,
    ) -> Result<Vec<TypeId>, UnbedError> {
        let hint = |i: usize| hints.get(i).copied().flatten();

        if rhs.len() == n {
            let mut tys = Vec::with_capacity(n);
            for (i, e) in rhs.iter().enumerate() {
                let op = match hint(i) {
                    Some(t) => self.assign_to(e, t, "assignment")?,
                    None => self.value(e, None)?,
                };
                tys.push(op.ty);
            }
            return Ok(tys);
        }

        let [single] = rhs else {
            return Err(self.mismatch(n, rhs.len(), span));
        };

        if n == 2 && self.comma_ok_form(single) {
            let op = self.value(single, hint(0))?;
            if !self.comma_ok_allowed(single) {
                return Err(self.mismatch(n, 1, span));
            }
            if let Some(t) = hint(0) {
                if !self.assignable(op.ty, t) {
                    return Err(self.err(
                        format!("cannot use value of type {} as {} value in assignment", self.types.display(op.ty), self.types.display(t)),
                        single.span,
                    ));
                }
            }
            return Ok(vec![op.ty, self.types.basic(BasicKind::UntypedBool)]);
        }

        let op = self.expr(single)?;
        if op.mode == Mode::NoValue {
            return Err(self.err("function call (no value) used as value", single.span));
        }
        if self.types.is_opaque(op.ty) {
            return Ok(vec![Types::OPAQUE; n]);
        }
        let TypeKind::Tuple(elems) = self.types.kind(op.ty).clone() else {
            return Err(self.mismatch(n, 1, span));
        };
        if elems.len() != n {
            return Err(self.mismatch(n, elems.len(), span));
        }
        for (i, ty) in elems.iter().enumerate() {
            if let Some(t) = hint(i) {
                if !self.assignable(*ty, t) {
                    return Err(self.err(
                        format!("cannot use value of type {} as {} value in assignment", self.types.display(*ty), self.types.display(t)),
                        single.span,
                    ));
                }
            }
        }
        Ok(elems)
    }

    fn mismatch(&self, want: usize, got: usize, span: Span) -> UnbedError {
        let values = if got == 1 { "value" } else { "values" };
        self.err(format!("assignment mismatch: {want} variables but {got} {values}"), span)
    }

    fn comma_ok_form(&self, e: &Spanned<Expr>) -> bool {
        matches!(unparen(e).node.kind, ExprKind::Index { .. } | ExprKind::TypeAssert { .. })
    }

    /// `m[k]` on a map or `x.(T)`, once checked.
    fn comma_ok_allowed(&self, e: &Spanned<Expr>) -> bool {
        match &unparen(e).node.kind {
            ExprKind::TypeAssert { .. } => true,
            ExprKind::Index { object, .. } => {
                let Some(ty) = self.infos[self.cur_file].type_of(object.id()) else {
                    return false;
                };
                self.types.is_opaque(ty) || matches!(self.types.kind(self.types.underlying(ty)), TypeKind::Map { .. })
            }
            _ => false,
        }
    }

    /// Type of an assignable location, or `None` for the blank identifier.
    fn assign_target(&mut self, e: &Spanned<Expr>) -> Result<Option<TypeId>, UnbedError> {
        if e.ident_name() == Some("_") {
            return Ok(None);
        }
        let op = self.value(e, None)?;
        if op.mode == Mode::Variable || self.types.is_opaque(op.ty) {
            return Ok(Some(op.ty));
        }
        if let ExprKind::Index { object, .. } = &unparen(e).node.kind {
            let is_map = self.infos[self.cur_file]
                .type_of(object.id())
                .is_some_and(|t| matches!(self.types.kind(self.types.underlying(t)), TypeKind::Map { .. }));
            if is_map {
                return Ok(Some(op.ty));
            }
        }
        Err(self.err("cannot assign to expression", e.span))
    }

    /// Key and value types of a range loop. The value type is `None` when
    /// the range permits only a key.
    fn range_types(&mut self, ty: TypeId, span: Span) -> Result<(TypeId, Option<TypeId>), UnbedError> {
        if self.types.is_opaque(ty) {
            return Ok((Types::OPAQUE, Some(Types::OPAQUE)));
        }
        let int = self.types.basic(BasicKind::Int);
        match self.types.kind(self.types.underlying(ty)).clone() {
            TypeKind::Basic(k) if k.is_string() => Ok((int, Some(self.types.basic(BasicKind::Int32)))),
            TypeKind::Basic(k) if k.is_integer() => Ok((self.types.default_type(ty), None)),
            TypeKind::Slice(elem) | TypeKind::Array { elem, .. } => Ok((int, Some(elem))),
            TypeKind::Pointer(p) => match self.types.kind(self.types.underlying(p)).clone() {
                TypeKind::Array { elem, .. } => Ok((int, Some(elem))),
                _ => Err(self.err(format!("cannot range over {}", self.types.display(ty)), span)),
            },
            TypeKind::Map { key, value } => Ok((key, Some(value))),
            TypeKind::Func(_) => Ok((Types::OPAQUE, Some(Types::OPAQUE))),
            _ => Err(self.err(format!("cannot range over {}", self.types.display(ty)), span)),
        }
    }

    fn local_decls(&mut self, decls: &[Decl]) -> Result<(), UnbedError> {
        let mut last_init: Option<&Spanned<ValueSpec>> = None;
        for decl in decls {
            match decl {
                Decl::Var(spec) => {
                    let tys = self.var_spec_types(spec)?;
                    for (name, ty) in spec.node.names.iter().zip(tys) {
                        self.define_local(name, Entity::Var(ty))?;
                    }
                }
                Decl::Const(spec) => {
                    if !spec.node.values.is_empty() || spec.node.iota == 0 {
                        last_init = Some(spec);
                    }
                    let init = last_init.unwrap_or(spec);
                    let values = self.const_spec_values(spec, init)?;
                    for (name, (ty, val)) in spec.node.names.iter().zip(values) {
                        self.define_local(name, Entity::Const(ty, val))?;
                    }
                }
                Decl::Type(spec) => {
                    let name = &spec.node.name;
                    if spec.node.alias {
                        let ty = self.resolve_type(&spec.node.ty)?;
                        self.define_local(name, Entity::Type(ty))?;
                    } else {
                        // Declared before its underlying type so it may refer to itself.
                        let named = self.types.new_named(&name.node, &self.path);
                        self.define_local(name, Entity::Type(named))?;
                        let rhs = self.resolve_type(&spec.node.ty)?;
                        self.types.set_underlying(named, rhs);
                    }
                }
                Decl::Func(func) => {
                    return Err(self.err("function declaration inside function body", func.span));
                }
            }
        }
        Ok(())
    }

    /// Types of the names declared by a `var` spec.
    pub(crate) fn var_spec_types(&mut self, spec: &Spanned<ValueSpec>) -> Result<Vec<TypeId>, UnbedError> {
        let declared = match &spec.node.ty {
            Some(t) => Some(self.resolve_type(t)?),
            None => None,
        };
        let n = spec.node.names.len();
        if spec.node.values.is_empty() {
            return match declared {
                Some(t) => Ok(vec![t; n]),
                None => Err(self.err("missing variable type or initialization", spec.span)),
            };
        }
        let hints = vec![declared; n];
        let tys = self.assign_rhs(&spec.node.values, n, &hints, spec.span)?;
        let nil = self.types.basic(BasicKind::UntypedNil);
        let mut out = Vec::with_capacity(n);
        for ty in tys {
            match declared {
                Some(t) => out.push(t),
                None if ty == nil => {
                    return Err(self.err("use of untyped nil in variable declaration", spec.span));
                }
                None => out.push(self.types.default_type(ty)),
            }
        }
        Ok(out)
    }

    /// Types and values of the names declared by a `const` spec. `init` is
    /// the spec whose type and expressions are repeated when `spec` has none.
    pub(crate) fn const_spec_values(
        &mut self,
        spec: &Spanned<ValueSpec>,
        init: &Spanned<ValueSpec>,
    ) -> Result<Vec<(TypeId, Option<i128>)>, UnbedError> {
        let saved = self.iota.replace(spec.node.iota as i128);
        let out = self.const_values(spec, init);
        self.iota = saved;
        out
    }

    fn const_values(
        &mut self,
        spec: &Spanned<ValueSpec>,
        init: &Spanned<ValueSpec>,
    ) -> Result<Vec<(TypeId, Option<i128>)>, UnbedError> {
        let names = &spec.node.names;
        let values = &init.node.values;
        if values.len() < names.len() {
            return Err(self.err("missing init expr for const declaration", spec.span));
        }
        if values.len() > names.len() {
            return Err(self.err("extra init expr", spec.span));
        }
        let declared = match &init.node.ty {
            Some(t) => Some(self.resolve_type(t)?),
            None => None,
        };
        let mut out = Vec::with_capacity(names.len());
        for value in values {
            let op = match declared {
                Some(t) => self.assign_to(value, t, "constant declaration")?,
                None => self.value(value, None)?,
            };
            if self.types.is_opaque(op.ty) {
                out.push((Types::OPAQUE, None));
                continue;
            }
            if op.mode != Mode::Constant {
                return Err(self.err("value is not constant", value.span));
            }
            out.push((declared.unwrap_or(op.ty), op.val));
        }
        Ok(out)
    }
}
