//! AST visitor infrastructure
//!
//! `Visitor` walks a parsed file by shared reference. The `'ast` lifetime lets a
//! visitor keep references to nodes it has seen (for example a stack of
//! enclosing expressions) for as long as the file is borrowed.
//!
//! ## Usage
//!
//! Implement the trait for your pass, overriding only the methods you need.
//! Call the corresponding `walk_*` function inside your override to get default recursion.
//!
//! ```rust
//! use unbed::visit::{Visitor, walk_expr};
//! use unbed::parser::ast::{Expr, ExprKind};
//! use unbed::span::Spanned;
//!
//! struct SelectorCounter {
//!     count: usize,
//! }
//!
//! impl<'ast> Visitor<'ast> for SelectorCounter {
//!     fn visit_expr(&mut self, expr: &'ast Spanned<Expr>) {
//!         if let ExprKind::Selector { .. } = &expr.node.kind {
//!             self.count += 1;
//!         }
//!         walk_expr(self, expr); // Continue recursion
//!     }
//! }
//! ```

use crate::parser::ast::*;
use crate::span::Spanned;

/// Read-only AST visitor. Default implementations recurse into all children.
/// Omit the walk call in an override to prune traversal at that node.
pub trait Visitor<'ast>: Sized {
    fn visit_file(&mut self, file: &'ast File) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        walk_decl(self, decl);
    }

    fn visit_func(&mut self, func: &'ast Spanned<FuncDecl>) {
        walk_func(self, func);
    }

    fn visit_block(&mut self, block: &'ast Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Spanned<Expr>) {
        walk_expr(self, expr);
    }

    fn visit_type_expr(&mut self, te: &'ast Spanned<TypeExpr>) {
        walk_type_expr(self, te);
    }
}

pub fn walk_file<'ast, V: Visitor<'ast>>(v: &mut V, file: &'ast File) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<'ast, V: Visitor<'ast>>(v: &mut V, decl: &'ast Decl) {
    match decl {
        Decl::Type(spec) => v.visit_type_expr(&spec.node.ty),
        Decl::Func(func) => v.visit_func(func),
        Decl::Var(spec) | Decl::Const(spec) => {
            if let Some(ty) = &spec.node.ty {
                v.visit_type_expr(ty);
            }
            for value in &spec.node.values {
                v.visit_expr(value);
            }
        }
    }
}

pub fn walk_func<'ast, V: Visitor<'ast>>(v: &mut V, func: &'ast Spanned<FuncDecl>) {
    walk_signature(v, &func.node.sig);
    if let Some(body) = &func.node.body {
        v.visit_block(body);
    }
}

fn walk_signature<'ast, V: Visitor<'ast>>(v: &mut V, sig: &'ast Signature) {
    for p in sig.params.iter().chain(&sig.results) {
        v.visit_type_expr(&p.ty);
    }
}

pub fn walk_block<'ast, V: Visitor<'ast>>(v: &mut V, block: &'ast Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(v: &mut V, stmt: &'ast Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Block(block) => v.visit_block(block),
        Stmt::Decl(decls) => {
            for decl in decls {
                v.visit_decl(decl);
            }
        }
        Stmt::ShortVarDecl { values, .. } => {
            for value in values {
                v.visit_expr(value);
            }
        }
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs.iter().chain(rhs) {
                v.visit_expr(e);
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Expr(e) | Stmt::Go(e) | Stmt::Defer(e) => v.visit_expr(e),
        Stmt::Return(values) => {
            for value in values {
                v.visit_expr(value);
            }
        }
        Stmt::If { init, cond, then_block, else_branch } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        Stmt::For { init, cond, post, body } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::ForRange { key, value, iterable, body, .. } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(iterable);
            v.visit_block(body);
        }
        Stmt::Switch { init, tag, cases } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for case in cases {
                for e in &case.node.exprs {
                    v.visit_expr(e);
                }
                for s in &case.node.body {
                    v.visit_stmt(s);
                }
            }
        }
        Stmt::Branch(_) | Stmt::Empty => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(v: &mut V, expr: &'ast Spanned<Expr>) {
    match &expr.node.kind {
        ExprKind::Ident(_)
        | ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::RuneLit(_)
        | ExprKind::StringLit(_) => {}
        ExprKind::CompositeLit { ty, elements } => {
            if let Some(ty) = ty {
                v.visit_expr(ty);
            }
            for el in elements {
                if let Some(key) = &el.key {
                    v.visit_expr(key);
                }
                v.visit_expr(&el.value);
            }
        }
        ExprKind::FuncLit { sig, body } => {
            walk_signature(v, sig);
            v.visit_block(body);
        }
        ExprKind::Paren(inner) => v.visit_expr(inner),
        ExprKind::Selector { object, .. } => v.visit_expr(object),
        ExprKind::Index { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        ExprKind::Slice { object, low, high, max } => {
            v.visit_expr(object);
            for part in [low, high, max].into_iter().flatten() {
                v.visit_expr(part);
            }
        }
        ExprKind::TypeAssert { object, ty } => {
            v.visit_expr(object);
            v.visit_type_expr(ty);
        }
        ExprKind::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        ExprKind::Type(te) => v.visit_type_expr(te),
    }
}

/// Type expressions only hold value expressions in array lengths.
pub fn walk_type_expr<'ast, V: Visitor<'ast>>(v: &mut V, te: &'ast Spanned<TypeExpr>) {
    match &te.node {
        TypeExpr::Name(_) | TypeExpr::Qualified { .. } => {}
        TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => v.visit_type_expr(inner),
        TypeExpr::Array { len, elem } => {
            if let Some(len) = len {
                v.visit_expr(len);
            }
            v.visit_type_expr(elem);
        }
        TypeExpr::Map { key, value } => {
            v.visit_type_expr(key);
            v.visit_type_expr(value);
        }
        TypeExpr::Func(sig) => walk_signature(v, sig),
        TypeExpr::Struct(fields) => {
            for field in fields {
                v.visit_type_expr(&field.ty);
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { sig, .. } => walk_signature(v, sig),
                    InterfaceElem::Embed(ty) => v.visit_type_expr(ty),
                }
            }
        }
    }
}
