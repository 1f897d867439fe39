//! Finding the selectors that reach a member implicitly through the target
//! embedded field.
//!
//! A selector `x.m` whose promotion path passes through the target field is
//! rewritten to `x.F.m` by inserting `F.` in front of `m`. Selectors that
//! cannot be rewritten safely are left alone and reported instead:
//!
//! - method expressions (`T.m`), whose type depends on the path taken,
//! - `unsafe.Offsetof(x.m)`, whose value is relative to the struct holding `m`,
//! - selectors where `x.F` or `x.F.m` would resolve to a different member,
//!   or where `F` cannot be named from the selector's package,
//! - selectors whose member depends on a type from outside the workspace and
//!   might pass through the target.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, trace};

use crate::loader::{Program, TypedUnit};
use crate::parser::ast::{unparen, Expr, ExprKind, File};
use crate::resolve::Target;
use crate::span::{Span, Spanned};
use crate::typeck::env::Builtin;
use crate::typeck::info::{Mode, Selection, SelectionKind, TypeInfo, Unresolved};
use crate::typeck::lookup::{lookup_field_or_method, LookupResult};
use crate::typeck::types::{is_exported, FieldId, Object, TypeId, Types};
use crate::visit::{walk_expr, walk_file, Visitor};

/// Why a matching selector was not rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VetoReason {
    MethodExpression { member: String },
    Offsetof { member: String },
    /// `x.F` itself selects something other than the target field.
    ShadowedEmbedding { field: String },
    /// `x.F.m` selects a different member than `x.m`.
    ShadowedMember { field: String, member: String },
    /// The inserted name is unexported and declared in another package.
    Inaccessible { field: String },
    /// The inserted name already selects something at or above the target.
    NameTaken { name: String },
    /// An embedded type from outside the workspace could hold the member.
    Unresolved { member: String },
}

impl fmt::Display for VetoReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VetoReason::MethodExpression { member } => {
                write!(f, "not rewriting method expression {member}: an explicit path changes its receiver type")
            }
            VetoReason::Offsetof { member } => {
                write!(f, "not rewriting unsafe.Offsetof argument {member}: an explicit path changes the offset")
            }
            VetoReason::ShadowedEmbedding { field } => {
                write!(f, "not rewriting: {field} selects a different member from this receiver")
            }
            VetoReason::ShadowedMember { field, member } => {
                write!(f, "not rewriting: {field}.{member} would select a different member")
            }
            VetoReason::Inaccessible { field } => {
                write!(f, "not rewriting: {field} is not accessible from this package")
            }
            VetoReason::NameTaken { name } => {
                write!(f, "not rewriting: {name} already selects a different member from this receiver")
            }
            VetoReason::Unresolved { member } => {
                write!(f, "not rewriting {member}: it may select a member of a type from outside the workspace")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    /// Span of the selected member name.
    pub span: Span,
    pub reason: VetoReason,
}

/// Rewrites and vetoes found in one file.
#[derive(Debug, Clone, Default)]
pub struct FileMatches {
    pub path: PathBuf,
    pub file_id: u32,
    /// Start offsets of the member names to qualify, ascending.
    pub offsets: Vec<usize>,
    pub vetoes: Vec<Veto>,
}

impl FileMatches {
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty() && self.vetoes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct UnitMatches {
    pub path: String,
    /// Only files with at least one rewrite or veto.
    pub files: Vec<FileMatches>,
}

impl UnitMatches {
    pub fn rewrites(&self) -> usize {
        self.files.iter().map(|f| f.offsets.len()).sum()
    }
}

/// Walk every file of every initial unit.
pub fn find_matches(program: &Program, target: &Target) -> Vec<UnitMatches> {
    let mut units = Vec::new();
    for unit in program.initial_units() {
        let files = unbed_unit(&program.types, unit, target);
        debug!(package = %unit.path, files = files.len(), "walked package");
        if !files.is_empty() {
            units.push(UnitMatches { path: unit.path.clone(), files });
        }
    }
    units
}

fn unbed_unit(types: &Types, unit: &TypedUnit, target: &Target) -> Vec<FileMatches> {
    unit.files
        .iter()
        .zip(&unit.infos)
        .filter_map(|(file, info)| {
            let (offsets, vetoes) = unbed_file(types, info, &unit.path, target, &file.ast);
            let matches = FileMatches { path: file.path.clone(), file_id: file.file_id, offsets, vetoes };
            (!matches.is_empty()).then_some(matches)
        })
        .collect()
}

/// Offsets to rewrite and vetoed selectors in one file of package `pkg`.
pub fn unbed_file(types: &Types, info: &TypeInfo, pkg: &str, target: &Target, file: &File) -> (Vec<usize>, Vec<Veto>) {
    let mut u = Unbedder { types, info, pkg, target, stack: Vec::new(), offsets: Vec::new(), vetoes: Vec::new() };
    walk_file(&mut u, file);
    u.offsets.sort_unstable();
    u.offsets.dedup();
    (u.offsets, u.vetoes)
}

struct Unbedder<'a, 'ast> {
    types: &'a Types,
    info: &'a TypeInfo,
    pkg: &'a str,
    target: &'a Target,
    /// Enclosing expressions of the one being visited.
    stack: Vec<&'ast Spanned<Expr>>,
    offsets: Vec<usize>,
    vetoes: Vec<Veto>,
}

impl<'a, 'ast> Visitor<'ast> for Unbedder<'a, 'ast> {
    fn visit_expr(&mut self, expr: &'ast Spanned<Expr>) {
        if let ExprKind::Selector { field, .. } = &expr.node.kind {
            self.selector(expr, field);
        }
        self.stack.push(expr);
        walk_expr(self, expr);
        self.stack.pop();
    }
}

impl<'a, 'ast> Unbedder<'a, 'ast> {
    fn selector(&mut self, expr: &'ast Spanned<Expr>, member: &Spanned<String>) {
        let info = self.info;
        // Qualified identifiers have no selection.
        let Some(sel) = info.selections.get(&expr.id()) else {
            if let Some(unresolved) = info.unresolved.get(&expr.id()) {
                self.unresolved(unresolved, member);
            }
            return;
        };
        if sel.index.len() == 1 {
            return;
        }
        let Some(hop) = self.target_hop(sel.recv, &sel.index[..sel.index.len() - 1]) else {
            return;
        };
        trace!(member = %member.node, hop, "selector passes through target");

        if let Some(reason) = self.veto(sel, hop, member) {
            self.push_veto(member, reason);
            return;
        }
        self.offsets.push(member.span.start);
    }

    /// Report a selector that may or may not pass through the target.
    fn unresolved(&mut self, unresolved: &Unresolved, member: &Spanned<String>) {
        let known = unresolved.known.as_deref().and_then(|index| index.split_last()).map(|(_, path)| path);
        let crosses = known.into_iter().chain(unresolved.external.iter().map(Vec::as_slice)).any(|path| {
            self.target_hop(unresolved.recv, path).is_some()
        });
        if crosses {
            self.push_veto(member, VetoReason::Unresolved { member: member.node.clone() });
        }
    }

    fn push_veto(&mut self, member: &Spanned<String>, reason: VetoReason) {
        debug!(%reason, offset = member.span.start, "vetoed");
        self.vetoes.push(Veto { span: member.span, reason });
    }

    /// Position in the embedded-field `path` from `recv` where the target
    /// field is crossed.
    fn target_hop(&self, recv: TypeId, path: &[usize]) -> Option<usize> {
        let mut ty = recv;
        let mut hops = Vec::new();
        for (hop, &index) in path.iter().enumerate() {
            let Some(strukt) = self.types.struct_of(self.types.deref_underlying(ty)) else {
                break;
            };
            let field = FieldId { strukt, index };
            if field == self.target.field {
                hops.push(hop);
            }
            ty = self.types.field(field).ty;
        }
        // A path visits each named type once, and the target field is only
        // reachable through its named owner.
        debug_assert!(hops.len() <= 1, "target field crossed {} times", hops.len());
        hops.first().copied()
    }

    /// `hop` is the target field's position in the promotion path.
    fn veto(&self, sel: &Selection, hop: usize, member: &Spanned<String>) -> Option<VetoReason> {
        if sel.kind == SelectionKind::MethodExpr {
            return Some(VetoReason::MethodExpression { member: member.node.clone() });
        }
        if self.in_offsetof() {
            return Some(VetoReason::Offsetof { member: member.node.clone() });
        }

        let declared_in = &self.types.field(self.target.field).pkg;
        let field_name = &self.target.field_name;
        let insert_name = &self.target.insert_name;
        for name in [field_name, insert_name] {
            if !is_exported(name) && declared_in != self.pkg {
                return Some(VetoReason::Inaccessible { field: name.clone() });
            }
        }

        match lookup_field_or_method(self.types, sel.recv, true, self.pkg, field_name) {
            LookupResult::Found { obj: Object::Field(f), .. } if f == self.target.field => {}
            LookupResult::Opaque { .. } => return Some(VetoReason::Unresolved { member: member.node.clone() }),
            _ => return Some(VetoReason::ShadowedEmbedding { field: field_name.clone() }),
        }

        // Once the field is renamed, `x.NewName` must reach it: nothing of that
        // name may sit at or above the field's depth.
        if insert_name != field_name {
            match lookup_field_or_method(self.types, sel.recv, true, self.pkg, insert_name) {
                LookupResult::NotFound => {}
                LookupResult::Found { index, .. } if index.len() > hop + 1 => {}
                LookupResult::Opaque { .. } => return Some(VetoReason::Unresolved { member: member.node.clone() }),
                _ => return Some(VetoReason::NameTaken { name: insert_name.clone() }),
            }
        }

        // A lookup from the field's type searches a subtree of the receiver's
        // search at the same relative depths, so it can only find `sel.obj`.
        // Kept as a check on the lookup itself.
        let embedded = self.types.field(self.target.field).ty;
        match lookup_field_or_method(self.types, embedded, true, self.pkg, &member.node) {
            LookupResult::Found { obj, .. } if obj == sel.obj => None,
            _ => Some(VetoReason::ShadowedMember { field: field_name.clone(), member: member.node.clone() }),
        }
    }

    /// The selector being visited is the argument of `unsafe.Offsetof`.
    fn in_offsetof(&self) -> bool {
        let Some(parent) = self.stack.iter().rev().find(|e| !matches!(e.node.kind, ExprKind::Paren(_))) else {
            return false;
        };
        let ExprKind::Call { func, .. } = &parent.node.kind else {
            return false;
        };
        self.info.mode_of(unparen(func).id()) == Some(Mode::Builtin(Builtin::Offsetof))
    }
}
