use std::collections::HashMap;

use crate::parser::ast::ExprId;

use super::env::Builtin;
use super::types::{Object, TypeId};

/// How an expression may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A call with no results.
    NoValue,
    Value,
    /// An addressable value.
    Variable,
    Constant,
    Type,
    Builtin(Builtin),
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAndMode {
    pub mode: Mode,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// `x.f` selecting a field of a value.
    FieldVal,
    /// `x.m` selecting a method of a value.
    MethodVal,
    /// `T.m` or `(*T).m`, a method through its type.
    MethodExpr,
}

/// A resolved `x.name` that is not a qualified identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Static type of `x`.
    pub recv: TypeId,
    pub obj: Object,
    /// Promotion path: embedded field indices, then the member's own index.
    pub index: Vec<usize>,
    pub indirect: bool,
}

/// `x.name` whose target depends on members of types from outside the
/// workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub recv: TypeId,
    /// Promotion path if the external types contribute nothing.
    pub known: Option<Vec<usize>>,
    /// Paths to the embedded external types.
    pub external: Vec<Vec<usize>>,
}

/// `pkg.Name` referring to a member of an imported package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedUse {
    pub package: String,
    pub name: String,
}

/// Type information for one file, keyed by expression id.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub types: HashMap<ExprId, TypeAndMode>,
    pub selections: HashMap<ExprId, Selection>,
    pub uses: HashMap<ExprId, QualifiedUse>,
    pub unresolved: HashMap<ExprId, Unresolved>,
}

impl TypeInfo {
    pub fn type_of(&self, id: ExprId) -> Option<TypeId> {
        self.types.get(&id).map(|tv| tv.ty)
    }

    pub fn mode_of(&self, id: ExprId) -> Option<Mode> {
        self.types.get(&id).map(|tv| tv.mode)
    }
}
