//! Resolution of a field spec to an immediate embedded field.

use serde::Serialize;

use crate::diagnostics::{ResolveError, UnbedError};
use crate::field_spec::FieldSpec;
use crate::loader::Program;
use crate::typeck::env::Entity;
use crate::typeck::lookup::{lookup_field_or_method, LookupResult};
use crate::typeck::types::{FieldId, Object, StructId, TypeId};

/// The embedded field being made explicit, resolved once per run and shared
/// by every walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Import path of the declaring package.
    pub package: String,
    pub type_name: String,
    /// Named type declaring the embedding.
    pub owner_type: TypeId,
    /// Struct literal underlying `owner_type`.
    pub owner: StructId,
    pub field: FieldId,
    /// The embedded field's current name.
    pub field_name: String,
    /// Name written in front of each rewritten member.
    pub insert_name: String,
}

impl Target {
    /// Text spliced in before the final member name of each access.
    pub fn insertion(&self) -> String {
        format!("{}.", self.insert_name)
    }
}

/// Summary of a resolved target for the JSON plan.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    pub package: String,
    pub type_name: String,
    pub field_name: String,
    pub insert_name: String,
}

impl From<&Target> for TargetSummary {
    fn from(t: &Target) -> Self {
        Self {
            package: t.package.clone(),
            type_name: t.type_name.clone(),
            field_name: t.field_name.clone(),
            insert_name: t.insert_name.clone(),
        }
    }
}

/// Resolve `spec` against the loaded target package. `insert_as` replaces the
/// embedded field's name as the inserted identifier.
pub fn resolve_target(program: &Program, spec: &FieldSpec, insert_as: Option<&str>) -> Result<Target, UnbedError> {
    let package = program.target.clone();
    let not_found = || ResolveError::TypeNotFound { package: package.clone(), type_name: spec.type_name.clone() };

    let unit = program.unit(&package).ok_or_else(not_found)?;
    let owner_type = match unit.scope.lookup(&spec.type_name) {
        Some(Entity::Type(ty)) => *ty,
        _ => return Err(not_found().into()),
    };
    let types = &program.types;
    let owner = types
        .struct_of(owner_type)
        .ok_or_else(|| ResolveError::NotAStruct { type_name: spec.type_name.clone() })?;

    let immediate = |reason: &str| ResolveError::ExpectedImmediateEmbeddedField {
        type_name: spec.type_name.clone(),
        field: spec.field_name.clone(),
        reason: reason.to_string(),
    };

    let field = match lookup_field_or_method(types, owner_type, true, &package, &spec.field_name) {
        LookupResult::Found { obj: Object::Field(field), index, .. } => {
            if index.len() != 1 {
                return Err(immediate(&format!("is embedded at depth {}", index.len())).into());
            }
            if !types.field(field).embedded {
                return Err(immediate("is not an embedded field").into());
            }
            field
        }
        LookupResult::Found { .. } | LookupResult::NotAddressable => return Err(immediate("is a method").into()),
        LookupResult::Ambiguous => {
            return Err(ResolveError::AmbiguousField { type_name: spec.type_name.clone(), field: spec.field_name.clone() }
                .into())
        }
        LookupResult::NotFound | LookupResult::Opaque { .. } => {
            return Err(ResolveError::FieldNotFound { type_name: spec.type_name.clone(), field: spec.field_name.clone() }
                .into())
        }
    };
    debug_assert_eq!(field.strukt, owner);

    let insert_name = match insert_as {
        Some(name) if !is_identifier(name) => {
            return Err(UnbedError::bad_spec(format!("--as {name:?} is not an identifier")));
        }
        Some(name) => name.to_string(),
        None => spec.field_name.clone(),
    };

    Ok(Target {
        package,
        type_name: spec.type_name.clone(),
        owner_type,
        owner,
        field,
        field_name: spec.field_name.clone(),
        insert_name,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && name != "_"
}
