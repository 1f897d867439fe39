use std::collections::HashMap;

use super::types::{BasicKind, TypeId, Types};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Clear,
    Close,
    Complex,
    Copy,
    Delete,
    Imag,
    Len,
    Make,
    Max,
    Min,
    New,
    Panic,
    Print,
    Println,
    Real,
    Recover,
    // unsafe
    Offsetof,
    Sizeof,
    Alignof,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Clear => "clear",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Imag => "imag",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Max => "max",
            Builtin::Min => "min",
            Builtin::New => "new",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Real => "real",
            Builtin::Recover => "recover",
            Builtin::Offsetof => "unsafe.Offsetof",
            Builtin::Sizeof => "unsafe.Sizeof",
            Builtin::Alignof => "unsafe.Alignof",
        }
    }
}

/// What a name denotes.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Type(TypeId),
    Var(TypeId),
    /// A constant with its integer value when known.
    Const(TypeId, Option<i128>),
    Func(TypeId),
    Builtin(Builtin),
    Nil,
    Iota,
    /// An imported package, by import path. Only found in file scopes.
    Package(String),
}

/// The top-level scope of a checked package.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Name from the package clause.
    pub name: String,
    pub path: String,
    pub entities: HashMap<String, Entity>,
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }
}

/// Nested block scopes of a function body.
#[derive(Debug, Default)]
pub struct LocalEnv {
    scopes: Vec<HashMap<String, Entity>>,
}

impl LocalEnv {
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Declare in the innermost scope. Returns false if the name is already
    /// declared there.
    pub fn define(&mut self, name: &str, entity: Entity) -> bool {
        if name == "_" {
            return true;
        }
        match self.scopes.last_mut() {
            Some(scope) if scope.contains_key(name) => false,
            Some(scope) => {
                scope.insert(name.to_string(), entity);
                true
            }
            None => false,
        }
    }

    pub fn defined_in_current(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.contains_key(name))
    }

    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

/// Predeclared identifiers.
pub fn universe(types: &Types, name: &str) -> Option<Entity> {
    let basic = |k| Some(Entity::Type(types.basic(k)));
    match name {
        "bool" => basic(BasicKind::Bool),
        "int" => basic(BasicKind::Int),
        "int8" => basic(BasicKind::Int8),
        "int16" => basic(BasicKind::Int16),
        "int32" | "rune" => basic(BasicKind::Int32),
        "int64" => basic(BasicKind::Int64),
        "uint" => basic(BasicKind::Uint),
        "uint8" | "byte" => basic(BasicKind::Uint8),
        "uint16" => basic(BasicKind::Uint16),
        "uint32" => basic(BasicKind::Uint32),
        "uint64" => basic(BasicKind::Uint64),
        "uintptr" => basic(BasicKind::Uintptr),
        "float32" => basic(BasicKind::Float32),
        "float64" => basic(BasicKind::Float64),
        "complex64" => basic(BasicKind::Complex64),
        "complex128" => basic(BasicKind::Complex128),
        "string" => basic(BasicKind::String),
        "error" => Some(Entity::Type(types.error_type())),
        "any" => Some(Entity::Type(types.any_type())),
        "true" => Some(Entity::Const(types.basic(BasicKind::UntypedBool), Some(1))),
        "false" => Some(Entity::Const(types.basic(BasicKind::UntypedBool), Some(0))),
        "nil" => Some(Entity::Nil),
        "iota" => Some(Entity::Iota),
        "append" => Some(Entity::Builtin(Builtin::Append)),
        "cap" => Some(Entity::Builtin(Builtin::Cap)),
        "clear" => Some(Entity::Builtin(Builtin::Clear)),
        "close" => Some(Entity::Builtin(Builtin::Close)),
        "complex" => Some(Entity::Builtin(Builtin::Complex)),
        "copy" => Some(Entity::Builtin(Builtin::Copy)),
        "delete" => Some(Entity::Builtin(Builtin::Delete)),
        "imag" => Some(Entity::Builtin(Builtin::Imag)),
        "len" => Some(Entity::Builtin(Builtin::Len)),
        "make" => Some(Entity::Builtin(Builtin::Make)),
        "max" => Some(Entity::Builtin(Builtin::Max)),
        "min" => Some(Entity::Builtin(Builtin::Min)),
        "new" => Some(Entity::Builtin(Builtin::New)),
        "panic" => Some(Entity::Builtin(Builtin::Panic)),
        "print" => Some(Entity::Builtin(Builtin::Print)),
        "println" => Some(Entity::Builtin(Builtin::Println)),
        "real" => Some(Entity::Builtin(Builtin::Real)),
        "recover" => Some(Entity::Builtin(Builtin::Recover)),
        _ => None,
    }
}

/// Members of the `unsafe` pseudo-package.
pub fn unsafe_member(types: &Types, name: &str) -> Option<Entity> {
    match name {
        "Pointer" => Some(Entity::Type(types.basic(BasicKind::UnsafePointer))),
        "Offsetof" => Some(Entity::Builtin(Builtin::Offsetof)),
        "Sizeof" => Some(Entity::Builtin(Builtin::Sizeof)),
        "Alignof" => Some(Entity::Builtin(Builtin::Alignof)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_outer() {
        let types = Types::new();
        let int = types.basic(BasicKind::Int);
        let string = types.basic(BasicKind::String);
        let mut env = LocalEnv::default();
        env.push_scope();
        assert!(env.define("x", Entity::Var(int)));
        env.push_scope();
        assert!(env.define("x", Entity::Var(string)));
        assert_eq!(env.lookup("x"), Some(&Entity::Var(string)));
        env.pop_scope();
        assert_eq!(env.lookup("x"), Some(&Entity::Var(int)));
    }

    #[test]
    fn redeclaration_in_same_scope_rejected() {
        let types = Types::new();
        let int = types.basic(BasicKind::Int);
        let mut env = LocalEnv::default();
        env.push_scope();
        assert!(env.define("x", Entity::Var(int)));
        assert!(!env.define("x", Entity::Var(int)));
        assert!(env.define("_", Entity::Var(int)));
        assert!(env.define("_", Entity::Var(int)));
    }

    #[test]
    fn universe_aliases_share_types() {
        let types = Types::new();
        assert_eq!(universe(&types, "byte"), universe(&types, "uint8"));
        assert_eq!(universe(&types, "rune"), universe(&types, "int32"));
        assert!(universe(&types, "Offsetof").is_none());
        assert_eq!(unsafe_member(&types, "Offsetof"), Some(Entity::Builtin(Builtin::Offsetof)));
    }
}
