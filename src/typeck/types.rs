use std::collections::HashMap;

/// Index into the `Types` arena.
pub type TypeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IfaceMethodId(pub u32);

/// Identity of a struct field: the struct literal that declares it plus its position.
/// Two fields with the same name in different structs never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub strukt: StructId,
    pub index: usize,
}

/// A selectable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Object {
    Field(FieldId),
    Method(MethodId),
    IfaceMethod(IfaceMethodId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub const ALL: [BasicKind; 24] = [
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
        BasicKind::UnsafePointer,
        BasicKind::UntypedBool,
        BasicKind::UntypedInt,
        BasicKind::UntypedRune,
        BasicKind::UntypedFloat,
        BasicKind::UntypedString,
        BasicKind::UntypedNil,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedRune => "untyped rune",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer()
            || matches!(
                self,
                BasicKind::Float32 | BasicKind::Float64 | BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedFloat
            )
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// The type an untyped constant takes when nothing else constrains it.
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedRune => BasicKind::Int32,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }

    /// Rank used to combine two untyped numeric operands (`1 + 2.0` is untyped float).
    fn untyped_rank(self) -> u8 {
        match self {
            BasicKind::UntypedInt => 1,
            BasicKind::UntypedRune => 2,
            BasicKind::UntypedFloat => 3,
            _ => 0,
        }
    }

    pub fn wider_untyped(a: BasicKind, b: BasicKind) -> BasicKind {
        if a.untyped_rank() >= b.untyped_rank() { a } else { b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Invalid,
    /// A type from outside the loaded workspace. Nothing is known about it.
    Opaque,
    Basic(BasicKind),
    Named(NamedId),
    Pointer(TypeId),
    Slice(TypeId),
    Array { len: Option<u64>, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Func(FuncType),
    Struct(StructId),
    Interface(InterfaceId),
    Tuple(Vec<TypeId>),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub embedded: bool,
    /// Import path of the declaring package; unexported names only match within it.
    pub pkg: String,
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: String,
    pub pkg: String,
    /// `Types::INVALID` until the declaration is resolved.
    pub underlying: TypeId,
    pub methods: Vec<MethodId>,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub pkg: String,
    pub recv: NamedId,
    pub pointer_recv: bool,
    pub sig: TypeId,
}

#[derive(Debug, Clone)]
pub struct IfaceMethod {
    pub name: String,
    pub pkg: String,
    pub sig: TypeId,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    /// Complete method set including embedded interfaces, sorted by name.
    pub methods: Vec<IfaceMethodId>,
    /// Embeds a type from outside the workspace, so the method set is incomplete.
    pub opaque: bool,
}

/// Arena of every type in a loaded program. Structural types are interned;
/// struct and interface literals, and named types, get fresh identities.
#[derive(Debug)]
pub struct Types {
    kinds: Vec<TypeKind>,
    interned: HashMap<TypeKind, TypeId>,
    named: Vec<NamedType>,
    structs: Vec<StructType>,
    interfaces: Vec<InterfaceType>,
    methods: Vec<MethodDef>,
    iface_methods: Vec<IfaceMethod>,
    error_ty: TypeId,
    any_ty: TypeId,
}

impl Default for Types {
    fn default() -> Self {
        Self::new()
    }
}

impl Types {
    pub const INVALID: TypeId = 0;
    pub const OPAQUE: TypeId = 1;

    pub fn new() -> Self {
        let mut types = Self {
            kinds: Vec::new(),
            interned: HashMap::new(),
            named: Vec::new(),
            structs: Vec::new(),
            interfaces: Vec::new(),
            methods: Vec::new(),
            iface_methods: Vec::new(),
            error_ty: Self::INVALID,
            any_ty: Self::INVALID,
        };
        types.intern(TypeKind::Invalid);
        types.intern(TypeKind::Opaque);
        for kind in BasicKind::ALL {
            types.intern(TypeKind::Basic(kind));
        }

        // type error interface { Error() string }
        let string = types.basic(BasicKind::String);
        let sig = types.func(Vec::new(), vec![string], false);
        let method = types.add_iface_method(IfaceMethod { name: "Error".to_string(), pkg: String::new(), sig });
        let iface = types.new_interface(vec![method], false);
        let error_ty = types.new_named("error", "");
        types.set_underlying(error_ty, iface);
        types.error_ty = error_ty;
        types.any_ty = types.new_interface(Vec::new(), false);
        types
    }

    pub fn basic(&self, kind: BasicKind) -> TypeId {
        2 + kind as TypeId
    }

    pub fn error_type(&self) -> TypeId {
        self.error_ty
    }

    pub fn any_type(&self) -> TypeId {
        self.any_ty
    }

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.kinds[ty as usize]
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = self.kinds.len() as TypeId;
        self.kinds.push(kind);
        id
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = self.push(kind.clone());
        self.interned.insert(kind, id);
        id
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Slice(elem))
    }

    pub fn array(&mut self, len: Option<u64>, elem: TypeId) -> TypeId {
        self.intern(TypeKind::Array { len, elem })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern(TypeKind::Map { key, value })
    }

    pub fn func(&mut self, params: Vec<TypeId>, results: Vec<TypeId>, variadic: bool) -> TypeId {
        self.intern(TypeKind::Func(FuncType { params, results, variadic }))
    }

    pub fn tuple(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.intern(TypeKind::Tuple(elems))
    }

    pub fn new_struct(&mut self, fields: Vec<Field>) -> TypeId {
        let id = StructId(self.structs.len() as u32);
        self.structs.push(StructType { fields });
        self.push(TypeKind::Struct(id))
    }

    pub fn new_interface(&mut self, mut methods: Vec<IfaceMethodId>, opaque: bool) -> TypeId {
        methods.sort_by(|a, b| self.iface_methods[a.0 as usize].name.cmp(&self.iface_methods[b.0 as usize].name));
        let id = InterfaceId(self.interfaces.len() as u32);
        self.interfaces.push(InterfaceType { methods, opaque });
        self.push(TypeKind::Interface(id))
    }

    pub fn new_named(&mut self, name: &str, pkg: &str) -> TypeId {
        let id = NamedId(self.named.len() as u32);
        self.named.push(NamedType {
            name: name.to_string(),
            pkg: pkg.to_string(),
            underlying: Self::INVALID,
            methods: Vec::new(),
        });
        self.push(TypeKind::Named(id))
    }

    /// Set the underlying type of the named type `named`. `underlying` is
    /// reduced to its own underlying type first.
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        let under = self.underlying(underlying);
        if let TypeKind::Named(id) = *self.kind(named) {
            self.named[id.0 as usize].underlying = under;
        }
    }

    pub fn add_method(&mut self, def: MethodDef) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.named[def.recv.0 as usize].methods.push(id);
        self.methods.push(def);
        id
    }

    pub fn add_iface_method(&mut self, method: IfaceMethod) -> IfaceMethodId {
        let id = IfaceMethodId(self.iface_methods.len() as u32);
        self.iface_methods.push(method);
        id
    }

    pub fn named(&self, id: NamedId) -> &NamedType {
        &self.named[id.0 as usize]
    }

    pub fn strukt(&self, id: StructId) -> &StructType {
        &self.structs[id.0 as usize]
    }

    pub fn interface(&self, id: InterfaceId) -> &InterfaceType {
        &self.interfaces[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.0 as usize]
    }

    pub fn iface_method(&self, id: IfaceMethodId) -> &IfaceMethod {
        &self.iface_methods[id.0 as usize]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.strukt(id.strukt).fields[id.index]
    }

    pub fn as_named(&self, ty: TypeId) -> Option<NamedId> {
        match self.kind(ty) {
            TypeKind::Named(id) => Some(*id),
            _ => None,
        }
    }

    /// Named types map to their declared underlying type; all others to themselves.
    pub fn underlying(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Named(id) => self.named(*id).underlying,
            _ => ty,
        }
    }

    /// Strip one pointer level: `*T` becomes `(T, true)`.
    pub fn deref(&self, ty: TypeId) -> (TypeId, bool) {
        match self.kind(ty) {
            TypeKind::Pointer(elem) => (*elem, true),
            _ => (ty, false),
        }
    }

    /// Like `deref`, but also looks through a named pointer type.
    pub fn deref_underlying(&self, ty: TypeId) -> TypeId {
        match self.kind(self.underlying(ty)) {
            TypeKind::Pointer(elem) => *elem,
            _ => ty,
        }
    }

    pub fn struct_of(&self, ty: TypeId) -> Option<StructId> {
        match self.kind(self.underlying(ty)) {
            TypeKind::Struct(id) => Some(*id),
            _ => None,
        }
    }

    pub fn interface_of(&self, ty: TypeId) -> Option<InterfaceId> {
        match self.kind(self.underlying(ty)) {
            TypeKind::Interface(id) => Some(*id),
            _ => None,
        }
    }

    pub fn basic_of(&self, ty: TypeId) -> Option<BasicKind> {
        match self.kind(self.underlying(ty)) {
            TypeKind::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn func_of(&self, ty: TypeId) -> Option<&FuncType> {
        match self.kind(self.underlying(ty)) {
            TypeKind::Func(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_opaque(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Opaque)
    }

    pub fn is_untyped(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Basic(k) if k.is_untyped())
    }

    /// Untyped constant types become their default type; everything else is unchanged.
    pub fn default_type(&self, ty: TypeId) -> TypeId {
        match self.kind(ty) {
            TypeKind::Basic(k) if k.is_untyped() => self.basic(k.default_kind()),
            _ => ty,
        }
    }

    /// Human-readable type, with package-qualified named types.
    pub fn display(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Invalid => "invalid type".to_string(),
            TypeKind::Opaque => "<external>".to_string(),
            TypeKind::Basic(kind) => kind.name().to_string(),
            TypeKind::Named(id) => {
                let named = self.named(*id);
                if named.pkg.is_empty() {
                    named.name.clone()
                } else {
                    format!("{}.{}", package_name_of(&named.pkg), named.name)
                }
            }
            TypeKind::Pointer(elem) => format!("*{}", self.display(*elem)),
            TypeKind::Slice(elem) => format!("[]{}", self.display(*elem)),
            TypeKind::Array { len: Some(n), elem } => format!("[{n}]{}", self.display(*elem)),
            TypeKind::Array { len: None, elem } => format!("[?]{}", self.display(*elem)),
            TypeKind::Map { key, value } => format!("map[{}]{}", self.display(*key), self.display(*value)),
            TypeKind::Func(sig) => format!("func{}", self.display_sig(sig)),
            TypeKind::Struct(id) => {
                let fields: Vec<String> = self
                    .strukt(*id)
                    .fields
                    .iter()
                    .map(|f| {
                        if f.embedded {
                            self.display(f.ty)
                        } else {
                            format!("{} {}", f.name, self.display(f.ty))
                        }
                    })
                    .collect();
                format!("struct{{{}}}", fields.join("; "))
            }
            TypeKind::Interface(id) => {
                let methods: Vec<String> = self
                    .interface(*id)
                    .methods
                    .iter()
                    .map(|m| {
                        let m = self.iface_method(*m);
                        match self.func_of(m.sig) {
                            Some(sig) => format!("{}{}", m.name, self.display_sig(sig)),
                            None => m.name.clone(),
                        }
                    })
                    .collect();
                if methods.is_empty() {
                    "interface{}".to_string()
                } else {
                    format!("interface{{{}}}", methods.join("; "))
                }
            }
            TypeKind::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(|e| self.display(*e)).collect();
                format!("({})", parts.join(", "))
            }
        }
    }

    fn display_sig(&self, sig: &FuncType) -> String {
        let mut params: Vec<String> = sig.params.iter().map(|p| self.display(*p)).collect();
        if sig.variadic {
            if let Some(last) = params.last_mut() {
                *last = format!("...{}", last.trim_start_matches("[]"));
            }
        }
        let results: Vec<String> = sig.results.iter().map(|r| self.display(*r)).collect();
        match results.len() {
            0 => format!("({})", params.join(", ")),
            1 => format!("({}) {}", params.join(", "), results[0]),
            _ => format!("({}) ({})", params.join(", "), results.join(", ")),
        }
    }
}

/// Exported names start with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Conventional package name for an import path: the last segment, skipping
/// a trailing major-version segment (`example.com/mod/v2` is `mod`).
pub fn package_name_of(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    let name = if is_version { segments.next().unwrap_or(last) } else { last };
    name.strip_prefix("go-").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basics_have_fixed_ids() {
        let types = Types::new();
        for kind in BasicKind::ALL {
            assert_eq!(types.kind(types.basic(kind)), &TypeKind::Basic(kind));
        }
        assert_eq!(types.kind(Types::INVALID), &TypeKind::Invalid);
        assert!(types.is_opaque(Types::OPAQUE));
    }

    #[test]
    fn structural_types_are_interned() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        assert_eq!(types.pointer(int), types.pointer(int));
        assert_eq!(types.slice(int), types.slice(int));
        assert_ne!(types.slice(int), types.pointer(int));
    }

    #[test]
    fn struct_literals_get_distinct_identities() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let field = || Field { name: "N".to_string(), ty: int, embedded: false, pkg: "p".to_string() };
        let a = types.new_struct(vec![field()]);
        let b = types.new_struct(vec![field()]);
        assert_ne!(a, b);
        assert_ne!(types.struct_of(a), types.struct_of(b));
    }

    #[test]
    fn named_types_resolve_to_underlying() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let celsius = types.new_named("Celsius", "example.com/temp");
        types.set_underlying(celsius, int);
        let alias_of = types.new_named("Kelvin", "example.com/temp");
        types.set_underlying(alias_of, celsius);
        assert_eq!(types.underlying(alias_of), int);
        assert_eq!(types.display(celsius), "temp.Celsius");
    }

    #[test]
    fn error_is_a_named_interface() {
        let types = Types::new();
        let err = types.error_type();
        let iface = types.interface_of(err).unwrap();
        assert_eq!(types.interface(iface).methods.len(), 1);
        assert_eq!(types.display(err), "error");
    }

    #[test]
    fn package_names_from_paths() {
        assert_eq!(package_name_of("fmt"), "fmt");
        assert_eq!(package_name_of("example.com/lib/geom"), "geom");
        assert_eq!(package_name_of("example.com/mod/v2"), "mod");
        assert_eq!(package_name_of("github.com/x/go-yaml"), "yaml");
    }

    #[test]
    fn exported_names() {
        assert!(is_exported("Base"));
        assert!(!is_exported("base"));
        assert!(!is_exported("_X"));
    }
}
