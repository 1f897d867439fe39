//! Field and method lookup with embedded-field promotion.
//!
//! The search is breadth-first over embedded fields. Each depth is scanned
//! completely before moving on; the shallowest match wins and two matches at
//! the same depth are ambiguous. Named types are expanded at most once per
//! search, which also stops recursive embeddings through pointers.
//!
//! Types from packages outside the workspace have unknown members. Once one is
//! reached the search goes on as if it had none, and the result is `Opaque`
//! with both the tentative path and the paths to the external types.

use std::collections::HashSet;

use super::types::{is_exported, FieldId, NamedId, Object, TypeId, TypeKind, Types};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found {
        obj: Object,
        /// Field indices from the receiver to the member; the last entry is the
        /// member's own index.
        index: Vec<usize>,
        /// A pointer was dereferenced somewhere along the path.
        indirect: bool,
    },
    NotFound,
    Ambiguous,
    /// A pointer-receiver method reached from a value that is neither a
    /// pointer nor addressable.
    NotAddressable,
    /// An external type was reached at or above the depth of any match, so the
    /// answer cannot be known.
    Opaque {
        /// Path to the member if external types have no members of their own.
        known: Option<Vec<usize>>,
        /// Paths to the external types whose members could take precedence.
        external: Vec<Vec<usize>>,
    },
}

impl LookupResult {
    pub fn obj(&self) -> Option<Object> {
        match self {
            LookupResult::Found { obj, .. } => Some(*obj),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Embedded {
    ty: TypeId,
    index: Vec<usize>,
    indirect: bool,
    /// Reached through more than one path at this depth.
    multiples: bool,
}

/// Look up `name` in the field and method sets of `ty`, as seen from package `pkg`.
pub fn lookup_field_or_method(types: &Types, ty: TypeId, addressable: bool, pkg: &str, name: &str) -> LookupResult {
    if name == "_" {
        return LookupResult::NotFound;
    }

    // Fields are reachable through a defined pointer type, methods are not.
    if types.as_named(ty).is_some() {
        if let TypeKind::Pointer(_) = types.kind(types.underlying(ty)) {
            let under = types.underlying(ty);
            let result = lookup_impl(types, under, pkg, name);
            return match result {
                LookupResult::Found { obj: Object::Field(_), .. } => result,
                LookupResult::Found { .. } => LookupResult::NotFound,
                other => other,
            };
        }
    }

    let result = lookup_impl(types, ty, pkg, name);
    if let LookupResult::Found { obj: Object::Method(m), indirect: false, .. } = &result {
        if types.method(*m).pointer_recv && !addressable {
            return LookupResult::NotAddressable;
        }
    }
    result
}

fn lookup_impl(types: &Types, ty: TypeId, pkg: &str, name: &str) -> LookupResult {
    let (start, is_ptr) = types.deref(ty);

    // *I where I is an interface has no methods.
    if is_ptr && types.interface_of(start).is_some() {
        return LookupResult::NotFound;
    }

    let mut current = vec![Embedded { ty: start, index: Vec::new(), indirect: is_ptr, multiples: false }];
    let mut seen: HashSet<NamedId> = HashSet::new();
    let mut external: Vec<Vec<usize>> = Vec::new();

    while !current.is_empty() {
        let mut found: Option<(Object, Vec<usize>, bool)> = None;
        let mut next: Vec<Embedded> = Vec::new();

        for e in &current {
            if types.is_opaque(e.ty) || types.is_opaque(types.underlying(e.ty)) {
                external.push(e.index.clone());
                continue;
            }
            let mut ty = e.ty;

            if let Some(named_id) = types.as_named(ty) {
                if !seen.insert(named_id) {
                    continue;
                }
                let named = types.named(named_id);
                if let Some((i, &m)) = named
                    .methods
                    .iter()
                    .enumerate()
                    .find(|(_, m)| same_id(&types.method(**m).name, &types.method(**m).pkg, pkg, name))
                {
                    if found.is_some() || e.multiples {
                        return ambiguous(external);
                    }
                    found = Some((Object::Method(m), concat(&e.index, i), e.indirect));
                    // A method and a field of the same name cannot coexist on one type.
                    continue;
                }
                ty = named.underlying;
            }

            match types.kind(ty) {
                TypeKind::Struct(sid) => {
                    for (i, f) in types.strukt(*sid).fields.iter().enumerate() {
                        if same_id(&f.name, &f.pkg, pkg, name) {
                            if found.is_some() || e.multiples {
                                return ambiguous(external);
                            }
                            let obj = Object::Field(FieldId { strukt: *sid, index: i });
                            found = Some((obj, concat(&e.index, i), e.indirect));
                            continue;
                        }
                        if found.is_none() && f.embedded {
                            let (fty, is_ptr) = types.deref(f.ty);
                            next.push(Embedded {
                                ty: fty,
                                index: concat(&e.index, i),
                                indirect: e.indirect || is_ptr,
                                multiples: e.multiples,
                            });
                        }
                    }
                }
                TypeKind::Interface(iid) => {
                    let iface = types.interface(*iid);
                    if let Some((i, &m)) = iface
                        .methods
                        .iter()
                        .enumerate()
                        .find(|(_, m)| same_id(&types.iface_method(**m).name, &types.iface_method(**m).pkg, pkg, name))
                    {
                        if found.is_some() || e.multiples {
                            return ambiguous(external);
                        }
                        found = Some((Object::IfaceMethod(m), concat(&e.index, i), e.indirect));
                    } else if iface.opaque {
                        external.push(e.index.clone());
                    }
                }
                _ => {}
            }
        }

        if let Some((obj, index, indirect)) = found {
            if !external.is_empty() {
                return LookupResult::Opaque { known: Some(index), external };
            }
            return LookupResult::Found { obj, index, indirect };
        }

        current = consolidate_multiples(types, next);
    }

    if external.is_empty() { LookupResult::NotFound } else { LookupResult::Opaque { known: None, external } }
}

/// An external type at or above the clash could still shadow it.
fn ambiguous(external: Vec<Vec<usize>>) -> LookupResult {
    if external.is_empty() { LookupResult::Ambiguous } else { LookupResult::Opaque { known: None, external } }
}

fn same_id(member: &str, member_pkg: &str, pkg: &str, name: &str) -> bool {
    member == name && (is_exported(name) || member_pkg == pkg)
}

fn concat(index: &[usize], i: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(index.len() + 1);
    out.extend_from_slice(index);
    out.push(i);
    out
}

/// Merge entries for the same type reached along different paths at one depth,
/// marking them so a later match through them is reported as ambiguous.
fn consolidate_multiples(types: &Types, list: Vec<Embedded>) -> Vec<Embedded> {
    if list.len() <= 1 {
        return list;
    }
    let mut out: Vec<Embedded> = Vec::with_capacity(list.len());
    for e in list {
        // External types all share one id; each keeps its own path.
        let dup = out.iter().position(|o| {
            !types.is_opaque(o.ty)
                && (o.ty == e.ty || (types.as_named(o.ty).is_some() && types.as_named(o.ty) == types.as_named(e.ty)))
        });
        match dup {
            Some(i) => out[i].multiples = true,
            None => out.push(e),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeck::types::{BasicKind, Field, IfaceMethod, MethodDef};

    const PKG: &str = "example.com/p";

    fn field(name: &str, ty: TypeId) -> Field {
        Field { name: name.to_string(), ty, embedded: false, pkg: PKG.to_string() }
    }

    fn embed(name: &str, ty: TypeId) -> Field {
        Field { name: name.to_string(), ty, embedded: true, pkg: PKG.to_string() }
    }

    fn named_struct(types: &mut Types, name: &str, fields: Vec<Field>) -> TypeId {
        let named = types.new_named(name, PKG);
        let st = types.new_struct(fields);
        types.set_underlying(named, st);
        named
    }

    fn found(result: &LookupResult) -> (Object, Vec<usize>, bool) {
        match result {
            LookupResult::Found { obj, index, indirect } => (*obj, index.clone(), *indirect),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn direct_field_has_single_index() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int)]);
        let (obj, index, indirect) = found(&lookup_field_or_method(&types, base, false, PKG, "N"));
        assert_eq!(index, vec![0]);
        assert!(!indirect);
        assert!(matches!(obj, Object::Field(FieldId { index: 0, .. })));
    }

    #[test]
    fn promoted_field_reports_full_chain() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int)]);
        let outer = named_struct(&mut types, "Outer", vec![field("X", int), embed("Base", base)]);
        let (obj, index, _) = found(&lookup_field_or_method(&types, outer, false, PKG, "N"));
        assert_eq!(index, vec![1, 0]);
        let base_struct = types.struct_of(base).unwrap();
        assert_eq!(obj, Object::Field(FieldId { strukt: base_struct, index: 0 }));
    }

    #[test]
    fn shallower_field_shadows_deeper() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int)]);
        let outer = named_struct(&mut types, "Outer", vec![embed("Base", base), field("N", int)]);
        let (_, index, _) = found(&lookup_field_or_method(&types, outer, false, PKG, "N"));
        assert_eq!(index, vec![1]);
    }

    #[test]
    fn same_depth_duplicates_are_ambiguous() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let a = named_struct(&mut types, "A", vec![field("N", int)]);
        let b = named_struct(&mut types, "B", vec![field("N", int)]);
        let outer = named_struct(&mut types, "Outer", vec![embed("A", a), embed("B", b)]);
        assert_eq!(lookup_field_or_method(&types, outer, false, PKG, "N"), LookupResult::Ambiguous);
    }

    #[test]
    fn same_type_reached_twice_is_ambiguous() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let leaf = named_struct(&mut types, "Leaf", vec![field("N", int)]);
        let a = named_struct(&mut types, "A", vec![embed("Leaf", leaf)]);
        let b = named_struct(&mut types, "B", vec![embed("Leaf", leaf)]);
        let outer = named_struct(&mut types, "Outer", vec![embed("A", a), embed("B", b)]);
        assert_eq!(lookup_field_or_method(&types, outer, false, PKG, "N"), LookupResult::Ambiguous);
    }

    #[test]
    fn pointer_embedding_sets_indirect() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int)]);
        let ptr = types.pointer(base);
        let outer = named_struct(&mut types, "Outer", vec![embed("Base", ptr)]);
        let (_, index, indirect) = found(&lookup_field_or_method(&types, outer, false, PKG, "N"));
        assert_eq!(index, vec![0, 0]);
        assert!(indirect);

        let outer_ptr = types.pointer(outer);
        let (_, _, indirect) = found(&lookup_field_or_method(&types, outer_ptr, false, PKG, "N"));
        assert!(indirect);
    }

    #[test]
    fn recursive_pointer_embedding_terminates() {
        let mut types = Types::new();
        let node = types.new_named("Node", PKG);
        let ptr = types.pointer(node);
        let st = types.new_struct(vec![embed("Node", ptr)]);
        types.set_underlying(node, st);
        assert_eq!(lookup_field_or_method(&types, node, false, PKG, "Missing"), LookupResult::NotFound);
    }

    #[test]
    fn methods_promote_through_embedding() {
        let mut types = Types::new();
        let base = named_struct(&mut types, "Base", vec![]);
        let sig = types.func(vec![], vec![], false);
        let base_id = types.as_named(base).unwrap();
        let m = types.add_method(MethodDef {
            name: "Run".to_string(),
            pkg: PKG.to_string(),
            recv: base_id,
            pointer_recv: true,
            sig,
        });
        let outer = named_struct(&mut types, "Outer", vec![embed("Base", base)]);
        let (obj, index, _) = found(&lookup_field_or_method(&types, outer, true, PKG, "Run"));
        assert_eq!(obj, Object::Method(m));
        assert_eq!(index, vec![0, 0]);

        assert_eq!(lookup_field_or_method(&types, outer, false, PKG, "Run"), LookupResult::NotAddressable);
        let outer_ptr = types.pointer(outer);
        assert!(matches!(lookup_field_or_method(&types, outer_ptr, false, PKG, "Run"), LookupResult::Found { .. }));
    }

    #[test]
    fn unexported_names_hidden_from_other_packages() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("n", int)]);
        assert!(matches!(lookup_field_or_method(&types, base, false, PKG, "n"), LookupResult::Found { .. }));
        assert_eq!(lookup_field_or_method(&types, base, false, "example.com/q", "n"), LookupResult::NotFound);
    }

    #[test]
    fn pointer_to_interface_has_no_methods() {
        let mut types = Types::new();
        let sig = types.func(vec![], vec![], false);
        let m = types.add_iface_method(IfaceMethod { name: "Close".to_string(), pkg: PKG.to_string(), sig });
        let iface = types.new_interface(vec![m], false);
        let closer = types.new_named("Closer", PKG);
        types.set_underlying(closer, iface);
        assert!(matches!(lookup_field_or_method(&types, closer, false, PKG, "Close"), LookupResult::Found { .. }));
        let ptr = types.pointer(closer);
        assert_eq!(lookup_field_or_method(&types, ptr, false, PKG, "Close"), LookupResult::NotFound);
    }

    #[test]
    fn opaque_embedding_at_match_depth_is_unknown() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int)]);
        let outer = named_struct(
            &mut types,
            "Outer",
            vec![field("X", int), embed("Base", base), embed("Reader", Types::OPAQUE)],
        );
        // Shallower than the external embedding: still certain.
        assert!(matches!(lookup_field_or_method(&types, outer, false, PKG, "X"), LookupResult::Found { .. }));
        // Same depth as the external type's members: unknown, but the path
        // through Base is kept.
        assert_eq!(
            lookup_field_or_method(&types, outer, false, PKG, "N"),
            LookupResult::Opaque { known: Some(vec![1, 0]), external: vec![vec![2]] }
        );
    }

    #[test]
    fn opaque_embedding_below_a_local_one_is_reported_by_path() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let base = named_struct(&mut types, "Base", vec![field("N", int), embed("Mutex", Types::OPAQUE)]);
        let outer = named_struct(&mut types, "Outer", vec![embed("Base", base), embed("Reader", Types::OPAQUE)]);
        // Above the external types: certain.
        assert!(matches!(lookup_field_or_method(&types, outer, false, PKG, "Base"), LookupResult::Found { .. }));
        // Every external type is searched; each keeps its own path.
        assert_eq!(
            lookup_field_or_method(&types, outer, false, PKG, "Lock"),
            LookupResult::Opaque { known: None, external: vec![vec![1], vec![0, 1]] }
        );
    }

    #[test]
    fn ambiguity_below_an_external_type_is_unknown() {
        let mut types = Types::new();
        let int = types.basic(BasicKind::Int);
        let a = named_struct(&mut types, "A", vec![field("N", int)]);
        let b = named_struct(&mut types, "B", vec![field("N", int)]);
        let mid_a = named_struct(&mut types, "MidA", vec![embed("A", a)]);
        let mid_b = named_struct(&mut types, "MidB", vec![embed("B", b)]);
        let outer = named_struct(
            &mut types,
            "Outer",
            vec![embed("Reader", Types::OPAQUE), embed("MidA", mid_a), embed("MidB", mid_b)],
        );
        assert_eq!(
            lookup_field_or_method(&types, outer, false, PKG, "N"),
            LookupResult::Opaque { known: None, external: vec![vec![0]] }
        );
    }

    #[test]
    fn opaque_receiver_is_unknown() {
        let types = Types::new();
        assert_eq!(
            lookup_field_or_method(&types, Types::OPAQUE, false, PKG, "N"),
            LookupResult::Opaque { known: None, external: vec![vec![]] }
        );
    }
}
