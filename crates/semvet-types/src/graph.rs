//! The type arena.
//!
//! Structural types are hash-consed: building the same shape twice yields
//! the same `TypeId`, so id equality doubles as the built-in identity fast
//! path. Named types and type parameters are declaration-scoped and never
//! interned — loading the same declaration from two snapshots produces two
//! distinct ids on purpose.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::{
    BasicKind, Field, InterfaceId, InterfaceShape, Method, NamedDecl, NamedId, SignatureId,
    SignatureShape, StructId, StructShape, Term, TypeData, TypeId, TypeParamDecl, TypeParamId,
    UnionId, UnionShape,
};

/// A fully flattened interface view: the complete method map (embedded
/// interfaces included), the flattened union term list, and whether the
/// predeclared `comparable` constraint is embedded anywhere.
#[derive(Clone, Debug, Default)]
pub struct FlatInterface {
    pub methods: BTreeMap<String, Method>,
    pub terms: Vec<Term>,
    pub comparable: bool,
}

impl FlatInterface {
    /// Whether the interface is fully described by its method set, i.e. it
    /// places no restriction on the type set.
    pub fn is_method_set(&self) -> bool {
        self.terms.is_empty() && !self.comparable
    }

    /// Whether the interface is a pure non-empty method set. Interfaces for
    /// which this holds on both sides are compared on the method-set axis
    /// only; everything else goes through constraint comparison.
    pub fn is_nonempty_method_set(&self) -> bool {
        self.is_method_set() && !self.methods.is_empty()
    }
}

/// Arena holding every type of both snapshots.
pub struct TypeGraph {
    types: Vec<TypeData>,
    intern: FxHashMap<TypeData, TypeId>,
    structs: Vec<StructShape>,
    struct_intern: FxHashMap<StructShape, StructId>,
    interfaces: Vec<InterfaceShape>,
    interface_intern: FxHashMap<InterfaceShape, InterfaceId>,
    signatures: Vec<SignatureShape>,
    signature_intern: FxHashMap<SignatureShape, SignatureId>,
    unions: Vec<UnionShape>,
    union_intern: FxHashMap<UnionShape, UnionId>,
    named: Vec<NamedDecl>,
    type_params: Vec<TypeParamDecl>,
    invalid: TypeId,
    error: TypeId,
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        let mut g = TypeGraph {
            types: Vec::new(),
            intern: FxHashMap::default(),
            structs: Vec::new(),
            struct_intern: FxHashMap::default(),
            interfaces: Vec::new(),
            interface_intern: FxHashMap::default(),
            signatures: Vec::new(),
            signature_intern: FxHashMap::default(),
            unions: Vec::new(),
            union_intern: FxHashMap::default(),
            named: Vec::new(),
            type_params: Vec::new(),
            invalid: TypeId(0),
            error: TypeId(0),
        };
        g.invalid = g.basic(BasicKind::Invalid);

        // The predeclared error interface is one shared declaration, so
        // both snapshots resolve `error` to the same id.
        let string_ty = g.basic(BasicKind::String);
        let error_sig = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: Vec::new(),
            results: vec![string_ty],
            variadic: false,
        });
        let error_iface = g.interface(InterfaceShape {
            methods: vec![Method {
                name: "Error".to_owned(),
                sig: error_sig,
                pkg_path: String::new(),
            }],
            embeddeds: Vec::new(),
            comparable: false,
        });
        let error = g.named("error", "");
        g.set_underlying(error, error_iface);
        g.error = error;
        g
    }

    fn push(&mut self, data: TypeData) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(data);
        id
    }

    fn intern_data(&mut self, data: TypeData) -> TypeId {
        if let Some(&id) = self.intern.get(&data) {
            return id;
        }
        let id = self.push(data);
        self.intern.insert(data, id);
        id
    }

    // ---- factories ---------------------------------------------------

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.intern_data(TypeData::Basic(kind))
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.intern_data(TypeData::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.intern_data(TypeData::Slice(elem))
    }

    pub fn array(&mut self, len: u64, elem: TypeId) -> TypeId {
        self.intern_data(TypeData::Array { len, elem })
    }

    pub fn map_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern_data(TypeData::Map { key, value })
    }

    pub fn chan_of(&mut self, dir: crate::ChanDir, elem: TypeId) -> TypeId {
        self.intern_data(TypeData::Chan { dir, elem })
    }

    pub fn strukt(&mut self, fields: Vec<Field>) -> TypeId {
        let shape = StructShape { fields };
        let sid = if let Some(&sid) = self.struct_intern.get(&shape) {
            sid
        } else {
            let sid = StructId(self.structs.len() as u32);
            self.structs.push(shape.clone());
            self.struct_intern.insert(shape, sid);
            sid
        };
        self.intern_data(TypeData::Struct(sid))
    }

    pub fn interface(&mut self, shape: InterfaceShape) -> TypeId {
        let iid = if let Some(&iid) = self.interface_intern.get(&shape) {
            iid
        } else {
            let iid = InterfaceId(self.interfaces.len() as u32);
            self.interfaces.push(shape.clone());
            self.interface_intern.insert(shape, iid);
            iid
        };
        self.intern_data(TypeData::Interface(iid))
    }

    pub fn signature(&mut self, shape: SignatureShape) -> TypeId {
        let sid = if let Some(&sid) = self.signature_intern.get(&shape) {
            sid
        } else {
            let sid = SignatureId(self.signatures.len() as u32);
            self.signatures.push(shape.clone());
            self.signature_intern.insert(shape, sid);
            sid
        };
        self.intern_data(TypeData::Signature(sid))
    }

    pub fn union(&mut self, terms: Vec<Term>) -> TypeId {
        let shape = UnionShape { terms };
        let uid = if let Some(&uid) = self.union_intern.get(&shape) {
            uid
        } else {
            let uid = UnionId(self.unions.len() as u32);
            self.unions.push(shape.clone());
            self.union_intern.insert(shape, uid);
            uid
        };
        self.intern_data(TypeData::Union(uid))
    }

    /// The empty interface (`any`).
    pub fn any_type(&mut self) -> TypeId {
        self.interface(InterfaceShape {
            methods: Vec::new(),
            embeddeds: Vec::new(),
            comparable: false,
        })
    }

    /// The predeclared `comparable` constraint.
    pub fn comparable_type(&mut self) -> TypeId {
        self.interface(InterfaceShape {
            methods: Vec::new(),
            embeddeds: Vec::new(),
            comparable: true,
        })
    }

    pub fn error_type(&self) -> TypeId {
        self.error
    }

    pub fn invalid_type(&self) -> TypeId {
        self.invalid
    }

    /// Allocate a named-type declaration. Never interned: each call is a
    /// distinct declaration, even for equal names.
    pub fn named(&mut self, name: &str, pkg_path: &str) -> TypeId {
        let nid = NamedId(self.named.len() as u32);
        self.named.push(NamedDecl {
            name: name.to_owned(),
            pkg_path: pkg_path.to_owned(),
            type_params: Vec::new(),
            underlying: self.invalid,
            methods: Vec::new(),
        });
        self.push(TypeData::Named(nid))
    }

    /// Allocate a type-parameter declaration, constraint patched in later.
    pub fn type_param(&mut self, name: &str) -> TypeId {
        let pid = TypeParamId(self.type_params.len() as u32);
        self.type_params.push(TypeParamDecl {
            name: name.to_owned(),
            constraint: self.invalid,
        });
        self.push(TypeData::TypeParam(pid))
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        debug_assert!(matches!(self.data(named), TypeData::Named(_)));
        if let TypeData::Named(nid) = *self.data(named) {
            self.named[nid.0 as usize].underlying = underlying;
        }
    }

    pub fn set_type_params(&mut self, named: TypeId, params: Vec<TypeParamId>) {
        debug_assert!(matches!(self.data(named), TypeData::Named(_)));
        if let TypeData::Named(nid) = *self.data(named) {
            self.named[nid.0 as usize].type_params = params;
        }
    }

    pub fn add_method(&mut self, named: TypeId, method: Method) {
        debug_assert!(matches!(self.data(named), TypeData::Named(_)));
        if let TypeData::Named(nid) = *self.data(named) {
            self.named[nid.0 as usize].methods.push(method);
        }
    }

    pub fn set_constraint(&mut self, type_param: TypeId, constraint: TypeId) {
        debug_assert!(matches!(self.data(type_param), TypeData::TypeParam(_)));
        if let TypeData::TypeParam(pid) = *self.data(type_param) {
            self.type_params[pid.0 as usize].constraint = constraint;
        }
    }

    // ---- accessors ---------------------------------------------------

    pub fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id.0 as usize]
    }

    pub fn struct_shape(&self, id: StructId) -> &StructShape {
        &self.structs[id.0 as usize]
    }

    pub fn interface_shape(&self, id: InterfaceId) -> &InterfaceShape {
        &self.interfaces[id.0 as usize]
    }

    pub fn signature_shape(&self, id: SignatureId) -> &SignatureShape {
        &self.signatures[id.0 as usize]
    }

    pub fn union_shape(&self, id: UnionId) -> &UnionShape {
        &self.unions[id.0 as usize]
    }

    pub fn named_decl(&self, id: NamedId) -> &NamedDecl {
        &self.named[id.0 as usize]
    }

    pub fn type_param_decl(&self, id: TypeParamId) -> &TypeParamDecl {
        &self.type_params[id.0 as usize]
    }

    /// The declaration behind a named `TypeId`, if it is one.
    pub fn as_named(&self, id: TypeId) -> Option<&NamedDecl> {
        match *self.data(id) {
            TypeData::Named(nid) => Some(self.named_decl(nid)),
            _ => None,
        }
    }

    pub fn as_type_param(&self, id: TypeId) -> Option<&TypeParamDecl> {
        match *self.data(id) {
            TypeData::TypeParam(pid) => Some(self.type_param_decl(pid)),
            _ => None,
        }
    }

    /// The constraint of each type parameter in a declared list.
    pub fn constraints_of(&self, params: &[TypeParamId]) -> Vec<TypeId> {
        params
            .iter()
            .map(|&p| self.type_param_decl(p).constraint)
            .collect()
    }

    /// Built-in identity: the fast path the kernel consults first. With
    /// hash-consed structural types this is plain id equality.
    pub fn builtin_identical(&self, a: TypeId, b: TypeId) -> bool {
        a == b
    }

    /// The structural type under a chain of named types (and under a type
    /// parameter, its constraint's shape). Bounded against malformed cycles.
    pub fn underlying(&self, t: TypeId) -> TypeId {
        let mut cur = t;
        for _ in 0..64 {
            match *self.data(cur) {
                TypeData::Named(nid) => {
                    let u = self.named_decl(nid).underlying;
                    if u == cur {
                        return cur;
                    }
                    cur = u;
                }
                TypeData::TypeParam(pid) => {
                    let c = self.type_param_decl(pid).constraint;
                    if c == cur || c == self.invalid {
                        return cur;
                    }
                    cur = c;
                }
                _ => return cur,
            }
        }
        cur
    }

    /// The method set of a type, keyed by method name. Interfaces expose
    /// their flattened methods; named types their declared methods (or the
    /// interface methods when the underlying type is an interface);
    /// pointers to named types the named type's methods.
    pub fn method_map(&self, t: TypeId) -> BTreeMap<String, Method> {
        match *self.data(t) {
            TypeData::Interface(_) => self.flatten_interface(t).methods,
            TypeData::Named(nid) => {
                let u = self.underlying(t);
                if matches!(self.data(u), TypeData::Interface(_)) {
                    self.flatten_interface(u).methods
                } else {
                    self.named_decl(nid)
                        .methods
                        .iter()
                        .map(|m| (m.name.clone(), m.clone()))
                        .collect()
                }
            }
            TypeData::Pointer(elem) if matches!(self.data(elem), TypeData::Named(_)) => {
                self.method_map(elem)
            }
            TypeData::TypeParam(pid) => {
                let c = self.type_param_decl(pid).constraint;
                if c == self.invalid {
                    BTreeMap::new()
                } else {
                    self.method_map(c)
                }
            }
            _ => BTreeMap::new(),
        }
    }

    /// Flatten an interface: merge methods and the comparable bit through
    /// embedded interfaces, and collect the union term list, distributing
    /// `~` over the subterms it produces.
    pub fn flatten_interface(&self, t: TypeId) -> FlatInterface {
        let mut flat = FlatInterface::default();
        let mut visited = FxHashSet::default();
        self.flatten_into(t, &mut flat, &mut visited);
        flat
    }

    fn flatten_into(&self, t: TypeId, flat: &mut FlatInterface, visited: &mut FxHashSet<TypeId>) {
        if !visited.insert(t) {
            return;
        }
        match *self.data(t) {
            TypeData::Interface(iid) => {
                let shape = self.interface_shape(iid);
                flat.comparable |= shape.comparable;
                for m in &shape.methods {
                    flat.methods.entry(m.name.clone()).or_insert_with(|| m.clone());
                }
                for &emb in &shape.embeddeds {
                    match *self.data(emb) {
                        TypeData::Interface(_) => self.flatten_into(emb, flat, visited),
                        TypeData::Named(_) => {
                            let u = self.underlying(emb);
                            if matches!(self.data(u), TypeData::Interface(_)) {
                                self.flatten_into(u, flat, visited);
                            } else {
                                self.terms_of(emb, &mut flat.terms, visited);
                            }
                        }
                        _ => self.terms_of(emb, &mut flat.terms, visited),
                    }
                }
            }
            TypeData::Named(_) => {
                let u = self.underlying(t);
                if u != t {
                    self.flatten_into(u, flat, visited);
                }
            }
            _ => {}
        }
    }

    /// Flatten a type in term position into union terms.
    fn terms_of(&self, t: TypeId, out: &mut Vec<Term>, visited: &mut FxHashSet<TypeId>) {
        match *self.data(t) {
            TypeData::Interface(iid) => {
                if !visited.insert(t) {
                    return;
                }
                let shape = self.interface_shape(iid);
                for &emb in &shape.embeddeds {
                    self.terms_of(emb, out, visited);
                }
            }
            TypeData::Named(_) => {
                let u = self.underlying(t);
                if u != t {
                    self.terms_of(u, out, visited);
                }
            }
            TypeData::Union(uid) => {
                if !visited.insert(t) {
                    return;
                }
                for term in &self.union_shape(uid).terms {
                    let mut sub = Vec::new();
                    self.terms_of(term.ty, &mut sub, visited);
                    if term.tilde {
                        // ~ distributes over every subterm it produces.
                        out.extend(sub.into_iter().map(|s| Term {
                            tilde: true,
                            ty: s.ty,
                        }));
                    } else {
                        out.extend(sub);
                    }
                }
            }
            _ => out.push(Term {
                tilde: false,
                ty: t,
            }),
        }
    }

    /// Strict comparability, the sense used for constraint type sets:
    /// interfaces are not strictly comparable, structs and arrays inherit
    /// from their components, slices/maps/functions never compare.
    pub fn is_strictly_comparable(&self, t: TypeId) -> bool {
        let mut visiting = FxHashSet::default();
        self.strictly_comparable(t, &mut visiting)
    }

    fn strictly_comparable(&self, t: TypeId, visiting: &mut FxHashSet<TypeId>) -> bool {
        if !visiting.insert(t) {
            return true;
        }
        let res = match *self.data(t) {
            TypeData::Basic(kind) => {
                !matches!(kind, BasicKind::Invalid | BasicKind::UntypedNil)
            }
            TypeData::Pointer(_) | TypeData::Chan { .. } => true,
            TypeData::Interface(_) | TypeData::TypeParam(_) => false,
            TypeData::Slice(_) | TypeData::Map { .. } | TypeData::Signature(_) => false,
            TypeData::Named(nid) => {
                let u = self.named_decl(nid).underlying;
                u != t && self.strictly_comparable(u, visiting)
            }
            TypeData::Array { elem, .. } => self.strictly_comparable(elem, visiting),
            TypeData::Struct(sid) => {
                let field_types: Vec<TypeId> =
                    self.struct_shape(sid).fields.iter().map(|f| f.ty).collect();
                field_types
                    .into_iter()
                    .all(|ty| self.strictly_comparable(ty, visiting))
            }
            TypeData::Union(uid) => {
                let term_types: Vec<TypeId> =
                    self.union_shape(uid).terms.iter().map(|t| t.ty).collect();
                term_types
                    .into_iter()
                    .all(|ty| self.strictly_comparable(ty, visiting))
            }
        };
        visiting.remove(&t);
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChanDir;

    #[test]
    fn structural_types_are_interned() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let a = g.slice(int);
        let b = g.slice(int);
        assert_eq!(a, b);
        assert!(g.builtin_identical(a, b));
    }

    #[test]
    fn named_types_are_not_interned() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let a = g.named("T", "example.com/m/p");
        let b = g.named("T", "example.com/m/p");
        g.set_underlying(a, int);
        g.set_underlying(b, int);
        assert_ne!(a, b);
        assert!(!g.builtin_identical(a, b));
    }

    #[test]
    fn underlying_resolves_named_chains() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let a = g.named("A", "p");
        let b = g.named("B", "p");
        g.set_underlying(b, int);
        g.set_underlying(a, b);
        assert_eq!(g.underlying(a), int);
    }

    #[test]
    fn error_type_is_an_interface() {
        let g = TypeGraph::new();
        let err = g.error_type();
        let u = g.underlying(err);
        assert!(matches!(g.data(u), TypeData::Interface(_)));
        let flat = g.flatten_interface(u);
        assert!(flat.methods.contains_key("Error"));
        assert!(flat.is_nonempty_method_set());
    }

    #[test]
    fn flatten_distributes_tilde_over_union() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let inner = g.union(vec![
            Term { tilde: false, ty: int },
            Term { tilde: false, ty: string },
        ]);
        let outer = g.union(vec![Term { tilde: true, ty: inner }]);
        let iface = g.interface(InterfaceShape {
            methods: Vec::new(),
            embeddeds: vec![outer],
            comparable: false,
        });
        let flat = g.flatten_interface(iface);
        assert_eq!(
            flat.terms,
            vec![
                Term { tilde: true, ty: int },
                Term { tilde: true, ty: string },
            ]
        );
    }

    #[test]
    fn flatten_merges_embedded_interface_methods() {
        let mut g = TypeGraph::new();
        let sig = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: Vec::new(),
            results: Vec::new(),
            variadic: false,
        });
        let base = g.interface(InterfaceShape {
            methods: vec![Method {
                name: "M".to_owned(),
                sig,
                pkg_path: "p".to_owned(),
            }],
            embeddeds: Vec::new(),
            comparable: false,
        });
        let named_base = g.named("Base", "p");
        g.set_underlying(named_base, base);
        let derived = g.interface(InterfaceShape {
            methods: vec![Method {
                name: "N".to_owned(),
                sig,
                pkg_path: "p".to_owned(),
            }],
            embeddeds: vec![named_base],
            comparable: false,
        });
        let flat = g.flatten_interface(derived);
        assert_eq!(flat.methods.len(), 2);
        assert!(flat.methods.contains_key("M"));
        assert!(flat.methods.contains_key("N"));
    }

    #[test]
    fn comparable_bit_propagates_through_embeds() {
        let mut g = TypeGraph::new();
        let comparable = g.comparable_type();
        let named = g.named("Ordered", "constraints");
        g.set_underlying(named, comparable);
        let iface = g.interface(InterfaceShape {
            methods: Vec::new(),
            embeddeds: vec![named],
            comparable: false,
        });
        let flat = g.flatten_interface(iface);
        assert!(flat.comparable);
        assert!(!flat.is_method_set());
    }

    #[test]
    fn strict_comparability() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        assert!(g.is_strictly_comparable(int));

        let slice = g.slice(int);
        assert!(!g.is_strictly_comparable(slice));

        let ptr = g.pointer(slice);
        assert!(g.is_strictly_comparable(ptr));

        let ch = g.chan_of(ChanDir::SendRecv, int);
        assert!(g.is_strictly_comparable(ch));

        let ok_struct = g.strukt(vec![Field {
            name: "A".to_owned(),
            ty: string,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        assert!(g.is_strictly_comparable(ok_struct));

        let bad_struct = g.strukt(vec![Field {
            name: "A".to_owned(),
            ty: slice,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        assert!(!g.is_strictly_comparable(bad_struct));

        let any = g.any_type();
        assert!(!g.is_strictly_comparable(any));
    }

    #[test]
    fn recursive_struct_flattening_terminates() {
        let mut g = TypeGraph::new();
        let node = g.named("Node", "p");
        let ptr = g.pointer(node);
        let children = g.slice(ptr);
        let shape = g.strukt(vec![Field {
            name: "Children".to_owned(),
            ty: children,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        g.set_underlying(node, shape);
        assert!(g.is_strictly_comparable(ptr));
        assert_eq!(g.underlying(node), shape);
    }
}
