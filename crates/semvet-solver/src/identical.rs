//! Type identity, tolerant of the two-snapshot split.
//!
//! The built-in fast path (id equality) only recognizes types from the same
//! snapshot; this predicate additionally treats named types as equal when
//! their declared names match and their underlyings compare identical,
//! which is what bridges the two independently loaded universes.

use semvet_types::{TypeData, TypeId};

use crate::Comparer;

impl Comparer<'_> {
    /// Symmetric structural identity, memoized on unordered id pairs.
    pub fn identical(&mut self, a: TypeId, b: TypeId) -> bool {
        if let Some(&res) = self.id_cache.get(&(a, b)) {
            return res;
        }
        if let Some(&res) = self.id_cache.get(&(b, a)) {
            return res;
        }
        if self.graph.builtin_identical(a, b) {
            self.id_cache.insert((a, b), true);
            return true;
        }
        // Break infinite regress on recursive types. The provisional
        // answer must not be cached: it is "true pending proof", valid
        // only inside this recursion.
        if self.id_stack.contains(&(a, b)) {
            return true;
        }
        self.id_stack.push((a, b));
        let res = self.identical_uncached(a, b);
        self.id_stack.pop();
        self.id_cache.insert((a, b), res);
        res
    }

    fn identical_uncached(&mut self, a: TypeId, b: TypeId) -> bool {
        let g = self.graph;
        match (g.as_named(a), g.as_named(b)) {
            (Some(na), Some(nb)) => {
                if na.name != nb.name {
                    return false;
                }
                let params_a = na.type_params.clone();
                let params_b = nb.type_params.clone();
                if params_a.len() != params_b.len() {
                    return false;
                }
                let ca = g.constraints_of(&params_a);
                let cb = g.constraints_of(&params_b);
                for (&x, &y) in ca.iter().zip(cb.iter()) {
                    if !self.identical(x, y) {
                        return false;
                    }
                }
                // Equal names are not enough; fall through to the
                // underlying types.
            }
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => {}
        }

        let ua = g.underlying(a);
        let ub = g.underlying(b);
        if g.builtin_identical(ua, ub) {
            return true;
        }
        self.underlying_identical(ua, ub)
    }

    fn underlying_identical(&mut self, ua: TypeId, ub: TypeId) -> bool {
        let g = self.graph;
        match (*g.data(ua), *g.data(ub)) {
            (TypeData::Array { len: la, elem: ea }, TypeData::Array { len: lb, elem: eb }) => {
                la == lb && self.identical(ea, eb)
            }
            (TypeData::Slice(ea), TypeData::Slice(eb)) => self.identical(ea, eb),
            (TypeData::Pointer(ea), TypeData::Pointer(eb)) => self.identical(ea, eb),
            (TypeData::Map { key: ka, value: va }, TypeData::Map { key: kb, value: vb }) => {
                self.identical(ka, kb) && self.identical(va, vb)
            }
            (TypeData::Chan { dir: da, elem: ea }, TypeData::Chan { dir: db, elem: eb }) => {
                da == db && self.identical(ea, eb)
            }
            (TypeData::Struct(_), TypeData::Struct(_)) => self.identical_structs(ua, ub),
            (TypeData::Signature(_), TypeData::Signature(_)) => {
                // Signature identity delegates to the richer signature
                // comparison coming back clean.
                self.compare_signatures(ua, ub).is_none()
            }
            (TypeData::Interface(_), TypeData::Interface(_)) => {
                self.identical_interfaces(ua, ub)
            }
            _ => false,
        }
    }

    /// Same field sequence: names, tag bytes, types, and for unexported
    /// fields the declaring package.
    fn identical_structs(&mut self, ua: TypeId, ub: TypeId) -> bool {
        let g = self.graph;
        let (TypeData::Struct(sa), TypeData::Struct(sb)) = (*g.data(ua), *g.data(ub)) else {
            return false;
        };
        let fields_a = &g.struct_shape(sa).fields;
        let fields_b = &g.struct_shape(sb).fields;
        if fields_a.len() != fields_b.len() {
            return false;
        }
        for (fa, fb) in fields_a.iter().zip(fields_b.iter()) {
            if fa.tag != fb.tag {
                return false;
            }
            if fa.name != fb.name {
                return false;
            }
            if !semvet_types::is_exported(&fa.name) && fa.pkg_path != fb.pkg_path {
                return false;
            }
            if !self.identical(fa.ty, fb.ty) {
                return false;
            }
        }
        true
    }

    /// Same method set (unexported names also match by package), and for
    /// constraints the type sets must be mutual subsets with agreeing
    /// comparability.
    fn identical_interfaces(&mut self, ua: TypeId, ub: TypeId) -> bool {
        let g = self.graph;
        let fa = g.flatten_interface(ua);
        let fb = g.flatten_interface(ub);
        if fa.methods.len() != fb.methods.len() {
            return false;
        }
        for (name, ma) in &fa.methods {
            let Some(mb) = fb.methods.get(name) else {
                return false;
            };
            if !semvet_types::is_exported(name) && ma.pkg_path != mb.pkg_path {
                return false;
            }
            if !self.identical(ma.sig, mb.sig) {
                return false;
            }
        }
        if !(fa.is_method_set() && fb.is_method_set()) {
            if self.interface_comparable(&fa) != self.interface_comparable(&fb) {
                return false;
            }
            if !self.term_list_subset(&fa.terms, &fb.terms) {
                return false;
            }
            if !self.term_list_subset(&fb.terms, &fa.terms) {
                return false;
            }
        }
        true
    }

    /// Method-set containment: every method of the interface must be
    /// present on `v` with an identical signature. This is the manual
    /// fallback that bridges snapshots when the built-in check cannot.
    pub(crate) fn implements(&mut self, v: TypeId, iface: TypeId) -> bool {
        let g = self.graph;
        let want = g.flatten_interface(iface);
        let have = g.method_map(v);
        for (name, wm) in &want.methods {
            let Some(vm) = have.get(name) else {
                return false;
            };
            if !self.identical(vm.sig, wm.sig) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use semvet_common::ResultCode;
    use semvet_types::{
        BasicKind, ChanDir, Field, InterfaceShape, Method, SignatureShape, Term, TypeGraph,
    };

    use crate::Comparer;

    fn field(name: &str, ty: semvet_types::TypeId) -> Field {
        Field {
            name: name.to_owned(),
            ty,
            tag: String::new(),
            embedded: false,
            pkg_path: "example.com/m/p".to_owned(),
        }
    }

    #[test]
    fn arrays_by_length_and_element() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let a1 = g.array(7, int);
        let a2 = g.array(7, int);
        let a3 = g.array(11, int);
        let a4 = g.array(7, string);

        let mut c = Comparer::new(&g);
        assert!(c.identical(a1, a2));
        assert!(!c.identical(a1, a3));
        assert!(!c.identical(a1, a4));
    }

    #[test]
    fn channels_by_direction_and_element() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let chans: Vec<_> = [
            (ChanDir::SendRecv, int),
            (ChanDir::SendOnly, int),
            (ChanDir::RecvOnly, int),
            (ChanDir::SendRecv, string),
            (ChanDir::SendOnly, string),
            (ChanDir::RecvOnly, string),
        ]
        .into_iter()
        .map(|(dir, elem)| g.chan_of(dir, elem))
        .collect();

        for i in 0..chans.len() {
            for j in i..chans.len() {
                let mut c = Comparer::new(&g);
                assert_eq!(
                    c.identical(chans[i], chans[j]),
                    i == j,
                    "chan {i} vs chan {j}"
                );
            }
        }
    }

    #[test]
    fn cross_snapshot_named_types_are_identical() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let older = g.named("Count", "example.com/m/p");
        let newer = g.named("Count", "example.com/m/p");
        g.set_underlying(older, int);
        g.set_underlying(newer, int);

        let mut c = Comparer::new(&g);
        assert!(!g.builtin_identical(older, newer));
        assert!(c.identical(older, newer));
    }

    #[test]
    fn named_types_with_different_names_differ() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let a = g.named("A", "p");
        let b = g.named("B", "p");
        g.set_underlying(a, int);
        g.set_underlying(b, int);

        let mut c = Comparer::new(&g);
        assert!(!c.identical(a, b));
    }

    #[test]
    fn named_vs_unnamed_never_identical() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let named = g.named("Count", "p");
        g.set_underlying(named, int);

        let mut c = Comparer::new(&g);
        assert!(!c.identical(named, int));
        assert!(!c.identical(int, named));
    }

    #[test]
    fn recursive_structs_terminate_and_match() {
        let mut g = TypeGraph::new();
        let string = g.basic(BasicKind::String);

        let mut make_node = |g: &mut TypeGraph| {
            let node = g.named("Node", "p");
            let ptr = g.pointer(node);
            let children = g.slice(ptr);
            let shape = g.strukt(vec![field("Children", children), field("Label", string)]);
            g.set_underlying(node, shape);
            node
        };
        let older = make_node(&mut g);
        let newer = make_node(&mut g);

        let mut c = Comparer::new(&g);
        assert!(c.identical(older, newer));
    }

    #[test]
    fn unexported_fields_compare_packages() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let mk = |g: &mut TypeGraph, pkg: &str| {
            g.strukt(vec![Field {
                name: "count".to_owned(),
                ty: int,
                tag: String::new(),
                embedded: false,
                pkg_path: pkg.to_owned(),
            }])
        };
        let a = mk(&mut g, "example.com/m/p");
        let b = mk(&mut g, "example.com/m/q");
        let c2 = mk(&mut g, "example.com/m/p");

        let mut c = Comparer::new(&g);
        assert!(!c.identical(a, b));
        assert!(c.identical(a, c2));
    }

    #[test]
    fn tag_bytes_participate_in_identity() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let tagged = g.strukt(vec![Field {
            name: "A".to_owned(),
            ty: int,
            tag: "json:\"a\"".to_owned(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        let untagged = g.strukt(vec![field("A", int)]);

        let mut c = Comparer::new(&g);
        assert!(!c.identical(tagged, untagged));
    }

    #[test]
    fn constraint_interfaces_need_matching_type_sets() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let mk = |g: &mut TypeGraph, terms: Vec<Term>| {
            let u = g.union(terms);
            g.interface(InterfaceShape {
                methods: Vec::new(),
                embeddeds: vec![u],
                comparable: false,
            })
        };
        let both = mk(
            &mut g,
            vec![
                Term { tilde: false, ty: int },
                Term { tilde: false, ty: string },
            ],
        );
        let only_int = mk(&mut g, vec![Term { tilde: false, ty: int }]);

        let mut c = Comparer::new(&g);
        assert!(!c.identical(both, only_int));
        assert!(c.identical(both, both));
    }

    #[test]
    fn implements_bridges_snapshots() {
        let mut g = TypeGraph::new();
        let string = g.basic(BasicKind::String);
        let sig = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: Vec::new(),
            results: vec![string],
            variadic: false,
        });
        let iface = g.interface(InterfaceShape {
            methods: vec![Method {
                name: "String".to_owned(),
                sig,
                pkg_path: "p".to_owned(),
            }],
            embeddeds: Vec::new(),
            comparable: false,
        });
        let int = g.basic(BasicKind::Int);
        let named = g.named("Stringish", "q");
        g.set_underlying(named, int);
        g.add_method(
            named,
            Method {
                name: "String".to_owned(),
                sig,
                pkg_path: "q".to_owned(),
            },
        );

        let mut c = Comparer::new(&g);
        assert!(c.implements(named, iface));

        let bare = g.named("Bare", "q");
        let mut c = Comparer::new(&g);
        assert!(!c.implements(bare, iface));
    }

    #[test]
    fn signature_identity_goes_through_comparison() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let sig_a = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: vec![int],
            results: vec![string],
            variadic: false,
        });
        let sig_b = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: vec![string],
            results: vec![string],
            variadic: false,
        });
        let mut c = Comparer::new(&g);
        assert!(c.identical(sig_a, sig_a));
        assert!(!c.identical(sig_a, sig_b));
        assert_eq!(
            c.compare_types(sig_a, sig_b).code(),
            ResultCode::Major
        );
    }
}
