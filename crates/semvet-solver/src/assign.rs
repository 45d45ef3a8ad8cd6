//! Assignability: the directed "may-flow-into" predicate.
//!
//! Follows the source language's assignability clauses, each falling back
//! to the snapshot-tolerant [`Comparer::identical`] where the language
//! itself would consult identity.

use semvet_types::{BasicKind, ChanDir, TypeData, TypeId};

use crate::Comparer;

impl Comparer<'_> {
    /// Whether a value of type `v` may flow into a slot of type `t`.
    pub fn assignable_to(&mut self, v: TypeId, t: TypeId) -> bool {
        let g = self.graph;
        if g.builtin_identical(v, t) {
            return true;
        }

        // x's type is identical to T.
        if self.identical(v, t) {
            return true;
        }

        // V and T have identical underlying types and at least one of the
        // two is not a defined type.
        let uv = g.underlying(v);
        let ut = g.underlying(t);
        if self.identical(uv, ut) && (g.as_named(v).is_none() || g.as_named(t).is_none()) {
            return true;
        }

        // T is an interface type and x implements T.
        if matches!(g.data(ut), TypeData::Interface(_)) && self.implements(v, ut) {
            return true;
        }

        if self.assignable_chan(v, t, uv, ut) {
            return true;
        }

        self.assignable_basic(v, ut)
    }

    /// A bidirectional channel value may flow into any channel type with an
    /// identical element type when at least one side is not a defined type.
    fn assignable_chan(&mut self, v: TypeId, t: TypeId, uv: TypeId, ut: TypeId) -> bool {
        let g = self.graph;
        let TypeData::Chan {
            dir: ChanDir::SendRecv,
            elem: ev,
        } = *g.data(uv)
        else {
            return false;
        };
        let TypeData::Chan { elem: et, .. } = *g.data(ut) else {
            return false;
        };
        self.identical(ev, et) && (g.as_named(v).is_none() || g.as_named(t).is_none())
    }

    fn assignable_basic(&mut self, v: TypeId, ut: TypeId) -> bool {
        let g = self.graph;
        let TypeData::Basic(kind) = *g.data(v) else {
            return false;
        };

        // The predeclared nil flows into pointer, function, slice, map,
        // channel, and interface slots.
        if kind == BasicKind::UntypedNil {
            return matches!(
                g.data(ut),
                TypeData::Pointer(_)
                    | TypeData::Signature(_)
                    | TypeData::Slice(_)
                    | TypeData::Map { .. }
                    | TypeData::Chan { .. }
                    | TypeData::Interface(_)
            );
        }

        // An untyped constant flows into any type it is representable in.
        match kind {
            BasicKind::UntypedBool
            | BasicKind::UntypedInt
            | BasicKind::UntypedRune
            | BasicKind::UntypedFloat
            | BasicKind::UntypedComplex
            | BasicKind::UntypedString => representable(kind, ut, g),
            _ => false,
        }
    }
}

/// Representability by kind. Range checking of literal values is out of
/// scope; only the kind lattice is consulted.
fn representable(x: BasicKind, ut: TypeId, g: &semvet_types::TypeGraph) -> bool {
    let TypeData::Basic(tb) = *g.data(ut) else {
        return false;
    };
    match x {
        BasicKind::UntypedBool => tb.is_boolean(),
        BasicKind::UntypedInt => tb.is_numeric(),
        BasicKind::UntypedRune => !matches!(
            tb,
            BasicKind::Int8 | BasicKind::Int16 | BasicKind::Uint8 | BasicKind::Uint16
        ) && tb.is_numeric(),
        BasicKind::UntypedFloat => !tb.is_integer() && tb.is_numeric(),
        BasicKind::UntypedComplex => tb.is_complex(),
        BasicKind::UntypedString => tb.is_string(),
        _ => false,
    }
}
