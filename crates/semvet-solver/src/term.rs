//! Type-set term subset reasoning for constraint interfaces.
//!
//! This mirrors term-set logic the source language keeps private: a term
//! `~t` admits every type whose underlying type is `t`, a plain term `T`
//! admits exactly `T`.

use semvet_types::{FlatInterface, Term};

use crate::Comparer;

impl Comparer<'_> {
    /// Whether `x ⊆ y` for single terms.
    fn term_subset(&mut self, x: Term, y: Term) -> bool {
        if self.term_disjoint(x, y) {
            return false;
        }
        // ~t ⊆ ~t and T ⊆ ~t and T ⊆ T hold; ~t ⊆ T does not.
        !x.tilde || y.tilde
    }

    /// Whether `x ∩ y = ∅`.
    fn term_disjoint(&mut self, x: Term, y: Term) -> bool {
        let g = self.graph;
        let ux = if y.tilde { g.underlying(x.ty) } else { x.ty };
        let uy = if x.tilde { g.underlying(y.ty) } else { y.ty };
        !self.identical(ux, uy)
    }

    /// Whether every term of `xl` is admitted by some term of `yl`.
    pub(crate) fn term_list_subset(&mut self, xl: &[Term], yl: &[Term]) -> bool {
        if yl.is_empty() {
            return xl.is_empty();
        }
        for &x in xl {
            let mut covered = false;
            for &y in yl {
                if self.term_subset(x, y) {
                    covered = true;
                    break;
                }
            }
            if !covered {
                return false;
            }
        }
        true
    }

    /// Whether an interface's type set consists entirely of comparable
    /// types: either `comparable` is embedded, or every term's type is
    /// strictly comparable.
    pub(crate) fn interface_comparable(&mut self, flat: &FlatInterface) -> bool {
        if flat.comparable {
            return true;
        }
        !flat.terms.is_empty()
            && flat
                .terms
                .iter()
                .all(|term| self.graph.is_strictly_comparable(term.ty))
    }
}

#[cfg(test)]
mod tests {
    use semvet_types::{BasicKind, Term, TypeGraph};

    use crate::Comparer;

    #[test]
    fn tilde_matrix() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let my_int = g.named("MyInt", "p");
        g.set_underlying(my_int, int);

        let t = |tilde, ty| Term { tilde, ty };
        let mut c = Comparer::new(&g);

        // ~int admits int and every type whose underlying is int.
        assert!(c.term_list_subset(&[t(false, int)], &[t(true, int)]));
        assert!(c.term_list_subset(&[t(false, my_int)], &[t(true, int)]));
        // int alone does not admit MyInt.
        assert!(!c.term_list_subset(&[t(false, my_int)], &[t(false, int)]));
        // ~int is not a subset of the single type int.
        assert!(!c.term_list_subset(&[t(true, int)], &[t(false, int)]));
        // Reflexive.
        assert!(c.term_list_subset(&[t(true, int)], &[t(true, int)]));
        assert!(c.term_list_subset(&[t(false, int)], &[t(false, int)]));
    }

    #[test]
    fn empty_lists() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let t = Term { tilde: false, ty: int };
        let mut c = Comparer::new(&g);

        assert!(c.term_list_subset(&[], &[]));
        assert!(!c.term_list_subset(&[t], &[]));
        assert!(c.term_list_subset(&[], &[t]));
    }

    #[test]
    fn subset_of_wider_union() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let t = |ty| Term { tilde: false, ty };
        let mut c = Comparer::new(&g);

        assert!(c.term_list_subset(&[t(int)], &[t(int), t(string)]));
        assert!(!c.term_list_subset(&[t(int), t(string)], &[t(int)]));
    }
}
