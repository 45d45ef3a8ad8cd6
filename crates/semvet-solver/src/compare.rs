//! Recursive type comparison.
//!
//! `compare_types(older, newer)` classifies the change from `older` to
//! `newer`, dispatching on the older type's kind. Results are memoized on
//! the ordered id pair; a pair re-entered during its own comparison reads
//! back as None, which is what terminates cyclic type graphs.

use rustc_hash::FxHashMap;
use tracing::trace;

use semvet_common::{Report, ResultCode};
use semvet_types::{TypeData, TypeId};

use crate::{CacheEntry, Comparer};

impl Comparer<'_> {
    pub fn compare_types(&mut self, older: TypeId, newer: TypeId) -> Report {
        match self.type_cache.get(&(older, newer)) {
            Some(CacheEntry::Done(report)) => return report.clone(),
            Some(CacheEntry::InProgress) => return Report::NONE,
            None => {}
        }
        self.type_cache.insert((older, newer), CacheEntry::InProgress);
        let res = self.compare_types_uncached(older, newer);
        self.type_cache
            .insert((older, newer), CacheEntry::Done(res.clone()));
        res
    }

    fn compare_types_uncached(&mut self, older: TypeId, newer: TypeId) -> Report {
        let g = self.graph;
        trace!(older = ?g.data(older), newer = ?g.data(newer), "comparing types");
        match *g.data(older) {
            TypeData::Array {
                len: older_len,
                elem: older_elem,
            } => {
                let TypeData::Array {
                    len: newer_len,
                    elem: newer_elem,
                } = *g.data(newer)
                else {
                    return Report::from(ResultCode::Major)
                        .wrap(format!("{} went from array to non-array", self.render(older)));
                };
                let res = self.compare_types(older_elem, newer_elem);
                if !res.is_none() {
                    return res.wrap(format!(
                        "{} went from array of {} to array of {}",
                        self.render(older),
                        self.render(older_elem),
                        self.render(newer_elem)
                    ));
                }
                if older_len != newer_len {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "{} went from length {older_len} array to length {newer_len}",
                        self.render(older)
                    ));
                }
                Report::NONE
            }

            TypeData::Chan {
                dir: older_dir,
                elem: older_elem,
            } => {
                let TypeData::Chan {
                    dir: newer_dir,
                    elem: newer_elem,
                } = *g.data(newer)
                else {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "{} went from channel to non-channel",
                        self.render(older)
                    ));
                };
                let res = self.compare_types(older_elem, newer_elem);
                if !res.is_none() {
                    return res.wrap(format!(
                        "{} went from channel of {} to channel of {}",
                        self.render(older),
                        self.render(older_elem),
                        self.render(newer_elem)
                    ));
                }
                if older_dir == newer_dir {
                    return Report::NONE;
                }
                if older_dir == semvet_types::ChanDir::SendRecv {
                    return Report::from(ResultCode::Minor).wrap(format!(
                        "{} went from send/receive channel to {}",
                        self.render(older),
                        newer_dir.describe()
                    ));
                }
                Report::from(ResultCode::Major).wrap(format!(
                    "{} went from {} channel to {}",
                    self.render(older),
                    older_dir.describe(),
                    newer_dir.describe()
                ))
            }

            TypeData::Pointer(older_elem) => {
                let TypeData::Pointer(newer_elem) = *g.data(newer) else {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "{} went from pointer to non-pointer",
                        self.render(older)
                    ));
                };
                self.compare_types(older_elem, newer_elem)
            }

            TypeData::Named(older_id) => {
                if matches!(g.data(newer), TypeData::Named(_)) {
                    return self.compare_named(older, newer);
                }
                if !g.named_decl(older_id).type_params.is_empty() {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "{} went from generic named type to unnamed {}",
                        self.render(older),
                        self.render(newer)
                    ));
                }
                self.compare_types(g.underlying(older), newer)
            }

            TypeData::Struct(_) => {
                if matches!(g.data(newer), TypeData::Struct(_)) {
                    return self.compare_structs(older, newer);
                }
                Report::from(ResultCode::Major)
                    .wrap(format!("{} went from struct to non-struct", self.render(older)))
            }

            TypeData::Interface(_) => {
                if matches!(g.data(newer), TypeData::Interface(_)) {
                    return self.compare_interfaces(older, newer);
                }
                Report::from(ResultCode::Major).wrap(format!(
                    "{} went from interface to non-interface",
                    self.render(older)
                ))
            }

            TypeData::Signature(_) => {
                if matches!(g.data(newer), TypeData::Signature(_)) {
                    return self.compare_signatures(older, newer);
                }
                Report::from(ResultCode::Major).wrap(format!(
                    "{} went from function to non-function",
                    self.render(older)
                ))
            }

            TypeData::Map {
                key: older_key,
                value: older_value,
            } => {
                let TypeData::Map {
                    key: newer_key,
                    value: newer_value,
                } = *g.data(newer)
                else {
                    return Report::from(ResultCode::Major)
                        .wrap(format!("{} went from map to non-map", self.render(older)));
                };
                let key_res = self.compare_types(older_key, newer_key);
                let value_res = self.compare_types(older_value, newer_value);
                if key_res.code() > value_res.code() {
                    return key_res
                        .wrap(format!("in the map-key type of {}", self.render(older)));
                }
                value_res.wrap(format!("in the map-value type of {}", self.render(older)))
            }

            TypeData::Slice(older_elem) => {
                let TypeData::Slice(newer_elem) = *g.data(newer) else {
                    return Report::from(ResultCode::Major)
                        .wrap(format!("{} went from slice to non-slice", self.render(older)));
                };
                self.compare_types(older_elem, newer_elem)
            }

            TypeData::Basic(_) | TypeData::TypeParam(_) | TypeData::Union(_) => {
                if !self.assignable_to(newer, older) {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "{} is not assignable to {}",
                        self.render(newer),
                        self.render(older)
                    ));
                }
                Report::NONE
            }
        }
    }

    /// Compare two named types: type-parameter lists, then underlyings,
    /// keeping the worse. A reason that mentions one of the underlyings is
    /// rewritten to name the type instead; otherwise the whole finding is
    /// wrapped with the type's name.
    fn compare_named(&mut self, older: TypeId, newer: TypeId) -> Report {
        let g = self.graph;
        let (Some(older_decl), Some(newer_decl)) = (g.as_named(older), g.as_named(newer)) else {
            return Report::NONE;
        };
        let older_params = older_decl.type_params.clone();
        let newer_params = newer_decl.type_params.clone();

        let mut res = self.compare_type_param_lists(&older_params, &newer_params);
        let under = self.compare_types(g.underlying(older), g.underlying(newer));
        res = res.worse_of(under);

        if let Report::Wrap { why, .. } = &mut res {
            let mut replaced = false;
            for (u, named) in [(g.underlying(older), older), (g.underlying(newer), newer)] {
                let from = crate::format::render(g, u);
                let to = crate::format::render(g, named);
                if from != to && replace_type_token(why, &from, &to) {
                    replaced = true;
                }
            }
            if replaced {
                return res;
            }
        }
        res.wrap(format!("in type {}", self.render(older)))
    }

    /// Struct comparison: removed exported fields are Major, added ones
    /// Minor, changed ones carry their own severity, and tag changes are
    /// diffed per field. If nothing else surfaced but the structs are not
    /// identical (unexported-field changes), that is a Patchlevel finding.
    fn compare_structs(&mut self, older: TypeId, newer: TypeId) -> Report {
        let g = self.graph;
        let (TypeData::Struct(older_sid), TypeData::Struct(newer_sid)) =
            (*g.data(older), *g.data(newer))
        else {
            return Report::NONE;
        };
        let older_fields = &g.struct_shape(older_sid).fields;
        let newer_fields = &g.struct_shape(newer_sid).fields;

        let older_index: FxHashMap<&str, usize> = older_fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect();
        let newer_index: FxHashMap<&str, usize> = newer_fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect();

        let mut res = Report::NONE;

        for field in older_fields {
            if !semvet_types::is_exported(&field.name) {
                // Unexported fields are outside the public contract.
                continue;
            }
            let Some(&j) = newer_index.get(field.name.as_str()) else {
                return Report::from(ResultCode::Major).wrap(format!(
                    "old struct field {} was removed from {}",
                    field.name,
                    self.render(older)
                ));
            };
            let newer_field = &newer_fields[j];

            let r = self.compare_types(field.ty, newer_field.ty);
            if r.code() > res.code() {
                res = r.wrap(format!(
                    "struct field {} changed in {}",
                    field.name,
                    self.render(older)
                ));
                if res.code() == ResultCode::Major {
                    return res;
                }
            }

            let tag_res = self.compare_struct_tags(&field.tag, &newer_field.tag);
            if tag_res.code() == ResultCode::Major {
                return tag_res.wrap(format!(
                    "tag change in field {} of {}",
                    field.name,
                    self.render(older)
                ));
            }
        }

        for field in newer_fields {
            if !semvet_types::is_exported(&field.name) {
                continue;
            }
            let Some(&j) = older_index.get(field.name.as_str()) else {
                return Report::from(ResultCode::Minor).wrap(format!(
                    "struct field {} was added to {}",
                    field.name,
                    self.render(newer)
                ));
            };
            let older_field = &older_fields[j];

            let tag_res = self.compare_struct_tags(&older_field.tag, &field.tag);
            if tag_res.code() == ResultCode::Minor {
                return tag_res.wrap(format!(
                    "tag change in field {} of {}",
                    field.name,
                    self.render(older)
                ));
            }
        }

        if !res.is_none() {
            return res;
        }
        if !self.identical(older, newer) {
            return Report::from(ResultCode::Patchlevel).wrap(format!(
                "old and new versions of {} are not identical",
                self.render(older)
            ));
        }
        Report::NONE
    }

    /// Interface comparison along two axes: the method set, and for
    /// constraints the flattened type set.
    fn compare_interfaces(&mut self, older: TypeId, newer: TypeId) -> Report {
        let g = self.graph;
        let mut res = Report::NONE;

        if self.implements(newer, older) {
            if !self.implements(older, newer) {
                res = Report::from(ResultCode::Major).wrap(format!(
                    "new interface {} is a superset of older",
                    self.render(newer)
                ));
            }
        } else {
            return Report::from(ResultCode::Major).wrap(format!(
                "new interface {} does not implement old",
                self.render(newer)
            ));
        }

        let older_flat = g.flatten_interface(older);
        let newer_flat = g.flatten_interface(newer);

        if older_flat.is_nonempty_method_set() {
            if newer_flat.is_nonempty_method_set() {
                return res;
            }
            return Report::from(ResultCode::Major)
                .wrap("new interface is a constraint, old one is not");
        }
        if newer_flat.is_nonempty_method_set() {
            return Report::from(ResultCode::Major)
                .wrap("old interface is a constraint, new one is not");
        }

        let older_comparable = self.interface_comparable(&older_flat);
        let newer_comparable = self.interface_comparable(&newer_flat);

        if older_flat.terms.is_empty() {
            if newer_flat.terms.is_empty() {
                return match (older_comparable, newer_comparable) {
                    (true, true) | (false, false) => res,
                    (true, false) => Report::from(ResultCode::Minor)
                        .wrap("constraint went from comparable to any"),
                    (false, true) => Report::from(ResultCode::Major)
                        .wrap("constraint went from any to comparable"),
                };
            }
            // The newer constraint narrows an unbounded type set.
            return match (older_comparable, newer_comparable) {
                (true, true) => Report::from(ResultCode::Major)
                    .wrap("constraint went from all to some comparable types"),
                (true, false) => Report::from(ResultCode::Major)
                    .wrap("constraint went from comparable to (some) non-comparable types"),
                (false, true) => Report::from(ResultCode::Major)
                    .wrap("constraint went from any to (some) comparable types"),
                (false, false) => {
                    Report::from(ResultCode::Major).wrap("new constraint adds type union")
                }
            };
        }
        if newer_flat.terms.is_empty() {
            return match (older_comparable, newer_comparable) {
                (true, true) => Report::from(ResultCode::Minor)
                    .wrap("constraint went from some to all comparable types"),
                (true, false) => Report::from(ResultCode::Minor)
                    .wrap("constraint went from some comparable types to any"),
                (false, true) => Report::from(ResultCode::Major)
                    .wrap("constraint went from (some) non-comparable types to comparable"),
                (false, false) => {
                    Report::from(ResultCode::Major).wrap("new constraint removes type union")
                }
            };
        }

        if self.term_list_subset(&older_flat.terms, &newer_flat.terms) {
            if self.term_list_subset(&newer_flat.terms, &older_flat.terms) {
                return res;
            }
            return Report::from(ResultCode::Minor).wrap(
                "older constraint type union is a subset of newer (constraint has relaxed)",
            );
        }
        if self.term_list_subset(&newer_flat.terms, &older_flat.terms) {
            return Report::from(ResultCode::Major).wrap(
                "newer constraint type union is a subset of older (constraint has tightened)",
            );
        }
        Report::from(ResultCode::Major).wrap("constraint type unions differ")
    }

    /// Signature comparison: type parameters, parameters (with the
    /// added-optional-parameter relaxation), and results, each wrapped and
    /// combined by worst severity.
    pub(crate) fn compare_signatures(&mut self, older: TypeId, newer: TypeId) -> Report {
        let g = self.graph;
        let (TypeData::Signature(older_sid), TypeData::Signature(newer_sid)) =
            (*g.data(older), *g.data(newer))
        else {
            return Report::NONE;
        };
        let older_shape = g.signature_shape(older_sid);
        let newer_shape = g.signature_shape(newer_sid);

        let type_params_res =
            self.compare_type_param_lists(&older_shape.type_params, &newer_shape.type_params);
        let params_res = self.compare_tuples(
            &older_shape.params,
            &newer_shape.params,
            !older_shape.variadic && newer_shape.variadic,
        );
        let results_res = self.compare_tuples(&older_shape.results, &newer_shape.results, false);

        let older_str = self.render(older);
        let mut res = type_params_res.wrap(format!("in type parameters of {older_str}"));
        if params_res.code() > res.code() {
            res = params_res.wrap(format!("in parameters of {older_str}"));
        }
        if results_res.code() > res.code() {
            res = results_res.wrap(format!("in results of {older_str}"));
        }
        res
    }

    /// Element-wise tuple comparison. When `variadic_check` is set and the
    /// newer tuple has exactly one extra element, the change counts as
    /// adding optional parameters: Minor if the shared prefix is clean.
    fn compare_tuples(
        &mut self,
        older: &[TypeId],
        newer: &[TypeId],
        variadic_check: bool,
    ) -> Report {
        let maybe_variadic = variadic_check && older.len() + 1 == newer.len();
        if older.len() != newer.len() && !maybe_variadic {
            return Report::from(ResultCode::Major).wrap(format!(
                "{} param(s) to {}",
                older.len(),
                newer.len()
            ));
        }
        let mut res = Report::NONE;
        for (&o, &n) in older.iter().zip(newer.iter()) {
            let r = self.compare_types(o, n);
            if r.code() == ResultCode::Major {
                return r;
            }
            res = res.worse_of(r);
        }
        if res.code() < ResultCode::Minor && maybe_variadic {
            return Report::from(ResultCode::Minor).wrap("added optional parameters");
        }
        res
    }

    /// Compare declared type-parameter lists by their constraints.
    pub(crate) fn compare_type_param_lists(
        &mut self,
        older: &[semvet_types::TypeParamId],
        newer: &[semvet_types::TypeParamId],
    ) -> Report {
        if older.len() != newer.len() {
            return Report::from(ResultCode::Major).wrap(format!(
                "went from {} type parameter(s) to {}",
                older.len(),
                newer.len()
            ));
        }
        let g = self.graph;
        let older_constraints = g.constraints_of(older);
        let newer_constraints = g.constraints_of(newer);
        let mut res = Report::NONE;
        for (&o, &n) in older_constraints.iter().zip(newer_constraints.iter()) {
            let r = self.compare_types(o, n);
            if r.code() > res.code() {
                res = r;
                if res.code() == ResultCode::Major {
                    break;
                }
            }
        }
        res
    }
}

/// Replace whole-token occurrences of `from` in `why` with `to`. A token
/// boundary is anything outside `[A-Za-z0-9_.]`, which keeps `int` from
/// rewriting the middle of `uint`.
fn replace_type_token(why: &mut String, from: &str, to: &str) -> bool {
    if from.is_empty() {
        return false;
    }
    let is_word = |c: u8| c.is_ascii_alphanumeric() || c == b'_' || c == b'.';
    let bytes = why.as_bytes();
    let mut out = String::with_capacity(why.len());
    let mut i = 0;
    let mut replaced = false;
    while i < bytes.len() {
        if why[i..].starts_with(from) {
            let before_ok = i == 0 || !is_word(bytes[i - 1]);
            let end = i + from.len();
            let after_ok = end >= bytes.len() || !is_word(bytes[end]);
            if before_ok && after_ok {
                out.push_str(to);
                i = end;
                replaced = true;
                continue;
            }
        }
        // Advance one full character, not one byte.
        let ch_len = why[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&why[i..i + ch_len]);
        i += ch_len;
    }
    if replaced {
        *why = out;
    }
    replaced
}
