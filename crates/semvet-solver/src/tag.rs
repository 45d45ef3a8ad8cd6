//! Struct-tag parsing and diffing.

use std::collections::BTreeMap;

use semvet_common::{Report, ResultCode};

use crate::Comparer;

/// Parse a struct tag into its key→value map.
///
/// A tag is a space-separated sequence of `key:"value"` pairs; keys exclude
/// spaces, quotes, colons and control characters, values keep their
/// backslash escapes verbatim. Duplicate keys: last wins, matching the
/// source language's own parser. Anything that does not scan as a pair is
/// skipped.
pub fn tag_map(tag: &str) -> BTreeMap<String, String> {
    let bytes = tag.as_bytes();
    let mut map = BTreeMap::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && is_key_byte(bytes[i]) {
            i += 1;
        }
        if i > start && i + 1 < bytes.len() && bytes[i] == b':' && bytes[i + 1] == b'"' {
            let key = &tag[start..i];
            let vstart = i + 2;
            let mut j = vstart;
            let mut closed = false;
            while j < bytes.len() {
                if bytes[j] == b'\\' && j + 1 < bytes.len() && bytes[j + 1] == b'"' {
                    j += 2;
                    continue;
                }
                if bytes[j] == b'"' {
                    closed = true;
                    break;
                }
                j += 1;
            }
            if closed {
                map.insert(key.to_owned(), tag[vstart..j].to_owned());
                i = j + 1;
                continue;
            }
        }
        if i == start {
            i += 1;
        }
    }
    map
}

fn is_key_byte(c: u8) -> bool {
    c != b' ' && c != b'"' && c != b':' && !c.is_ascii_control()
}

impl Comparer<'_> {
    /// Diff two tag strings. Identical strings short-circuit without
    /// parsing; a removed key or changed value is Major, an added key is
    /// Minor.
    pub(crate) fn compare_struct_tags(&self, older: &str, newer: &str) -> Report {
        if older == newer {
            return Report::NONE;
        }
        let older_map = tag_map(older);
        let newer_map = tag_map(newer);
        for (key, old_value) in &older_map {
            match newer_map.get(key) {
                Some(new_value) if new_value != old_value => {
                    return Report::from(ResultCode::Major).wrap(format!(
                        "struct tag changed the value for key \"{key}\" from \"{old_value}\" to \"{new_value}\""
                    ));
                }
                Some(_) => {}
                None => {
                    return Report::from(ResultCode::Major)
                        .wrap(format!("struct tag {key} was removed"));
                }
            }
        }
        for key in newer_map.keys() {
            if !older_map.contains_key(key) {
                return Report::from(ResultCode::Minor)
                    .wrap(format!("struct tag {key} was added"));
            }
        }
        Report::NONE
    }
}
