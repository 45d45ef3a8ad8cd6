//! Packages, modules, and the loader contract.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::graph::TypeGraph;
use crate::types::TypeId;

/// Module metadata attached to the packages of one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleInfo {
    /// The module path from the module declaration.
    pub path: String,
    /// The declared minimum toolchain version, e.g. `"1.21"`.
    pub go_version: Option<String>,
}

/// One loaded package: its import path, the module it belongs to, and its
/// top-level objects (package-scope values, types, and functions — never
/// struct fields or methods), each mapped to the type of the declared
/// object. A `BTreeMap` keeps walk order deterministic; the final result
/// code never depends on it, but reason messages do in ties.
#[derive(Clone, Debug)]
pub struct Package {
    pub path: String,
    pub module: Option<ModuleInfo>,
    pub objects: BTreeMap<String, TypeId>,
}

impl Package {
    pub fn new(path: impl Into<String>) -> Self {
        Package {
            path: path.into(),
            module: None,
            objects: BTreeMap::new(),
        }
    }
}

/// Whether a package path is part of the public API surface.
pub fn is_public(pkg_path: &str) -> bool {
    if pkg_path == "main" || pkg_path == "internal" {
        return false;
    }
    if pkg_path.ends_with("/main") || pkg_path.ends_with("/internal") {
        return false;
    }
    if pkg_path.starts_with("internal/") {
        return false;
    }
    !pkg_path.contains("/internal/")
}

/// Whether an identifier is exported. Accepts qualified names and judges
/// the final element.
pub fn is_exported(name: &str) -> bool {
    let last = match name.rfind('.') {
        Some(i) if i > 0 => &name[i + 1..],
        _ => name,
    };
    last.chars().next().is_some_and(char::is_uppercase)
}

/// Errors surfaced while materializing a snapshot.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{file}:{line}:{col}: {message}")]
    Parse {
        file: PathBuf,
        line: u32,
        col: u32,
        message: String,
    },

    #[error("error(s) loading package {package}: {}", errors.join("; "))]
    Package {
        package: String,
        errors: Vec<String>,
    },
}

/// The loader contract: materialize every package under `dir` into the
/// given graph. Any per-package error halts the load; partial results are
/// never returned.
pub trait Loader {
    fn load(&self, dir: &Path, graph: &mut TypeGraph) -> Result<Vec<Package>, LoadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_path_rule() {
        let cases = [
            ("main", false),
            ("internal", false),
            ("mainx", true),
            ("internalx", true),
            ("foo/main", false),
            ("main/foo", true),
            ("foo/mainx", true),
            ("mainx/foo", true),
            ("foo/internal", false),
            ("internal/foo", false),
            ("foo/internal/bar", false),
            ("foo/internalx", true),
            ("internalx/foo", true),
            ("foo/xinternal/bar", true),
            ("foo/xinternal", true),
            ("xinternal/foo", true),
        ];
        for (path, want) in cases {
            assert_eq!(is_public(path), want, "is_public({path:?})");
        }
    }

    #[test]
    fn exported_names() {
        assert!(is_exported("Foo"));
        assert!(!is_exported("foo"));
        assert!(!is_exported("_Foo"));
        assert!(is_exported("pkg.Foo"));
        assert!(!is_exported("pkg.foo"));
        assert!(!is_exported(""));
    }
}
