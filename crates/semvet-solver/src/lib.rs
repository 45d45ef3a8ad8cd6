//! The semvet comparison engine.
//!
//! [`compare`] walks two sets of loaded packages in three passes (Major,
//! Minor, Patchlevel) and returns the minimum version bump the differences
//! require, with a reason chain. The recursive type comparison and the
//! identity/assignability predicates live on [`Comparer`], whose caches and
//! recursion stacks last exactly one call.

mod assign;
mod compare;
mod format;
mod identical;
mod sweep;
mod tag;
mod term;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use semvet_common::Report;
use semvet_types::{Loader, LoadError, Package, TypeGraph, TypeId};

pub use format::render;
pub use tag::tag_map;

/// Errors from the loading side of a comparison. The comparison itself is
/// total: it always produces a [`Report`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("loading {dir}: {source}")]
    Load {
        dir: PathBuf,
        #[source]
        source: LoadError,
    },
}

/// Compare two sets of loaded packages sharing one type graph.
pub fn compare(graph: &TypeGraph, olders: &[Package], newers: &[Package]) -> Report {
    Comparer::new(graph).compare_packages(olders, newers)
}

/// Load both snapshot directories with `loader` and compare them.
pub fn compare_dirs(loader: &dyn Loader, older: &Path, newer: &Path) -> Result<Report, Error> {
    let mut graph = TypeGraph::new();
    let olders = loader.load(older, &mut graph).map_err(|source| Error::Load {
        dir: older.to_owned(),
        source,
    })?;
    let newers = loader.load(newer, &mut graph).map_err(|source| Error::Load {
        dir: newer.to_owned(),
        source,
    })?;
    Ok(compare(&graph, &olders, &newers))
}

/// Entry in the type-comparison memo table. `InProgress` is the cycle
/// sentinel: re-entering a pair mid-comparison reads back as `None`
/// ("no difference pending proof").
enum CacheEntry {
    InProgress,
    Done(Report),
}

/// One comparison's worth of state: borrows the immutable graph, owns the
/// memo tables and the identity recursion stack.
pub struct Comparer<'g> {
    graph: &'g TypeGraph,
    type_cache: FxHashMap<(TypeId, TypeId), CacheEntry>,
    id_cache: FxHashMap<(TypeId, TypeId), bool>,
    id_stack: Vec<(TypeId, TypeId)>,
}

impl<'g> Comparer<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Comparer {
            graph,
            type_cache: FxHashMap::default(),
            id_cache: FxHashMap::default(),
            id_stack: Vec::new(),
        }
    }

    pub(crate) fn render(&self, t: TypeId) -> String {
        format::render(self.graph, t)
    }
}
