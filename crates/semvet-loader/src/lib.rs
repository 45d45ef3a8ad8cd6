//! Loader for the declaration subset of Go source trees.
//!
//! [`GoLoader`] walks a module directory, parses every non-test `.go`
//! file's declarations (bodies are skipped), resolves named types across
//! the packages of the tree, and returns [`Package`]s whose types live in
//! the caller's [`TypeGraph`]. Anything that fails to parse halts the load
//! with the file position; names from outside the tree become opaque
//! external types.

mod gomod;
mod parser;
mod resolve;
mod scanner;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use semvet_types::{LoadError, Loader, Package, TypeGraph};

use crate::parser::{FileAst, Parser};
use crate::resolve::PackageSource;

#[derive(Default)]
pub struct GoLoader;

impl GoLoader {
    pub fn new() -> Self {
        GoLoader
    }
}

impl Loader for GoLoader {
    fn load(&self, dir: &Path, graph: &mut TypeGraph) -> Result<Vec<Package>, LoadError> {
        let module = gomod::read_module(dir)?;

        let mut by_dir: BTreeMap<String, Vec<FileAst>> = BTreeMap::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || keep_entry(entry));
        for entry in walker {
            let entry = entry.map_err(|e| LoadError::Io {
                path: e.path().map(Path::to_owned).unwrap_or_else(|| dir.to_owned()),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk error")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !name.ends_with(".go") || name.ends_with("_test.go") {
                continue;
            }
            let path = entry.path();
            let src = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.to_owned(),
                source,
            })?;
            let ast = Parser::new(&src)
                .and_then(Parser::parse_file)
                .map_err(|e| LoadError::Parse {
                    file: path.to_owned(),
                    line: e.pos.line,
                    col: e.pos.col,
                    message: e.message,
                })?;
            let rel = path
                .parent()
                .and_then(|p| p.strip_prefix(dir).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            by_dir.entry(rel).or_default().push(ast);
        }

        let base = module.as_ref().map(|m| m.path.clone()).unwrap_or_default();
        let sources: Vec<PackageSource> = by_dir
            .into_iter()
            .map(|(rel, files)| {
                let path = package_path(&base, &rel, &files);
                debug!(package = %path, files = files.len(), "loading package");
                PackageSource { path, files }
            })
            .collect();

        Ok(resolve::resolve(graph, module, sources))
    }
}

fn keep_entry(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !(name.starts_with('.')
        || name.starts_with('_')
        || name == "testdata"
        || name == "vendor")
}

fn package_path(module_path: &str, rel: &str, files: &[FileAst]) -> String {
    match (module_path.is_empty(), rel.is_empty()) {
        (false, true) => module_path.to_owned(),
        (false, false) => format!("{module_path}/{rel}"),
        (true, false) => rel.to_owned(),
        (true, true) => files
            .first()
            .map(|f| f.package.clone())
            .unwrap_or_default(),
    }
}
