//! Staging of repository revisions for comparison.
//!
//! [`Fetcher::stage`] produces two checkouts under one temporary directory
//! that is removed on drop, whatever the exit path. A resolvable `git`
//! executable is preferred; without one the in-process library takes over
//! with a warning, matching the behavior users expect from the native
//! tool when it is available.

mod tags;

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use semvet_common::Report;
use semvet_types::Loader;

pub use tags::nearest_tag;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("creating staging directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("running {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Command {
        command: String,
        status: std::process::ExitStatus,
    },

    #[error("cloning {url} into {dir}: {source}")]
    Clone {
        url: String,
        dir: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("resolving revision \"{rev}\": {source}")]
    Resolve {
        rev: String,
        #[source]
        source: git2::Error,
    },

    #[error("checking out \"{rev}\": {source}")]
    Checkout {
        rev: String,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// Two revisions staged side by side. Dropping this removes both clones.
#[derive(Debug)]
pub struct Staged {
    _dir: TempDir,
    older: PathBuf,
    newer: PathBuf,
}

impl Staged {
    pub fn older(&self) -> &Path {
        &self.older
    }

    pub fn newer(&self) -> &Path {
        &self.newer
    }
}

/// Clones and checks out revisions, preferring an external executable.
pub struct Fetcher {
    git_cmd: String,
}

impl Default for Fetcher {
    fn default() -> Self {
        Fetcher::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Fetcher {
            git_cmd: "git".to_owned(),
        }
    }

    /// Use `cmd` for version-control operations. An empty command skips
    /// the executable entirely and always uses the in-process library.
    pub fn with_git_command(cmd: impl Into<String>) -> Self {
        Fetcher {
            git_cmd: cmd.into(),
        }
    }

    /// Create two clones at the requested revisions.
    pub fn stage(
        &self,
        older_url: &str,
        older_rev: &str,
        newer_url: &str,
        newer_rev: &str,
    ) -> Result<Staged, FetchError> {
        let dir = TempDir::with_prefix("semvet").map_err(FetchError::TempDir)?;
        let older = dir.path().join("older");
        let newer = dir.path().join("newer");
        self.checkout(older_url, older_rev, &older)?;
        self.checkout(newer_url, newer_rev, &newer)?;
        Ok(Staged {
            _dir: dir,
            older,
            newer,
        })
    }

    fn checkout(&self, url: &str, rev: &str, dir: &Path) -> Result<(), FetchError> {
        match resolve_executable(&self.git_cmd) {
            Some(git) => self.checkout_native(&git, url, rev, dir),
            None => {
                if !self.git_cmd.is_empty() {
                    warn!(
                        command = %self.git_cmd,
                        "cannot resolve version-control command, falling back to in-process library"
                    );
                }
                checkout_in_process(url, rev, dir)
            }
        }
    }

    fn checkout_native(
        &self,
        git: &Path,
        url: &str,
        rev: &str,
        dir: &Path,
    ) -> Result<(), FetchError> {
        debug!(url, rev, dir = %dir.display(), "native clone");
        run(Command::new(git).arg("clone").arg(url).arg(dir))?;
        run(Command::new(git)
            .arg("checkout")
            .arg(rev)
            .current_dir(dir))?;
        Ok(())
    }
}

fn run(cmd: &mut Command) -> Result<(), FetchError> {
    let command = format!("{cmd:?}");
    let status = cmd
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(|source| FetchError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !status.success() {
        return Err(FetchError::Command { command, status });
    }
    Ok(())
}

fn checkout_in_process(url: &str, rev: &str, dir: &Path) -> Result<(), FetchError> {
    let repo = git2::Repository::clone(url, dir).map_err(|source| FetchError::Clone {
        url: url.to_owned(),
        dir: dir.to_owned(),
        source,
    })?;
    let object = repo
        .revparse_single(rev)
        .map_err(|source| FetchError::Resolve {
            rev: rev.to_owned(),
            source,
        })?;
    let commit = object
        .peel(git2::ObjectType::Commit)
        .map_err(|source| FetchError::Resolve {
            rev: rev.to_owned(),
            source,
        })?;
    let mut opts = git2::build::CheckoutBuilder::new();
    opts.force();
    repo.checkout_tree(&commit, Some(&mut opts))
        .map_err(|source| FetchError::Checkout {
            rev: rev.to_owned(),
            source,
        })?;
    repo.set_head_detached(commit.id())
        .map_err(|source| FetchError::Checkout {
            rev: rev.to_owned(),
            source,
        })?;
    Ok(())
}

/// Resolve a command name against `PATH`. Absolute and relative paths are
/// taken as given when they exist.
fn resolve_executable(cmd: &str) -> Option<PathBuf> {
    if cmd.is_empty() {
        return None;
    }
    let direct = Path::new(cmd);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_owned());
    }
    let path = std::env::var_os("PATH")?;
    for entry in std::env::split_paths(&path) {
        let candidate = entry.join(cmd);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Errors from a staged comparison: fetching or loading.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Compare(#[from] semvet_solver::Error),
}

/// Stage the two revisions and compare them with `loader`.
pub fn compare_git(
    fetcher: &Fetcher,
    loader: &dyn Loader,
    older_url: &str,
    older_rev: &str,
    newer_url: &str,
    newer_rev: &str,
) -> Result<Report, Error> {
    let staged = fetcher.stage(older_url, older_rev, newer_url, newer_rev)?;
    Ok(semvet_solver::compare_dirs(
        loader,
        staged.older(),
        staged.newer(),
    )?)
}
