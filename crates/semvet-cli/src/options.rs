//! Command-line surface.

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

/// Compare two versions of the same module and report whether the change
/// needs a Major, Minor, or Patchlevel version bump (or None).
#[derive(Debug, Parser)]
#[command(name = "semvet", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CommandKind,

    /// Print nothing; exit with 0, 1, 2, 3, or 4 for None, Patchlevel,
    /// Minor, Major, or error (without --v1/--v2), or 0/1 for OK/ERR.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show the result as an indented multi-line report.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Version string of the older snapshot; with --v2, output becomes an
    /// OK/ERR adequacy check of the version-number change.
    #[arg(long, global = true, value_name = "VERSION")]
    pub v1: Option<String>,

    /// Version string of the newer snapshot.
    #[arg(long, global = true, value_name = "VERSION")]
    pub v2: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CommandKind {
    /// Compare two checked-out module directories.
    Dirs { older: PathBuf, newer: PathBuf },

    /// Compare two revisions, cloning each from its repository URL.
    Git {
        url_older: String,
        rev_older: String,
        url_newer: String,
        rev_newer: String,

        /// Derive --v1 and --v2 from the nearest semver tags reachable
        /// from the two revisions.
        #[arg(long)]
        versions: bool,

        /// Command to use for version-control operations; when it cannot
        /// be resolved the in-process library is used instead.
        #[arg(long, default_value = "git", value_name = "CMD")]
        gitcmd: String,
    },

    /// Compare the base and head of a pull request and post the report
    /// as a comment.
    Pr {
        url: String,

        /// Access token for the hosting platform.
        #[arg(long, env = "GITHUB_TOKEN", value_name = "TOKEN")]
        token: Option<String>,
    },
}

impl Cli {
    /// Flag combinations clap cannot rule out structurally.
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if matches!(self.command, CommandKind::Pr { .. })
            && (self.v1.is_some() || self.v2.is_some())
        {
            bail!("do not specify --v1 or --v2 with pr");
        }
        if self.v1.is_some() != self.v2.is_some() {
            bail!("--v1 and --v2 must be given together");
        }
        if let (Some(v1), Some(v2)) = (&self.v1, &self.v2) {
            self.v1 = Some(normalize_version(v1)?);
            self.v2 = Some(normalize_version(v2)?);
        }
        Ok(self)
    }
}

/// Add the `v` prefix when missing, and insist on a parseable version.
fn normalize_version(v: &str) -> anyhow::Result<String> {
    let with_prefix = if v.starts_with('v') {
        v.to_owned()
    } else {
        format!("v{v}")
    };
    if parse_version(&with_prefix).is_none() {
        bail!("not a valid version string: {with_prefix}");
    }
    Ok(with_prefix)
}

/// Lenient `vMAJOR[.MINOR[.PATCH]][-PRE]` parsing.
pub fn parse_version(v: &str) -> Option<semver::Version> {
    let rest = v.strip_prefix('v')?;
    if let Ok(version) = semver::Version::parse(rest) {
        return Some(version);
    }
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };
    let mut parts = core.splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    let mut version = semver::Version::new(major, minor, patch);
    if let Some(pre) = pre {
        version.pre = semver::Prerelease::new(pre).ok()?;
    }
    Some(version)
}
