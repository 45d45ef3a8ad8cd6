//! Derivation of version strings from repository tags.

use std::path::Path;

use tracing::debug;

use crate::FetchError;

/// The greatest valid-semver tag whose commit is reachable from `rev`
/// (an ancestor of it, or the commit itself). `None` when no tag
/// qualifies.
pub fn nearest_tag(dir: &Path, rev: &str) -> Result<Option<String>, FetchError> {
    let repo = git2::Repository::open(dir)?;
    let commit = repo
        .revparse_single(rev)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|source| FetchError::Resolve {
            rev: rev.to_owned(),
            source,
        })?;

    let mut best: Option<(semver::Version, String)> = None;
    let names = repo.tag_names(None)?;
    for name in names.iter().flatten() {
        let Some(version) = parse_semver_tag(name) else {
            continue;
        };
        let tag_commit = match repo
            .revparse_single(&format!("refs/tags/{name}"))
            .and_then(|obj| obj.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(e) => {
                debug!(tag = name, error = %e, "skipping unresolvable tag");
                continue;
            }
        };
        let reachable = tag_commit.id() == commit.id()
            || repo
                .merge_base(commit.id(), tag_commit.id())
                .map(|base| base == tag_commit.id())
                .unwrap_or(false);
        if !reachable {
            continue;
        }
        let better = match &best {
            Some((v, _)) => version > *v,
            None => true,
        };
        if better {
            best = Some((version, name.to_owned()));
        }
    }
    Ok(best.map(|(_, name)| name))
}

/// Parse a `vMAJOR[.MINOR[.PATCH]][-PRERELEASE]` tag leniently, the way
/// the source ecosystem's version comparison does.
pub(crate) fn parse_semver_tag(tag: &str) -> Option<semver::Version> {
    let rest = tag.strip_prefix('v')?;
    if let Ok(v) = semver::Version::parse(rest) {
        return Some(v);
    }
    // Pad missing components: v1 and v1.2 are valid in the ecosystem.
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
