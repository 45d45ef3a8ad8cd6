//! Pull-request reporting: compare base and head, then create or update a
//! single recognizable comment.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use semvet_common::Report;

/// Header line that marks a comment as ours; detection looks at the first
/// non-blank line of the body.
const REPORT_HEADER: &str = "# Modver result";

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub base: PrRef,
    pub head: PrRef,
}

#[derive(Debug, Deserialize)]
pub struct PrRef {
    pub sha: String,
    /// Absent when the source repository has been deleted.
    #[serde(default)]
    pub repo: Option<RepoRef>,
}

#[derive(Debug, Deserialize)]
pub struct RepoRef {
    pub clone_url: String,
}

#[derive(Debug, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
}

/// Thin synchronous client for the hosting platform's REST API.
pub struct GitHubClient {
    token: String,
    api_base: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        GitHubClient {
            token: token.into(),
            api_base: "https://api.github.com".to_owned(),
        }
    }

    /// Point the client at a different API root (tests, GHE).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        GitHubClient {
            token: token.into(),
            api_base: api_base.into(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        ureq::request(method, &format!("{}{path}", self.api_base))
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "semvet")
    }

    pub fn pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        self.request("GET", &format!("/repos/{owner}/{repo}/pulls/{number}"))
            .call()
            .context("getting pull request")?
            .into_json()
            .context("decoding pull request")
    }

    pub fn list_comments(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<IssueComment>> {
        self.request(
            "GET",
            &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        )
        .call()
        .context("listing PR comments")?
        .into_json()
        .context("decoding PR comments")
    }

    pub fn create_comment(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        self.request(
            "POST",
            &format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        )
        .send_json(serde_json::json!({ "body": body }))
        .context("creating PR comment")?;
        Ok(())
    }

    pub fn update_comment(&self, owner: &str, repo: &str, id: u64, body: &str) -> Result<()> {
        self.request("PATCH", &format!("/repos/{owner}/{repo}/issues/comments/{id}"))
            .send_json(serde_json::json!({ "body": body }))
            .context("updating PR comment")?;
        Ok(())
    }
}

/// `https://github.com/OWNER/REPO/pull/N` → (owner, repo, n).
pub fn parse_pr_url(url: &str) -> Result<(String, String, u64)> {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let mut parts = rest.trim_matches('/').split('/');
    let _host = parts.next();
    let (Some(owner), Some(repo), Some(kind), Some(number)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("too few path elements in pull-request URL {url}");
    };
    if kind != "pull" {
        bail!("pull-request URL not in expected format: {url}");
    }
    let number: u64 = number
        .parse()
        .with_context(|| format!("parsing number from pull-request URL {url}"))?;
    Ok((owner.to_owned(), repo.to_owned(), number))
}

/// Whether a comment body is the report comment.
pub fn is_report_comment(body: &str) -> bool {
    let head = if body.len() > 1024 {
        let mut end = 1024;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        &body[..end]
    } else {
        body
    };
    head.lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.trim_end() == REPORT_HEADER)
}

/// Render the comment body: the header, the code, and the pretty report
/// inside a fenced block.
pub fn comment_body(report: &Report) -> String {
    let mut pretty = Vec::new();
    let _ = report.pretty(&mut pretty);
    format!(
        "{REPORT_HEADER}\n\n`{}`\n\n```\n{}```\n",
        report.code(),
        String::from_utf8_lossy(&pretty)
    )
}

/// Compare the PR's base and head, then create or update the report
/// comment idempotently.
pub fn report_on_pr(client: &GitHubClient, url: &str, report_for: impl FnOnce(&str, &str, &str) -> Result<Report>) -> Result<Report> {
    let (owner, repo, number) = parse_pr_url(url)?;
    let pr = client.pull_request(&owner, &repo, number)?;
    let clone_url = &pr
        .base
        .repo
        .as_ref()
        .context("pull request has no base repository")?
        .clone_url;
    let report = report_for(clone_url, &pr.base.sha, &pr.head.sha)?;

    let body = comment_body(&report);
    let existing = client
        .list_comments(&owner, &repo, number)?
        .into_iter()
        .find(|c| is_report_comment(&c.body));
    match existing {
        Some(comment) => {
            debug!(id = comment.id, "updating existing report comment");
            client.update_comment(&owner, &repo, comment.id, &body)?;
        }
        None => client.create_comment(&owner, &repo, number, &body)?,
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semvet_common::ResultCode;

    #[test]
    fn parses_pr_urls() {
        let (owner, repo, number) =
            parse_pr_url("https://github.com/bobg/modver/pull/42").unwrap();
        assert_eq!(owner, "bobg");
        assert_eq!(repo, "modver");
        assert_eq!(number, 42);
    }

    #[test]
    fn rejects_malformed_pr_urls() {
        assert!(parse_pr_url("https://github.com/bobg/modver").is_err());
        assert!(parse_pr_url("https://github.com/bobg/modver/issues/42").is_err());
        assert!(parse_pr_url("https://github.com/bobg/modver/pull/abc").is_err());
    }

    #[test]
    fn recognizes_report_comments() {
        assert!(is_report_comment("# Modver result\n\nMinor\n"));
        assert!(is_report_comment("\n\n# Modver result\nrest"));
        assert!(!is_report_comment("## Modver result\n"));
        assert!(!is_report_comment("something else\n# Modver result\n"));
        assert!(!is_report_comment(""));
    }

    #[test]
    fn comment_body_embeds_pretty_report() {
        let report = Report::from(ResultCode::Minor).wrap("struct field B was added");
        let body = comment_body(&report);
        assert!(body.starts_with("# Modver result\n"));
        assert!(body.contains("`Minor`"));
        assert!(body.contains("```\nstruct field B was added\n  Minor\n```"));
        assert!(is_report_comment(&body));
    }
}
