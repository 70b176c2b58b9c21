//! GitHub content source: review-able content plus commit fingerprints.
//!
//! [`ContentSource`] is the collaborator boundary the review service
//! depends on; [`GitHubSource`] is the production implementation over
//! the GitHub REST v3 API. Failures are typed at this boundary so the
//! orchestrator never inspects message strings.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tribunal_core::{Result, TribunalError};

/// Marker appended when a diff is cut at the byte budget.
pub const TRUNCATION_MARKER: &str = "\n[diff truncated: remaining files omitted to fit the size budget]\n";

/// Pull request metadata used in the review prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestInfo {
    pub title: String,
    pub author: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub commits: u64,
    pub body: String,
    pub is_draft: bool,
}

/// Repository metadata used in the review prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub name: String,
    pub description: String,
    pub language: Option<String>,
    pub stars: u64,
    pub has_tests: bool,
    pub readme: String,
}

/// Capability boundary: fetch review-able content and the commit
/// fingerprints that pin its current state.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch PR metadata.
    async fn pull_request(&self, owner: &str, repo: &str, number: u64)
        -> Result<PullRequestInfo>;

    /// Fetch repository metadata, including README content.
    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo>;

    /// Fetch the PR's unified diff, file-prioritized and truncated to
    /// `max_bytes`.
    async fn diff(&self, owner: &str, repo: &str, number: u64, max_bytes: usize)
        -> Result<String>;

    /// Head commit SHA of a PR.
    async fn pr_head_sha(&self, owner: &str, repo: &str, number: u64) -> Result<String>;

    /// HEAD commit SHA of the default branch.
    async fn default_branch_sha(&self, owner: &str, repo: &str) -> Result<String>;

    /// Full SHA of a commit, verifying it exists.
    async fn commit_sha(&self, owner: &str, repo: &str, sha: &str) -> Result<String>;

    /// Head commit SHA of a named branch (slashes allowed).
    async fn branch_sha(&self, owner: &str, repo: &str, branch: &str) -> Result<String>;
}

/// GitHub REST v3 client.
///
/// # Examples
///
/// ```no_run
/// use tribunal_review::github::GitHubSource;
///
/// let source = GitHubSource::new(Some("ghp_xxxx".into())).unwrap();
/// ```
pub struct GitHubSource {
    http: reqwest::Client,
    token: Option<String>,
}

impl GitHubSource {
    /// Create a client. A token is optional but strongly recommended:
    /// anonymous requests are limited to 60/hour by GitHub.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Github`] if the HTTP client cannot be
    /// built.
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("tribunal")
            .build()
            .map_err(|e| TribunalError::Github(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, token })
    }

    fn request(&self, path: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .get(format!("https://api.github.com{path}"))
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn get_text(&self, path: &str, accept: &str, what: &str) -> Result<String> {
        let response = self
            .request(path, accept)
            .send()
            .await
            .map_err(|e| TribunalError::Github(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, what));
        }
        response
            .text()
            .await
            .map_err(|e| TribunalError::Github(format!("failed to read response: {e}")))
    }

    async fn get_json(&self, path: &str, what: &str) -> Result<serde_json::Value> {
        let text = self
            .get_text(path, "application/vnd.github+json", what)
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| TribunalError::Github(format!("failed to parse response: {e}")))
    }
}

fn status_error(status: reqwest::StatusCode, body: &str, what: &str) -> TribunalError {
    match status.as_u16() {
        404 => TribunalError::NotFound(what.to_string()),
        401 | 403 => TribunalError::Forbidden(format!("{what} is private or access was denied")),
        // GitHub answers 409 for content requests against empty repositories.
        409 => TribunalError::Validation(format!("{what} is an empty repository")),
        _ => TribunalError::Github(format!("GitHub API error {status}: {body}")),
    }
}

fn str_field<'a>(value: &'a serde_json::Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| TribunalError::Github(format!("unexpected response structure: missing {field}")))
}

#[async_trait]
impl ContentSource for GitHubSource {
    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo> {
        let what = format!("pull request {owner}/{repo}#{number}");
        let pr = self
            .get_json(&format!("/repos/{owner}/{repo}/pulls/{number}"), &what)
            .await?;
        Ok(PullRequestInfo {
            title: str_field(&pr, "title")?.to_string(),
            author: pr
                .get("user")
                .and_then(|u| u.get("login"))
                .and_then(|l| l.as_str())
                .unwrap_or("unknown")
                .to_string(),
            additions: pr.get("additions").and_then(|v| v.as_u64()).unwrap_or(0),
            deletions: pr.get("deletions").and_then(|v| v.as_u64()).unwrap_or(0),
            changed_files: pr.get("changed_files").and_then(|v| v.as_u64()).unwrap_or(0),
            commits: pr.get("commits").and_then(|v| v.as_u64()).unwrap_or(0),
            body: pr
                .get("body")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            is_draft: pr.get("draft").and_then(|v| v.as_bool()).unwrap_or(false),
        })
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<RepositoryInfo> {
        let what = format!("repository {owner}/{repo}");
        let meta = self.get_json(&format!("/repos/{owner}/{repo}"), &what).await?;

        // README absence is normal, not an error.
        let readme = match self
            .get_text(
                &format!("/repos/{owner}/{repo}/readme"),
                "application/vnd.github.raw+json",
                &what,
            )
            .await
        {
            Ok(text) => text,
            Err(TribunalError::NotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };

        let has_tests = match self
            .get_json(&format!("/repos/{owner}/{repo}/contents/"), &what)
            .await
        {
            Ok(serde_json::Value::Array(entries)) => entries.iter().any(|entry| {
                entry
                    .get("name")
                    .and_then(|n| n.as_str())
                    .is_some_and(looks_like_test_dir)
            }),
            Ok(_) => false,
            Err(TribunalError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };

        Ok(RepositoryInfo {
            name: str_field(&meta, "name")?.to_string(),
            description: meta
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            language: meta
                .get("language")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            stars: meta
                .get("stargazers_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            has_tests,
            readme,
        })
    }

    async fn diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        max_bytes: usize,
    ) -> Result<String> {
        let what = format!("pull request {owner}/{repo}#{number}");
        let raw = self
            .get_text(
                &format!("/repos/{owner}/{repo}/pulls/{number}"),
                "application/vnd.github.v3.diff",
                &what,
            )
            .await?;
        Ok(prioritize_diff(&raw, max_bytes))
    }

    async fn pr_head_sha(&self, owner: &str, repo: &str, number: u64) -> Result<String> {
        let what = format!("pull request {owner}/{repo}#{number}");
        let pr = self
            .get_json(&format!("/repos/{owner}/{repo}/pulls/{number}"), &what)
            .await?;
        let sha = pr
            .get("head")
            .and_then(|h| h.get("sha"))
            .and_then(|s| s.as_str())
            .ok_or_else(|| {
                TribunalError::Github("unexpected response structure: missing head.sha".into())
            })?;
        Ok(sha.to_string())
    }

    async fn default_branch_sha(&self, owner: &str, repo: &str) -> Result<String> {
        let what = format!("repository {owner}/{repo}");
        let meta = self.get_json(&format!("/repos/{owner}/{repo}"), &what).await?;
        let default_branch = str_field(&meta, "default_branch")?.to_string();
        self.branch_sha(owner, repo, &default_branch).await
    }

    async fn commit_sha(&self, owner: &str, repo: &str, sha: &str) -> Result<String> {
        let what = format!("commit {sha} in {owner}/{repo}");
        let commit = self
            .get_json(&format!("/repos/{owner}/{repo}/commits/{sha}"), &what)
            .await?;
        Ok(str_field(&commit, "sha")?.to_string())
    }

    async fn branch_sha(&self, owner: &str, repo: &str, branch: &str) -> Result<String> {
        let what = format!("branch {branch} in {owner}/{repo}");
        let commit = self
            .get_json(&format!("/repos/{owner}/{repo}/commits/{branch}"), &what)
            .await?;
        Ok(str_field(&commit, "sha")?.to_string())
    }
}

fn looks_like_test_dir(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "test" | "tests" | "__tests__" | "spec" | "specs" | "e2e" | "cypress"
    )
}

/// Reorder a unified diff so review-worthy files come first, then cut
/// at the byte budget.
///
/// Lockfiles, minified bundles, sourcemaps, vendored and generated
/// files sort last; relative order within each group is preserved. Once
/// the budget is exhausted the output ends with [`TRUNCATION_MARKER`].
pub fn prioritize_diff(diff: &str, max_bytes: usize) -> String {
    let mut sections: Vec<&str> = Vec::new();
    let mut start = 0;
    for (idx, _) in diff.match_indices("\ndiff --git ") {
        if idx + 1 > start {
            sections.push(&diff[start..idx + 1]);
        }
        start = idx + 1;
    }
    if start < diff.len() {
        sections.push(&diff[start..]);
    }

    // Stable partition: noise keeps its order, just moves to the back.
    sections.sort_by_key(|section| is_noise_file(section_path(section)));

    let mut out = String::new();
    for section in sections {
        if out.len() + section.len() > max_bytes {
            out.push_str(TRUNCATION_MARKER);
            break;
        }
        out.push_str(section);
    }
    out
}

fn section_path(section: &str) -> &str {
    // "diff --git a/path b/path" — the b/ side names the file post-change.
    section
        .lines()
        .next()
        .and_then(|header| header.split(" b/").nth(1))
        .unwrap_or("")
}

fn is_noise_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    let noise_name = matches!(
        name,
        "package-lock.json"
            | "yarn.lock"
            | "pnpm-lock.yaml"
            | "cargo.lock"
            | "composer.lock"
            | "gemfile.lock"
            | "go.sum"
    );
    noise_name
        || lower.ends_with(".min.js")
        || lower.ends_with(".min.css")
        || lower.ends_with(".map")
        || lower.ends_with(".snap")
        || lower.contains("node_modules/")
        || lower.contains("vendor/")
        || lower.contains("/dist/")
        || lower.contains("/generated/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(path: &str, body: &str) -> String {
        format!("diff --git a/{path} b/{path}\n{body}\n")
    }

    #[test]
    fn noise_detection() {
        assert!(is_noise_file("package-lock.json"));
        assert!(is_noise_file("sub/dir/yarn.lock"));
        assert!(is_noise_file("assets/app.min.js"));
        assert!(is_noise_file("build/out.js.map"));
        assert!(is_noise_file("vendor/lib.go"));
        assert!(!is_noise_file("src/main.rs"));
        assert!(!is_noise_file("README.md"));
        assert!(!is_noise_file("locktite.rs"));
    }

    #[test]
    fn lockfiles_sort_after_code() {
        let diff = format!(
            "{}{}{}",
            section("package-lock.json", "+lock"),
            section("src/a.rs", "+a"),
            section("src/b.rs", "+b"),
        );
        let out = prioritize_diff(&diff, 10_000);
        let lock_pos = out.find("package-lock.json").unwrap();
        let a_pos = out.find("src/a.rs").unwrap();
        let b_pos = out.find("src/b.rs").unwrap();
        assert!(a_pos < b_pos, "code order preserved");
        assert!(b_pos < lock_pos, "lockfile moved last");
    }

    #[test]
    fn truncation_appends_marker() {
        let diff = format!(
            "{}{}",
            section("src/a.rs", &"+x\n".repeat(50)),
            section("src/b.rs", &"+y\n".repeat(50)),
        );
        let out = prioritize_diff(&diff, 200);
        assert!(out.contains("src/a.rs"));
        assert!(!out.contains("src/b.rs"));
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn small_diff_is_untouched_and_unmarked() {
        let diff = section("src/a.rs", "+line");
        let out = prioritize_diff(&diff, 10_000);
        assert_eq!(out, diff);
        assert!(!out.contains("[diff truncated"));
    }

    #[test]
    fn section_path_reads_post_change_side() {
        let s = section("src/renamed.rs", "+z");
        assert_eq!(section_path(&s), "src/renamed.rs");
    }

    #[test]
    fn pull_request_info_serializes_camel_case() {
        let info = PullRequestInfo {
            title: "t".into(),
            author: "a".into(),
            additions: 1,
            deletions: 2,
            changed_files: 3,
            commits: 4,
            body: "b".into(),
            is_draft: true,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("changedFiles").is_some());
        assert!(json.get("isDraft").is_some());
    }
}
