//! The review service: classify, fingerprint, cache, fetch, judge.
//!
//! Per-request flow: classify the URL, fetch the upstream fingerprint,
//! consult the cache, and on a miss fetch content, run the judge panel,
//! and store the result. The fingerprint fetch always precedes the
//! cache lookup so a cached review computed against an older upstream
//! state is never served. No retries at this layer; errors propagate
//! typed. Concurrent identical requests are not deduplicated.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tribunal_core::{Result, ReviewResult, TribunalConfig, TribunalError};

use crate::cache::ReviewCache;
use crate::github::ContentSource;
use crate::judges::{self, Preset};
use crate::llm::Completion;
use crate::prompt::{self, ReviewContent};
use crate::reference::{classify, ParsedReference};
use crate::response::parse_review;

/// One review request.
#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// The GitHub URL to review.
    pub url: String,
    /// Explicit judge ids; overrides `preset` when present.
    pub judges: Option<Vec<String>>,
    /// Named judge bundle; `standard` when absent.
    pub preset: Option<Preset>,
    /// Model override; must be in the catalog.
    pub model: Option<String>,
}

/// Cache provenance returned alongside a review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Whether the review was served from cache.
    pub hit: bool,
    /// 7-character prefix of the fingerprint the review was computed
    /// against.
    pub commit_hash: String,
    /// When the entry was cached (hits only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    /// When the entry expires (hits only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Orchestrates a full review from URL to [`ReviewResult`].
pub struct ReviewService {
    source: Arc<dyn ContentSource>,
    llm: Arc<dyn Completion>,
    cache: ReviewCache,
    default_model: String,
    max_diff_bytes: usize,
}

impl ReviewService {
    /// Assemble the service from its collaborators and configuration.
    pub fn new(
        source: Arc<dyn ContentSource>,
        llm: Arc<dyn Completion>,
        config: &TribunalConfig,
    ) -> Self {
        Self {
            source,
            llm,
            cache: ReviewCache::new(&config.cache),
            default_model: config.llm.model.clone(),
            max_diff_bytes: config.review.max_diff_bytes,
        }
    }

    /// The model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Run one review request end to end.
    ///
    /// # Errors
    ///
    /// [`TribunalError::Validation`] for an invalid URL, unknown judge,
    /// or unknown model; otherwise whatever the content source or LLM
    /// boundary reports, propagated unchanged.
    pub async fn review(&self, opts: &ReviewOptions) -> Result<(ReviewResult, CacheStatus)> {
        let reference = classify(&opts.url);
        if reference.is_invalid() {
            return Err(TribunalError::Validation(format!(
                "not a valid GitHub URL: {}",
                opts.url
            )));
        }

        let panel = judges::resolve(opts.preset, opts.judges.as_deref())?;
        let model = match &opts.model {
            Some(model) => {
                judges::validate_model(model)?;
                model.clone()
            }
            None => self.default_model.clone(),
        };

        // Fingerprint first: the cache must never answer for an upstream
        // state newer than what it holds.
        let fingerprint = self.fingerprint(&reference).await?;
        let url = reference.normalized_url();

        if let Some(entry) = self.cache.get(url, &fingerprint) {
            tracing::info!(url, kind = %reference, "serving review from cache");
            return Ok((
                entry.review,
                CacheStatus {
                    hit: true,
                    commit_hash: short_hash(&fingerprint),
                    cached_at: Some(entry.cached_at),
                    expires_at: Some(entry.expires_at),
                },
            ));
        }

        tracing::info!(url, kind = %reference, model, judges = panel.len(), "generating review");
        let content = self.fetch_content(&reference).await?;
        let system = prompt::build_system_prompt(&panel);
        let user = prompt::build_user_prompt(&content, &panel);

        let started = Instant::now();
        let raw = self.llm.complete(&model, &system, &user).await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let review = parse_review(&raw, &panel, &model, Some(duration_ms))?;
        self.cache.set(url, &fingerprint, review.clone());

        Ok((
            review,
            CacheStatus {
                hit: false,
                commit_hash: short_hash(&fingerprint),
                cached_at: None,
                expires_at: None,
            },
        ))
    }

    async fn fingerprint(&self, reference: &ParsedReference) -> Result<String> {
        match reference {
            ParsedReference::Pr {
                owner, repo, number, ..
            } => self.source.pr_head_sha(owner, repo, *number).await,
            ParsedReference::Repo { owner, repo, .. } => {
                self.source.default_branch_sha(owner, repo).await
            }
            ParsedReference::Commit {
                owner, repo, sha, ..
            } => self.source.commit_sha(owner, repo, sha).await,
            ParsedReference::Branch {
                owner, repo, branch, ..
            } => self.source.branch_sha(owner, repo, branch).await,
            ParsedReference::Invalid { input } => Err(TribunalError::Validation(format!(
                "not a valid GitHub URL: {input}"
            ))),
        }
    }

    async fn fetch_content(&self, reference: &ParsedReference) -> Result<ReviewContent> {
        match reference {
            ParsedReference::Pr {
                owner, repo, number, ..
            } => {
                let info = self.source.pull_request(owner, repo, *number).await?;
                let diff = self
                    .source
                    .diff(owner, repo, *number, self.max_diff_bytes)
                    .await?;
                Ok(ReviewContent::PullRequest { info, diff })
            }
            // Commit and branch references review the repository content
            // with the fingerprint pinned to the referenced ref.
            ParsedReference::Repo { owner, repo, .. }
            | ParsedReference::Commit { owner, repo, .. }
            | ParsedReference::Branch { owner, repo, .. } => {
                let info = self.source.repository(owner, repo).await?;
                Ok(ReviewContent::Repository { info })
            }
            ParsedReference::Invalid { input } => Err(TribunalError::Validation(format!(
                "not a valid GitHub URL: {input}"
            ))),
        }
    }
}

fn short_hash(fingerprint: &str) -> String {
    fingerprint.chars().take(7).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::github::{PullRequestInfo, RepositoryInfo};

    struct MockSource {
        fingerprint: Mutex<Result<String>>,
        fingerprint_calls: AtomicUsize,
        pr_fetches: AtomicUsize,
        repo_fetches: AtomicUsize,
    }

    impl MockSource {
        fn with_fingerprint(sha: &str) -> Self {
            Self {
                fingerprint: Mutex::new(Ok(sha.to_string())),
                fingerprint_calls: AtomicUsize::new(0),
                pr_fetches: AtomicUsize::new(0),
                repo_fetches: AtomicUsize::new(0),
            }
        }

        fn set_fingerprint(&self, result: Result<String>) {
            *self.fingerprint.lock().unwrap() = result;
        }

        fn current_fingerprint(&self) -> Result<String> {
            self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
            match &*self.fingerprint.lock().unwrap() {
                Ok(sha) => Ok(sha.clone()),
                Err(TribunalError::NotFound(what)) => Err(TribunalError::NotFound(what.clone())),
                Err(_) => Err(TribunalError::Github("mock failure".into())),
            }
        }
    }

    #[async_trait]
    impl ContentSource for MockSource {
        async fn pull_request(&self, _: &str, _: &str, _: u64) -> Result<PullRequestInfo> {
            self.pr_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(PullRequestInfo {
                title: "Add feature".into(),
                author: "octocat".into(),
                additions: 10,
                deletions: 2,
                changed_files: 1,
                commits: 1,
                body: String::new(),
                is_draft: false,
            })
        }

        async fn repository(&self, _: &str, _: &str) -> Result<RepositoryInfo> {
            self.repo_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(RepositoryInfo {
                name: "demo".into(),
                description: String::new(),
                language: Some("Rust".into()),
                stars: 1,
                has_tests: true,
                readme: "# Demo".into(),
            })
        }

        async fn diff(&self, _: &str, _: &str, _: u64, _: usize) -> Result<String> {
            Ok("diff --git a/x b/x\n+1\n".into())
        }

        async fn pr_head_sha(&self, _: &str, _: &str, _: u64) -> Result<String> {
            self.current_fingerprint()
        }

        async fn default_branch_sha(&self, _: &str, _: &str) -> Result<String> {
            self.current_fingerprint()
        }

        async fn commit_sha(&self, _: &str, _: &str, sha: &str) -> Result<String> {
            self.fingerprint_calls.fetch_add(1, Ordering::SeqCst);
            Ok(sha.to_string())
        }

        async fn branch_sha(&self, _: &str, _: &str, _: &str) -> Result<String> {
            self.current_fingerprint()
        }
    }

    struct MockLlm {
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Completion for MockLlm {
        async fn complete(&self, _: &str, _: &str, _: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{
  "overall": {"score": 80, "verdict": "ok", "summary": "fine"},
  "judges": [
    {"id": "correctness", "score": 90, "verdict": "solid", "findings": []},
    {"id": "security", "score": 80, "verdict": "tight", "findings": []},
    {"id": "readability", "score": 70, "verdict": "clear", "findings": []}
  ]
}"#
            .into())
        }
    }

    fn service(source: Arc<MockSource>, llm: Arc<MockLlm>) -> ReviewService {
        ReviewService::new(source, llm, &TribunalConfig::default())
    }

    fn quick_opts(url: &str) -> ReviewOptions {
        ReviewOptions {
            url: url.into(),
            preset: Some(Preset::Quick),
            ..ReviewOptions::default()
        }
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_before_any_fetch() {
        let source = Arc::new(MockSource::with_fingerprint("abc"));
        let svc = service(source.clone(), Arc::new(MockLlm::new()));
        let err = svc.review(&quick_opts("https://gitlab.com/a/b")).await.unwrap_err();
        assert!(matches!(err, TribunalError::Validation(_)));
        assert_eq!(source.fingerprint_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_then_hit_reuses_the_review() {
        let source = Arc::new(MockSource::with_fingerprint("abcdef1234567890"));
        let llm = Arc::new(MockLlm::new());
        let svc = service(source.clone(), llm.clone());
        let opts = quick_opts("https://github.com/a/b/pull/1");

        let (first, status) = svc.review(&opts).await.unwrap();
        assert!(!status.hit);
        assert_eq!(status.commit_hash, "abcdef1");
        assert!(status.cached_at.is_none());

        let (second, status) = svc.review(&opts).await.unwrap();
        assert!(status.hit);
        assert!(status.cached_at.is_some());
        assert!(status.expires_at.is_some());
        assert_eq!(first.overall.score, second.overall.score);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_change_invalidates_the_cache() {
        let source = Arc::new(MockSource::with_fingerprint("sha-one"));
        let llm = Arc::new(MockLlm::new());
        let svc = service(source.clone(), llm.clone());
        let opts = quick_opts("https://github.com/a/b/pull/1");

        svc.review(&opts).await.unwrap();
        source.set_fingerprint(Ok("sha-two".into()));
        let (_, status) = svc.review(&opts).await.unwrap();
        assert!(!status.hit);
        assert_eq!(status.commit_hash, "sha-two");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fingerprint_failure_blocks_cached_answers() {
        let source = Arc::new(MockSource::with_fingerprint("sha-one"));
        let llm = Arc::new(MockLlm::new());
        let svc = service(source.clone(), llm.clone());
        let opts = quick_opts("https://github.com/a/b/pull/1");

        svc.review(&opts).await.unwrap();
        source.set_fingerprint(Err(TribunalError::NotFound("pr".into())));
        let err = svc.review(&opts).await.unwrap_err();
        assert!(matches!(err, TribunalError::NotFound(_)));
        // The LLM was not re-invoked and no stale answer was served.
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pr_reference_fetches_pr_content() {
        let source = Arc::new(MockSource::with_fingerprint("sha"));
        let svc = service(source.clone(), Arc::new(MockLlm::new()));
        svc.review(&quick_opts("https://github.com/a/b/pull/1")).await.unwrap();
        assert_eq!(source.pr_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(source.repo_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repo_and_branch_references_fetch_repo_content() {
        let source = Arc::new(MockSource::with_fingerprint("sha"));
        let svc = service(source.clone(), Arc::new(MockLlm::new()));
        svc.review(&quick_opts("https://github.com/a/b")).await.unwrap();
        svc.review(&quick_opts("https://github.com/a/b/tree/main")).await.unwrap();
        assert_eq!(source.repo_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let source = Arc::new(MockSource::with_fingerprint("sha"));
        let svc = service(source, Arc::new(MockLlm::new()));
        let opts = ReviewOptions {
            url: "https://github.com/a/b".into(),
            preset: Some(Preset::Quick),
            model: Some("gpt-imaginary".into()),
            ..ReviewOptions::default()
        };
        let err = svc.review(&opts).await.unwrap_err();
        assert!(matches!(err, TribunalError::Validation(_)));
    }

    #[tokio::test]
    async fn separate_urls_cache_independently() {
        let source = Arc::new(MockSource::with_fingerprint("sha"));
        let llm = Arc::new(MockLlm::new());
        let svc = service(source, llm.clone());
        svc.review(&quick_opts("https://github.com/a/b")).await.unwrap();
        svc.review(&quick_opts("https://github.com/a/c")).await.unwrap();
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }
}
