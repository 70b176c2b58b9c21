//! GitHub URL classification.
//!
//! Turns a raw user-supplied string into a typed [`ParsedReference`].
//! Classification never fails: anything unparseable becomes
//! [`ParsedReference::Invalid`].

use std::fmt;

/// A classified GitHub reference.
///
/// Every non-`Invalid` variant carries a non-empty owner and repo and a
/// canonical `normalized_url` suitable for cache keying.
///
/// # Examples
///
/// ```
/// use tribunal_review::reference::{classify, ParsedReference};
///
/// let parsed = classify("https://github.com/rust-lang/rust/pull/12345");
/// match parsed {
///     ParsedReference::Pr { owner, repo, number, .. } => {
///         assert_eq!(owner, "rust-lang");
///         assert_eq!(repo, "rust");
///         assert_eq!(number, 12345);
///     }
///     _ => panic!("expected a PR reference"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReference {
    /// A pull request: `github.com/<owner>/<repo>/pull/<number>`.
    Pr {
        owner: String,
        repo: String,
        number: u64,
        normalized_url: String,
    },
    /// A repository root: `github.com/<owner>/<repo>`.
    Repo {
        owner: String,
        repo: String,
        normalized_url: String,
    },
    /// A single commit: `github.com/<owner>/<repo>/commit/<sha>`.
    Commit {
        owner: String,
        repo: String,
        sha: String,
        normalized_url: String,
    },
    /// A branch: `github.com/<owner>/<repo>/tree/<branch>`. Branch names
    /// may contain slashes.
    Branch {
        owner: String,
        repo: String,
        branch: String,
        normalized_url: String,
    },
    /// Anything that could not be classified. Carries the trimmed input.
    Invalid { input: String },
}

impl ParsedReference {
    /// Repository owner, or `""` for invalid references.
    pub fn owner(&self) -> &str {
        match self {
            ParsedReference::Pr { owner, .. }
            | ParsedReference::Repo { owner, .. }
            | ParsedReference::Commit { owner, .. }
            | ParsedReference::Branch { owner, .. } => owner,
            ParsedReference::Invalid { .. } => "",
        }
    }

    /// Repository name, or `""` for invalid references.
    pub fn repo(&self) -> &str {
        match self {
            ParsedReference::Pr { repo, .. }
            | ParsedReference::Repo { repo, .. }
            | ParsedReference::Commit { repo, .. }
            | ParsedReference::Branch { repo, .. } => repo,
            ParsedReference::Invalid { .. } => "",
        }
    }

    /// Canonical URL for cache keying; the trimmed input for invalid
    /// references.
    pub fn normalized_url(&self) -> &str {
        match self {
            ParsedReference::Pr { normalized_url, .. }
            | ParsedReference::Repo { normalized_url, .. }
            | ParsedReference::Commit { normalized_url, .. }
            | ParsedReference::Branch { normalized_url, .. } => normalized_url,
            ParsedReference::Invalid { input } => input,
        }
    }

    /// Whether this reference failed classification.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ParsedReference::Invalid { .. })
    }
}

impl fmt::Display for ParsedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedReference::Pr { .. } => write!(f, "pr"),
            ParsedReference::Repo { .. } => write!(f, "repo"),
            ParsedReference::Commit { .. } => write!(f, "commit"),
            ParsedReference::Branch { .. } => write!(f, "branch"),
            ParsedReference::Invalid { .. } => write!(f, "invalid"),
        }
    }
}

/// Classify a raw string into a [`ParsedReference`].
///
/// Accepts URLs with or without a scheme and with or without a leading
/// `www.`. Query strings and fragments are ignored. A trailing `.git`
/// on the repo name is stripped.
///
/// Known quirk kept for compatibility: `.../pull/` with no number
/// classifies as [`ParsedReference::Repo`], not `Invalid` — the empty
/// trailing segment is dropped before the PR check runs, so the path
/// falls through to the default branch of the classifier.
///
/// # Examples
///
/// ```
/// use tribunal_review::reference::{classify, ParsedReference};
///
/// assert!(matches!(
///     classify("github.com/octocat/hello-world"),
///     ParsedReference::Repo { .. }
/// ));
/// assert!(classify("https://gitlab.com/foo/bar").is_invalid());
/// assert!(classify("").is_invalid());
/// ```
pub fn classify(raw: &str) -> ParsedReference {
    let trimmed = raw.trim();
    let invalid = || ParsedReference::Invalid {
        input: trimmed.to_string(),
    };
    if trimmed.is_empty() {
        return invalid();
    }

    // Scheme is optional; anything scheme-like is stripped before host
    // inspection so the host check decides validity.
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphabetic()) => rest,
        Some(_) => return invalid(),
        None => trimmed,
    };
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);

    let (host, path) = match without_www.find(['/', '?', '#']) {
        Some(idx) if without_www.as_bytes()[idx] == b'/' => without_www.split_at(idx),
        Some(idx) => (&without_www[..idx], ""),
        None => (without_www, ""),
    };
    if !host.eq_ignore_ascii_case("github.com") {
        return invalid();
    }

    // Drop query string and fragment before segmenting the path.
    let path = path.split(['?', '#']).next().unwrap_or("");
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return invalid();
    }

    let owner = segments[0].to_string();
    let repo = segments[1].strip_suffix(".git").unwrap_or(segments[1]).to_string();
    let rest = &segments[2..];

    match rest {
        [] => ParsedReference::Repo {
            normalized_url: format!("https://github.com/{owner}/{repo}"),
            owner,
            repo,
        },
        ["pull", number, ..] => match number.parse::<u64>() {
            Ok(number) => ParsedReference::Pr {
                normalized_url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
                owner,
                repo,
                number,
            },
            Err(_) => invalid(),
        },
        ["commit", sha, ..] => ParsedReference::Commit {
            normalized_url: format!("https://github.com/{owner}/{repo}/commit/{sha}"),
            sha: (*sha).to_string(),
            owner,
            repo,
        },
        ["tree", branch_parts @ ..] if !branch_parts.is_empty() => {
            let branch = branch_parts.join("/");
            ParsedReference::Branch {
                normalized_url: format!("https://github.com/{owner}/{repo}/tree/{branch}"),
                owner,
                repo,
                branch,
            }
        }
        _ => ParsedReference::Repo {
            normalized_url: format!("https://github.com/{owner}/{repo}"),
            owner,
            repo,
        },
    }
}
