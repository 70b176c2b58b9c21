use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single judge finding.
///
/// # Examples
///
/// ```
/// use tribunal_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"critical\"").unwrap();
/// assert_eq!(s, Severity::Critical);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A defect or vulnerability that must be addressed.
    Critical,
    /// A potential issue worth investigating.
    Warning,
    /// Informational observation.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Letter grade derived from an overall score.
///
/// A pure step function with inclusive lower bounds: 95 is the smallest
/// score earning an `A+`, 60 the smallest earning a `D`.
///
/// # Examples
///
/// ```
/// use tribunal_core::Grade;
///
/// assert_eq!(Grade::from_score(95), Grade::APlus);
/// assert_eq!(Grade::from_score(94), Grade::A);
/// assert_eq!(Grade::from_score(59), Grade::F);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    /// Derive the grade for a 0–100 score.
    pub fn from_score(score: u8) -> Self {
        match score {
            95..=u8::MAX => Grade::APlus,
            90..=94 => Grade::A,
            85..=89 => Grade::BPlus,
            80..=84 => Grade::B,
            75..=79 => Grade::CPlus,
            70..=74 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{s}")
    }
}

/// A single finding reported by one judge.
///
/// # Examples
///
/// ```
/// use tribunal_core::{JudgeFinding, Severity};
///
/// let finding = JudgeFinding {
///     severity: Severity::Critical,
///     title: "Unvalidated input".into(),
///     message: "User input reaches the query builder unchecked".into(),
///     suggestion: Some("Parameterize the query".into()),
///     location: Some("src/db.rs:42".into()),
/// };
/// assert_eq!(finding.severity, Severity::Critical);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeFinding {
    /// Severity of the finding.
    pub severity: Severity,
    /// Short title for the finding.
    pub title: String,
    /// Explanation of the issue.
    pub message: String,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Optional file/line location reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One judge's complete assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeReview {
    /// Stable judge identifier from the catalog.
    pub id: String,
    /// Display name of the judge persona.
    pub name: String,
    /// Emoji icon for the persona.
    pub icon: String,
    /// This judge's score (0–100).
    pub score: u8,
    /// One-line verdict from this judge.
    pub verdict: String,
    /// Findings, most severe first.
    pub findings: Vec<JudgeFinding>,
}

/// Aggregated verdict across all judges.
///
/// Invariant: `score` is the weighted mean of per-judge scores and
/// `grade` is [`Grade::from_score`] of it. Both are recomputed from the
/// judges rather than trusted from model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallReview {
    /// Weighted mean of judge scores (0–100).
    pub score: u8,
    /// Letter grade for the score.
    pub grade: Grade,
    /// One-line verdict for the whole review.
    pub verdict: String,
    /// Short prose summary of the review.
    pub summary: String,
}

/// Metadata about how a review was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMetadata {
    /// When the review completed.
    pub reviewed_at: DateTime<Utc>,
    /// Judge ids that participated, in caller-requested order.
    pub judges_used: Vec<String>,
    /// Model identifier used for the review.
    pub model_used: String,
    /// Wall-clock duration of review generation, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_duration_ms: Option<u64>,
}

/// Result of a completed multi-judge review.
///
/// # Examples
///
/// ```
/// use tribunal_core::{Grade, OverallReview, ReviewMetadata, ReviewResult};
/// use chrono::Utc;
///
/// let result = ReviewResult {
///     overall: OverallReview {
///         score: 88,
///         grade: Grade::from_score(88),
///         verdict: "Solid".into(),
///         summary: "Well structured change".into(),
///     },
///     judges: vec![],
///     full_report: None,
///     metadata: ReviewMetadata {
///         reviewed_at: Utc::now(),
///         judges_used: vec![],
///         model_used: "gpt-4o".into(),
///         review_duration_ms: None,
///     },
/// };
/// assert_eq!(result.overall.grade, Grade::BPlus);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Aggregated verdict.
    pub overall: OverallReview,
    /// Per-judge assessments, in caller-requested judge order.
    pub judges: Vec<JudgeReview>,
    /// Rendered markdown deep-dive (file breakdown, recommendations, snippets).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_report: Option<String>,
    /// Provenance metadata.
    pub metadata: ReviewMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries_are_exact() {
        assert_eq!(Grade::from_score(100), Grade::APlus);
        assert_eq!(Grade::from_score(95), Grade::APlus);
        assert_eq!(Grade::from_score(94), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::BPlus);
        assert_eq!(Grade::from_score(85), Grade::BPlus);
        assert_eq!(Grade::from_score(84), Grade::B);
        assert_eq!(Grade::from_score(80), Grade::B);
        assert_eq!(Grade::from_score(79), Grade::CPlus);
        assert_eq!(Grade::from_score(75), Grade::CPlus);
        assert_eq!(Grade::from_score(74), Grade::C);
        assert_eq!(Grade::from_score(70), Grade::C);
        assert_eq!(Grade::from_score(69), Grade::D);
        assert_eq!(Grade::from_score(60), Grade::D);
        assert_eq!(Grade::from_score(59), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn grade_serializes_with_plus_signs() {
        assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
        assert_eq!(serde_json::to_string(&Grade::BPlus).unwrap(), "\"B+\"");
        assert_eq!(serde_json::to_string(&Grade::F).unwrap(), "\"F\"");
    }

    #[test]
    fn severity_roundtrips_through_json() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, Severity::Warning);
    }

    #[test]
    fn severity_from_str() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn finding_serializes_camel_case_and_skips_none() {
        let finding = JudgeFinding {
            severity: Severity::Info,
            title: "t".into(),
            message: "m".into(),
            suggestion: None,
            location: None,
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert!(json.get("severity").is_some());
        assert!(json.get("suggestion").is_none());
        assert!(json.get("location").is_none());
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = ReviewResult {
            overall: OverallReview {
                score: 70,
                grade: Grade::from_score(70),
                verdict: "ok".into(),
                summary: "fine".into(),
            },
            judges: vec![],
            full_report: None,
            metadata: ReviewMetadata {
                reviewed_at: Utc::now(),
                judges_used: vec!["architecture".into()],
                model_used: "gpt-4o".into(),
                review_duration_ms: Some(1200),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["metadata"].get("reviewedAt").is_some());
        assert!(json["metadata"].get("judgesUsed").is_some());
        assert!(json["metadata"].get("reviewDurationMs").is_some());
        assert!(json["metadata"].get("reviewed_at").is_none());
        assert_eq!(json["overall"]["grade"], "C");
    }
}
