//! Turning raw model output into a validated [`ReviewResult`].
//!
//! The decode is strict: missing required fields, out-of-range scores,
//! or a judge absent from the response all fail with
//! [`TribunalError::Parse`]. Derived fields are never trusted from the
//! model: the overall score is recomputed as the weighted mean of judge
//! scores and the grade is derived from that.

use chrono::Utc;
use serde::Deserialize;
use tribunal_core::{
    Grade, JudgeFinding, JudgeReview, OverallReview, Result, ReviewMetadata, ReviewResult,
    Severity, TribunalError,
};

use crate::extract::extract_json;
use crate::judges::JudgeSpec;

/// Longest slice of offending model output carried in a parse error.
/// Diagnostics get a taste, never the full response.
const PREVIEW_LEN: usize = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    overall: RawOverall,
    judges: Vec<RawJudge>,
    full_report: Option<RawFullReport>,
}

#[derive(Deserialize)]
struct RawOverall {
    score: f64,
    verdict: String,
    summary: String,
}

#[derive(Deserialize)]
struct RawJudge {
    id: String,
    score: f64,
    verdict: String,
    #[serde(default)]
    findings: Vec<RawFinding>,
}

#[derive(Deserialize)]
struct RawFinding {
    severity: Severity,
    title: String,
    message: String,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFullReport {
    #[serde(default)]
    file_breakdown: Vec<RawFileEntry>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    snippets: Vec<RawSnippet>,
}

#[derive(Deserialize)]
struct RawFileEntry {
    file: String,
    score: f64,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct RawSnippet {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    language: Option<String>,
    code: String,
    #[serde(default)]
    comment: String,
}

/// Parse and validate raw model output into a [`ReviewResult`].
///
/// `panel` is the caller-requested judge order; the result's `judges`
/// follow it regardless of the order the model answered in.
///
/// # Errors
///
/// Returns [`TribunalError::Parse`] when the output cannot be coerced
/// to the schema: not JSON, missing judges, or scores outside 0–100.
pub fn parse_review(
    raw: &str,
    panel: &[&JudgeSpec],
    model: &str,
    duration_ms: Option<u64>,
) -> Result<ReviewResult> {
    let extracted = extract_json(raw);
    let parsed: RawResponse =
        serde_json::from_str(extracted).map_err(|_| parse_error(raw))?;

    for raw_judge in &parsed.judges {
        if !panel.iter().any(|j| j.id == raw_judge.id) {
            tracing::warn!(judge = %raw_judge.id, "model answered for a judge not on the panel, skipping");
        }
    }

    let mut judges = Vec::with_capacity(panel.len());
    for spec in panel {
        let raw_judge = parsed
            .judges
            .iter()
            .find(|j| j.id == spec.id)
            .ok_or_else(|| parse_error(raw))?;
        judges.push(JudgeReview {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            icon: spec.icon.to_string(),
            score: validated_score(raw_judge.score).ok_or_else(|| parse_error(raw))?,
            verdict: raw_judge.verdict.clone(),
            findings: raw_judge
                .findings
                .iter()
                .map(|f| JudgeFinding {
                    severity: f.severity,
                    title: f.title.clone(),
                    message: f.message.clone(),
                    suggestion: f.suggestion.clone(),
                    location: f.location.clone(),
                })
                .collect(),
        });
    }

    let stated = validated_score(parsed.overall.score).ok_or_else(|| parse_error(raw))?;
    let computed = weighted_mean(panel, &judges);
    if computed != stated {
        tracing::warn!(
            stated,
            computed,
            "model's overall score disagrees with the weighted mean, using the computed value"
        );
    }

    Ok(ReviewResult {
        overall: OverallReview {
            score: computed,
            grade: Grade::from_score(computed),
            verdict: parsed.overall.verdict,
            summary: parsed.overall.summary,
        },
        judges,
        full_report: parsed.full_report.map(render_full_report),
        metadata: ReviewMetadata {
            reviewed_at: Utc::now(),
            judges_used: panel.iter().map(|j| j.id.to_string()).collect(),
            model_used: model.to_string(),
            review_duration_ms: duration_ms,
        },
    })
}

fn parse_error(raw: &str) -> TribunalError {
    TribunalError::Parse(preview(raw))
}

fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.len() <= PREVIEW_LEN {
        return trimmed.to_string();
    }
    let cut = (0..=PREVIEW_LEN)
        .rev()
        .find(|&i| trimmed.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}…", &trimmed[..cut])
}

fn validated_score(score: f64) -> Option<u8> {
    if (0.0..=100.0).contains(&score) {
        Some(score.round() as u8)
    } else {
        None
    }
}

fn weighted_mean(panel: &[&JudgeSpec], judges: &[JudgeReview]) -> u8 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (spec, judge) in panel.iter().zip(judges) {
        weighted_sum += f64::from(judge.score) * spec.weight;
        weight_total += spec.weight;
    }
    if weight_total == 0.0 {
        return 0;
    }
    (weighted_sum / weight_total).round().clamp(0.0, 100.0) as u8
}

fn render_full_report(report: RawFullReport) -> String {
    let mut out = String::new();

    if !report.file_breakdown.is_empty() {
        out.push_str("## File breakdown\n\n");
        for entry in &report.file_breakdown {
            let score = validated_score(entry.score).unwrap_or(0);
            out.push_str(&format!("- `{}` — {}/100", entry.file, score));
            if !entry.notes.is_empty() {
                out.push_str(&format!(": {}", entry.notes));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        out.push_str("## Recommendations\n\n");
        for rec in &report.recommendations {
            out.push_str(&format!("- {rec}\n"));
        }
        out.push('\n');
    }

    if !report.snippets.is_empty() {
        out.push_str("## Snippets\n\n");
        for snippet in &report.snippets {
            if let Some(file) = &snippet.file {
                out.push_str(&format!("**`{file}`**\n\n"));
            }
            out.push_str(&format!(
                "```{}\n{}\n```\n",
                snippet.language.as_deref().unwrap_or(""),
                snippet.code
            ));
            if !snippet.comment.is_empty() {
                out.push_str(&format!("{}\n", snippet.comment));
            }
            out.push('\n');
        }
    }

    out.trim_end().to_string()
}
