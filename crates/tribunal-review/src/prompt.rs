//! Prompt construction for the multi-judge review.
//!
//! One LLM call covers the whole panel: the system prompt enumerates
//! the selected personas, the user prompt carries the content, the
//! metadata block, and the exact output schema with cardinality
//! constraints.

use std::fmt::Write;

use crate::github::{PullRequestInfo, RepositoryInfo};
use crate::judges::JudgeSpec;

/// Content assembled for one review.
#[derive(Debug, Clone)]
pub enum ReviewContent {
    /// A pull request: metadata plus its (prioritized, truncated) diff.
    PullRequest {
        info: PullRequestInfo,
        diff: String,
    },
    /// A repository: metadata including README content. Also used for
    /// commit and branch references, with the fingerprint pinned to the
    /// referenced ref.
    Repository { info: RepositoryInfo },
}

const SYSTEM_HEADER: &str = "\
You are Tribunal, a panel of expert code reviewers. You embody every judge \
listed below simultaneously and produce one combined assessment.

Rules:
- Score each judge independently on their own focus area, 0-100
- Only report findings you are confident about; reference concrete evidence
- Do not pad findings to hit a count; prefer fewer, sharper findings
- Each judge treats their trigger list as automatic critical findings
- Respond with a single JSON object and nothing else";

/// Build the system prompt enumerating the selected judge personas.
///
/// # Examples
///
/// ```
/// use tribunal_review::judges;
/// use tribunal_review::prompt::build_system_prompt;
///
/// let panel = judges::resolve(None, None).unwrap();
/// let prompt = build_system_prompt(&panel);
/// assert!(prompt.contains("Tribunal"));
/// assert!(prompt.contains("The Sentinel"));
/// ```
pub fn build_system_prompt(panel: &[&JudgeSpec]) -> String {
    let mut prompt = String::from(SYSTEM_HEADER);
    prompt.push_str("\n\nThe judges on this panel:\n");
    for judge in panel {
        let _ = writeln!(
            prompt,
            "- {} {} (id: {}): focuses on {}. Treats as critical: {}.",
            judge.icon,
            judge.name,
            judge.id,
            judge.focus,
            judge.triggers.join("; "),
        );
    }
    prompt
}

/// Build the user prompt embedding the judge list, the type-specific
/// metadata block, the content, and the output schema description.
pub fn build_user_prompt(content: &ReviewContent, panel: &[&JudgeSpec]) -> String {
    let mut prompt = String::new();
    let judge_ids: Vec<&str> = panel.iter().map(|j| j.id).collect();
    let _ = writeln!(
        prompt,
        "Review the following with these judges: {}.\n",
        judge_ids.join(", ")
    );

    match content {
        ReviewContent::PullRequest { info, diff } => {
            prompt.push_str("## Pull request\n");
            let _ = writeln!(prompt, "Title: {}", info.title);
            let _ = writeln!(prompt, "Author: {}", info.author);
            let _ = writeln!(
                prompt,
                "Changes: +{} / -{} across {} files, {} commits",
                info.additions, info.deletions, info.changed_files, info.commits
            );
            let _ = writeln!(prompt, "Draft: {}", if info.is_draft { "yes" } else { "no" });
            if !info.body.is_empty() {
                let _ = writeln!(prompt, "\nDescription:\n{}", info.body);
            }
            let _ = writeln!(prompt, "\n## Diff\n```diff\n{diff}\n```");
        }
        ReviewContent::Repository { info } => {
            prompt.push_str("## Repository\n");
            let _ = writeln!(prompt, "Name: {}", info.name);
            if !info.description.is_empty() {
                let _ = writeln!(prompt, "Description: {}", info.description);
            }
            let _ = writeln!(
                prompt,
                "Language: {}",
                info.language.as_deref().unwrap_or("unknown")
            );
            let _ = writeln!(prompt, "Stars: {}", info.stars);
            let _ = writeln!(prompt, "Has tests: {}", if info.has_tests { "yes" } else { "no" });
            if !info.readme.is_empty() {
                let _ = writeln!(prompt, "\n## README\n{}", info.readme);
            }
        }
    }

    prompt.push_str(OUTPUT_SCHEMA);
    prompt
}

const OUTPUT_SCHEMA: &str = r#"
## Output format

Respond with exactly this JSON shape:
{
  "overall": {
    "score": <0-100>,
    "verdict": "<one line>",
    "summary": "<2-3 sentences>"
  },
  "judges": [
    {
      "id": "<judge id from the panel>",
      "score": <0-100>,
      "verdict": "<one line>",
      "findings": [
        {
          "severity": "critical" | "warning" | "info",
          "title": "<short title>",
          "message": "<explanation>",
          "suggestion": "<optional fix>",
          "location": "<optional file:line>"
        }
      ]
    }
  ],
  "fullReport": {
    "fileBreakdown": [ { "file": "<path>", "score": <0-100>, "notes": "<one line>" } ],
    "recommendations": [ "<actionable recommendation>" ],
    "snippets": [ { "file": "<path>", "language": "<lang>", "code": "<short excerpt>", "comment": "<why it matters>" } ]
  }
}

Constraints:
- Include every judge from the panel exactly once, no others
- Each judge needs 2-5 findings
- fileBreakdown: 3-8 entries; recommendations: 3-6; snippets: 1-3
- All scores are integers from 0 to 100"#;
