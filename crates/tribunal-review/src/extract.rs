//! Isolating a JSON object from free-form model output.
//!
//! Models do not reliably emit bare JSON even when asked to. The rules
//! run strictest-first:
//!
//! 1. the trimmed response already is a JSON object — use it;
//! 2. a fenced code block (```` ``` ````, optionally tagged `json`)
//!    whose trimmed content is a JSON object — unwrap it;
//! 3. the greedy span from the first `{` to the *last* `}` — last
//!    resort, since it can swallow prose the model wrapped in braces;
//! 4. nothing matched — hand back the original text so the downstream
//!    parse fails with a useful diagnostic.

/// Extract the most plausible JSON object from `response`.
///
/// Always returns a slice of the input; never allocates, never fails.
///
/// # Examples
///
/// ```
/// use tribunal_review::extract::extract_json;
///
/// assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
/// assert_eq!(
///     extract_json("Here you go:\n```json\n{\"a\":1}\n```\nDone."),
///     r#"{"a":1}"#
/// );
/// assert_eq!(extract_json("Sure! {\"a\":1} Hope that helps."), r#"{"a":1}"#);
/// assert_eq!(extract_json("no json here"), "no json here");
/// ```
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    if is_object_like(trimmed) {
        return trimmed;
    }

    if let Some(fenced) = fenced_candidate(response) {
        return fenced;
    }

    if let (Some(first), Some(last)) = (response.find('{'), response.rfind('}')) {
        if first < last {
            return &response[first..=last];
        }
    }

    response
}

fn is_object_like(s: &str) -> bool {
    s.starts_with('{') && s.ends_with('}')
}

fn fenced_candidate(s: &str) -> Option<&str> {
    let start = s.find("```")?;
    let after = &s[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    let inner = after[..end].trim();
    is_object_like(inner).then_some(inner)
}
