/// Errors that can occur across the Tribunal platform.
///
/// Each variant maps to one distinguishable failure case at the API
/// boundary. Library crates use this type directly; the server crate
/// translates variants to HTTP status codes and stable error codes,
/// and the binary crate converts to `miette` diagnostics.
///
/// # Examples
///
/// ```
/// use tribunal_core::TribunalError;
///
/// let err = TribunalError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TribunalError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration (including missing API credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request input: bad URL, unknown judge id, unknown model.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced PR, repository, commit, or branch does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// The referenced resource is private or access was denied.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// Too many requests from one client within the rate-limit window.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the client's window resets.
        retry_after_secs: u64,
    },

    /// The LLM provider rejected the request for lack of credits.
    #[error("AI credits exhausted: {0}")]
    Quota(String),

    /// Model output could not be coerced into the review schema.
    ///
    /// Carries a truncated preview of the offending text, never the
    /// full response.
    #[error("Invalid review response format: {0}")]
    Parse(String),

    /// LLM API transport or protocol failure.
    #[error("LLM error: {0}")]
    Llm(String),

    /// GitHub API transport or protocol failure.
    #[error("GitHub error: {0}")]
    Github(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: TribunalError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = TribunalError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn parse_error_uses_stable_prefix() {
        let err = TribunalError::Parse("I cannot review this".into());
        assert!(err.to_string().starts_with("Invalid review response format"));
    }

    #[test]
    fn rate_limited_shows_retry_hint() {
        let err = TribunalError::RateLimited {
            retry_after_secs: 42,
        };
        assert!(err.to_string().contains("42s"));
    }
}
