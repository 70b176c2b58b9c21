use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TribunalError;

/// Top-level configuration loaded from `.tribunal.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use tribunal_core::TribunalConfig;
///
/// let config = TribunalConfig::default();
/// assert_eq!(config.rate_limit.max_requests, 10);
/// assert_eq!(config.cache.ttl_secs, 86_400);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TribunalConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Review cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Per-client rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Review content limits.
    #[serde(default)]
    pub review: ReviewLimits,
}

impl TribunalConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Io`] if the file cannot be read, or
    /// [`TribunalError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, TribunalError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TribunalError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use tribunal_core::TribunalConfig;
    ///
    /// let toml = r#"
    /// [rate_limit]
    /// max_requests = 20
    /// "#;
    /// let config = TribunalConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.rate_limit.max_requests, 20);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, TribunalError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Fill unset credentials from the environment.
    ///
    /// `OPENAI_API_KEY` backs `llm.api_key`; `GITHUB_TOKEN` backs
    /// `github.token`. Values already present in the config file win.
    pub fn apply_env(&mut self) {
        if self.llm.api_key.is_none() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.llm.api_key = Some(key);
            }
        }
        if self.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                self.github.token = Some(token);
            }
        }
    }
}

/// LLM provider configuration.
///
/// # Examples
///
/// ```
/// use tribunal_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (e.g. `"openai"`, `"ollama"`, `"litellm"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Default model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token. Unauthenticated requests work for public
    /// repositories but hit GitHub's anonymous rate limits quickly.
    pub token: Option<String>,
}

/// HTTP server configuration.
///
/// # Examples
///
/// ```
/// use tribunal_core::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.port, 8787);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Listen port (default: 8787).
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Review cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds (default: 24 hours).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    86_400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds (default: 60).
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Maximum requests per window per client (default: 10).
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

/// Limits on content sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLimits {
    /// Byte budget for PR diffs sent to the model (default: 60 000).
    #[serde(default = "default_max_diff_bytes")]
    pub max_diff_bytes: usize,
}

fn default_max_diff_bytes() -> usize {
    60_000
}

impl Default for ReviewLimits {
    fn default() -> Self {
        Self {
            max_diff_bytes: default_max_diff_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = TribunalConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(config.llm.api_key.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.review.max_diff_bytes, 60_000);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[server]
port = 9000
"#;
        let config = TribunalConfig::from_toml(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "127.0.0.1");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
provider = "litellm"
model = "gpt-4o-mini"
base_url = "http://localhost:4000"

[github]
token = "ghp_test"

[server]
bind = "0.0.0.0"
port = 8080

[cache]
ttl_secs = 3600

[rate_limit]
window_secs = 30
max_requests = 5

[review]
max_diff_bytes = 10000
"#;
        let config = TribunalConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.provider, "litellm");
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.review.max_diff_bytes, 10000);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = TribunalConfig::from_toml("").unwrap();
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = TribunalConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }
}
