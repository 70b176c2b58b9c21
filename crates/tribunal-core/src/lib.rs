//! Core types, configuration, and error handling for the Tribunal platform.
//!
//! This crate provides the shared foundation used by all other Tribunal crates:
//! - [`TribunalError`] — unified error taxonomy using `thiserror`
//! - [`TribunalConfig`] — configuration loaded from `.tribunal.toml`
//! - Shared types: [`ReviewResult`], [`JudgeReview`], [`JudgeFinding`],
//!   [`Severity`], [`Grade`]

mod config;
mod error;
mod types;

pub use config::{
    CacheConfig, GithubConfig, LlmConfig, RateLimitConfig, ReviewLimits, ServerConfig,
    TribunalConfig,
};
pub use error::TribunalError;
pub use types::{
    Grade, JudgeFinding, JudgeReview, OverallReview, ReviewMetadata, ReviewResult, Severity,
};

/// A convenience `Result` type for Tribunal operations.
pub type Result<T> = std::result::Result<T, TribunalError>;
