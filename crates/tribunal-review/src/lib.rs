//! Review orchestration for the Tribunal platform.
//!
//! Provides the full review core: GitHub URL classification, the review
//! cache, per-client rate limiting, the GitHub content source, the LLM
//! client, the judge catalog, prompt construction, structured-response
//! extraction, and the orchestrating [`service::ReviewService`].

pub mod cache;
pub mod extract;
pub mod github;
pub mod judges;
pub mod llm;
pub mod prompt;
pub mod ratelimit;
pub mod reference;
pub mod response;
pub mod service;
