//! Request handlers, client identification, and error mapping.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tribunal_core::{ReviewResult, TribunalError};
use tribunal_review::judges::{self, Preset};
use tribunal_review::ratelimit::RateDecision;
use tribunal_review::service::{CacheStatus, ReviewOptions};

use crate::AppContext;

/// Request body for `POST /review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub url: String,
    #[serde(default)]
    pub judges: Option<Vec<String>>,
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Serialize)]
struct ReviewResponse {
    #[serde(flatten)]
    result: ReviewResult,
    #[serde(rename = "_cache")]
    cache: CacheStatus,
}

/// `POST /review` — run or serve a review. Consumes rate-limit quota.
///
/// The body is taken as a `Result` so a malformed payload still goes
/// through [`error_response`] and gets rate headers, instead of axum's
/// plain-text rejection.
pub async fn post_review(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Response {
    let identifier = client_identifier(&headers);
    let decision = ctx.limiter.check(&identifier);
    if !decision.allowed {
        let retry_after_secs = decision.retry_after_secs();
        let mut response = error_response(&TribunalError::RateLimited { retry_after_secs });
        if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
            response.headers_mut().insert("Retry-After", value);
        }
        return with_rate_headers(response, &decision);
    }

    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = TribunalError::Validation(format!("invalid request body: {rejection}"));
            return with_rate_headers(error_response(&err), &decision);
        }
    };

    let opts = ReviewOptions {
        url: body.url,
        judges: body.judges,
        preset: body.preset,
        model: body.model,
    };
    let response = match ctx.service.review(&opts).await {
        Ok((result, cache)) => Json(ReviewResponse { result, cache }).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "review request failed");
            error_response(&err)
        }
    };
    with_rate_headers(response, &decision)
}

/// `GET /review` — the static catalog. Does not consume quota.
pub async fn get_catalog(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Response {
    let identifier = client_identifier(&headers);
    let decision = ctx.limiter.status(&identifier);
    let catalog = judges::catalog(ctx.service.default_model());
    with_rate_headers(Json(catalog).into_response(), &decision)
}

/// Derive the client identifier for rate limiting.
///
/// First `X-Forwarded-For` value, then `X-Real-IP`, then the literal
/// `"unknown"` — meaning all unidentified clients share one bucket.
fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    "unknown".to_string()
}

fn with_rate_headers(mut response: Response, decision: &RateDecision) -> Response {
    let headers = response.headers_mut();
    for (name, value) in [
        ("X-RateLimit-Limit", decision.limit.to_string()),
        ("X-RateLimit-Remaining", decision.remaining.to_string()),
        ("X-RateLimit-Reset", decision.reset_epoch().to_string()),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
    response
}

/// Map an error to its HTTP status and stable code, with a JSON body
/// `{error, code}`. Error and success payloads are mutually exclusive.
fn error_response(err: &TribunalError) -> Response {
    let (status, code) = match err {
        TribunalError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        TribunalError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        TribunalError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
        TribunalError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        TribunalError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        TribunalError::Quota(_) => (StatusCode::SERVICE_UNAVAILABLE, "QUOTA_EXHAUSTED"),
        TribunalError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AI_PARSE_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (
        status,
        Json(json!({ "error": err.to_string(), "code": code })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_takes_first_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "10.0.0.2");
    }

    #[test]
    fn unidentified_clients_share_one_bucket() {
        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.3"));
        assert_eq!(client_identifier(&headers), "10.0.0.3");
    }

    #[test]
    fn error_statuses_match_taxonomy() {
        let cases = [
            (TribunalError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (TribunalError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (TribunalError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                TribunalError::RateLimited { retry_after_secs: 1 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (TribunalError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (TribunalError::Quota("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (TribunalError::Parse("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (TribunalError::Github("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).status(), expected, "{err}");
        }
    }
}
