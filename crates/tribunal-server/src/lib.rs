//! HTTP surface for the Tribunal review service.
//!
//! One endpoint pair:
//! - `POST /review` — run (or serve from cache) a multi-judge review
//! - `GET  /review` — the static catalog: judges, presets, models
//!
//! Every response carries `X-RateLimit-*` headers; only `POST` consumes
//! quota. Errors are JSON `{error, code}` bodies, never partial
//! successes.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tribunal_review::ratelimit::{RateLimiter, SWEEP_INTERVAL_SECS};
use tribunal_review::service::ReviewService;

/// Shared state handed to every request handler.
pub struct AppContext {
    /// The review orchestrator.
    pub service: ReviewService,
    /// Per-client fixed-window limiter.
    pub limiter: RateLimiter,
}

/// Build the application router.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route(
            "/review",
            get(routes::get_catalog).post(routes::post_review),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Bind and serve until the process exits.
///
/// Also spawns the rate-limiter sweep task, which trims expired
/// windows every five minutes.
///
/// # Errors
///
/// Returns [`std::io::Error`] if the address cannot be bound or the
/// server fails while running.
pub async fn serve(ctx: Arc<AppContext>, addr: SocketAddr) -> std::io::Result<()> {
    spawn_sweeper(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "review API listening");
    axum::serve(listener, build_router(ctx)).await
}

fn spawn_sweeper(ctx: Arc<AppContext>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        interval.tick().await; // first tick is immediate
        loop {
            interval.tick().await;
            let dropped = ctx.limiter.sweep();
            if dropped > 0 {
                tracing::debug!(dropped, "swept expired rate-limit windows");
            }
        }
    });
}
