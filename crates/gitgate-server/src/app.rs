// SPDX-License-Identifier: Apache-2.0

//! Router assembly and shared application state.

use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use gitgate_core::Authorizer;
use tower_http::trace::TraceLayer;

use crate::metrics::PrometheusObserver;

/// State shared across every request-handling task.
#[derive(Clone)]
pub struct AppState {
    pub(crate) authorizer: Arc<Authorizer>,
    pub(crate) client: reqwest::Client,
    pub(crate) observer: Arc<PrometheusObserver>,
}

impl AppState {
    /// Builds shared state from a resolved authorizer and metrics observer.
    #[must_use]
    pub fn new(authorizer: Arc<Authorizer>, observer: Arc<PrometheusObserver>) -> Self {
        Self {
            authorizer,
            client: reqwest::Client::new(),
            observer,
        }
    }
}

/// Builds the proxy's router: `/healthz` and `/readyz` always answer `200`,
/// everything else falls through to the reverse-proxy handler.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .fallback(any(crate::proxy::proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the standalone router serving `/metrics` on its own listener.
///
/// Kept on a separate port from the proxy traffic so that scraping it never
/// competes with, or is gated behind, the authorization logic in
/// [`router`].
#[must_use]
pub fn metrics_router(observer: Arc<PrometheusObserver>) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(move || crate::metrics::metrics_handler(observer.clone())),
        )
        .layer(TraceLayer::new_for_http())
}

async fn liveness() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}

async fn readiness() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}
