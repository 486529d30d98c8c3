// SPDX-License-Identifier: Apache-2.0

//! Request metrics.
//!
//! The proxy handler talks to metrics only through the narrow
//! [`RequestObserver`] trait; the concrete Prometheus registry and its text
//! exposition format are confined to this module.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// A collaborator that observes completed proxy requests.
///
/// Exists so the proxy handler can be exercised in tests without standing
/// up a real Prometheus registry.
pub trait RequestObserver: Send + Sync {
    /// Records one completed request.
    fn observe(&self, endpoint_id: &str, status: StatusCode, elapsed: Duration);
}

/// Prometheus-backed [`RequestObserver`].
pub struct PrometheusObserver {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl PrometheusObserver {
    /// Builds a fresh registry with the proxy's metric families registered.
    ///
    /// # Panics
    ///
    /// Panics if a metric family fails to register, which only happens on
    /// a duplicate registration and therefore indicates a programming
    /// error rather than a runtime condition.
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "gitgate_requests_total",
                "Total number of proxied requests, by endpoint and status code",
            ),
            &["endpoint", "status"],
        )
        .expect("metric options are valid");
        registry
            .register(Box::new(requests_total.clone()))
            .expect("requests_total registers exactly once");

        let request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "gitgate_request_duration_seconds",
                "Time spent forwarding a proxied request, by endpoint",
            ),
            &["endpoint"],
        )
        .expect("histogram options are valid");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("request_duration_seconds registers exactly once");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
        }
    }

    /// Renders the registry in Prometheus text exposition format.
    fn gather(&self) -> Vec<u8> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .expect("text encoding of well-formed metric families never fails");
        buffer
    }
}

impl Default for PrometheusObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestObserver for PrometheusObserver {
    fn observe(&self, endpoint_id: &str, status: StatusCode, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[endpoint_id, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[endpoint_id])
            .observe(elapsed.as_secs_f64());
    }
}

/// Axum handler for `GET /metrics`.
pub async fn metrics_handler(observer: Arc<PrometheusObserver>) -> Response {
    let body = observer.gather();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_increments_counter_and_histogram() {
        let observer = PrometheusObserver::new();
        observer.observe("github.com//policy-1", StatusCode::OK, Duration::from_millis(12));
        let families = observer.registry.gather();
        let total: f64 = families
            .iter()
            .find(|f| f.name() == "gitgate_requests_total")
            .and_then(|f| f.get_metric().first())
            .map(|m| m.get_counter().value())
            .unwrap_or_default();
        assert_eq!(total, 1.0);
    }

    #[tokio::test]
    async fn metrics_handler_returns_text_exposition_format() {
        let observer = Arc::new(PrometheusObserver::new());
        observer.observe("anon//anon", StatusCode::FORBIDDEN, Duration::from_millis(1));
        let response = metrics_handler(observer).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
