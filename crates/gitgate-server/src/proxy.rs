// SPDX-License-Identifier: Apache-2.0

//! The reverse-proxy request handler.
//!
//! Orchestrates token extraction, authorization, request rewriting, and
//! forwarding to the upstream provider. This is the only place in the
//! server crate that talks to both `gitgate-core` and the outbound HTTP
//! client.

use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use gitgate_core::token::extract_token;
use tracing::instrument;

use crate::app::AppState;
use crate::error::{ProxyError, UpstreamError};
use crate::metrics::RequestObserver;

/// Request headers that must never be copied verbatim to the upstream
/// leg of the proxy: they describe this hop's transport, not the
/// resource being requested.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "authorization",
];

#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let header_token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let token = extract_token(header_token);

    let rewritten = match state.authorizer.rewrite_request(&path, &token).await {
        Ok(rewritten) => rewritten,
        Err(err) => {
            let response = ProxyError::from(err).into_response();
            state
                .observer
                .observe("unresolved", response.status(), started_at.elapsed());
            return response;
        }
    };

    let mut target = format!("{}://{}{}", rewritten.scheme, rewritten.host, rewritten.path);
    if let Some(query) = &query {
        target.push('?');
        target.push_str(query);
    }

    let mut headers = HeaderMap::new();
    for (name, value) in request.headers() {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            headers.insert(name.clone(), value.clone());
        }
    }
    if let Some(auth) = rewritten.authorization_header {
        match HeaderValue::from_str(&auth) {
            Ok(value) => {
                headers.insert(HeaderName::from_static("authorization"), value);
            }
            Err(_) => {
                tracing::error!("built Authorization header contained invalid bytes");
                let response = (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .into_response();
                state
                    .observer
                    .observe(&rewritten.endpoint_id, response.status(), started_at.elapsed());
                return response;
            }
        }
    }

    let body_stream = request.into_body().into_data_stream();
    let upstream_request = state
        .client
        .request(method, target)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body_stream));

    let upstream_response = match upstream_request.send().await {
        Ok(response) => response,
        Err(err) => {
            let response = UpstreamError(err).into_response();
            state
                .observer
                .observe(&rewritten.endpoint_id, response.status(), started_at.elapsed());
            return response;
        }
    };

    let status = upstream_response.status();
    let mut response_builder = Response::builder().status(status);
    for (name, value) in upstream_response.headers() {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            response_builder = response_builder.header(name, value);
        }
    }

    let response = response_builder
        .body(Body::from_stream(upstream_response.bytes_stream()))
        .unwrap_or_else(|_| {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        });

    state
        .observer
        .observe(&rewritten.endpoint_id, status, started_at.elapsed());
    response
}
