// SPDX-License-Identifier: Apache-2.0

//! Maps authorization outcomes onto HTTP responses for the proxy handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gitgate_core::AuthError;

/// Wraps an [`AuthError`] with the HTTP status it should produce.
///
/// Kept as a thin newtype, rather than implementing [`IntoResponse`]
/// directly on `AuthError`, so `gitgate-core` stays free of any HTTP
/// framework dependency.
pub struct ProxyError(pub AuthError);

impl From<AuthError> for ProxyError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            AuthError::MissingCredential | AuthError::CredentialNotRecognised => {
                (StatusCode::FORBIDDEN, "User not permitted")
            }
            AuthError::MalformedCredential => (StatusCode::FORBIDDEN, "User not permitted"),
            AuthError::Forbidden(_) => (StatusCode::FORBIDDEN, "User not permitted"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        tracing::warn!(error = %self.0, status = status.as_u16(), "rejected proxied request");
        (status, body).into_response()
    }
}

/// Represents the upstream reverse-proxy leg of a request failing after
/// authorization succeeded: connection refused, TLS failure, timeout, etc.
/// Always reported as `502 Bad Gateway`, mirroring a conventional reverse
/// proxy rather than leaking upstream transport errors to the caller.
pub struct UpstreamError(pub reqwest::Error);

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "upstream request failed");
        (StatusCode::BAD_GATEWAY, "Bad gateway").into_response()
    }
}
