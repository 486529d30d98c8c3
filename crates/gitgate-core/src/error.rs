// SPDX-License-Identifier: Apache-2.0

//! Error types for the gitgate authorization engine.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Each variant maps to one of the error kinds in the design: configuration
//! errors are fatal at startup, auth errors become HTTP status codes, and
//! provider errors become `500`s at the proxy handler.

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::config::Configuration`].
///
/// Always fatal at process startup; never raised once the `Authorizer` has
/// been constructed.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration blob failed to parse or deserialize.
    #[error("could not parse configuration: {0}")]
    Parse(#[from] config::ConfigError),

    /// The configuration parsed but failed a validation rule.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human-readable description of the violated rule.
        message: String,
    },

    /// A policy's `userAuth.tokenHash` is not a well-formed sha512-crypt hash.
    #[error("policy '{policy_id}' has a malformed token hash: {message}")]
    InvalidHash {
        /// The offending policy's id.
        policy_id: String,
        /// Description of what made the hash unusable.
        message: String,
    },

    /// Two or more endpoints were built with an identical id.
    #[error("duplicate endpoint id '{0}'")]
    DuplicateEndpointId(String),

    /// A provider adapter could not be built from a policy (e.g. bad regex).
    #[error("could not build provider for policy '{policy_id}': {message}")]
    Provider {
        /// The offending policy's id.
        policy_id: String,
        /// Description of the failure.
        message: String,
    },
}

/// Errors raised while resolving or verifying a caller's credential.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No `Authorization` header was present on the request.
    #[error("missing credential")]
    MissingCredential,

    /// The `Authorization` header was present but not a recognised shape.
    #[error("malformed credential")]
    MalformedCredential,

    /// The token did not resolve to any configured endpoint.
    #[error("credential not recognised")]
    CredentialNotRecognised,

    /// The token resolved to an endpoint, but the path is not permitted for it.
    #[error("token not permitted for path {0}")]
    Forbidden(String),

    /// Hash verification or another internal step failed unexpectedly.
    ///
    /// Construction-time hash validation (see [`ConfigError::InvalidHash`])
    /// should make this unreachable in practice; it exists so a verifier
    /// failure surfaces as a handled error instead of a panic.
    #[error("internal authorization error: {0}")]
    Internal(String),
}

/// Errors raised while a provider adapter rewrites a request.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The rewritten upstream URL (`scheme://host`) failed to parse.
    #[error("invalid upstream url: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The outbound token source failed to produce a token.
    #[error("could not fetch upstream token: {0}")]
    TokenFetch(String),
}
