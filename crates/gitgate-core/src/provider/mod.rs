// SPDX-License-Identifier: Apache-2.0

//! Provider adapters: the per-upstream rules for which paths a policy
//! permits, how a request's host/path are rewritten before forwarding, and
//! how the outbound `Authorization` header is constructed.

pub mod github;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::ProviderError;

/// A source of upstream credentials for a provider adapter.
///
/// Exists as a trait, rather than a bare [`SecretString`], so that a static
/// configured token and a future short-lived installation-token fetcher can
/// be used interchangeably.
#[async_trait]
pub trait GitHubTokenSource: Send + Sync {
    /// Returns the current upstream token. An empty secret means "no
    /// upstream credential" (anonymous upstream access).
    async fn token(&self) -> Result<SecretString, ProviderError>;
}

/// A static token fixed at construction time. The only implementation
/// needed until a dynamic installation-token source is added.
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    /// Wraps a fixed token.
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl GitHubTokenSource for StaticTokenSource {
    async fn token(&self) -> Result<SecretString, ProviderError> {
        Ok(self.token.clone())
    }
}

/// A provider adapter: the compiled, policy-specific rules for permission
/// checking and request rewriting.
///
/// Implementations are held behind `Arc<dyn Provider>` inside [`crate::endpoint::Endpoint`],
/// so every method takes `&self` and the trait is object-safe.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns whether `path` (the request's path, with no query string) is
    /// permitted by this adapter's compiled repository patterns.
    fn is_permitted(&self, path: &str) -> bool;

    /// Returns the upstream host this request should be forwarded to, given
    /// its inbound path. May differ from the policy's configured host (e.g.
    /// GitHub.com API traffic is forwarded to `api.github.com`).
    fn rewrite_host(&self, path: &str) -> String;

    /// Returns the upstream path this request should be forwarded to, given
    /// its inbound path.
    fn rewrite_path(&self, path: &str) -> String;

    /// The upstream URL scheme (`http` or `https`).
    fn scheme(&self) -> &str;

    /// Builds the outbound `Authorization` header value for a request to
    /// `path`, or `None` if no upstream credential should be attached.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::TokenFetch`] if the underlying token source
    /// fails.
    async fn authorization_header(&self, path: &str) -> Result<Option<String>, ProviderError>;
}
