// SPDX-License-Identifier: Apache-2.0

//! Credential resolution, path permission checks, and request rewriting.
//!
//! The [`Authorizer`] is built once from a [`Configuration`] at startup and
//! is immutable thereafter; all lookups are read-only and safe to share
//! across request-handling tasks behind an `Arc`.

use std::collections::HashMap;

use tracing::instrument;

use crate::config::Configuration;
use crate::crypt;
use crate::endpoint::Endpoint;
use crate::error::{AuthError, ConfigError};

/// The result of rewriting an inbound request for forwarding upstream.
#[derive(Debug, Clone)]
pub struct RewrittenRequest {
    /// Id of the endpoint the request was resolved to, for logging and
    /// metrics labeling.
    pub endpoint_id: String,
    /// Upstream URL scheme (`http` or `https`).
    pub scheme: String,
    /// Upstream host to connect to and to send as the `Host` header.
    pub host: String,
    /// Upstream request path (query string is untouched by the rewrite and
    /// should be carried over verbatim by the caller).
    pub path: String,
    /// Replacement `Authorization` header value, or `None` if the header
    /// should be omitted entirely.
    pub authorization_header: Option<String>,
}

/// Resolves inbound credentials to endpoints, checks path permissions, and
/// rewrites requests for forwarding.
pub struct Authorizer {
    endpoints: Vec<Endpoint>,
    /// `(token_hash, endpoint_index)` pairs, in configuration order, for
    /// every policy with a non-empty `tokenHash`. Checked before falling
    /// back to the anonymous endpoint so that resolution is deterministic
    /// regardless of hash map iteration order.
    hashed: Vec<(String, usize)>,
    /// Index into `endpoints` of the single anonymous-policy endpoint, if
    /// one was configured.
    anonymous: Option<usize>,
    #[allow(dead_code)]
    endpoints_by_id: HashMap<String, usize>,
}

impl Authorizer {
    /// Builds an authorizer from a loaded, already-validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Provider`] if a policy's provider adapter
    /// cannot be compiled, or [`ConfigError::DuplicateEndpointId`] if two
    /// policies produce the same endpoint id (this should already be
    /// impossible given unique policy ids, but is checked defensively).
    pub fn new(cfg: &Configuration) -> Result<Self, ConfigError> {
        let mut endpoints = Vec::with_capacity(cfg.policies.len());
        let mut hashed = Vec::new();
        let mut anonymous = None;
        let mut endpoints_by_id = HashMap::with_capacity(cfg.policies.len());

        for policy in &cfg.policies {
            let endpoint = Endpoint::from_policy(policy)?;
            let index = endpoints.len();

            if endpoints_by_id
                .insert(endpoint.id().to_string(), index)
                .is_some()
            {
                return Err(ConfigError::DuplicateEndpointId(endpoint.id().to_string()));
            }

            if policy.user_auth.token_hash.is_empty() {
                anonymous = Some(index);
            } else {
                hashed.push((policy.user_auth.token_hash.clone(), index));
            }

            endpoints.push(endpoint);
        }

        Ok(Self {
            endpoints,
            hashed,
            anonymous,
            endpoints_by_id,
        })
    }

    /// Resolves an inbound token to its endpoint.
    ///
    /// Non-empty hashes are checked first, in configuration order, using
    /// [`crate::crypt::verify`]. An empty token, or a non-empty token that
    /// matches no configured hash, falls back to the configured anonymous
    /// endpoint, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] if the token is empty and no
    /// anonymous policy is configured, or
    /// [`AuthError::CredentialNotRecognised`] if a non-empty token matches no
    /// configured hash and no anonymous policy is configured.
    #[instrument(skip(self, token))]
    pub fn resolve_by_token(&self, token: &str) -> Result<&Endpoint, AuthError> {
        if !token.is_empty() {
            for (hash, index) in &self.hashed {
                if crypt::verify(token, hash) {
                    return Ok(&self.endpoints[*index]);
                }
            }
            return self
                .anonymous
                .map(|index| &self.endpoints[index])
                .ok_or(AuthError::CredentialNotRecognised);
        }

        self.anonymous
            .map(|index| &self.endpoints[index])
            .ok_or(AuthError::MissingCredential)
    }

    /// Returns whether `token` is permitted to access `path`.
    ///
    /// # Errors
    ///
    /// Propagates [`Authorizer::resolve_by_token`]'s errors, or returns
    /// [`AuthError::Forbidden`] if the token resolves but `path` is not
    /// among its endpoint's permitted patterns.
    pub fn is_permitted(&self, path: &str, token: &str) -> Result<(), AuthError> {
        let endpoint = self.resolve_by_token(token)?;
        if endpoint.provider().is_permitted(path) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(path.to_string()))
        }
    }

    /// Resolves `token`, checks that `path` is permitted, and builds the
    /// rewritten upstream request.
    ///
    /// # Errors
    ///
    /// Propagates [`Authorizer::resolve_by_token`]'s and
    /// [`Authorizer::is_permitted`]'s errors, or
    /// [`AuthError::Internal`] if the provider adapter fails while building
    /// the outbound `Authorization` header.
    pub async fn rewrite_request(
        &self,
        path: &str,
        token: &str,
    ) -> Result<RewrittenRequest, AuthError> {
        let endpoint = self.resolve_by_token(token)?;
        let provider = endpoint.provider();
        if !provider.is_permitted(path) {
            return Err(AuthError::Forbidden(path.to_string()));
        }

        let authorization_header = provider
            .authorization_header(path)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(RewrittenRequest {
            endpoint_id: endpoint.id().to_string(),
            scheme: provider.scheme().to_string(),
            host: provider.rewrite_host(path),
            path: provider.rewrite_path(path),
            authorization_header,
        })
    }

    /// All endpoints built from the configuration, in configuration order.
    /// Exposed for diagnostics (e.g. a future `/debug/endpoints` surface).
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    const VALID_HASH: &str =
        "$6$NmUowWy4LgRFWSsY$fOVzziH1IYD84dW8qSHa4X9PSHlo4R52oTx4jzvrR5vWkepDM/sWC.zbgrZ1IZ90zBoUGoEGCLQdbpaMbWtou.";

    fn cfg_with_anonymous_and_hashed() -> Configuration {
        let json = format!(
            r#"{{
                "policies": [
                    {{"id": "anon", "provider": "github", "github": {{"token": ""}}, "host": "github.com",
                      "userAuth": {{"tokenHash": ""}}, "repositories": [{{"owner": "*", "name": "*"}}]}},
                    {{"id": "authed", "provider": "github", "github": {{"token": "upstream-tok"}}, "host": "github.com",
                      "userAuth": {{"tokenHash": "{VALID_HASH}"}}, "repositories": [{{"owner": "org", "name": "repo"}}]}}
                ]
            }}"#
        );
        config::load(json.as_bytes()).unwrap()
    }

    #[test]
    fn empty_token_resolves_to_anonymous_endpoint() {
        let cfg = cfg_with_anonymous_and_hashed();
        let authz = Authorizer::new(&cfg).unwrap();
        let endpoint = authz.resolve_by_token("").unwrap();
        assert_eq!(endpoint.policy_id(), "anon");
    }

    #[test]
    fn unrecognised_nonempty_token_falls_back_to_anonymous() {
        let cfg = cfg_with_anonymous_and_hashed();
        let authz = Authorizer::new(&cfg).unwrap();
        let endpoint = authz.resolve_by_token("not-a-real-token").unwrap();
        assert_eq!(endpoint.policy_id(), "anon");
    }

    #[test]
    fn unrecognised_nonempty_token_is_rejected_without_anonymous_policy() {
        let json = format!(
            r#"{{
                "policies": [
                    {{"id": "authed", "provider": "github", "github": {{"token": "t"}}, "host": "github.com",
                      "userAuth": {{"tokenHash": "{VALID_HASH}"}}, "repositories": [{{"owner": "org", "name": "repo"}}]}}
                ]
            }}"#
        );
        let cfg = config::load(json.as_bytes()).unwrap();
        let authz = Authorizer::new(&cfg).unwrap();
        let err = authz.resolve_by_token("not-a-real-token").unwrap_err();
        assert!(matches!(err, AuthError::CredentialNotRecognised));
    }

    #[test]
    fn missing_credential_when_no_anonymous_policy_configured() {
        let json = format!(
            r#"{{
                "policies": [
                    {{"id": "authed", "provider": "github", "github": {{"token": "t"}}, "host": "github.com",
                      "userAuth": {{"tokenHash": "{VALID_HASH}"}}, "repositories": [{{"owner": "org", "name": "repo"}}]}}
                ]
            }}"#
        );
        let cfg = config::load(json.as_bytes()).unwrap();
        let authz = Authorizer::new(&cfg).unwrap();
        let err = authz.resolve_by_token("").unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential));
    }

    #[test]
    fn is_permitted_rejects_out_of_scope_path() {
        let cfg = cfg_with_anonymous_and_hashed();
        let authz = Authorizer::new(&cfg).unwrap();
        let err = authz.is_permitted("/other/repo/info/refs", "").unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
    }

    #[tokio::test]
    async fn rewrite_request_builds_upstream_target() {
        let cfg = cfg_with_anonymous_and_hashed();
        let authz = Authorizer::new(&cfg).unwrap();
        let rewritten = authz
            .rewrite_request("/repos/org/repo/contents", "")
            .await
            .unwrap();
        assert_eq!(rewritten.scheme, "https");
        assert_eq!(rewritten.host, "api.github.com");
        assert_eq!(rewritten.path, "/repos/org/repo/contents");
        assert!(rewritten.authorization_header.is_none());
    }
}
