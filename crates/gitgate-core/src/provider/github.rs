// SPDX-License-Identifier: Apache-2.0

//! GitHub / GitHub Enterprise provider adapter.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use base64::Engine;
use regex::Regex;
use secrecy::ExposeSecret;

use super::{GitHubTokenSource, Provider, StaticTokenSource};
use crate::config::Policy;
use crate::error::ProviderError;

const STANDARD_GITHUB_HOST: &str = "github.com";

/// Provider adapter for `github.com` and GitHub Enterprise Server hosts.
///
/// Built once per policy at startup; the compiled path patterns and the
/// upstream token source are immutable for the lifetime of the process.
pub struct GitHubProvider {
    host: String,
    scheme: String,
    patterns: Vec<Regex>,
    token_source: Arc<dyn GitHubTokenSource>,
}

impl GitHubProvider {
    /// Builds a provider adapter from a policy's host, scheme, upstream
    /// token, and permitted repositories.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if any repository's path
    /// pattern fails to compile as a regular expression.
    pub fn from_policy(policy: &Policy) -> Result<Self, String> {
        let mut patterns = Vec::with_capacity(policy.repositories.len() * 4 + 1);
        for repo in &policy.repositories {
            patterns.extend(path_patterns(&repo.owner, &repo.name).map_err(|e| e.to_string())?);
        }
        // Every policy also permits the GraphQL endpoint wholesale; the
        // pattern carries no owner/repo and is identical across policies.
        patterns.push(graphql_pattern().map_err(|e| e.to_string())?);

        Ok(Self {
            host: policy.host.clone(),
            scheme: policy
                .scheme
                .clone()
                .unwrap_or_else(|| "https".to_string()),
            patterns,
            token_source: Arc::new(StaticTokenSource::new(policy.github.token.clone())),
        })
    }

    /// Builds a provider with an explicit token source, bypassing the
    /// policy-derived [`StaticTokenSource`]. Used by tests and by future
    /// callers that supply a dynamic installation-token source.
    #[must_use]
    pub fn with_token_source(
        host: String,
        scheme: String,
        repositories: &[(String, String)],
        token_source: Arc<dyn GitHubTokenSource>,
    ) -> Result<Self, String> {
        let mut patterns = Vec::with_capacity(repositories.len() * 4 + 1);
        for (owner, repo) in repositories {
            patterns.extend(path_patterns(owner, repo).map_err(|e| e.to_string())?);
        }
        patterns.push(graphql_pattern().map_err(|e| e.to_string())?);
        Ok(Self {
            host,
            scheme,
            patterns,
            token_source,
        })
    }
}

/// Expands an owner or repository name into a regex fragment, treating `""`
/// and `"*"` as "match any single path segment".
fn wildcard_fragment(value: &str) -> &str {
    if value.is_empty() || value == "*" {
        "[^/]*"
    } else {
        value
    }
}

/// Builds the three owner/repo-scoped path patterns for one permitted
/// repository: git smart-HTTP, the `/api/v2/` and `/api/v3/` API shape, and
/// the plain `/repos/` REST shape.
///
/// Patterns are case-insensitive and deliberately not anchored at the end:
/// `/org/repo` and `/org/repository` both match a pattern built for
/// `org/repo`, because the word boundary sits after the owner segment, not
/// after the repository segment. `/organisation/repo` does not match,
/// because the boundary between `org` and `anisation` falls between two
/// word characters.
fn path_patterns(owner: &str, repo: &str) -> Result<[Regex; 3], regex::Error> {
    let owner = wildcard_fragment(owner);
    let repo = wildcard_fragment(repo);
    Ok([
        Regex::new(&format!(r"(?i)/{owner}/{repo}(/.*)?\b"))?,
        Regex::new(&format!(r"(?i)/api/v[23]/(.*)/{owner}/{repo}/(/.*)?\b"))?,
        Regex::new(&format!(r"(?i)/repos/(.*)/{owner}/{repo}/(/.*)?\b"))?,
    ])
}

fn graphql_pattern() -> Result<Regex, regex::Error> {
    Regex::new(r"(?i)/graphql/?\b")
}

#[async_trait]
impl Provider for GitHubProvider {
    fn is_permitted(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(path))
    }

    fn rewrite_host(&self, path: &str) -> String {
        if self.host != STANDARD_GITHUB_HOST {
            return self.host.clone();
        }
        if path.starts_with("/api/v3/") || path.starts_with("/repos/") || path.starts_with("/graphql") {
            format!("api.{}", self.host)
        } else {
            self.host.clone()
        }
    }

    fn rewrite_path(&self, path: &str) -> String {
        if self.host != STANDARD_GITHUB_HOST {
            return path.to_string();
        }
        path.strip_prefix("/api/v3")
            .map_or_else(|| path.to_string(), ToString::to_string)
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }

    async fn authorization_header(&self, path: &str) -> Result<Option<String>, ProviderError> {
        let token = self
            .token_source
            .token()
            .await
            .map_err(|e| ProviderError::TokenFetch(e.to_string()))?;
        if token.expose_secret().is_empty() {
            return Ok(None);
        }

        if path.starts_with("/api/v3/") {
            return Ok(Some(format!("Bearer {}", token.expose_secret())));
        }
        if path.starts_with("/graphql") {
            return Ok(Some(format!("bearer {}", token.expose_secret())));
        }

        let basic = format!("x-access-token:{}", token.expose_secret());
        let encoded = BASE64_URL_SAFE.encode(basic.as_bytes());
        Ok(Some(format!("Basic {encoded}")))
    }
}
