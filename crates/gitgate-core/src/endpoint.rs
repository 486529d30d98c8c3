// SPDX-License-Identifier: Apache-2.0

//! Runtime endpoint records built from configuration at startup.
//!
//! An [`Endpoint`] is the resolved, immutable counterpart of a [`Policy`][p]:
//! it carries the compiled provider adapter instead of raw provider config,
//! and an `id` derived from its policy for logging and lookup.
//!
//! [p]: crate::config::Policy

use std::sync::Arc;

use crate::config::{Policy, ProviderType};
use crate::provider::{github::GitHubProvider, Provider};

/// A resolved, ready-to-use upstream target: the compiled provider adapter
/// plus enough metadata to log and debug a match.
///
/// Cheap to clone: the provider adapter is held behind an [`Arc`].
#[derive(Clone)]
pub struct Endpoint {
    id: String,
    policy_id: String,
    /// `true` if this endpoint was built from a policy whose
    /// `userAuth.tokenHash` is empty (the anonymous fallback endpoint).
    pub is_anonymous: bool,
    provider: Arc<dyn Provider>,
}

impl Endpoint {
    /// Builds an endpoint from a single policy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfigError::Provider`] if the policy's
    /// provider adapter cannot be constructed (e.g. an unsupported host
    /// shape for its regex patterns).
    pub fn from_policy(policy: &Policy) -> Result<Self, crate::error::ConfigError> {
        let provider: Arc<dyn Provider> = match policy.provider {
            ProviderType::GitHub => Arc::new(GitHubProvider::from_policy(policy).map_err(
                |message| crate::error::ConfigError::Provider {
                    policy_id: policy.id.clone(),
                    message,
                },
            )?),
        };

        Ok(Self {
            // The literal double slash is intentional: the id format is
            // `host + "/" + "" + "/" + policy.id`, reserving a segment for
            // a future endpoint discriminator that is always empty today.
            id: format!("{}/{}/{}", policy.host, "", policy.id),
            policy_id: policy.id.clone(),
            is_anonymous: policy.user_auth.token_hash.is_empty(),
            provider,
        })
    }

    /// The endpoint's stable identifier: `host + "/" + "" + "/" + policy.id`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The id of the policy this endpoint was built from.
    #[must_use]
    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    /// The compiled provider adapter for this endpoint.
    #[must_use]
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("policy_id", &self.policy_id)
            .field("is_anonymous", &self.is_anonymous)
            .finish_non_exhaustive()
    }
}
