// SPDX-License-Identifier: Apache-2.0

//! Declarative policy configuration.
//!
//! A [`Configuration`] is a list of [`Policy`] records: inbound credential
//! hash → permitted repositories → upstream provider + upstream credential.
//! Configuration is loaded once at startup from a JSON blob and is immutable
//! for the lifetime of the process; there is no reload.

use std::collections::HashSet;

use secrecy::SecretString;
use serde::Deserialize;

use crate::crypt::looks_like_sha512_crypt;
use crate::error::ConfigError;

/// Closed set of upstream provider tags. Extensible in principle; today only
/// `github` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// GitHub or GitHub Enterprise.
    GitHub,
}

/// Provider-specific configuration nested under a policy's `"github"` key.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubProviderConfig {
    /// Static upstream token. Empty string means "anonymous upstream" — no
    /// `Authorization` header is attached to forwarded requests.
    #[serde(default = "empty_secret")]
    pub token: SecretString,
}

impl Default for GitHubProviderConfig {
    fn default() -> Self {
        Self {
            token: empty_secret(),
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Inbound credential check for a policy.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAuth {
    /// A crypt-style password hash (`$6$...`, sha512-crypt) that inbound
    /// tokens are checked against. The empty string is distinguished:
    /// it marks an *anonymous policy*, matched iff the inbound token is
    /// also empty.
    #[serde(rename = "tokenHash", default)]
    pub token_hash: String,
}

/// One permitted repository. Either field being `""` or `"*"` means
/// "match any owner/name".
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository owner (user or org), or a wildcard.
    #[serde(default)]
    pub owner: String,
    /// Repository name, or a wildcard.
    pub name: String,
}

/// One configured rule: who may authenticate, what they may touch, and which
/// upstream credential is used on their behalf.
#[derive(Debug, Clone, Deserialize)]
pub struct Policy {
    /// Non-empty identifier, unique within the configuration.
    pub id: String,
    /// Upstream provider tag.
    pub provider: ProviderType,
    /// Provider-specific configuration (nested under `"github"`).
    #[serde(default)]
    pub github: GitHubProviderConfig,
    /// Upstream hostname, e.g. `github.com` or `ghe.example.com`.
    pub host: String,
    /// URL scheme for the upstream. Defaults to `https` when absent.
    #[serde(default)]
    pub scheme: Option<String>,
    /// Inbound credential check.
    #[serde(rename = "userAuth")]
    pub user_auth: UserAuth,
    /// Repositories this policy permits.
    pub repositories: Vec<Repository>,
}

/// Top-level configuration: the list of policies.
#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// Configured policies. Must be non-empty.
    pub policies: Vec<Policy>,
}

const DEFAULT_SCHEME: &str = "https";

/// Parses, defaults, and validates a configuration blob.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if `bytes` is not valid JSON matching the
/// configuration shape, or [`ConfigError::Validation`] /
/// [`ConfigError::InvalidHash`] if the parsed configuration violates one of
/// the rules below.
///
/// # Validation rules
///
/// - `policies` must be non-empty.
/// - Each policy must have a non-empty `id`, unique within the configuration.
/// - Each policy's `host` must be a syntactically plausible hostname
///   (non-empty, no whitespace, no scheme prefix).
/// - Each policy's `repositories` must be non-empty.
/// - At most one policy may have an empty `userAuth.tokenHash` (the
///   "anonymous policy"); a second is a validation error rather than an
///   ambiguous first-wins fallback.
/// - Every non-empty `tokenHash` must look like a sha512-crypt (`$6$...`)
///   hash; malformed hashes are rejected here rather than causing a panic
///   during request handling.
pub fn load(bytes: &[u8]) -> Result<Configuration, ConfigError> {
    let source = config::File::from_str(
        std::str::from_utf8(bytes).map_err(|e| ConfigError::Validation {
            message: format!("configuration is not valid UTF-8: {e}"),
        })?,
        config::FileFormat::Json,
    );
    let built = config::Config::builder()
        .add_source(source)
        .build()
        .map_err(ConfigError::Parse)?;
    let mut cfg: Configuration = built.try_deserialize().map_err(ConfigError::Parse)?;

    apply_defaults(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

fn apply_defaults(cfg: &mut Configuration) {
    for policy in &mut cfg.policies {
        if policy.scheme.as_deref().is_none_or(str::is_empty) {
            policy.scheme = Some(DEFAULT_SCHEME.to_string());
        }
    }
}

fn validate(cfg: &Configuration) -> Result<(), ConfigError> {
    if cfg.policies.is_empty() {
        return Err(ConfigError::Validation {
            message: "configuration must declare at least one policy".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    let mut anonymous_policy_id: Option<&str> = None;

    for policy in &cfg.policies {
        if policy.id.is_empty() {
            return Err(ConfigError::Validation {
                message: "policy id must not be empty".to_string(),
            });
        }
        if !seen_ids.insert(policy.id.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("duplicate policy id '{}'", policy.id),
            });
        }
        if policy.host.is_empty() || policy.host.contains(char::is_whitespace) {
            return Err(ConfigError::Validation {
                message: format!("policy '{}' has an invalid host", policy.id),
            });
        }
        if policy.host.contains("://") {
            return Err(ConfigError::Validation {
                message: format!(
                    "policy '{}' host must not include a scheme prefix",
                    policy.id
                ),
            });
        }
        if policy.repositories.is_empty() {
            return Err(ConfigError::Validation {
                message: format!("policy '{}' must permit at least one repository", policy.id),
            });
        }

        if policy.user_auth.token_hash.is_empty() {
            if let Some(first) = anonymous_policy_id {
                return Err(ConfigError::Validation {
                    message: format!(
                        "only one anonymous policy is allowed, found '{first}' and '{}'",
                        policy.id
                    ),
                });
            }
            anonymous_policy_id = Some(policy.id.as_str());
        } else if !looks_like_sha512_crypt(&policy.user_auth.token_hash) {
            return Err(ConfigError::InvalidHash {
                policy_id: policy.id.clone(),
                message: "tokenHash must be a sha512-crypt ($6$...) hash".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const VALID_HASH: &str =
        "$6$NmUowWy4LgRFWSsY$fOVzziH1IYD84dW8qSHa4X9PSHlo4R52oTx4jzvrR5vWkepDM/sWC.zbgrZ1IZ90zBoUGoEGCLQdbpaMbWtou.";

    fn single_policy_json(token_hash: &str) -> String {
        format!(
            r#"{{
                "policies": [
                    {{
                        "id": "123",
                        "provider": "github",
                        "github": {{ "token": "test-token" }},
                        "host": "github.com",
                        "userAuth": {{ "tokenHash": "{token_hash}" }},
                        "repositories": [
                            {{ "owner": "org", "name": "repo" }},
                            {{ "owner": "org", "name": "foobar" }},
                            {{ "owner": "org", "name": "repo%20space" }}
                        ]
                    }}
                ]
            }}"#
        )
    }

    #[test]
    fn loads_valid_github_policy() {
        let cfg = load(single_policy_json(VALID_HASH).as_bytes()).expect("should load");
        assert_eq!(cfg.policies.len(), 1);
        let policy = &cfg.policies[0];
        assert_eq!(policy.id, "123");
        assert_eq!(policy.host, "github.com");
        assert_eq!(policy.scheme.as_deref(), Some("https"));
        assert_eq!(policy.github.token.expose_secret(), "test-token");
        assert_eq!(policy.repositories.len(), 3);
    }

    #[test]
    fn defaults_missing_scheme_to_https() {
        let cfg = load(single_policy_json(VALID_HASH).as_bytes()).unwrap();
        assert_eq!(cfg.policies[0].scheme.as_deref(), Some("https"));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = load(b"{ not json }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_policies() {
        let err = load(br#"{"policies": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn rejects_duplicate_policy_ids() {
        let json = format!(
            r#"{{
                "policies": [
                    {{"id": "a", "provider": "github", "github": {{"token": ""}}, "host": "github.com",
                      "userAuth": {{"tokenHash": ""}}, "repositories": [{{"owner": "*", "name": "*"}}]}},
                    {{"id": "a", "provider": "github", "github": {{"token": ""}}, "host": "github.com",
                      "userAuth": {{"tokenHash": "{VALID_HASH}"}}, "repositories": [{{"owner": "*", "name": "*"}}]}}
                ]
            }}"#
        );
        let err = load(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn rejects_more_than_one_anonymous_policy() {
        let json = format!(
            r#"{{
                "policies": [
                    {{"id": "a", "provider": "github", "github": {{"token": ""}}, "host": "github.com",
                      "userAuth": {{"tokenHash": ""}}, "repositories": [{{"owner": "*", "name": "*"}}]}},
                    {{"id": "b", "provider": "github", "github": {{"token": ""}}, "host": "github.com",
                      "userAuth": {{"tokenHash": ""}}, "repositories": [{{"owner": "*", "name": "*"}}]}}
                ]
            }}"#
        );
        let err = load(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn rejects_malformed_token_hash() {
        let err = load(single_policy_json("not-a-crypt-hash").as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHash { .. }));
    }

    #[test]
    fn rejects_empty_repositories() {
        let json = r#"{
            "policies": [
                {"id": "a", "provider": "github", "github": {"token": ""}, "host": "github.com",
                 "userAuth": {"tokenHash": ""}, "repositories": []}
            ]
        }"#;
        let err = load(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn wildcard_owner_and_name_are_accepted() {
        let json = r#"{
            "policies": [
                {"id": "public", "provider": "github", "github": {"token": ""}, "host": "github.com",
                 "userAuth": {"tokenHash": ""}, "repositories": [{"owner": "*", "name": "*"}]}
            ]
        }"#;
        let cfg = load(json.as_bytes()).expect("should load");
        assert_eq!(cfg.policies[0].repositories[0].owner, "*");
    }
}
