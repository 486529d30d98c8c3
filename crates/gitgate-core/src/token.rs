// SPDX-License-Identifier: Apache-2.0

//! Extracts the inbound credential from an `Authorization` header.
//!
//! Every failure mode here — a missing header, an unrecognised scheme, a
//! malformed Basic payload — is swallowed into an empty token rather than
//! surfaced as an error. An empty token is a valid input to
//! [`crate::authorizer::Authorizer::resolve_by_token`]: it simply falls
//! back to the anonymous policy if one is configured, or is rejected there
//! if not. This keeps the "no credential" and "bad credential" cases
//! indistinguishable to the caller, matching the upstream behavior this
//! adapts.

use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use base64::Engine;

/// Extracts the bearer token from an `Authorization` header value.
///
/// - `Basic <base64url(user:pass)>`: decodes the payload and returns the
///   password component if non-empty, else the username component, else
///   an empty string (both empty, or not exactly two components).
/// - `Bearer <token>` / `Token <token>`: returns `<token>` verbatim.
/// - anything else, or `None`: returns an empty string.
#[must_use]
pub fn extract_token(header_value: Option<&str>) -> String {
    let Some(value) = header_value else {
        return String::new();
    };
    let trimmed = value.trim_start();

    if let Some(rest) = strip_prefix_ci(trimmed, "Basic ") {
        return decode_basic(rest).unwrap_or_default();
    }
    if let Some(rest) = strip_prefix_ci(trimmed, "Bearer ") {
        return rest.to_string();
    }
    if let Some(rest) = strip_prefix_ci(trimmed, "Token ") {
        return rest.to_string();
    }
    String::new()
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn decode_basic(encoded: &str) -> Option<String> {
    let decoded = BASE64_URL_SAFE.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    if decoded.matches(':').count() != 1 {
        return None;
    }
    let mut parts = decoded.splitn(2, ':');
    let user = parts.next()?;
    let pass = parts.next()?;
    if !pass.is_empty() {
        Some(pass.to_string())
    } else if !user.is_empty() {
        Some(user.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_header(user: &str, pass: &str) -> String {
        let payload = format!("{user}:{pass}");
        format!("Basic {}", BASE64_URL_SAFE.encode(payload.as_bytes()))
    }

    #[test]
    fn missing_header_yields_empty_token() {
        assert_eq!(extract_token(None), "");
    }

    #[test]
    fn empty_header_yields_empty_token() {
        assert_eq!(extract_token(Some("")), "");
    }

    #[test]
    fn bearer_token_is_returned_verbatim() {
        assert_eq!(extract_token(Some("Bearer abc123")), "abc123");
    }

    #[test]
    fn token_scheme_is_returned_verbatim() {
        assert_eq!(extract_token(Some("Token abc123")), "abc123");
    }

    #[test]
    fn scheme_matching_is_case_insensitive() {
        assert_eq!(extract_token(Some("bEaReR abc123")), "abc123");
    }

    #[test]
    fn basic_auth_prefers_password_component() {
        let header = basic_header("x-access-token", "s3cr3t");
        assert_eq!(extract_token(Some(&header)), "s3cr3t");
    }

    #[test]
    fn basic_auth_falls_back_to_username_when_password_empty() {
        let header = basic_header("only-user", "");
        assert_eq!(extract_token(Some(&header)), "only-user");
    }

    #[test]
    fn basic_auth_with_both_components_empty_yields_empty_token() {
        let header = basic_header("", "");
        assert_eq!(extract_token(Some(&header)), "");
    }

    #[test]
    fn basic_auth_with_too_many_components_yields_empty_token() {
        let payload = "a:b:c";
        let header = format!("Basic {}", BASE64_URL_SAFE.encode(payload));
        assert_eq!(extract_token(Some(&header)), "");
    }

    #[test]
    fn malformed_base64_yields_empty_token() {
        assert_eq!(extract_token(Some("Basic not-base64!!")), "");
    }

    #[test]
    fn unrecognised_scheme_yields_empty_token() {
        assert_eq!(extract_token(Some("Digest abc123")), "");
    }
}
