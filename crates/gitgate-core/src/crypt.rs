// SPDX-License-Identifier: Apache-2.0

//! sha512-crypt (`$6$...`) verification of inbound bearer tokens.
//!
//! Inbound tokens are never stored in cleartext in configuration; only a
//! crypt hash is. Verifying a candidate token means recomputing the hash
//! with the rounds and salt embedded in the stored hash and comparing the
//! result against it.

use sha_crypt::{sha512_check, Sha512Params};

/// Returns whether `hash` has the shape of a sha512-crypt hash
/// (`$6$[rounds=N$]salt$digest`), without verifying any particular
/// password against it.
///
/// Used at configuration load time to reject malformed hashes before they
/// can cause a verification-time error.
#[must_use]
pub fn looks_like_sha512_crypt(hash: &str) -> bool {
    let Some(rest) = hash.strip_prefix("$6$") else {
        return false;
    };
    let mut fields: Vec<&str> = rest.split('$').collect();
    if let Some(first) = fields.first() {
        if let Some(rounds) = first.strip_prefix("rounds=") {
            if rounds.parse::<u32>().is_err() {
                return false;
            }
            fields.remove(0);
        }
    }
    // Remaining fields must be exactly [salt, digest], both non-empty.
    matches!(fields.as_slice(), [salt, digest] if !salt.is_empty() && !digest.is_empty())
}

/// Verifies `candidate` against a stored sha512-crypt `hash`.
///
/// Delegates to [`sha_crypt::sha512_check`], which recomputes the digest
/// using the rounds and salt embedded in `hash` and compares it against the
/// stored one.
///
/// Returns `false` (not an error) for any malformed hash or mismatched
/// candidate; callers that need to distinguish "wrong password" from
/// "broken configuration" should validate hash shape beforehand with
/// [`looks_like_sha512_crypt`].
#[must_use]
pub fn verify(candidate: &str, hash: &str) -> bool {
    sha512_check(candidate, hash).is_ok()
}

/// Produces a sha512-crypt hash for `password` using fresh random salt and
/// the default round count. Exposed for tooling (e.g. a future `gitgate
/// hash-token` CLI helper) and tests; the proxy itself only ever verifies.
///
/// # Errors
///
/// Returns an error if the underlying hashing primitive rejects the
/// parameters (it never does with [`Sha512Params::default`]).
pub fn hash(password: &str) -> Result<String, sha_crypt::CryptError> {
    sha_crypt::sha512_simple(password, &Sha512Params::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_hash() {
        assert!(looks_like_sha512_crypt(
            "$6$NmUowWy4LgRFWSsY$fOVzziH1IYD84dW8qSHa4X9PSHlo4R52oTx4jzvrR5vWkepDM/sWC.zbgrZ1IZ90zBoUGoEGCLQdbpaMbWtou."
        ));
    }

    #[test]
    fn accepts_hash_with_rounds_prefix() {
        assert!(looks_like_sha512_crypt("$6$rounds=5000$salt123$abcdefghij"));
    }

    #[test]
    fn rejects_wrong_algorithm_prefix() {
        assert!(!looks_like_sha512_crypt(
            "$1$salt$9qZA5KzHepyoVK.nVQGZF/"
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(!looks_like_sha512_crypt("not-a-hash-at-all"));
        assert!(!looks_like_sha512_crypt(""));
        assert!(!looks_like_sha512_crypt("$6$"));
        assert!(!looks_like_sha512_crypt("$6$onlysalt"));
    }

    #[test]
    fn round_trips_hash_and_verify() {
        let hashed = hash("correct-horse-battery-staple").expect("hash should succeed");
        assert!(looks_like_sha512_crypt(&hashed));
        assert!(verify("correct-horse-battery-staple", &hashed));
        assert!(!verify("wrong-password", &hashed));
    }

    #[test]
    fn verify_rejects_malformed_hash_without_panicking() {
        assert!(!verify("anything", "garbage"));
    }
}
