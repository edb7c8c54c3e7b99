//! PKCE (RFC 7636) verifier/challenge generation and the per-attempt `state`.
//!
//! All randomness comes from the OS source through `getrandom`; there is no
//! fallback generator.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use core_runtime::config::{DEFAULT_VERIFIER_BYTES, MAX_VERIFIER_BYTES, MIN_VERIFIER_BYTES};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{AuthError, Result};

/// Random bytes behind the `state` parameter.
pub const STATE_BYTES: usize = 32;

/// Only S256 is ever sent.
pub const CHALLENGE_METHOD: &str = "S256";

/// A PKCE verifier and its S256 challenge.
///
/// The verifier is the secret half; it never leaves the process except in the
/// token request body.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    /// Generate a pair from 64 random bytes (an 86-character verifier).
    pub fn generate() -> Result<Self> {
        Self::with_length(DEFAULT_VERIFIER_BYTES)
    }

    /// Generate a pair from `bytes` random bytes.
    ///
    /// `bytes` must be within 32..=96 so that the encoded verifier falls in
    /// the 43..=128 character range RFC 7636 requires.
    pub fn with_length(bytes: usize) -> Result<Self> {
        if !(MIN_VERIFIER_BYTES..=MAX_VERIFIER_BYTES).contains(&bytes) {
            return Err(AuthError::InvalidConfiguration(format!(
                "verifier length must be between {} and {} bytes, got {}",
                MIN_VERIFIER_BYTES, MAX_VERIFIER_BYTES, bytes
            )));
        }

        let verifier = random_urlsafe(bytes)?;
        let challenge = Self::challenge_for(&verifier);
        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// `base64url(SHA256(verifier))` without padding.
    pub fn challenge_for(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Fresh CSRF `state` for one authorization attempt.
pub fn generate_state() -> Result<String> {
    random_urlsafe(STATE_BYTES)
}

/// `bytes` bytes from the OS random source, base64url-encoded.
pub fn random_urlsafe(bytes: usize) -> Result<String> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf).map_err(|e| AuthError::RandomUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_unreserved(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    #[test]
    fn test_verifier_lengths() {
        assert_eq!(PkcePair::with_length(32).unwrap().verifier().len(), 43);
        assert_eq!(PkcePair::generate().unwrap().verifier().len(), 86);
        assert_eq!(PkcePair::with_length(96).unwrap().verifier().len(), 128);
    }

    #[test]
    fn test_out_of_range_length_rejected() {
        assert!(matches!(
            PkcePair::with_length(31),
            Err(AuthError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PkcePair::with_length(97),
            Err(AuthError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_urlsafe_alphabet() {
        for _ in 0..50 {
            let pair = PkcePair::generate().unwrap();
            assert!(pair.verifier().chars().all(is_unreserved));
            assert!(pair.challenge().chars().all(is_unreserved));
            assert!(!pair.challenge().contains('='));
        }
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(
            PkcePair::challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_challenge_matches_verifier() {
        let pair = PkcePair::generate().unwrap();
        assert_eq!(pair.challenge(), PkcePair::challenge_for(pair.verifier()));
        assert_eq!(pair.method(), "S256");
    }

    #[test]
    fn test_values_are_unique() {
        let verifiers: HashSet<String> = (0..100)
            .map(|_| PkcePair::generate().unwrap().verifier().to_string())
            .collect();
        assert_eq!(verifiers.len(), 100);

        let state_a = generate_state().unwrap();
        let state_b = generate_state().unwrap();
        assert_ne!(state_a, state_b);
        assert_eq!(state_a.len(), 43);
    }

    #[test]
    fn test_debug_redacts_verifier() {
        let pair = PkcePair::generate().unwrap();
        let debug = format!("{:?}", pair);
        assert!(!debug.contains(pair.verifier()));
        assert!(debug.contains("[REDACTED]"));
    }
}
