// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client secret generation and hashing.
//!
//! ## Format
//!
//! Hashes are PBKDF2-HMAC-SHA256 with a 16-byte random salt, encoded as:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<base64url salt>$<base64url hash>
//! ```
//!
//! The iteration count travels with the hash, so raising `PBKDF2_ITERATIONS`
//! only affects secrets hashed afterwards.

use std::num::NonZeroU32;

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

const SCHEME: &str = "pbkdf2-sha256";
const SECRET_LEN: usize = 32;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("system random source failed")]
    Random,
}

/// Generates client secrets and hashes/verifies them.
pub struct CredentialHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
    /// Hash verified against when the client is unknown, so lookups of
    /// missing and existing clients cost the same.
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(iterations: NonZeroU32) -> Result<Self, CredentialError> {
        let rng = SystemRandom::new();
        let mut hasher = Self {
            iterations,
            rng,
            dummy_hash: String::new(),
        };
        let filler = hasher.generate_secret()?;
        hasher.dummy_hash = hasher.hash(&filler)?;
        Ok(hasher)
    }

    /// 32 random bytes, base64url without padding.
    pub fn generate_secret(&self) -> Result<String, CredentialError> {
        let mut bytes = [0u8; SECRET_LEN];
        self.rng.fill(&mut bytes).map_err(|_| CredentialError::Random)?;
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }

    /// Hash `secret` with a fresh salt.
    pub fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| CredentialError::Random)?;

        let mut derived = [0u8; HASH_LEN];
        pbkdf2::derive(
            PBKDF2_ALG,
            self.iterations,
            &salt,
            secret.as_bytes(),
            &mut derived,
        );

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            Base64UrlUnpadded::encode_string(&salt),
            Base64UrlUnpadded::encode_string(&derived),
        ))
    }

    /// Constant-time check of `secret` against an encoded hash.
    ///
    /// A malformed hash never matches.
    pub fn verify(&self, secret: &str, encoded: &str) -> bool {
        let Some((iterations, salt, derived)) = parse_hash(encoded) else {
            return false;
        };
        pbkdf2::verify(PBKDF2_ALG, iterations, &salt, secret.as_bytes(), &derived).is_ok()
    }

    /// Burn the same work as [`verify`](Self::verify) for a client that does not exist.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy_hash);
        false
    }
}

fn parse_hash(encoded: &str) -> Option<(NonZeroU32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations = parts.next()?.parse::<NonZeroU32>().ok()?;
    let salt = Base64UrlUnpadded::decode_vec(parts.next()?).ok()?;
    let derived = Base64UrlUnpadded::decode_vec(parts.next()?).ok()?;
    if parts.next().is_some() || derived.is_empty() {
        return None;
    }
    Some((iterations, salt, derived))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(NonZeroU32::new(1_000).unwrap()).unwrap()
    }

    #[test]
    fn hash_verifies_only_the_original_secret() {
        let hasher = hasher();
        let hash = hasher.hash("s3cret").unwrap();

        assert!(hash.starts_with("pbkdf2-sha256$1000$"));
        assert!(!hash.contains("s3cret"));
        assert!(hasher.verify("s3cret", &hash));
        assert!(!hasher.verify("s3cret ", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn same_secret_hashes_differently() {
        let hasher = hasher();
        assert_ne!(hasher.hash("x").unwrap(), hasher.hash("x").unwrap());
    }

    #[test]
    fn iteration_count_is_read_from_hash() {
        let old = CredentialHasher::new(NonZeroU32::new(500).unwrap()).unwrap();
        let hash = old.hash("s3cret").unwrap();
        assert!(hasher().verify("s3cret", &hash));
    }

    #[test]
    fn generated_secrets_are_distinct_and_url_safe() {
        let hasher = hasher();
        let a = hasher.generate_secret().unwrap();
        let b = hasher.generate_secret().unwrap();
        assert_ne!(a, b);
        assert_eq!(Base64UrlUnpadded::decode_vec(&a).unwrap().len(), SECRET_LEN);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn malformed_hashes_never_match() {
        let hasher = hasher();
        for encoded in [
            "",
            "plain",
            "bcrypt$10$a$b",
            "pbkdf2-sha256$0$c2FsdA$aGFzaA",
            "pbkdf2-sha256$10$!!$aGFzaA",
        ] {
            assert!(!hasher.verify("anything", encoded), "{encoded}");
        }
        assert!(!hasher.verify_dummy("anything"));
    }
}
