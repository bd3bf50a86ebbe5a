// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing secret lookup and per-process memoization.
//!
//! ## Security
//!
//! - The secret is fetched from the configured [`SecretStore`] once per process
//! - Secret bytes never appear in `Debug` output or logs
//! - A fetch failure before the first success is reported as
//!   [`SecretError::SecretUnavailable`]; once memoized the accessor never fails
//!
//! ## Usage
//!
//! Construct one [`SecretAccessor`] in `main.rs`, wrap it in an `Arc` and
//! share it with the token issuer and the authorizer through `AppState`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::Algorithm;
use tokio::sync::RwLock;

/// Secret lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    /// The store could not be reached or returned no usable secret.
    #[error("signing secret {secret_id} is unavailable: {reason}")]
    SecretUnavailable { secret_id: String, reason: String },

    /// The store returned a secret for an algorithm this service cannot use.
    #[error("signing secret {secret_id} uses unsupported algorithm {algorithm}")]
    UnsupportedAlgorithm { secret_id: String, algorithm: String },
}

impl SecretError {
    pub fn unavailable(secret_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SecretError::SecretUnavailable {
            secret_id: secret_id.into(),
            reason: reason.into(),
        }
    }
}

/// Signing secret material plus its algorithm.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret {
    bytes: Vec<u8>,
    algorithm: Algorithm,
}

impl SigningSecret {
    /// Build an HMAC-SHA256 secret.
    pub fn hs256(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            algorithm: Algorithm::HS256,
        }
    }

    /// Build a secret from raw material and an algorithm name.
    ///
    /// Only `HS256` is accepted, and the material must not be empty.
    pub fn parse(
        secret_id: &str,
        bytes: impl Into<Vec<u8>>,
        algorithm: &str,
    ) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SecretError::unavailable(secret_id, "secret is empty"));
        }
        match Algorithm::from_str(algorithm) {
            Ok(Algorithm::HS256) => Ok(Self::hs256(bytes)),
            _ => Err(SecretError::UnsupportedAlgorithm {
                secret_id: secret_id.to_string(),
                algorithm: algorithm.to_string(),
            }),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Marks a configured secret as base64url-encoded key material.
pub const BASE64URL_PREFIX: &str = "base64url:";

/// Decode base64url key material, padded or not.
pub fn decode_base64url(secret_id: &str, encoded: &str) -> Result<Vec<u8>, SecretError> {
    Base64UrlUnpadded::decode_vec(encoded.trim().trim_end_matches('='))
        .map_err(|_| SecretError::unavailable(secret_id, "secret material is not valid base64url"))
}

/// Key bytes of a configured secret.
///
/// Values carrying [`BASE64URL_PREFIX`] are decoded; anything else is used
/// verbatim as the HMAC key.
pub fn configured_secret_material(secret_id: &str, raw: &str) -> Result<Vec<u8>, SecretError> {
    match raw.strip_prefix(BASE64URL_PREFIX) {
        Some(encoded) => decode_base64url(secret_id, encoded),
        None => Ok(raw.as_bytes().to_vec()),
    }
}

/// External holder of the signing secret.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current secret stored under `secret_id`.
    async fn fetch(&self, secret_id: &str) -> Result<SigningSecret, SecretError>;
}

/// Secret store backed by a fixed value.
#[derive(Debug, Clone)]
pub struct StaticSecretStore {
    secret: SigningSecret,
}

impl StaticSecretStore {
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch(&self, _secret_id: &str) -> Result<SigningSecret, SecretError> {
        Ok(self.secret.clone())
    }
}

/// Secret store reading `SIGNING_SECRET` from the process environment at startup.
#[derive(Clone)]
pub struct EnvSecretStore {
    value: Option<String>,
    algorithm: String,
}

impl EnvSecretStore {
    pub fn new(value: Option<String>, algorithm: impl Into<String>) -> Self {
        Self {
            value,
            algorithm: algorithm.into(),
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<SigningSecret, SecretError> {
        let raw = self.value.as_deref().ok_or_else(|| {
            SecretError::unavailable(secret_id, "no signing secret configured in the environment")
        })?;
        let material = configured_secret_material(secret_id, raw)?;
        SigningSecret::parse(secret_id, material, &self.algorithm)
    }
}

/// Fetches the signing secret once and memoizes it for the process lifetime.
pub struct SecretAccessor {
    secret_id: String,
    store: Arc<dyn SecretStore>,
    cached: RwLock<Option<Arc<SigningSecret>>>,
}

impl SecretAccessor {
    pub fn new(secret_id: impl Into<String>, store: Arc<dyn SecretStore>) -> Self {
        Self {
            secret_id: secret_id.into(),
            store,
            cached: RwLock::new(None),
        }
    }

    /// Return the memoized secret, fetching it on first use.
    ///
    /// Concurrent first callers are serialized on the write lock so the store
    /// sees exactly one fetch.
    pub async fn signing_secret(&self) -> Result<Arc<SigningSecret>, SecretError> {
        if let Some(secret) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(secret));
        }

        let mut cached = self.cached.write().await;
        if let Some(secret) = cached.as_ref() {
            return Ok(Arc::clone(secret));
        }

        let secret = match self.store.fetch(&self.secret_id).await {
            Ok(secret) => Arc::new(secret),
            Err(e) => {
                tracing::warn!(
                    secret_id = %self.secret_id,
                    error = %e,
                    "Signing secret fetch failed"
                );
                return Err(e);
            }
        };
        tracing::info!(secret_id = %self.secret_id, "Signing secret loaded");
        *cached = Some(Arc::clone(&secret));
        Ok(secret)
    }

    /// Drop the memoized secret so the next call fetches again.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if cached.take().is_some() {
            tracing::info!(secret_id = %self.secret_id, "Signing secret invalidated");
        }
    }

    /// Check whether a secret is currently memoized.
    pub async fn is_loaded(&self) -> bool {
        self.cached.read().await.is_some()
    }
}
