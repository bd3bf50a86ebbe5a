// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote secret store client.
//!
//! Fetches `GET {base_url}/secrets/{secret_id}` and expects:
//!
//! ```json
//! { "secret": "<base64url material>", "algorithm": "HS256" }
//! ```
//!
//! Any transport, status or decoding failure is reported as
//! [`SecretError::SecretUnavailable`]; memoization happens one level up in
//! [`SecretAccessor`](super::SecretAccessor).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::secrets::{decode_base64url, SecretError, SecretStore, SigningSecret};

/// Request timeout for secret fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct SecretPayload {
    secret: String,
    #[serde(default = "default_algorithm")]
    algorithm: String,
}

fn default_algorithm() -> String {
    crate::config::DEFAULT_SIGNING_ALGORITHM.to_string()
}

/// HTTP secret store client.
#[derive(Clone)]
pub struct HttpSecretStore {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpSecretStore {
    /// Create a client for the given store base URL.
    pub fn new(base_url: Url) -> Result<Self, SecretError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| SecretError::unavailable("*", format!("HTTP client setup failed: {e}")))?;
        Ok(Self { base_url, client })
    }

    /// URL of a named secret.
    fn secret_url(&self, secret_id: &str) -> Result<Url, SecretError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SecretError::unavailable(secret_id, "secret store URL cannot be a base"))?
            .pop_if_empty()
            .push("secrets")
            .push(secret_id);
        Ok(url)
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn fetch(&self, secret_id: &str) -> Result<SigningSecret, SecretError> {
        let url = self.secret_url(secret_id)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SecretError::unavailable(secret_id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(SecretError::unavailable(
                secret_id,
                format!("HTTP {} from secret store", response.status()),
            ));
        }

        let payload: SecretPayload = response
            .json()
            .await
            .map_err(|e| SecretError::unavailable(secret_id, e.to_string()))?;

        let material = decode_base64url(secret_id, &payload.secret)?;
        SigningSecret::parse(secret_id, material, &payload.algorithm)
    }
}
