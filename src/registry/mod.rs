// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Registry
//!
//! Provisions and revokes the client credentials the token issuer trusts.
//!
//! ## Guarantees
//!
//! - `client_id` is a UUID v4, generated here and never changed
//! - Only a salted hash of the client secret is stored; the plaintext is
//!   returned once, from `create` or `rotate_secret`
//! - `updated_at` never moves backwards, even if the clock does
//! - Deactivated clients stay readable but fail `verify_credentials`

pub mod credentials;

use std::num::NonZeroU32;
use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::clock::Clock;
use crate::storage::{ClientRecord, ClientStore, StoreError};
use credentials::{CredentialError, CredentialHasher};

/// Maximum client name length, in characters.
pub const MAX_NAME_CHARS: usize = 128;

/// Maximum client description length, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1024;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("client {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("client {0} already exists")]
    Conflict(String),

    #[error("client store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("credential processing failed: {0}")]
    Crypto(#[from] CredentialError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => RegistryError::NotFound(what),
            StoreError::AlreadyExists(what) => RegistryError::Conflict(what),
            StoreError::Unavailable(reason) | StoreError::Corrupt(reason) => {
                RegistryError::StoreUnavailable(reason)
            }
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A record together with its freshly generated plaintext secret.
pub struct IssuedCredentials {
    pub record: ClientRecord,
    pub client_secret: String,
}

impl std::fmt::Debug for IssuedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCredentials")
            .field("client_id", &self.record.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub name: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
}

/// CRUD over client identity records.
pub struct ClientRegistry {
    store: Arc<dyn ClientStore>,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
}

impl ClientRegistry {
    pub fn new(
        store: Arc<dyn ClientStore>,
        pbkdf2_iterations: NonZeroU32,
        clock: Arc<dyn Clock>,
    ) -> RegistryResult<Self> {
        Ok(Self {
            store,
            hasher: CredentialHasher::new(pbkdf2_iterations)?,
            clock,
        })
    }

    /// Provision a new active client.
    pub fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> RegistryResult<IssuedCredentials> {
        let name = normalize_name(name)?;
        let description = normalize_description(description)?;

        let client_secret = self.hasher.generate_secret()?;
        let now = self.clock.now();
        let record = ClientRecord {
            client_id: uuid::Uuid::new_v4().to_string(),
            client_secret_hash: self.hasher.hash(&client_secret)?,
            name,
            description,
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        self.store.insert(&record).map_err(|e| self.store_failure("create", e))?;
        tracing::info!(client_id = %record.client_id, name = %record.name, "Client created");

        Ok(IssuedCredentials {
            record,
            client_secret,
        })
    }

    pub fn get(&self, client_id: &str) -> RegistryResult<ClientRecord> {
        self.store
            .get(client_id)
            .map_err(|e| self.store_failure("get", e))?
            .ok_or_else(|| RegistryError::NotFound(client_id.to_string()))
    }

    /// All clients, including inactive ones, oldest first.
    pub fn list(&self) -> RegistryResult<Vec<ClientRecord>> {
        self.store.list().map_err(|e| self.store_failure("list", e))
    }

    /// Change name and/or description.
    pub fn update(&self, client_id: &str, update: ClientUpdate) -> RegistryResult<ClientRecord> {
        let name = update.name.as_deref().map(normalize_name).transpose()?;
        let description = update
            .description
            .as_deref()
            .map(|d| normalize_description(Some(d)))
            .transpose()?;

        let now = self.clock.now();
        let record = self
            .store
            .modify(client_id, &mut |record| {
                if let Some(name) = &name {
                    record.name = name.clone();
                }
                if let Some(description) = &description {
                    record.description = description.clone();
                }
                record.updated_at = record.updated_at.max(now);
            })
            .map_err(|e| self.store_failure("update", e))?;

        tracing::info!(client_id, "Client updated");
        Ok(record)
    }

    /// Mark a client inactive. Deactivating an inactive client succeeds.
    pub fn deactivate(&self, client_id: &str) -> RegistryResult<()> {
        let now = self.clock.now();
        let mut changed = false;
        self.store
            .modify(client_id, &mut |record| {
                if record.is_active {
                    record.is_active = false;
                    record.updated_at = record.updated_at.max(now);
                    changed = true;
                }
            })
            .map_err(|e| self.store_failure("deactivate", e))?;

        if changed {
            tracing::info!(client_id, "Client deactivated");
        }
        Ok(())
    }

    /// Replace a client's secret. Active state is left as it is.
    pub fn rotate_secret(&self, client_id: &str) -> RegistryResult<IssuedCredentials> {
        let client_secret = self.hasher.generate_secret()?;
        let hash = self.hasher.hash(&client_secret)?;

        let now = self.clock.now();
        let record = self
            .store
            .modify(client_id, &mut |record| {
                record.client_secret_hash = hash.clone();
                record.updated_at = record.updated_at.max(now);
            })
            .map_err(|e| self.store_failure("rotate_secret", e))?;

        tracing::info!(client_id, "Client secret rotated");
        Ok(IssuedCredentials {
            record,
            client_secret,
        })
    }

    /// Check a credential pair.
    ///
    /// Unknown, inactive and wrong-secret all return `Ok(false)` after the
    /// same amount of hashing work.
    pub fn verify_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> RegistryResult<bool> {
        let record = self
            .store
            .get(client_id)
            .map_err(|e| self.store_failure("verify_credentials", e))?;

        Ok(match record {
            Some(record) => {
                let matches = self.hasher.verify(client_secret, &record.client_secret_hash);
                matches && record.is_active
            }
            None => self.hasher.verify_dummy(client_secret),
        })
    }

    /// Provision a client with a caller-chosen id and secret unless it exists.
    ///
    /// Returns `true` if the client was created.
    pub fn seed(&self, client_id: &str, client_secret: &str, name: &str) -> RegistryResult<bool> {
        let client_id = client_id.trim();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(RegistryError::Validation(
                "seed client id and secret must not be empty".to_string(),
            ));
        }
        match self.get(client_id) {
            Ok(_) => {
                tracing::info!(client_id, "Seed client already present");
                return Ok(false);
            }
            Err(RegistryError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let now = self.clock.now();
        let record = ClientRecord {
            client_id: client_id.to_string(),
            client_secret_hash: self.hasher.hash(client_secret)?,
            name: normalize_name(name)?,
            description: None,
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        match self.store.insert(&record) {
            Ok(()) => {
                tracing::info!(client_id, "Seed client provisioned");
                Ok(true)
            }
            // Another process seeded it first.
            Err(StoreError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(self.store_failure("seed", e)),
        }
    }

    /// Probe the backing store with a point lookup.
    pub fn store_available(&self) -> bool {
        self.store.get("health-probe").is_ok()
    }

    fn store_failure(&self, operation: &str, err: StoreError) -> RegistryError {
        if matches!(err, StoreError::Unavailable(_) | StoreError::Corrupt(_)) {
            tracing::warn!(operation, error = %err, "Client store failure");
        }
        err.into()
    }
}

fn normalize_name(name: &str) -> RegistryResult<String> {
    let name: String = name.trim().nfc().collect();
    if name.is_empty() {
        return Err(RegistryError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(RegistryError::Validation(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

fn normalize_description(description: Option<&str>) -> RegistryResult<Option<String>> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description: String = description.trim().nfc().collect();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(RegistryError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok((!description.is_empty()).then_some(description))
}
