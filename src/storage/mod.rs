// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Record Storage
//!
//! Key-value persistence for client identity records, keyed by `client_id`.
//!
//! ## Backends
//!
//! - [`InMemoryClientStore`]: process-local map, the default
//! - [`ClientDatabase`]: embedded redb file, used when `CLIENT_DB_PATH` is set
//!
//! ## Notes
//!
//! - Records are never physically deleted; deactivation is an update
//! - `modify` runs its closure under the store's write lock (or write
//!   transaction), so read-modify-write updates never interleave

pub mod client_db;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client_db::ClientDatabase;
pub use memory::InMemoryClientStore;

/// Persisted client identity record.
///
/// Holds the secret hash, so it never leaves the service as-is; API
/// responses use [`ClientView`](crate::models::ClientView).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Unique client identifier (UUID v4), immutable
    pub client_id: String,
    /// Encoded one-way hash of the client secret
    pub client_secret_hash: String,
    /// Display name
    pub name: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Never decreases
    pub updated_at: DateTime<Utc>,
    /// Inactive clients cannot obtain tokens
    pub is_active: bool,
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Backing store for client records.
pub trait ClientStore: Send + Sync {
    /// Point lookup.
    fn get(&self, client_id: &str) -> StoreResult<Option<ClientRecord>>;

    /// Insert a new record; fails with `AlreadyExists` if the id is taken.
    fn insert(&self, record: &ClientRecord) -> StoreResult<()>;

    /// Apply `apply` to an existing record and persist the result.
    ///
    /// Fails with `NotFound` if the id is unknown.
    fn modify(
        &self,
        client_id: &str,
        apply: &mut dyn FnMut(&mut ClientRecord),
    ) -> StoreResult<ClientRecord>;

    /// All records, oldest first.
    fn list(&self) -> StoreResult<Vec<ClientRecord>>;
}

/// Sort records oldest first, ties broken by id.
pub(crate) fn sort_records(records: &mut [ClientRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A store whose every operation fails as unavailable.
    pub struct FailingClientStore;

    impl ClientStore for FailingClientStore {
        fn get(&self, _client_id: &str) -> StoreResult<Option<ClientRecord>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn insert(&self, _record: &ClientRecord) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn modify(
            &self,
            _client_id: &str,
            _apply: &mut dyn FnMut(&mut ClientRecord),
        ) -> StoreResult<ClientRecord> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        fn list(&self) -> StoreResult<Vec<ClientRecord>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    pub fn sample_record(client_id: &str, name: &str) -> ClientRecord {
        let now = Utc::now();
        ClientRecord {
            client_id: client_id.to_string(),
            client_secret_hash: "pbkdf2-sha256$1$c2FsdA$aGFzaA".to_string(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }
}
