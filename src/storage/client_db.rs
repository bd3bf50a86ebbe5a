// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded client database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `clients`: client_id → serialized ClientRecord (JSON bytes)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{sort_records, ClientRecord, ClientStore, StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: client_id → serialized ClientRecord (JSON bytes).
const CLIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("clients");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClientDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type ClientDbResult<T> = Result<T, ClientDbError>;

impl From<ClientDbError> for StoreError {
    fn from(err: ClientDbError) -> Self {
        match err {
            ClientDbError::NotFound(what) => StoreError::NotFound(what),
            ClientDbError::AlreadyExists(what) => StoreError::AlreadyExists(what),
            ClientDbError::Serde(e) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

// =============================================================================
// ClientDatabase
// =============================================================================

/// Embedded ACID client record database.
pub struct ClientDatabase {
    db: Database,
}

impl ClientDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> ClientDbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn get_record(&self, client_id: &str) -> ClientDbResult<Option<ClientRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;
        match table.get(client_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert_record(&self, record: &ClientRecord) -> ClientDbResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CLIENTS)?;
            if table.get(record.client_id.as_str())?.is_some() {
                return Err(ClientDbError::AlreadyExists(format!(
                    "Client {}",
                    record.client_id
                )));
            }
            table.insert(record.client_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn modify_record(
        &self,
        client_id: &str,
        apply: &mut dyn FnMut(&mut ClientRecord),
    ) -> ClientDbResult<ClientRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(CLIENTS)?;
            let mut record: ClientRecord = match table.get(client_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(ClientDbError::NotFound(format!("Client {client_id}"))),
            };
            apply(&mut record);
            let json = serde_json::to_vec(&record)?;
            table.insert(client_id, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    fn list_records(&self) -> ClientDbResult<Vec<ClientRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLIENTS)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        sort_records(&mut records);
        Ok(records)
    }
}

impl ClientStore for ClientDatabase {
    fn get(&self, client_id: &str) -> StoreResult<Option<ClientRecord>> {
        Ok(self.get_record(client_id)?)
    }

    fn insert(&self, record: &ClientRecord) -> StoreResult<()> {
        Ok(self.insert_record(record)?)
    }

    fn modify(
        &self,
        client_id: &str,
        apply: &mut dyn FnMut(&mut ClientRecord),
    ) -> StoreResult<ClientRecord> {
        Ok(self.modify_record(client_id, apply)?)
    }

    fn list(&self) -> StoreResult<Vec<ClientRecord>> {
        Ok(self.list_records()?)
    }
}
