// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory client store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{sort_records, ClientRecord, ClientStore, StoreError, StoreResult};

/// Process-local client store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryClientStore {
    records: RwLock<HashMap<String, ClientRecord>>,
}

impl InMemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("client store lock poisoned".to_string())
}

impl ClientStore for InMemoryClientStore {
    fn get(&self, client_id: &str) -> StoreResult<Option<ClientRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(client_id).cloned())
    }

    fn insert(&self, record: &ClientRecord) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&record.client_id) {
            return Err(StoreError::AlreadyExists(format!(
                "Client {}",
                record.client_id
            )));
        }
        records.insert(record.client_id.clone(), record.clone());
        Ok(())
    }

    fn modify(
        &self,
        client_id: &str,
        apply: &mut dyn FnMut(&mut ClientRecord),
    ) -> StoreResult<ClientRecord> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let record = records
            .get_mut(client_id)
            .ok_or_else(|| StoreError::NotFound(format!("Client {client_id}")))?;
        apply(record);
        Ok(record.clone())
    }

    fn list(&self) -> StoreResult<Vec<ClientRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut all: Vec<ClientRecord> = records.values().cloned().collect();
        sort_records(&mut all);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::sample_record;

    #[test]
    fn insert_then_get() {
        let store = InMemoryClientStore::new();
        store.insert(&sample_record("c1", "svc-a")).unwrap();

        let record = store.get("c1").unwrap().unwrap();
        assert_eq!(record.name, "svc-a");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = InMemoryClientStore::new();
        store.insert(&sample_record("c1", "svc-a")).unwrap();
        assert!(matches!(
            store.insert(&sample_record("c1", "svc-b")),
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.get("c1").unwrap().unwrap().name, "svc-a");
    }

    #[test]
    fn modify_updates_in_place() {
        let store = InMemoryClientStore::new();
        store.insert(&sample_record("c1", "svc-a")).unwrap();

        let updated = store.modify("c1", &mut |r| r.is_active = false).unwrap();
        assert!(!updated.is_active);
        assert!(!store.get("c1").unwrap().unwrap().is_active);
    }

    #[test]
    fn modify_unknown_is_not_found() {
        let store = InMemoryClientStore::new();
        assert!(matches!(
            store.modify("nope", &mut |_| {}),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_is_oldest_first() {
        let store = InMemoryClientStore::new();
        let mut older = sample_record("b", "older");
        older.created_at -= chrono::Duration::seconds(10);
        store.insert(&sample_record("a", "newer")).unwrap();
        store.insert(&older).unwrap();

        let names: Vec<_> = store.list().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["older", "newer"]);
    }
}
