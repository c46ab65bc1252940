// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory record store for tests and ephemeral deployments.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{resource_id_from_key, RecordStore, StoreError, StoreResult};
use crate::models::{RecordKey, TenantId};
use crate::records::EncryptedRecord;

/// Records keyed by [`RecordKey::to_bytes`], so listing matches the redb
/// store's ordering.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<Vec<u8>, EncryptedRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>> {
        Ok(self
            .records
            .read()
            .map_err(poisoned)?
            .get(&key.to_bytes())
            .cloned())
    }

    fn insert(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<bool> {
        match self.records.write().map_err(poisoned)?.entry(key.to_bytes()) {
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    fn put(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<()> {
        self.records
            .write()
            .map_err(poisoned)?
            .insert(key.to_bytes(), record.clone());
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>> {
        Ok(self
            .records
            .write()
            .map_err(poisoned)?
            .remove(&key.to_bytes()))
    }

    fn list(
        &self,
        tenant: &TenantId,
        resource_type: &str,
    ) -> StoreResult<Vec<(String, EncryptedRecord)>> {
        let prefix = RecordKey::type_prefix(tenant, resource_type);
        let records = self.records.read().map_err(poisoned)?;
        records
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| Ok((resource_id_from_key(k, &prefix)?, v.clone())))
            .collect()
    }

    fn health_check(&self) -> StoreResult<()> {
        let _records = self.records.read().map_err(poisoned)?;
        Ok(())
    }
}
