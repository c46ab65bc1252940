// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded record store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `records`: [`RecordKey::to_bytes`] → serialized [`EncryptedRecord`] (JSON)

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{resource_id_from_key, RecordStore, StoreResult};
use crate::models::{RecordKey, TenantId};
use crate::records::EncryptedRecord;

const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// redb-backed [`RecordStore`].
pub struct RedbRecordStore {
    db: Database,
}

impl RedbRecordStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl RecordStore for RedbRecordStore {
    fn get(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        match table.get(key.to_bytes().as_slice())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<bool> {
        let json = serde_json::to_vec(record)?;
        let key = key.to_bytes();
        let write_txn = self.db.begin_write()?;
        let inserted = {
            let mut table = write_txn.open_table(RECORDS)?;
            let taken = table.get(key.as_slice())?.is_some();
            if !taken {
                table.insert(key.as_slice(), json.as_slice())?;
            }
            !taken
        };
        if inserted {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(inserted)
    }

    fn put(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            table.insert(key.to_bytes().as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(RECORDS)?;
            let removed = match table.remove(key.to_bytes().as_slice())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn list(
        &self,
        tenant: &TenantId,
        resource_type: &str,
    ) -> StoreResult<Vec<(String, EncryptedRecord)>> {
        let prefix = RecordKey::type_prefix(tenant, resource_type);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS)?;

        let mut records = Vec::new();
        for entry in table.range(prefix.as_slice()..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let id = resource_id_from_key(key.value(), &prefix)?;
            records.push((id, serde_json::from_slice(value.value())?));
        }
        Ok(records)
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(RECORDS)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedbRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRecordStore").finish_non_exhaustive()
    }
}
