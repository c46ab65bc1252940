// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Record Storage
//!
//! Persists [`EncryptedRecord`]s. Sensitive columns are opaque envelopes to
//! this layer; only identifiers (tenant, resource type, resource id) take
//! part in keys and scans.
//!
//! ## Key Layout
//!
//! ```text
//! u32be(len tenant) tenant u32be(len type) type resource_id
//! ```
//!
//! A tenant/type listing is a prefix scan over the first four components.

mod memory;
mod redb_store;

use crate::models::{RecordKey, TenantId};
use crate::records::EncryptedRecord;

pub use memory::InMemoryRecordStore;
pub use redb_store::RedbRecordStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

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

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Resource id from a full key, given the tenant/type prefix it was found under.
fn resource_id_from_key(key: &[u8], prefix: &[u8]) -> StoreResult<String> {
    key.strip_prefix(prefix)
        .and_then(|id| std::str::from_utf8(id).ok())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Unavailable("corrupt record key".into()))
}

/// Storage boundary for encrypted records.
///
/// Concurrent writers to one key are resolved by the store (last commit
/// wins); callers get no optimistic-concurrency guarantee.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>>;

    /// Insert only if `key` is free, atomically. Returns `false` and leaves
    /// the existing record untouched when the key is taken.
    fn insert(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<bool>;

    /// Insert or replace.
    fn put(&self, key: &RecordKey, record: &EncryptedRecord) -> StoreResult<()>;

    /// Remove a record, returning what was stored.
    fn delete(&self, key: &RecordKey) -> StoreResult<Option<EncryptedRecord>>;

    /// Every record of `resource_type` in `tenant` with its resource id,
    /// ordered by resource id.
    fn list(
        &self,
        tenant: &TenantId,
        resource_type: &str,
    ) -> StoreResult<Vec<(String, EncryptedRecord)>>;

    fn health_check(&self) -> StoreResult<()>;
}
