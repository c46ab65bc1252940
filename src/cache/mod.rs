// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Tenant-Scoped Cache
//!
//! Fronts reads of decrypted records. Entries are partitioned by key
//! structure: [`CacheKey`] holds the tenant as its own component, so two
//! tenants can never address the same entry.
//!
//! Values are [`DecryptedRecord`]s. An envelope can never be cached because
//! only the payload transformer can build a `DecryptedRecord`.
//!
//! ## Fill ordering
//!
//! Every `(tenant, resource_type)` has a generation that both invalidation
//! calls advance. A reader takes the generation before it reads storage and
//! hands it to [`RecordCache::put`]; a fill whose generation has moved on is
//! dropped, so a value read before a write can never land after that
//! write's invalidation.

mod lru_cache;

use std::time::Duration;

use thiserror::Error;

use crate::models::{RecordKey, TenantId};
use crate::records::DecryptedRecord;

pub use lru_cache::LruRecordCache;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// What a key addresses within one tenant and record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheScope {
    Record(String),
    /// The full list of a tenant's records of one type.
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant_id: TenantId,
    pub resource_type: &'static str,
    pub scope: CacheScope,
}

impl CacheKey {
    pub fn record(key: &RecordKey) -> Self {
        Self {
            tenant_id: key.tenant_id.clone(),
            resource_type: key.resource_type,
            scope: CacheScope::Record(key.resource_id.clone()),
        }
    }

    pub fn list(tenant_id: &TenantId, resource_type: &'static str) -> Self {
        Self {
            tenant_id: tenant_id.clone(),
            resource_type,
            scope: CacheScope::List,
        }
    }

    /// Whether this key lies under `(tenant, resource_type)`.
    pub fn has_prefix(&self, tenant_id: &TenantId, resource_type: &str) -> bool {
        &self.tenant_id == tenant_id && self.resource_type == resource_type
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Record(DecryptedRecord),
    List(Vec<DecryptedRecord>),
}

/// Cache boundary. Implementations may be remote; every call can fail.
pub trait RecordCache: Send + Sync {
    /// `Ok(None)` is a miss (absent or expired).
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError>;

    /// Current fill generation of `(tenant, resource_type)`.
    fn generation(&self, tenant_id: &TenantId, resource_type: &str) -> Result<u64, CacheError>;

    /// Store `value` unless `generation` is older than the current one.
    /// A stale fill is silently skipped.
    fn put(
        &self,
        key: CacheKey,
        value: CachedValue,
        ttl: Duration,
        generation: u64,
    ) -> Result<(), CacheError>;

    /// Drop one entry and advance the generation of its prefix.
    fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Drop every entry (records and lists) under `(tenant, resource_type)`
    /// and advance its generation.
    fn invalidate_prefix(&self, tenant_id: &TenantId, resource_type: &str) -> Result<(), CacheError>;
}
