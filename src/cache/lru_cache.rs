// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process LRU cache with per-entry TTL.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::{CacheError, CacheKey, CachedValue, RecordCache};
use crate::models::TenantId;

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

struct Inner {
    entries: LruCache<CacheKey, CacheEntry>,
    /// Fill generation per `(tenant, resource_type)`. Absent means 0.
    generations: HashMap<(TenantId, String), u64>,
}

impl Inner {
    fn generation(&self, tenant_id: &TenantId, resource_type: &str) -> u64 {
        self.generations
            .get(&(tenant_id.clone(), resource_type.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn advance(&mut self, tenant_id: &TenantId, resource_type: &str) {
        *self
            .generations
            .entry((tenant_id.clone(), resource_type.to_string()))
            .or_insert(0) += 1;
    }
}

/// Bounded in-process cache for decrypted records.
pub struct LruRecordCache {
    inner: Mutex<Inner>,
}

impl LruRecordCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                generations: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, CacheError> {
        self.inner
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".into()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|c| c.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordCache for LruRecordCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError> {
        let mut inner = self.lock()?;
        if let Some(entry) = inner.entries.get(key) {
            if Instant::now() < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
            inner.entries.pop(key);
        }
        Ok(None)
    }

    fn generation(&self, tenant_id: &TenantId, resource_type: &str) -> Result<u64, CacheError> {
        Ok(self.lock()?.generation(tenant_id, resource_type))
    }

    fn put(
        &self,
        key: CacheKey,
        value: CachedValue,
        ttl: Duration,
        generation: u64,
    ) -> Result<(), CacheError> {
        let mut inner = self.lock()?;
        if inner.generation(&key.tenant_id, key.resource_type) != generation {
            tracing::debug!(
                tenant_id = %key.tenant_id,
                resource_type = key.resource_type,
                "skipping stale cache fill"
            );
            return Ok(());
        }
        inner.entries.put(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut inner = self.lock()?;
        inner.entries.pop(key);
        inner.advance(&key.tenant_id, key.resource_type);
        Ok(())
    }

    fn invalidate_prefix(&self, tenant_id: &TenantId, resource_type: &str) -> Result<(), CacheError> {
        let mut inner = self.lock()?;
        let doomed: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.has_prefix(tenant_id, resource_type))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            inner.entries.pop(key);
        }
        inner.advance(tenant_id, resource_type);
        Ok(())
    }
}

impl std::fmt::Debug for LruRecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruRecordCache")
            .field("len", &self.len())
            .finish()
    }
}
