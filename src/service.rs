// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # PHI Service
//!
//! The seams the rest of the application uses to handle sensitive records.
//! Nothing outside this crate touches the field cipher directly.
//!
//! ## Write path
//!
//! ```text
//! guard -> encrypt -> store write -> cache.invalidate(record) + invalidate_prefix -> audit
//!                                                                    | failed: restore store, invalidate
//! ```
//!
//! ## Read path
//!
//! ```text
//! guard -> cache.get | (cache.generation -> store.get -> decrypt -> cache.put) -> audit -> respond
//! ```
//!
//! A denied caller is audited and refused before any decrypt is attempted.
//! A failed audit write fails the operation, and a write whose audit event
//! cannot be recorded is undone in storage. Cache trouble on the read path
//! degrades to a miss; on the write path a failed invalidation fails the
//! operation so a stale entry is never acknowledged. Fills carry the cache
//! generation taken before the storage read, so a read racing a write cannot
//! re-populate the pre-write value.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::access::{AccessGuard, Action, Caller};
use crate::audit::{AuditAction, AuditDetail, AuditEvent, AuditRecorder};
use crate::cache::{CacheError, CacheKey, CachedValue, RecordCache};
use crate::error::{PhiError, PhiResult};
use crate::models::{RecordKey, TenantId};
use crate::records::{DecryptedRecord, EncryptedRecord, PayloadTransformer, Record, RecordSchema};
use crate::storage::{RecordStore, StoreError};

/// Resource id recorded for collection reads.
const ALL_RESOURCES: &str = "*";

/// Facade over transformer, store, cache, audit and guard.
pub struct PhiService {
    transformer: PayloadTransformer,
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn RecordCache>,
    audit: AuditRecorder,
    guard: AccessGuard,
    cache_ttl: Duration,
}

impl PhiService {
    pub fn new(
        transformer: PayloadTransformer,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn RecordCache>,
        audit: AuditRecorder,
        guard: AccessGuard,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            transformer,
            store,
            cache,
            audit,
            guard,
            cache_ttl,
        }
    }

    // =========================================================================
    // Caller seams
    // =========================================================================

    /// Encrypt the declared sensitive fields of `record`.
    pub fn encrypt_payload(
        &self,
        schema: &RecordSchema,
        record: &Record,
    ) -> PhiResult<EncryptedRecord> {
        Ok(self.transformer.encrypt_payload(schema, record)?)
    }

    /// Check the caller against the guard, then decrypt.
    ///
    /// A denied caller produces an `unauthorized_attempt` event and no
    /// decrypt call. Each redacted field produces one `decrypt_failure`
    /// event.
    pub fn authorize_then_decrypt(
        &self,
        caller: &Caller,
        key: &RecordKey,
        schema: &RecordSchema,
        record: &EncryptedRecord,
    ) -> PhiResult<DecryptedRecord> {
        self.authorize(caller, key, Action::Read, schema)?;
        self.decrypt_and_report(caller, key, schema, record)
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Store a new record and return its resource id.
    ///
    /// The id is taken from the record's `id` field, or generated (and
    /// written into the record) when absent.
    pub fn create_record(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        schema: &RecordSchema,
        mut record: Record,
    ) -> PhiResult<String> {
        let resource_id = match record.get("id") {
            None | Some(Value::Null) => {
                let id = uuid::Uuid::new_v4().to_string();
                record.insert("id".into(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(_) => {
                return Err(PhiError::InvalidPayload(
                    "`id` must be a non-empty string".into(),
                ))
            }
        };
        let key = RecordKey::new(tenant.clone(), schema.resource_type, resource_id.clone());
        self.authorize(caller, &key, Action::Create, schema)?;

        let encrypted = self.transformer.encrypt_payload(schema, &record)?;
        let detail = AuditDetail::new().count(
            "sensitive_fields",
            sensitive_present(schema, &record),
        );
        match self.store.insert(&key, &encrypted) {
            Ok(true) => {}
            Ok(false) => return Err(PhiError::InvalidPayload(format!("{key} already exists"))),
            Err(e) => return Err(self.store_failed(caller, &key, AuditAction::Create, detail, e)),
        }
        self.finish_write(caller, &key, AuditAction::Create, detail, None)?;

        tracing::debug!(
            tenant_id = %tenant,
            resource_type = schema.resource_type,
            resource_id = %resource_id,
            "record created"
        );
        Ok(resource_id)
    }

    /// Read one record.
    pub fn read_record(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        schema: &RecordSchema,
        resource_id: &str,
    ) -> PhiResult<DecryptedRecord> {
        let key = RecordKey::new(tenant.clone(), schema.resource_type, resource_id);
        self.authorize(caller, &key, Action::Read, schema)?;

        let cache_key = CacheKey::record(&key);
        if let Some(CachedValue::Record(record)) = self.cache_get(&cache_key) {
            self.audit.log(
                &AuditEvent::new(AuditAction::Read, caller, &key)
                    .with_detail(AuditDetail::new().field("source", "cache")),
            )?;
            return Ok(record);
        }

        let generation = self.cache_generation(tenant, schema.resource_type);
        let Some(encrypted) = self.store.get(&key)? else {
            return self.not_found(caller, &key, AuditAction::Read);
        };

        let decrypted = self.decrypt_and_report(caller, &key, schema, &encrypted)?;
        if !decrypted.is_partial() {
            self.cache_put(cache_key, CachedValue::Record(decrypted.clone()), generation);
        }

        self.audit.log(
            &AuditEvent::new(AuditAction::Read, caller, &key).with_detail(
                AuditDetail::new()
                    .field("source", "store")
                    .count("redacted", decrypted.redactions().len()),
            ),
        )?;
        Ok(decrypted)
    }

    /// Merge `patch` into an existing record.
    ///
    /// Only sensitive fields present in `patch` are re-encrypted; stored
    /// envelopes for the other sensitive fields are kept as they are.
    pub fn update_record(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        schema: &RecordSchema,
        resource_id: &str,
        patch: Record,
    ) -> PhiResult<()> {
        let key = RecordKey::new(tenant.clone(), schema.resource_type, resource_id);
        self.authorize(caller, &key, Action::Update, schema)?;

        if let Some(id) = patch.get("id") {
            if id.as_str() != Some(resource_id) {
                return Err(PhiError::InvalidPayload("`id` cannot be changed".into()));
            }
        }

        let Some(previous) = self.store.get(&key)? else {
            return self.not_found(caller, &key, AuditAction::Update);
        };
        let mut stored = previous.clone();

        let mut changed = Vec::new();
        let mut other_changed = 0;
        for (field, value) in &patch {
            match schema.sensitive_name(field) {
                Some(name) => changed.push(name),
                None if stored.get(field) != Some(value) => other_changed += 1,
                None => {}
            }
        }

        let encrypted_patch = self.transformer.encrypt_payload(schema, &patch)?;
        stored.fields_mut().extend(encrypted_patch.into_fields());

        let detail = AuditDetail::new()
            .fields("changed", &changed)
            .count("other_changed", other_changed);
        if let Err(e) = self.store.put(&key, &stored) {
            return Err(self.store_failed(caller, &key, AuditAction::Update, detail, e));
        }
        self.finish_write(caller, &key, AuditAction::Update, detail, Some(&previous))
    }

    pub fn delete_record(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        schema: &RecordSchema,
        resource_id: &str,
    ) -> PhiResult<()> {
        let key = RecordKey::new(tenant.clone(), schema.resource_type, resource_id);
        self.authorize(caller, &key, Action::Delete, schema)?;

        let Some(removed) = self.store.delete(&key)? else {
            return self.not_found(caller, &key, AuditAction::Delete);
        };
        self.finish_write(caller, &key, AuditAction::Delete, AuditDetail::new(), Some(&removed))
    }

    /// Every record of one type in one tenant.
    pub fn list_records(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        schema: &RecordSchema,
    ) -> PhiResult<Vec<DecryptedRecord>> {
        let key = RecordKey::new(tenant.clone(), schema.resource_type, ALL_RESOURCES);
        self.authorize(caller, &key, Action::Read, schema)?;

        let cache_key = CacheKey::list(tenant, schema.resource_type);
        if let Some(CachedValue::List(records)) = self.cache_get(&cache_key) {
            self.audit.log(
                &AuditEvent::new(AuditAction::Read, caller, &key).with_detail(
                    AuditDetail::new()
                        .field("source", "cache")
                        .count("records", records.len()),
                ),
            )?;
            return Ok(records);
        }

        let generation = self.cache_generation(tenant, schema.resource_type);
        let mut records = Vec::new();
        let mut redacted = 0;
        for (resource_id, encrypted) in self.store.list(tenant, schema.resource_type)? {
            let record_key = RecordKey::new(tenant.clone(), schema.resource_type, resource_id);
            let decrypted = self.decrypt_and_report(caller, &record_key, schema, &encrypted)?;
            redacted += decrypted.redactions().len();
            records.push(decrypted);
        }

        if redacted == 0 {
            self.cache_put(cache_key, CachedValue::List(records.clone()), generation);
        }

        self.audit.log(
            &AuditEvent::new(AuditAction::Read, caller, &key).with_detail(
                AuditDetail::new()
                    .field("source", "store")
                    .count("records", records.len())
                    .count("redacted", redacted),
            ),
        )?;
        Ok(records)
    }

    /// Readiness of the store and the audit sink.
    pub fn health_check(&self) -> PhiResult<()> {
        self.store_health()?;
        self.audit_health()
    }

    pub fn store_health(&self) -> PhiResult<()> {
        Ok(self.store.health_check()?)
    }

    pub fn audit_health(&self) -> PhiResult<()> {
        Ok(self.audit.health_check()?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn authorize(
        &self,
        caller: &Caller,
        key: &RecordKey,
        action: Action,
        schema: &RecordSchema,
    ) -> PhiResult<()> {
        let Err(denial) = self.guard.authorize(caller, &key.tenant_id, action, schema) else {
            return Ok(());
        };

        tracing::warn!(
            actor_id = %caller.actor_id,
            role = %caller.role,
            tenant_id = %key.tenant_id,
            resource_type = key.resource_type,
            action = %action,
            reason = denial.code(),
            "access denied"
        );
        self.audit.log(
            &AuditEvent::new(AuditAction::UnauthorizedAttempt, caller, key)
                .failed()
                .with_detail(
                    AuditDetail::new()
                        .field("action", action.as_str())
                        .reason(denial.code()),
                ),
        )?;
        Err(PhiError::AccessDenied(denial))
    }

    fn decrypt_and_report(
        &self,
        caller: &Caller,
        key: &RecordKey,
        schema: &RecordSchema,
        record: &EncryptedRecord,
    ) -> PhiResult<DecryptedRecord> {
        let decrypted = self.transformer.decrypt_payload(schema, record);
        for redaction in decrypted.redactions() {
            self.audit.log(
                &AuditEvent::new(AuditAction::DecryptFailure, caller, key)
                    .failed()
                    .with_detail(
                        AuditDetail::new()
                            .field("field", redaction.field)
                            .reason(redaction.reason),
                    ),
            )?;
        }
        Ok(decrypted)
    }

    /// Audit a write the store refused.
    fn store_failed(
        &self,
        caller: &Caller,
        key: &RecordKey,
        action: AuditAction,
        detail: AuditDetail,
        error: StoreError,
    ) -> PhiError {
        // The audit error, if any, is already logged by the recorder.
        let _ = self.audit.log(
            &AuditEvent::new(action, caller, key)
                .failed()
                .with_detail(detail.reason("store_unavailable")),
        );
        error.into()
    }

    /// Invalidate cached copies of `key` and its list, then audit.
    ///
    /// `previous` is what the store held before the write (`None` for a
    /// create). If the audit event cannot be recorded the store is put back
    /// to it and the audit error returned.
    fn finish_write(
        &self,
        caller: &Caller,
        key: &RecordKey,
        action: AuditAction,
        detail: AuditDetail,
        previous: Option<&EncryptedRecord>,
    ) -> PhiResult<()> {
        let invalidated = self.invalidate(key);

        let event = AuditEvent::new(action, caller, key);
        let event = match &invalidated {
            Ok(()) => event.with_detail(detail),
            Err(_) => event
                .failed()
                .with_detail(detail.reason("cache_invalidation_failed")),
        };
        if let Err(e) = self.audit.log(&event) {
            self.roll_back(key, previous);
            return Err(e.into());
        }

        invalidated.map_err(|e| {
            tracing::error!(
                tenant_id = %key.tenant_id,
                resource_type = key.resource_type,
                resource_id = %key.resource_id,
                error = %e,
                "cache invalidation failed after write"
            );
            PhiError::Cache(e)
        })
    }

    /// Restore the store to `previous` after an unaudited write.
    fn roll_back(&self, key: &RecordKey, previous: Option<&EncryptedRecord>) {
        let restored = match previous {
            Some(record) => self.store.put(key, record),
            None => self.store.delete(key).map(drop),
        };
        if let Err(e) = restored {
            tracing::error!(
                tenant_id = %key.tenant_id,
                resource_type = key.resource_type,
                resource_id = %key.resource_id,
                error = %e,
                "failed to roll back unaudited write"
            );
            return;
        }
        if let Err(e) = self.invalidate(key) {
            tracing::error!(
                tenant_id = %key.tenant_id,
                resource_type = key.resource_type,
                resource_id = %key.resource_id,
                error = %e,
                "cache invalidation failed after rollback"
            );
        }
        tracing::warn!(
            tenant_id = %key.tenant_id,
            resource_type = key.resource_type,
            resource_id = %key.resource_id,
            "write rolled back; audit event not recorded"
        );
    }

    fn invalidate(&self, key: &RecordKey) -> Result<(), CacheError> {
        let cache_key = CacheKey::record(key);
        retry_once("invalidate", || self.cache.invalidate(&cache_key))?;
        retry_once("invalidate_prefix", || {
            self.cache.invalidate_prefix(&key.tenant_id, key.resource_type)
        })
    }

    fn cache_get(&self, key: &CacheKey) -> Option<CachedValue> {
        match retry_once("get", || self.cache.get(key)) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    tenant_id = %key.tenant_id,
                    resource_type = key.resource_type,
                    error = %e,
                    "cache read failed; falling back to storage"
                );
                None
            }
        }
    }

    /// Fill generation for a storage read, or `None` when the cache is down
    /// (the fill is then skipped).
    fn cache_generation(&self, tenant_id: &TenantId, resource_type: &str) -> Option<u64> {
        match retry_once("generation", || self.cache.generation(tenant_id, resource_type)) {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    resource_type,
                    error = %e,
                    "cache generation unavailable; result will not be cached"
                );
                None
            }
        }
    }

    fn cache_put(&self, key: CacheKey, value: CachedValue, generation: Option<u64>) {
        let Some(generation) = generation else {
            return;
        };
        let tenant_id = key.tenant_id.clone();
        let put = retry_once("put", || {
            self.cache
                .put(key.clone(), value.clone(), self.cache_ttl, generation)
        });
        if let Err(e) = put {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "cache write failed");
        }
    }

    fn not_found<T>(&self, caller: &Caller, key: &RecordKey, action: AuditAction) -> PhiResult<T> {
        self.audit.log(
            &AuditEvent::new(action, caller, key)
                .failed()
                .with_detail(AuditDetail::new().reason("not_found")),
        )?;
        Err(PhiError::NotFound {
            resource_type: key.resource_type,
            resource_id: key.resource_id.clone(),
        })
    }
}

impl std::fmt::Debug for PhiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhiService")
            .field("transformer", &self.transformer)
            .field("audit", &self.audit)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

fn retry_once<T>(
    op: &'static str,
    call: impl Fn() -> Result<T, CacheError>,
) -> Result<T, CacheError> {
    call().or_else(|e| {
        tracing::warn!(op, error = %e, "cache call failed; retrying once");
        call()
    })
}

fn sensitive_present(schema: &RecordSchema, record: &Record) -> usize {
    schema
        .sensitive_fields
        .iter()
        .filter(|f| record.get(**f).is_some_and(|v| !v.is_null()))
        .count()
}
