// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shared Identifier Types
//!
//! ## Tenant Id
//!
//! The [`TenantId`] newtype marks the isolation boundary. Every stored
//! record, cache entry and audit event carries one.
//!
//! ## Record Key
//!
//! [`RecordKey`] addresses one record: tenant, resource type and resource
//! id. Storage and cache keys are derived from it structurally, never from
//! string concatenation, so two tenants can never produce the same key.

use serde::{Deserialize, Serialize};

// =============================================================================
// Tenant Id
// =============================================================================

/// Identifier of an isolated customer/organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(value: String) -> Self {
        TenantId(value)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

// =============================================================================
// Record Key
// =============================================================================

/// Address of one record within one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub tenant_id: TenantId,
    pub resource_type: &'static str,
    pub resource_id: String,
}

impl RecordKey {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        resource_type: &'static str,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    /// Length-prefixed byte encoding: `len(tenant) tenant len(type) type id`.
    ///
    /// Every component boundary is explicit, so distinct keys never encode
    /// to the same bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Self::type_prefix(&self.tenant_id, self.resource_type);
        out.extend_from_slice(self.resource_id.as_bytes());
        out
    }

    /// Prefix covering every record of one type within one tenant.
    pub fn type_prefix(tenant_id: &TenantId, resource_type: &str) -> Vec<u8> {
        let tenant = tenant_id.as_str().as_bytes();
        let rt = resource_type.as_bytes();
        let mut out = Vec::with_capacity(8 + tenant.len() + rt.len());
        out.extend_from_slice(&(tenant.len() as u32).to_be_bytes());
        out.extend_from_slice(tenant);
        out.extend_from_slice(&(rt.len() as u32).to_be_bytes());
        out.extend_from_slice(rt);
        out
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.tenant_id, self.resource_type, self.resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_from_and_into_string() {
        let from_str: TenantId = "clinic-a".into();
        assert_eq!(from_str.0, "clinic-a");

        let from_string: TenantId = String::from("clinic-b").into();
        assert_eq!(from_string.as_str(), "clinic-b");

        let to_string: String = TenantId("clinic-c".into()).into();
        assert_eq!(to_string, "clinic-c");
    }

    #[test]
    fn key_bytes_cannot_collide_across_tenants() {
        // Naive "tenant:id" joining would make these equal.
        let a = RecordKey::new("a:b", "patient", "c");
        let b = RecordKey::new("a", "patient", "b:c");
        assert_ne!(a.to_bytes(), b.to_bytes());

        let c = RecordKey::new("ab", "patient", "1");
        let d = RecordKey::new("a", "bpatient", "1");
        assert_ne!(c.to_bytes(), d.to_bytes());
    }

    #[test]
    fn key_bytes_start_with_type_prefix() {
        let key = RecordKey::new("clinic-a", "patient", "p-1");
        let prefix = RecordKey::type_prefix(&key.tenant_id, "patient");
        assert!(key.to_bytes().starts_with(&prefix));

        let other_tenant = RecordKey::type_prefix(&TenantId::from("clinic-b"), "patient");
        assert!(!key.to_bytes().starts_with(&other_tenant));
    }
}
