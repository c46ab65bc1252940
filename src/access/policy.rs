// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization policy and the guard that applies it.

use std::sync::Arc;

use super::{Action, Caller, Role};
use crate::models::TenantId;
use crate::records::RecordSchema;

/// Decides whether a role may perform an action on a resource type.
///
/// The full policy lives with the authorization subsystem; this crate
/// depends only on this boundary.
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, role: Role, action: Action, resource_type: &str) -> bool;
}

/// Built-in role table. See [`Role`] for the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl AccessPolicy for RolePolicy {
    fn authorize(&self, role: Role, action: Action, resource_type: &str) -> bool {
        use Action::*;

        match role {
            Role::Admin => true,
            Role::Physician => matches!(action, Create | Read | Update),
            Role::Nurse => match resource_type {
                "clinical_note" => matches!(action, Create | Read | Update),
                _ => action == Read,
            },
            Role::Receptionist => {
                resource_type == "patient" && matches!(action, Create | Read | Update)
            }
            Role::Billing => resource_type == "patient" && action == Read,
            Role::Auditor => false,
        }
    }
}

/// Why the guard refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The caller's session belongs to another tenant.
    TenantMismatch,
    /// The policy does not grant this role the action.
    RoleNotPermitted,
}

impl Denial {
    /// Static code for audit details.
    pub fn code(&self) -> &'static str {
        match self {
            Denial::TenantMismatch => "tenant_mismatch",
            Denial::RoleNotPermitted => "role_not_permitted",
        }
    }
}

/// Applies the tenant boundary and then the policy.
#[derive(Clone)]
pub struct AccessGuard {
    policy: Arc<dyn AccessPolicy>,
}

impl AccessGuard {
    pub fn new(policy: Arc<dyn AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn authorize(
        &self,
        caller: &Caller,
        tenant: &TenantId,
        action: Action,
        schema: &RecordSchema,
    ) -> Result<(), Denial> {
        if !caller.belongs_to(tenant) {
            return Err(Denial::TenantMismatch);
        }
        if !self.policy.authorize(caller.role, action, schema.resource_type) {
            return Err(Denial::RoleNotPermitted);
        }
        Ok(())
    }
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new(Arc::new(RolePolicy))
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").finish_non_exhaustive()
    }
}
