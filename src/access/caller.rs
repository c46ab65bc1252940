// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

use super::Role;
use crate::models::TenantId;

/// Who is making the request.
///
/// Built by the (external) session layer after token verification; this
/// crate only consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Stable actor identifier (recorded in every audit event).
    pub actor_id: String,
    pub role: Role,
    /// Tenant the caller's session belongs to.
    pub tenant_id: TenantId,
}

impl Caller {
    pub fn new(actor_id: impl Into<String>, role: Role, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
            tenant_id: tenant_id.into(),
        }
    }

    /// Whether this caller's session is scoped to `tenant`.
    pub fn belongs_to(&self, tenant: &TenantId) -> bool {
        &self.tenant_id == tenant
    }
}
