// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{Action, Caller};
use crate::models::{RecordKey, TenantId};

/// Kinds of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    /// A stored envelope failed authentication and was redacted.
    DecryptFailure,
    /// The access guard refused the caller.
    UnauthorizedAttempt,
}

impl From<Action> for AuditAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Create => AuditAction::Create,
            Action::Read => AuditAction::Read,
            Action::Update => AuditAction::Update,
            Action::Delete => AuditAction::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// An audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Caller that triggered the event.
    pub actor_id: String,
    pub action: AuditAction,
    pub resource_type: String,
    /// `*` for collection reads.
    pub resource_id: String,
    /// Tenant whose record was addressed (not necessarily the caller's).
    pub tenant_id: TenantId,
    pub outcome: AuditOutcome,
    /// Sanitized description, see [`AuditDetail`].
    pub detail: String,
}

impl AuditEvent {
    /// Create a successful event for `caller` acting on `key`.
    pub fn new(action: AuditAction, caller: &Caller, key: &RecordKey) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor_id: caller.actor_id.clone(),
            action,
            resource_type: key.resource_type.to_string(),
            resource_id: key.resource_id.clone(),
            tenant_id: key.tenant_id.clone(),
            outcome: AuditOutcome::Success,
            detail: String::new(),
        }
    }

    /// Mark as failed.
    pub fn failed(mut self) -> Self {
        self.outcome = AuditOutcome::Failure;
        self
    }

    pub fn with_detail(mut self, detail: AuditDetail) -> Self {
        self.detail = detail.to_string();
        self
    }

    /// Day bucket the event is filed under (`YYYY-MM-DD`, UTC).
    pub fn date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Allow-listed builder for [`AuditEvent::detail`].
///
/// Every key and every name is `&'static str`, so only identifiers known at
/// compile time (field names, reason codes) and counts can reach the trail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditDetail {
    parts: Vec<(&'static str, String)>,
}

impl AuditDetail {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single field name, e.g. `field=diagnosis`.
    pub fn field(mut self, key: &'static str, name: &'static str) -> Self {
        self.parts.push((key, name.to_string()));
        self
    }

    /// A list of field names, e.g. `changed=phone,address`.
    pub fn fields(mut self, key: &'static str, names: &[&'static str]) -> Self {
        self.parts.push((key, names.join(",")));
        self
    }

    pub fn count(mut self, key: &'static str, n: usize) -> Self {
        self.parts.push((key, n.to_string()));
        self
    }

    /// A static reason code, e.g. `reason=authentication_failed`.
    pub fn reason(mut self, code: &'static str) -> Self {
        self.parts.push(("reason", code.to_string()));
        self
    }
}

impl fmt::Display for AuditDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
