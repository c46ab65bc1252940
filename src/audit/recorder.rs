// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fire-and-confirm audit logging with bounded retry.

use std::sync::Arc;

use super::{AuditEvent, AuditResult, AuditSink};

/// Writes events to a sink, retrying up to `max_attempts` times.
///
/// The same event (same `event_id`) is resubmitted on every attempt.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    max_attempts: u32,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>, max_attempts: u32) -> Self {
        Self {
            sink,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Record an event. An `Err` means the event is not on the trail and the
    /// caller's operation must fail.
    pub fn log(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut attempt = 1;
        loop {
            match self.sink.append(event) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        attempt,
                        error = %e,
                        "audit write failed; retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        event_id = %event.event_id,
                        action = ?event.action,
                        tenant_id = %event.tenant_id,
                        resource_type = %event.resource_type,
                        attempts = attempt,
                        error = %e,
                        "audit write failed; giving up"
                    );
                    return Err(e);
                }
            }
        }
    }

    pub fn health_check(&self) -> AuditResult<()> {
        self.sink.health_check()
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
