// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Audit Recorder
//!
//! Append-only trail of every access to sensitive records.
//!
//! - [`AuditEvent`] is the persisted shape. Its `detail` can only be built
//!   through [`AuditDetail`], which accepts static field names, counts and
//!   reason codes, never record values.
//! - [`AuditSink`] is the storage boundary. [`FileAuditSink`] writes sealed
//!   daily JSONL files; [`MemoryAuditSink`] backs tests.
//! - [`AuditRecorder`] retries a bounded number of times. When it gives up,
//!   the triggering operation fails: an unaudited access is a defect.
//!
//! There is no delete API. Retention is handled outside the application.

mod event;
mod recorder;
mod sink;

use thiserror::Error;

use crate::config::ConfigError;

pub use event::{AuditAction, AuditDetail, AuditEvent, AuditOutcome};
pub use recorder::AuditRecorder;
pub use sink::{AuditSink, FileAuditSink, MemoryAuditSink};

/// Audit sink failures.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialization(String),

    #[error("invalid audit date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("audit seal mismatch in {date} at line {line}")]
    IntegrityViolation { date: String, line: usize },

    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("audit seal key: {0}")]
    Key(#[from] ConfigError),
}

pub type AuditResult<T> = Result<T, AuditError>;
