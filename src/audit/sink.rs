// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit sinks.
//!
//! The file sink appends one JSON object per line to
//! `<dir>/<YYYY-MM-DD>/events.jsonl`. Each line carries a `seal`: an
//! HMAC-SHA256 over the previous line's seal and the event itself, so an
//! edited, removed or reordered line breaks verification from that point on.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64ct::{Base64, Encoding};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{AuditError, AuditEvent, AuditResult};
use crate::crypto::{KeyMaterial, KEY_LEN};
use crate::models::TenantId;

/// Label for the seal subkey derivation.
const SEAL_KEY_LABEL: &[u8] = b"phi-vault/audit-seal/v1";

/// Storage boundary for audit events.
pub trait AuditSink: Send + Sync {
    /// Durably append one event.
    fn append(&self, event: &AuditEvent) -> AuditResult<()>;

    /// Whether the sink can currently accept writes.
    fn health_check(&self) -> AuditResult<()>;
}

// =============================================================================
// File sink
// =============================================================================

#[derive(Serialize, Deserialize)]
struct SealedLine {
    #[serde(flatten)]
    event: AuditEvent,
    seal: String,
}

/// Daily JSONL files with a chained integrity seal.
pub struct FileAuditSink {
    dir: PathBuf,
    seal_key: Zeroizing<[u8; KEY_LEN]>,
    /// Date and seal of the last line written by this process.
    chain: Mutex<Option<(String, String)>>,
}

impl FileAuditSink {
    /// Open (creating if needed) the audit directory.
    pub fn open(dir: impl Into<PathBuf>, material: &KeyMaterial) -> AuditResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seal_key: material.derive_subkey(SEAL_KEY_LABEL)?,
            chain: Mutex::new(None),
        })
    }

    fn events_file(&self, date: &str) -> PathBuf {
        self.dir.join(date).join("events.jsonl")
    }

    fn seal(&self, previous: &str, event_json: &[u8]) -> AuditResult<Hmac<Sha256>> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(self.seal_key.as_slice())
            .map_err(|_| AuditError::Unavailable("invalid seal key".into()))?;
        mac.update(previous.as_bytes());
        mac.update(b"\n");
        mac.update(event_json);
        Ok(mac)
    }

    /// Seal of the last line in an existing file, or empty for a new file.
    fn last_seal_on_disk(path: &Path) -> AuditResult<String> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        };
        let mut last = String::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sealed: SealedLine = serde_json::from_str(&line)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            last = sealed.seal;
        }
        Ok(last)
    }

    fn read_lines(&self, date: &str) -> AuditResult<Vec<SealedLine>> {
        validate_date(date)?;
        let file = match File::open(self.events_file(date)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sealed: SealedLine = serde_json::from_str(&line).map_err(|e| {
                AuditError::Serialization(format!("failed to deserialize audit event: {e}"))
            })?;
            lines.push(sealed);
        }
        Ok(lines)
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> AuditResult<Vec<AuditEvent>> {
        Ok(self
            .read_lines(date)?
            .into_iter()
            .map(|line| line.event)
            .collect())
    }

    /// Read events for an inclusive date range.
    pub fn read_events_range(&self, start_date: &str, end_date: &str) -> AuditResult<Vec<AuditEvent>> {
        let start = validate_date(start_date)?;
        let end = validate_date(end_date)?;

        let mut all_events = Vec::new();
        let mut current = start;
        while current <= end {
            all_events.extend(self.read_events(&current.format("%Y-%m-%d").to_string())?);
            current = current
                .succ_opt()
                .ok_or_else(|| AuditError::InvalidDate(end_date.to_string()))?;
        }
        Ok(all_events)
    }

    /// Events addressed to one tenant on `date`.
    pub fn search_by_tenant(&self, tenant: &TenantId, date: &str) -> AuditResult<Vec<AuditEvent>> {
        Ok(self
            .read_events(date)?
            .into_iter()
            .filter(|e| &e.tenant_id == tenant)
            .collect())
    }

    /// Events touching one record on `date`.
    pub fn search_by_resource(
        &self,
        tenant: &TenantId,
        resource_type: &str,
        resource_id: &str,
        date: &str,
    ) -> AuditResult<Vec<AuditEvent>> {
        Ok(self
            .read_events(date)?
            .into_iter()
            .filter(|e| {
                &e.tenant_id == tenant
                    && e.resource_type == resource_type
                    && e.resource_id == resource_id
            })
            .collect())
    }

    /// Re-check every seal in a day's file. Returns the number of events.
    pub fn verify(&self, date: &str) -> AuditResult<usize> {
        let lines = self.read_lines(date)?;
        let mut previous = String::new();
        for (i, line) in lines.iter().enumerate() {
            let event_json = serde_json::to_vec(&line.event)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            let expected = Base64::decode_vec(&line.seal).map_err(|_| {
                AuditError::IntegrityViolation {
                    date: date.to_string(),
                    line: i + 1,
                }
            })?;
            self.seal(&previous, &event_json)?
                .verify_slice(&expected)
                .map_err(|_| AuditError::IntegrityViolation {
                    date: date.to_string(),
                    line: i + 1,
                })?;
            previous.clone_from(&line.seal);
        }
        Ok(lines.len())
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, event: &AuditEvent) -> AuditResult<()> {
        let date = event.date();
        let path = self.events_file(&date);

        let mut chain = self
            .chain
            .lock()
            .map_err(|_| AuditError::Unavailable("audit chain lock poisoned".into()))?;

        let previous = match chain.as_ref() {
            Some((chain_date, seal)) if *chain_date == date => seal.clone(),
            _ => Self::last_seal_on_disk(&path)?,
        };

        let event_json =
            serde_json::to_vec(event).map_err(|e| AuditError::Serialization(e.to_string()))?;
        let seal = Base64::encode_string(&self.seal(&previous, &event_json)?.finalize().into_bytes());

        let mut line = serde_json::to_vec(&SealedLine {
            event: event.clone(),
            seal: seal.clone(),
        })
        .map_err(|e| AuditError::Serialization(e.to_string()))?;
        line.push(b'\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        append_line(&mut file, &line)?;

        *chain = Some((date, seal));
        Ok(())
    }

    fn health_check(&self) -> AuditResult<()> {
        let meta = fs::metadata(&self.dir)?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(AuditError::Unavailable(format!(
                "{} is not a writable directory",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAuditSink")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// An append-only file as seen by [`append_line`].
trait AppendTarget: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write and sync one line, or leave the target at its previous length.
///
/// A line that is only partly written, or written but not synced, is cut
/// off again, so a retry never follows a torn line or a duplicate seal.
fn append_line(target: &mut impl AppendTarget, line: &[u8]) -> io::Result<()> {
    let len = target.len()?;
    let written = target.write_all(line).and_then(|()| target.sync());
    if let Err(e) = written {
        if let Err(trunc) = target.truncate(len) {
            tracing::error!(error = %trunc, "failed to truncate audit file after a failed append");
        }
        return Err(e);
    }
    Ok(())
}

fn validate_date(date: &str) -> AuditResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| AuditError::InvalidDate(date.to_string()))
}

// =============================================================================
// Memory sink
// =============================================================================

/// In-process sink for tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> AuditResult<()> {
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }

    fn health_check(&self) -> AuditResult<()> {
        Ok(())
    }
}
