// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sensitive Records
//!
//! Structured records are JSON objects. Each record type declares its
//! sensitive fields once, as a [`RecordSchema`] constant; the
//! [`PayloadTransformer`] uses that list verbatim on both the encrypt and the
//! decrypt path and never guesses at runtime.
//!
//! Two wrapper types keep the states apart:
//!
//! - [`EncryptedRecord`] - what storage holds (sensitive fields are envelopes)
//! - [`DecryptedRecord`] - what callers and the cache see

pub mod schema;
pub mod transformer;

pub use schema::{schema_for, RecordSchema, ALL_SCHEMAS, CLINICAL_NOTE, PATIENT, PRESCRIPTION};
pub use transformer::{
    DecryptedField, DecryptedRecord, EncryptedRecord, PayloadTransformer, Redaction,
};

/// A structured record: field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;
