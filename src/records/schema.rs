// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Statically declared sensitive-field sets.

/// A record type and the names of its sensitive fields.
///
/// Identifiers, tenant id and timestamps are deliberately absent from every
/// list so they stay queryable and sortable in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub resource_type: &'static str,
    pub sensitive_fields: &'static [&'static str],
}

impl RecordSchema {
    pub const fn new(resource_type: &'static str, sensitive_fields: &'static [&'static str]) -> Self {
        Self {
            resource_type,
            sensitive_fields,
        }
    }

    pub fn is_sensitive(&self, field: &str) -> bool {
        self.sensitive_fields.iter().any(|f| *f == field)
    }

    /// The declared name for `field`, if sensitive. Lets callers turn a
    /// runtime key into the static name used in audit details.
    pub fn sensitive_name(&self, field: &str) -> Option<&'static str> {
        self.sensitive_fields.iter().copied().find(|f| *f == field)
    }

    /// Associated data for one field: length-prefixed resource type, then
    /// the field name.
    pub(crate) fn field_context(&self, field: &str) -> Vec<u8> {
        let rt = self.resource_type.as_bytes();
        let mut ctx = Vec::with_capacity(4 + rt.len() + field.len());
        ctx.extend_from_slice(&(rt.len() as u32).to_be_bytes());
        ctx.extend_from_slice(rt);
        ctx.extend_from_slice(field.as_bytes());
        ctx
    }
}

pub const PATIENT: RecordSchema = RecordSchema::new(
    "patient",
    &[
        "ssn",
        "date_of_birth",
        "phone",
        "email",
        "address",
        "insurance_number",
        "allergies",
        "medical_history",
        "emergency_contact",
    ],
);

pub const CLINICAL_NOTE: RecordSchema =
    RecordSchema::new("clinical_note", &["content", "diagnosis", "treatment_plan"]);

pub const PRESCRIPTION: RecordSchema =
    RecordSchema::new("prescription", &["medication", "dosage", "instructions"]);

/// Every record type that carries PHI.
pub const ALL_SCHEMAS: &[RecordSchema] = &[PATIENT, CLINICAL_NOTE, PRESCRIPTION];

/// Look up a schema by resource type.
pub fn schema_for(resource_type: &str) -> Option<&'static RecordSchema> {
    ALL_SCHEMAS.iter().find(|s| s.resource_type == resource_type)
}
