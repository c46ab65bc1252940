// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payload transformer: field-by-field encryption of structured records.
//!
//! Sensitive values are serialized as JSON text before sealing, so strings,
//! numbers, arrays and objects all come back with their original type.
//!
//! The cipher fails loud; this layer fails partial. A field whose envelope
//! does not authenticate comes back as `null` and is listed in
//! [`DecryptedRecord::redacted_fields`]; the rest of the record stays usable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Record, RecordSchema};
use crate::crypto::cipher::FieldCipher;
use crate::crypto::{CipherError, Envelope, KeyMaterial};

/// A record as persisted: every present sensitive field is an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedRecord(Record);

impl EncryptedRecord {
    /// Field access for non-sensitive columns (ids, timestamps) and for
    /// opaque envelope values.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Record {
        &mut self.0
    }

    pub(crate) fn into_fields(self) -> Record {
        self.0
    }
}

/// Outcome of decrypting one field.
#[derive(Debug, Clone, PartialEq)]
pub enum DecryptedField {
    /// Authenticated plaintext value.
    Plain(Value),
    /// The field is missing or `null`; nothing to decrypt.
    Absent,
    /// The envelope could not be opened. `reason` is a static code.
    Redacted { reason: &'static str },
}

/// A sensitive field that was withheld from a [`DecryptedRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redaction {
    pub field: &'static str,
    pub reason: &'static str,
}

/// A record ready for response serialization.
///
/// Only the transformer builds these, so a cached or returned record can
/// never hold an envelope in a sensitive field.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedRecord {
    fields: Record,
    redacted: Vec<Redaction>,
}

impl DecryptedRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn into_fields(self) -> Record {
        self.fields
    }

    /// Names of sensitive fields that failed to decrypt.
    pub fn redacted_fields(&self) -> Vec<&'static str> {
        self.redacted.iter().map(|r| r.field).collect()
    }

    pub fn redactions(&self) -> &[Redaction] {
        &self.redacted
    }

    /// True when at least one sensitive field was redacted.
    pub fn is_partial(&self) -> bool {
        !self.redacted.is_empty()
    }
}

/// Applies the field cipher to the declared sensitive fields of a record.
#[derive(Debug)]
pub struct PayloadTransformer {
    cipher: FieldCipher,
}

impl PayloadTransformer {
    pub fn new(material: &KeyMaterial) -> Result<Self, CipherError> {
        Ok(Self {
            cipher: FieldCipher::new(material)?,
        })
    }

    /// Encrypt every present, non-null sensitive field. Other fields are
    /// copied through unchanged.
    pub fn encrypt_payload(
        &self,
        schema: &RecordSchema,
        record: &Record,
    ) -> Result<EncryptedRecord, CipherError> {
        let mut out = record.clone();
        for &field in schema.sensitive_fields {
            let Some(value) = record.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let plaintext = serde_json::to_vec(value).map_err(|_| CipherError::EncryptionFailed)?;
            let envelope = self
                .cipher
                .encrypt(&plaintext, &schema.field_context(field))?;
            out.insert(field.to_string(), envelope.to_value());
        }
        Ok(EncryptedRecord(out))
    }

    /// Decrypt a single stored field value.
    pub fn decrypt_field(&self, schema: &RecordSchema, field: &str, value: &Value) -> DecryptedField {
        if value.is_null() {
            return DecryptedField::Absent;
        }
        let envelope = match Envelope::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => return DecryptedField::Redacted { reason: e.code() },
        };
        let plaintext = match self.cipher.decrypt(&envelope, &schema.field_context(field)) {
            Ok(plaintext) => plaintext,
            Err(e) => return DecryptedField::Redacted { reason: e.code() },
        };
        match serde_json::from_slice(&plaintext) {
            Ok(value) => DecryptedField::Plain(value),
            Err(_) => DecryptedField::Redacted {
                reason: "invalid_plaintext",
            },
        }
    }

    /// Decrypt every sensitive field of a stored record.
    pub fn decrypt_payload(&self, schema: &RecordSchema, record: &EncryptedRecord) -> DecryptedRecord {
        let mut fields = record.0.clone();
        let mut redacted = Vec::new();

        for &field in schema.sensitive_fields {
            let Some(value) = record.0.get(field) else {
                continue;
            };
            match self.decrypt_field(schema, field, value) {
                DecryptedField::Plain(plain) => {
                    fields.insert(field.to_string(), plain);
                }
                DecryptedField::Absent => {}
                DecryptedField::Redacted { reason } => {
                    tracing::error!(
                        resource_type = schema.resource_type,
                        field,
                        reason,
                        "sensitive field failed to decrypt; redacting"
                    );
                    fields.insert(field.to_string(), Value::Null);
                    redacted.push(Redaction { field, reason });
                }
            }
        }

        DecryptedRecord { fields, redacted }
    }

    #[cfg(test)]
    pub(crate) fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::records::{CLINICAL_NOTE, PATIENT};
    use serde_json::json;

    fn transformer() -> PayloadTransformer {
        PayloadTransformer::new(&KeyMaterial::from_bytes(&[0u8; KEY_LEN], None).unwrap()).unwrap()
    }

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    /// Only `allergy` is sensitive here.
    const ALLERGY_ONLY: RecordSchema = RecordSchema::new("allergy_card", &["allergy"]);

    #[test]
    fn only_declared_fields_are_encrypted() {
        let t = transformer();
        let input = record(json!({"name": "Alice", "allergy": "penicillin"}));
        let encrypted = t.encrypt_payload(&ALLERGY_ONLY, &input).unwrap();

        assert_eq!(encrypted.get("name"), Some(&json!("Alice")));
        let allergy = encrypted.get("allergy").unwrap();
        assert!(!allergy.is_string());
        assert!(Envelope::is_envelope_value(allergy));
        Envelope::from_value(allergy).unwrap();
    }

    #[test]
    fn payload_round_trip_preserves_types() {
        let t = transformer();
        let input = record(json!({
            "id": "p-1",
            "tenant_id": "clinic-a",
            "first_name": "Alice",
            "ssn": "123-45-6789",
            "allergies": ["penicillin", "latex"],
            "emergency_contact": {"name": "Bob", "phone": "555-0101"},
            "insurance_number": 998877,
        }));

        let encrypted = t.encrypt_payload(&PATIENT, &input).unwrap();
        for field in ["ssn", "allergies", "emergency_contact", "insurance_number"] {
            assert!(Envelope::is_envelope_value(encrypted.get(field).unwrap()));
        }

        let decrypted = t.decrypt_payload(&PATIENT, &encrypted);
        assert!(!decrypted.is_partial());
        assert_eq!(decrypted.fields(), &input);
    }

    #[test]
    fn null_and_missing_fields_pass_through() {
        let t = transformer();
        let input = record(json!({"id": "p-2", "phone": null}));
        let encrypted = t.encrypt_payload(&PATIENT, &input).unwrap();
        assert_eq!(encrypted.get("phone"), Some(&Value::Null));
        assert!(encrypted.get("ssn").is_none());

        let decrypted = t.decrypt_payload(&PATIENT, &encrypted);
        assert_eq!(decrypted.fields(), &input);
        assert!(!decrypted.is_partial());
    }

    #[test]
    fn one_corrupt_field_is_redacted_and_the_rest_survives() {
        let t = transformer();
        let input = record(json!({
            "id": "n-1",
            "content": "Patient reports chest pain",
            "diagnosis": "angina",
        }));
        let mut encrypted = t.encrypt_payload(&CLINICAL_NOTE, &input).unwrap();

        let mut envelope = Envelope::from_value(encrypted.get("diagnosis").unwrap()).unwrap();
        envelope.tag_mut()[0] ^= 0xFF;
        encrypted
            .fields_mut()
            .insert("diagnosis".into(), envelope.to_value());

        let decrypted = t.decrypt_payload(&CLINICAL_NOTE, &encrypted);
        assert!(decrypted.is_partial());
        assert_eq!(decrypted.redacted_fields(), &["diagnosis"]);
        assert_eq!(decrypted.redactions()[0].reason, "authentication_failed");
        assert_eq!(decrypted.get("diagnosis"), Some(&Value::Null));
        assert_eq!(
            decrypted.get("content"),
            Some(&json!("Patient reports chest pain"))
        );
        assert_eq!(decrypted.get("id"), Some(&json!("n-1")));
    }

    #[test]
    fn envelope_moved_to_another_field_does_not_open() {
        let t = transformer();
        let input = record(json!({"phone": "555-0100", "email": "a@example.org"}));
        let mut encrypted = t.encrypt_payload(&PATIENT, &input).unwrap();

        let phone = encrypted.get("phone").cloned().unwrap();
        encrypted.fields_mut().insert("email".into(), phone);

        let decrypted = t.decrypt_payload(&PATIENT, &encrypted);
        assert_eq!(decrypted.redacted_fields(), &["email"]);
        assert_eq!(decrypted.get("phone"), Some(&json!("555-0100")));
    }

    #[test]
    fn plaintext_in_sensitive_column_is_redacted_not_trusted() {
        let t = transformer();
        let stored = EncryptedRecord(record(json!({"ssn": "123-45-6789"})));
        match t.decrypt_field(&PATIENT, "ssn", stored.get("ssn").unwrap()) {
            DecryptedField::Redacted { reason } => assert_eq!(reason, "malformed_envelope"),
            other => panic!("expected redaction, got {other:?}"),
        }
        let decrypted = t.decrypt_payload(&PATIENT, &stored);
        assert_eq!(decrypted.get("ssn"), Some(&Value::Null));
    }

    #[test]
    fn decrypt_field_reports_absent_for_null() {
        let t = transformer();
        assert_eq!(
            t.decrypt_field(&PATIENT, "ssn", &Value::Null),
            DecryptedField::Absent
        );
    }

    #[test]
    fn encrypted_record_serializes_as_plain_object() {
        let t = transformer();
        let encrypted = t
            .encrypt_payload(&ALLERGY_ONLY, &record(json!({"name": "Alice", "allergy": "nuts"})))
            .unwrap();
        let text = serde_json::to_string(&encrypted).unwrap();
        assert!(!text.contains("nuts"));
        let restored: EncryptedRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, encrypted);
    }
}
