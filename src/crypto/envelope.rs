// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted field envelope.
//!
//! Wire form (one JSON object, one storage cell):
//!
//! ```json
//! { "v": 1, "nonce": "<b64>", "ciphertext": "<b64>", "tag": "<b64>" }
//! ```
//!
//! The three parts are always carried together. Unknown keys are rejected
//! so an arbitrary object is never mistaken for an envelope.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

use super::CipherError;

/// AES-GCM nonce length (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-GCM tag length (128 bits).
pub const TAG_LEN: usize = 16;

/// Current envelope wire version.
pub const ENVELOPE_VERSION: u8 = 1;

/// One encrypted field value: nonce, ciphertext and authentication tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeWire", into = "EnvelopeWire")]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

impl Envelope {
    pub(crate) fn new(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>, tag: [u8; TAG_LEN]) -> Self {
        Self {
            nonce,
            ciphertext,
            tag,
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    /// Encode as the JSON storage value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::from(EnvelopeWire::from(self.clone()))
    }

    /// Decode from a JSON storage value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CipherError> {
        let wire: EnvelopeWire = serde_json::from_value(value.clone())
            .map_err(|e| CipherError::MalformedEnvelope(e.to_string()))?;
        Self::try_from(wire)
    }

    /// Whether a JSON value has the envelope shape (does not validate contents).
    pub fn is_envelope_value(value: &serde_json::Value) -> bool {
        value.as_object().is_some_and(|obj| {
            obj.contains_key("nonce") && obj.contains_key("ciphertext") && obj.contains_key("tag")
        })
    }

    #[cfg(test)]
    pub(crate) fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }

    #[cfg(test)]
    pub(crate) fn tag_mut(&mut self) -> &mut [u8; TAG_LEN] {
        &mut self.tag
    }
}

/// Serialized shape of an [`Envelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvelopeWire {
    v: u8,
    nonce: String,
    ciphertext: String,
    tag: String,
}

impl From<Envelope> for EnvelopeWire {
    fn from(envelope: Envelope) -> Self {
        Self {
            v: ENVELOPE_VERSION,
            nonce: Base64::encode_string(&envelope.nonce),
            ciphertext: Base64::encode_string(&envelope.ciphertext),
            tag: Base64::encode_string(&envelope.tag),
        }
    }
}

impl From<EnvelopeWire> for serde_json::Value {
    fn from(wire: EnvelopeWire) -> Self {
        serde_json::json!({
            "v": wire.v,
            "nonce": wire.nonce,
            "ciphertext": wire.ciphertext,
            "tag": wire.tag,
        })
    }
}

impl TryFrom<EnvelopeWire> for Envelope {
    type Error = CipherError;

    fn try_from(wire: EnvelopeWire) -> Result<Self, Self::Error> {
        if wire.v != ENVELOPE_VERSION {
            return Err(CipherError::UnsupportedVersion(wire.v));
        }
        let nonce = decode_fixed::<NONCE_LEN>(&wire.nonce, "nonce")?;
        let tag = decode_fixed::<TAG_LEN>(&wire.tag, "tag")?;
        let ciphertext = Base64::decode_vec(&wire.ciphertext)
            .map_err(|_| CipherError::MalformedEnvelope("ciphertext is not base64".into()))?;
        Ok(Self {
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn decode_fixed<const N: usize>(encoded: &str, part: &str) -> Result<[u8; N], CipherError> {
    let bytes = Base64::decode_vec(encoded)
        .map_err(|_| CipherError::MalformedEnvelope(format!("{part} is not base64")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CipherError::MalformedEnvelope(format!("{part} must be {N} bytes, got {}", b.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Envelope {
        Envelope::new([1u8; NONCE_LEN], vec![9, 8, 7, 6], [2u8; TAG_LEN])
    }

    #[test]
    fn wire_form_has_three_named_parts_and_version() {
        let value = sample().to_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(obj["v"], json!(1));
        assert!(obj["nonce"].is_string());
        assert!(obj["ciphertext"].is_string());
        assert!(obj["tag"].is_string());
    }

    #[test]
    fn value_decoding_restores_envelope() {
        let original = sample();
        let decoded = Envelope::from_value(&original.to_value()).unwrap();
        assert_eq!(decoded, original);

        let via_serde: Envelope =
            serde_json::from_str(&serde_json::to_string(&original).unwrap()).unwrap();
        assert_eq!(via_serde, original);
    }

    #[test]
    fn wrong_nonce_length_is_malformed() {
        let mut value = sample().to_value();
        value["nonce"] = json!(Base64::encode_string(&[0u8; 8]));
        assert!(matches!(
            Envelope::from_value(&value),
            Err(CipherError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn missing_part_is_malformed() {
        let mut value = sample().to_value();
        value.as_object_mut().unwrap().remove("tag");
        assert!(matches!(
            Envelope::from_value(&value),
            Err(CipherError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut value = sample().to_value();
        value["v"] = json!(2);
        assert_eq!(
            Envelope::from_value(&value),
            Err(CipherError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn extra_keys_are_rejected() {
        let mut value = sample().to_value();
        value["plaintext"] = json!("oops");
        assert!(Envelope::from_value(&value).is_err());
    }

    #[test]
    fn plain_strings_are_not_envelopes() {
        assert!(!Envelope::is_envelope_value(&json!("penicillin")));
        assert!(!Envelope::is_envelope_value(&json!({"nonce": "a"})));
        assert!(Envelope::is_envelope_value(&sample().to_value()));
    }
}
