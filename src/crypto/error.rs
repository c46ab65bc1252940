// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cipher-level errors.

/// Errors raised by the field cipher and envelope decoding.
///
/// None of the variants carry plaintext or key bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("secure random source unavailable")]
    RandomnessUnavailable,

    #[error("encryption failed")]
    EncryptionFailed,

    /// Tag mismatch: the envelope was corrupted, tampered with, sealed under
    /// another key, or moved to a different field.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),
}

impl CipherError {
    /// Short machine-readable code, safe for audit details.
    pub fn code(&self) -> &'static str {
        match self {
            CipherError::InvalidKeyLength { .. } => "invalid_key_length",
            CipherError::RandomnessUnavailable => "randomness_unavailable",
            CipherError::EncryptionFailed => "encryption_failed",
            CipherError::AuthenticationFailed => "authentication_failed",
            CipherError::MalformedEnvelope(_) => "malformed_envelope",
            CipherError::UnsupportedVersion(_) => "unsupported_envelope_version",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(CipherError::AuthenticationFailed.code(), "authentication_failed");
        assert_eq!(
            CipherError::MalformedEnvelope("x".into()).code(),
            "malformed_envelope"
        );
        assert_eq!(CipherError::UnsupportedVersion(9).code(), "unsupported_envelope_version");
    }

    #[test]
    fn display_does_not_leak_detail_for_auth_failure() {
        assert_eq!(CipherError::AuthenticationFailed.to_string(), "authentication failed");
    }
}
