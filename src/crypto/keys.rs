// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material provider.
//!
//! The data-at-rest key comes from process configuration only. It is
//! resolved once at startup into a [`KeyMaterial`] value that is passed to
//! whoever needs it; there is no module-level key state.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::config::{ConfigError, ENCRYPTION_KEY_ENV, ENCRYPTION_SALT_ENV};

/// Required key length for AES-256-GCM.
pub const KEY_LEN: usize = 32;

/// Salt length generated by [`derive_key_from_password`] when none is given.
pub const PASSWORD_SALT_LEN: usize = 16;

/// Floor for the PBKDF2 work factor.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Default PBKDF2-HMAC-SHA256 work factor for human-supplied secrets.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 210_000;

/// Resolved symmetric key plus optional key scope (salt).
///
/// Immutable once built. The key bytes are wiped on drop and never printed.
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    salt: Option<Vec<u8>>,
}

impl KeyMaterial {
    /// Build from raw bytes. The key must be exactly [`KEY_LEN`] bytes; it is
    /// never padded or truncated.
    pub fn from_bytes(key: &[u8], salt: Option<&[u8]>) -> Result<Self, ConfigError> {
        if key.len() != KEY_LEN {
            return Err(ConfigError::InvalidKeyLength {
                expected: KEY_LEN,
                got: key.len(),
            });
        }
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key);
        Ok(Self {
            key: bytes,
            salt: salt.filter(|s| !s.is_empty()).map(<[u8]>::to_vec),
        })
    }

    /// Resolve from an environment-style lookup.
    ///
    /// `PHI_ENCRYPTION_KEY` must be base64 of exactly 32 bytes.
    /// `PHI_ENCRYPTION_SALT` is optional and used verbatim.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded = lookup(ENCRYPTION_KEY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingKey)?;

        let decoded = Zeroizing::new(
            Base64::decode_vec(&encoded).map_err(|_| ConfigError::InvalidKeyEncoding)?,
        );

        let salt = lookup(ENCRYPTION_SALT_ENV).map(|s| s.trim().to_string());
        Self::from_bytes(&decoded, salt.as_deref().map(str::as_bytes))
    }

    /// The key bytes. Crate-private: only the cipher and subkey derivation
    /// see them.
    pub(crate) fn key_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Optional key scope.
    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    /// Derive a purpose-bound 32-byte subkey: HMAC-SHA256(key, label ‖ salt).
    ///
    /// Used for the audit integrity seal so that the data key itself never
    /// doubles as a MAC key.
    pub(crate) fn derive_subkey(&self, label: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, ConfigError> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.key).map_err(|_| {
            ConfigError::InvalidKeyLength {
                expected: KEY_LEN,
                got: self.key.len(),
            }
        })?;
        mac.update(label);
        if let Some(salt) = &self.salt {
            mac.update(salt);
        }
        let mut out = Zeroizing::new([0u8; KEY_LEN]);
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"<redacted>")
            .field("salt", &self.salt.as_ref().map(|s| s.len()))
            .finish()
    }
}

/// Resolve the data-at-rest key from the process environment.
///
/// Call once at startup. An error here must stop the process.
pub fn resolve_key() -> Result<KeyMaterial, ConfigError> {
    KeyMaterial::from_lookup(|name| std::env::var(name).ok())
}

/// Derive a key from a human-supplied password with PBKDF2-HMAC-SHA256.
///
/// Returns the key and the salt that was used (freshly generated when
/// `salt` is `None`). Not for the primary data-at-rest key.
pub fn derive_key_from_password(
    password: &str,
    salt: Option<&[u8]>,
    iterations: u32,
) -> Result<(Zeroizing<[u8; KEY_LEN]>, Vec<u8>), ConfigError> {
    if password.is_empty() {
        return Err(ConfigError::EmptyPassword);
    }
    let iterations = NonZeroU32::new(iterations)
        .filter(|n| n.get() >= MIN_PBKDF2_ITERATIONS)
        .ok_or(ConfigError::WeakWorkFactor {
            minimum: MIN_PBKDF2_ITERATIONS,
            got: iterations,
        })?;

    let salt = match salt {
        Some(s) if !s.is_empty() => s.to_vec(),
        _ => {
            let mut fresh = vec![0u8; PASSWORD_SALT_LEN];
            SystemRandom::new()
                .fill(&mut fresh)
                .map_err(|_| ConfigError::RandomnessUnavailable)?;
            fresh
        }
    };

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &mut key[..],
    );
    Ok((key, salt))
}
