// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM field cipher.
//!
//! Every call to [`FieldCipher::encrypt`] draws a fresh 96-bit nonce from
//! the system CSPRNG. The key scope (configured salt) is length-prefixed into
//! the associated data ahead of the caller's context, so envelopes sealed
//! under one scope never open under another.

use std::sync::atomic::{AtomicU64, Ordering};

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use super::{CipherError, Envelope, KeyMaterial, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Authenticated cipher bound to one key.
pub struct FieldCipher {
    key: LessSafeKey,
    scope: Vec<u8>,
    rng: SystemRandom,
    decrypt_calls: AtomicU64,
}

impl FieldCipher {
    pub fn new(material: &KeyMaterial) -> Result<Self, CipherError> {
        let unbound = UnboundKey::new(&AES_256_GCM, material.key_bytes()).map_err(|_| {
            CipherError::InvalidKeyLength {
                expected: KEY_LEN,
                got: material.key_bytes().len(),
            }
        })?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            scope: material.salt().map(<[u8]>::to_vec).unwrap_or_default(),
            rng: SystemRandom::new(),
            decrypt_calls: AtomicU64::new(0),
        })
    }

    /// Encrypt `plaintext`, authenticating `context` alongside it.
    pub fn encrypt(&self, plaintext: &[u8], context: &[u8]) -> Result<Envelope, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::RandomnessUnavailable)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let aad = self.associated_data(context);
        let mut in_out = plaintext.to_vec();
        let tag = match self
            .key
            .seal_in_place_separate_tag(nonce, Aad::from(aad.as_slice()), &mut in_out)
        {
            Ok(tag) => tag,
            Err(_) => {
                in_out.zeroize();
                return Err(CipherError::EncryptionFailed);
            }
        };

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag.as_ref());
        Ok(Envelope::new(nonce_bytes, in_out, tag_bytes))
    }

    /// Decrypt and authenticate an envelope.
    ///
    /// Any mismatch in ciphertext, tag, nonce, key, scope or `context` yields
    /// [`CipherError::AuthenticationFailed`] and no plaintext.
    pub fn decrypt(&self, envelope: &Envelope, context: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.decrypt_calls.fetch_add(1, Ordering::Relaxed);

        let nonce = Nonce::assume_unique_for_key(*envelope.nonce());
        let aad = self.associated_data(context);

        let mut ct_tag = Vec::with_capacity(envelope.ciphertext().len() + TAG_LEN);
        ct_tag.extend_from_slice(envelope.ciphertext());
        ct_tag.extend_from_slice(envelope.tag());

        let result = match self
            .key
            .open_in_place(nonce, Aad::from(aad.as_slice()), &mut ct_tag)
        {
            Ok(plaintext) => Ok(plaintext.to_vec()),
            Err(_) => Err(CipherError::AuthenticationFailed),
        };
        ct_tag.zeroize();
        result
    }

    /// Number of decrypt attempts made through this cipher.
    pub fn decrypt_calls(&self) -> u64 {
        self.decrypt_calls.load(Ordering::Relaxed)
    }

    fn associated_data(&self, context: &[u8]) -> Vec<u8> {
        let mut aad = Vec::with_capacity(4 + self.scope.len() + context.len());
        aad.extend_from_slice(&(self.scope.len() as u32).to_be_bytes());
        aad.extend_from_slice(&self.scope);
        aad.extend_from_slice(context);
        aad
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("algorithm", &"AES-256-GCM")
            .field("decrypt_calls", &self.decrypt_calls())
            .finish_non_exhaustive()
    }
}
