// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Field Encryption
//!
//! Authenticated encryption of individual PHI field values.
//!
//! ## Layers
//!
//! - `keys` - resolves the data-at-rest key from configuration (fail fast)
//! - `envelope` - the nonce + ciphertext + tag triple and its wire form
//! - `cipher` - AES-256-GCM over a single byte sequence
//!
//! The cipher is crate-private: the rest of the application reaches it only
//! through [`crate::records::PayloadTransformer`] and [`crate::service::PhiService`].
//!
//! ## Failure model
//!
//! A tag mismatch is a hard [`CipherError::AuthenticationFailed`]. The cipher
//! never returns partial plaintext. Turning that into a redacted field is the
//! transformer's job, not the cipher's.

pub(crate) mod cipher;
pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{Envelope, ENVELOPE_VERSION, NONCE_LEN, TAG_LEN};
pub use error::CipherError;
pub use keys::{derive_key_from_password, resolve_key, KeyMaterial, KEY_LEN};
