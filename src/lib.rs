// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PHI Vault - field-level protection for multi-tenant health records
//!
//! Encrypts the sensitive fields of structured records with AES-256-GCM,
//! gates every decrypt behind an access check, keeps a sealed audit trail
//! and fronts reads with a tenant-partitioned cache.
//!
//! ## Modules
//!
//! - `crypto` - key material, envelopes, field cipher
//! - `records` - sensitive-field schemas and the payload transformer
//! - `access` - roles, caller identity, access guard
//! - `audit` - audit events, sinks and the retrying recorder
//! - `cache` - tenant-scoped cache of decrypted records
//! - `storage` - encrypted record stores (redb, in-memory)
//! - `service` - the caller-facing facade
//! - `api` - health endpoints (Axum)

pub mod access;
pub mod api;
pub mod audit;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod records;
pub mod service;
pub mod state;
pub mod storage;
pub mod telemetry;
