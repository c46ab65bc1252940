// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Guard
//!
//! The gate in front of the decrypt path. This is not a general RBAC
//! framework: it answers one question, "may this caller perform this action
//! on this record type in this tenant", and the service refuses to touch the
//! cipher unless the answer is yes.
//!
//! ## Rules
//!
//! - A caller outside the requested tenant is denied whatever its role.
//! - Otherwise the [`AccessPolicy`] decides from role, action and resource type.

pub mod caller;
pub mod policy;
pub mod roles;

pub use caller::Caller;
pub use policy::{AccessGuard, AccessPolicy, Denial, RolePolicy};
pub use roles::{Action, Role};
