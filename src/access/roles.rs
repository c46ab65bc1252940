// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller roles and record actions.

use serde::{Deserialize, Serialize};

/// Caller roles as issued by the (external) authentication layer.
///
/// ## Default policy
///
/// - `Admin` - every action on every record type
/// - `Physician` - create, read and update clinical records
/// - `Nurse` - read everything, write clinical notes
/// - `Receptionist` - patient demographics only
/// - `Billing` - read patients only
/// - `Auditor` - no record access (reads the audit trail out of band)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Physician,
    Nurse,
    Receptionist,
    Billing,
    Auditor,
}

impl std::str::FromStr for Role {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "physician" => Ok(Role::Physician),
            "nurse" => Ok(Role::Nurse),
            "receptionist" => Ok(Role::Receptionist),
            "billing" => Ok(Role::Billing),
            "auditor" => Ok(Role::Auditor),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Physician => write!(f, "physician"),
            Role::Nurse => write!(f, "nurse"),
            Role::Receptionist => write!(f, "receptionist"),
            Role::Billing => write!(f, "billing"),
            Role::Auditor => write!(f, "auditor"),
        }
    }
}

/// Operations on a sensitive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("PHYSICIAN".parse::<Role>(), Ok(Role::Physician));
        assert_eq!("Nurse".parse::<Role>(), Ok(Role::Nurse));
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for role in [
            Role::Admin,
            Role::Physician,
            Role::Nurse,
            Role::Receptionist,
            Role::Billing,
            Role::Auditor,
        ] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Billing).unwrap(), "\"billing\"");
        assert_eq!(serde_json::to_string(&Action::Delete).unwrap(), "\"delete\"");
    }
}
