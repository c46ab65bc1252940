// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! validated [`AppConfig`]. Configuration is loaded from the environment at
//! startup; any error here prevents the process from serving traffic.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PHI_ENCRYPTION_KEY` | Base64 of exactly 32 key bytes | Required |
//! | `PHI_ENCRYPTION_SALT` | Key scope bound into every envelope | None |
//! | `DATA_DIR` | Root directory for record database and audit logs | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `CACHE_CAPACITY` | Maximum cached entries | `1024` |
//! | `CACHE_TTL_SECS` | Cache entry time-to-live | `300` |
//! | `AUDIT_MAX_ATTEMPTS` | Audit write attempts before failing the operation | `3` |

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the base64-encoded data-at-rest key.
///
/// Never read from the database. Rotation is a redeploy.
pub const ENCRYPTION_KEY_ENV: &str = "PHI_ENCRYPTION_KEY";

/// Environment variable holding the optional key scope (salt).
pub const ENCRYPTION_SALT_ENV: &str = "PHI_ENCRYPTION_SALT";

/// Environment variable name for the data directory path.
///
/// Holds `records.redb` and the `audit/` JSONL tree.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const CACHE_TTL_SECS_ENV: &str = "CACHE_TTL_SECS";
pub const AUDIT_MAX_ATTEMPTS_ENV: &str = "AUDIT_MAX_ATTEMPTS";

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_AUDIT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound on audit attempts. Audit retries stay small and bounded.
pub const MAX_AUDIT_ATTEMPTS: u32 = 5;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("PHI_ENCRYPTION_KEY is not set or empty")]
    MissingKey,

    #[error("PHI_ENCRYPTION_KEY is not valid base64")]
    InvalidKeyEncoding,

    #[error("encryption key must be exactly {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("key derivation work factor {got} is below the minimum of {minimum}")]
    WeakWorkFactor { minimum: u32, got: u32 },

    #[error("secure random source unavailable")]
    RandomnessUnavailable,

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Validated process configuration (everything except key material, which
/// is resolved by [`crate::crypto::resolve_key`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub audit_max_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            audit_max_attempts: DEFAULT_AUDIT_MAX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary lookup (used by tests to avoid touching the
    /// process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let host = lookup(HOST_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = parse_var(&lookup, PORT_ENV)?.unwrap_or(defaults.port);

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("") => defaults.log_format,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let cache_capacity: usize =
            parse_var(&lookup, CACHE_CAPACITY_ENV)?.unwrap_or(defaults.cache_capacity);
        if cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                var: CACHE_CAPACITY_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let cache_ttl = parse_var::<u64, _>(&lookup, CACHE_TTL_SECS_ENV)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let audit_max_attempts: u32 =
            parse_var(&lookup, AUDIT_MAX_ATTEMPTS_ENV)?.unwrap_or(defaults.audit_max_attempts);
        if !(1..=MAX_AUDIT_ATTEMPTS).contains(&audit_max_attempts) {
            return Err(ConfigError::InvalidValue {
                var: AUDIT_MAX_ATTEMPTS_ENV,
                reason: format!("must be between 1 and {MAX_AUDIT_ATTEMPTS}"),
            });
        }

        Ok(Self {
            data_dir,
            host,
            port,
            log_format,
            cache_capacity,
            cache_ttl,
            audit_max_attempts,
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of the embedded record database.
    pub fn records_db_path(&self) -> PathBuf {
        self.data_dir.join("records.redb")
    }

    /// Root directory of the audit log tree.
    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }
}

/// Parse an optional numeric variable. Present-but-malformed is an error,
/// never a silent default.
fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.records_db_path(), PathBuf::from("/data/records.redb"));
        assert_eq!(config.audit_dir(), PathBuf::from("/data/audit"));
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (DATA_DIR_ENV, "/tmp/phi"),
            (PORT_ENV, "9443"),
            (LOG_FORMAT_ENV, "JSON"),
            (CACHE_CAPACITY_ENV, "16"),
            (CACHE_TTL_SECS_ENV, "5"),
            (AUDIT_MAX_ATTEMPTS_ENV, "2"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/phi"));
        assert_eq!(config.port, 9443);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.audit_max_attempts, 2);
    }

    #[test]
    fn malformed_numbers_are_errors_not_defaults() {
        let err = AppConfig::from_lookup(lookup_from(&[(PORT_ENV, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: PORT_ENV, .. }));
    }

    #[test]
    fn audit_attempts_are_bounded() {
        let err =
            AppConfig::from_lookup(lookup_from(&[(AUDIT_MAX_ATTEMPTS_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: AUDIT_MAX_ATTEMPTS_ENV, .. }));

        let err =
            AppConfig::from_lookup(lookup_from(&[(AUDIT_MAX_ATTEMPTS_ENV, "50")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: AUDIT_MAX_ATTEMPTS_ENV, .. }));
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(CACHE_CAPACITY_ENV, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: CACHE_CAPACITY_ENV, .. }));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[(LOG_FORMAT_ENV, "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: LOG_FORMAT_ENV, .. }));
    }
}
