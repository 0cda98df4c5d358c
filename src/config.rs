// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! [`AppConfig`]. Malformed values are reported as [`ConfigError`]; nothing
//! here panics.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for opaque storage; unset keeps everything in memory | unset |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `IDENTITY_VERIFIER` | `mock` or `real` | `mock` |
//! | `VERIFICATION_WINDOW_SECS` | Real-mode verification window | `900` |
//! | `VERIFICATION_CACHE_CAPACITY` | Maximum live verification attempts | `10000` |
//! | `CPF_HASH_KEY` | HMAC key for CPF hashes in metadata | development key |
//! | `SEED_ACCOUNTS` | `email=cpf,...` pairs for the account directory | empty |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::identity::{VerifierMode, DEFAULT_GATE_CAPACITY, DEFAULT_VERIFICATION_WINDOW};

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const IDENTITY_VERIFIER_ENV: &str = "IDENTITY_VERIFIER";
pub const VERIFICATION_WINDOW_ENV: &str = "VERIFICATION_WINDOW_SECS";
pub const VERIFICATION_CAPACITY_ENV: &str = "VERIFICATION_CACHE_CAPACITY";
pub const CPF_HASH_KEY_ENV: &str = "CPF_HASH_KEY";
pub const SEED_ACCOUNTS_ENV: &str = "SEED_ACCOUNTS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Used only when `CPF_HASH_KEY` is unset. Hashes made with it are not
/// protected against brute force.
const DEV_CPF_HASH_KEY: &str = "sealed-requests-development-cpf-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub verifier_mode: VerifierMode,
    pub verification_window: Duration,
    pub verification_capacity: usize,
    pub cpf_hash_key: Vec<u8>,
    /// True when `cpf_hash_key` is the built-in development key.
    pub using_dev_cpf_key: bool,
    pub seed_accounts: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, &raw, e.to_string()))?,
            None => DEFAULT_PORT,
        };
        let bind = format!("{host}:{port}");
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(HOST_ENV, &host, e.to_string()))?;

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let verifier_mode = match get(IDENTITY_VERIFIER_ENV) {
            Some(raw) => raw
                .parse::<VerifierMode>()
                .map_err(|e| ConfigError::invalid(IDENTITY_VERIFIER_ENV, &raw, e))?,
            None => VerifierMode::Mock,
        };

        let verification_window = match get(VERIFICATION_WINDOW_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        VERIFICATION_WINDOW_ENV,
                        &raw,
                        "must be greater than zero",
                    ))
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(ConfigError::invalid(
                        VERIFICATION_WINDOW_ENV,
                        &raw,
                        e.to_string(),
                    ))
                }
            },
            None => DEFAULT_VERIFICATION_WINDOW,
        };

        let verification_capacity = match get(VERIFICATION_CAPACITY_ENV) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        VERIFICATION_CAPACITY_ENV,
                        &raw,
                        "must be greater than zero",
                    ))
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ConfigError::invalid(VERIFICATION_CAPACITY_ENV, &raw, e.to_string()))
                }
            },
            None => DEFAULT_GATE_CAPACITY,
        };

        let (cpf_hash_key, using_dev_cpf_key) = match get(CPF_HASH_KEY_ENV) {
            Some(key) => (key.into_bytes(), false),
            None => (DEV_CPF_HASH_KEY.as_bytes().to_vec(), true),
        };

        Ok(Self {
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            bind_addr,
            log_format,
            verifier_mode,
            verification_window,
            verification_capacity,
            cpf_hash_key,
            using_dev_cpf_key,
            seed_accounts: get(SEED_ACCOUNTS_ENV),
        })
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the built-in default filter.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.data_dir, None);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.verifier_mode, VerifierMode::Mock);
        assert_eq!(cfg.verification_window, Duration::from_secs(900));
        assert_eq!(cfg.verification_capacity, 10_000);
        assert!(cfg.using_dev_cpf_key);
        assert!(cfg.seed_accounts.is_none());
    }

    #[test]
    fn values_are_read() {
        let cfg = config(&[
            ("DATA_DIR", "/srv/requests"),
            ("HOST", "127.0.0.1"),
            ("PORT", "9090"),
            ("LOG_FORMAT", "json"),
            ("IDENTITY_VERIFIER", "real"),
            ("VERIFICATION_WINDOW_SECS", "60"),
            ("VERIFICATION_CACHE_CAPACITY", "5"),
            ("CPF_HASH_KEY", "secret"),
            ("SEED_ACCOUNTS", "a@x.com=529.982.247-25"),
        ])
        .unwrap();

        assert_eq!(cfg.data_dir, Some(PathBuf::from("/srv/requests")));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.verifier_mode, VerifierMode::Real);
        assert_eq!(cfg.verification_window, Duration::from_secs(60));
        assert_eq!(cfg.verification_capacity, 5);
        assert_eq!(cfg.cpf_hash_key, b"secret");
        assert!(!cfg.using_dev_cpf_key);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = config(&[("DATA_DIR", ""), ("PORT", "  ")]).unwrap();
        assert_eq!(cfg.data_dir, None);
        assert_eq!(cfg.bind_addr.port(), 8080);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("HOST", "not a host")]),
            Err(ConfigError::Invalid { var: "HOST", .. })
        ));
        assert!(matches!(
            config(&[("IDENTITY_VERIFIER", "sometimes")]),
            Err(ConfigError::Invalid { var: "IDENTITY_VERIFIER", .. })
        ));
        assert!(matches!(
            config(&[("VERIFICATION_WINDOW_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config(&[("VERIFICATION_CACHE_CAPACITY", "-1")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
