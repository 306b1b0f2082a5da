// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ETH_RPC_URL` | Ethereum JSON-RPC endpoint | `http://localhost:8545` |
//! | `ETH_CHAIN_ID` | Chain id (part of the EIP-712 domain) | `1` |
//! | `ETH_NETWORK_NAME` | Network name for logging | `ethereum` |
//! | `ETH_RELAYER_PRIVATE_KEY` | Relayer signing key (hex) | Required |
//! | `DATA_DIR` | Directory for the embedded store | `/data` |
//! | `WST_BYTECODE_PATH` | File holding AuthIbetWST creation code (hex) | Optional |
//! | `MONITOR_POLL_INTERVAL_SECS` | Monitor cycle interval | `10` |
//! | `RECEIPT_TIMEOUT_SECS` | Per-receipt lookup timeout | `1` |
//! | `MAX_SUBMISSION_ATTEMPTS` | Submission retries before dead-letter | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::chain::NetworkConfig;
use crate::monitor::{
    MonitorConfig, DEFAULT_MAX_SUBMISSION_ATTEMPTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_RECEIPT_TIMEOUT,
};

pub const ETH_RPC_URL_ENV: &str = "ETH_RPC_URL";
pub const ETH_CHAIN_ID_ENV: &str = "ETH_CHAIN_ID";
pub const ETH_NETWORK_NAME_ENV: &str = "ETH_NETWORK_NAME";
pub const ETH_RELAYER_PRIVATE_KEY_ENV: &str = "ETH_RELAYER_PRIVATE_KEY";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const WST_BYTECODE_PATH_ENV: &str = "WST_BYTECODE_PATH";
pub const MONITOR_POLL_INTERVAL_ENV: &str = "MONITOR_POLL_INTERVAL_SECS";
pub const RECEIPT_TIMEOUT_ENV: &str = "RECEIPT_TIMEOUT_SECS";
pub const MAX_SUBMISSION_ATTEMPTS_ENV: &str = "MAX_SUBMISSION_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error("failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// Application configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkConfig,
    pub relayer_private_key: String,
    pub data_dir: PathBuf,
    pub wst_bytecode_path: Option<PathBuf>,
    pub monitor: MonitorConfig,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let network = NetworkConfig {
            name: var_or(ETH_NETWORK_NAME_ENV, "ethereum"),
            chain_id: parse_var(ETH_CHAIN_ID_ENV, 1)?,
            rpc_url: var_or(ETH_RPC_URL_ENV, "http://localhost:8545"),
        };

        let relayer_private_key = std::env::var(ETH_RELAYER_PRIVATE_KEY_ENV)
            .map_err(|_| ConfigError::MissingVar(ETH_RELAYER_PRIVATE_KEY_ENV))?;

        let monitor = MonitorConfig {
            poll_interval: parse_var(MONITOR_POLL_INTERVAL_ENV, DEFAULT_POLL_INTERVAL.as_secs())
                .map(Duration::from_secs)?,
            receipt_timeout: parse_var(RECEIPT_TIMEOUT_ENV, DEFAULT_RECEIPT_TIMEOUT.as_secs())
                .map(Duration::from_secs)?,
            max_submission_attempts: parse_var(
                MAX_SUBMISSION_ATTEMPTS_ENV,
                DEFAULT_MAX_SUBMISSION_ATTEMPTS,
            )?,
        };

        Ok(Self {
            network,
            relayer_private_key,
            data_dir: PathBuf::from(var_or(DATA_DIR_ENV, "/data")),
            wst_bytecode_path: std::env::var(WST_BYTECODE_PATH_ENV).ok().map(PathBuf::from),
            monitor,
            log_format: var_or(LOG_FORMAT_ENV, "pretty"),
        })
    }

    /// Path of the embedded store file inside the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("wst_relay.redb")
    }

    /// Load the AuthIbetWST creation code, if a path is configured.
    ///
    /// The file holds hex text (0x prefix and surrounding whitespace are
    /// tolerated), matching compiler output formats.
    pub fn load_deploy_bytecode(&self) -> Result<Vec<u8>, ConfigError> {
        let Some(path) = &self.wst_bytecode_path else {
            return Ok(Vec::new());
        };
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let hex = text.trim().trim_start_matches("0x");
        alloy::hex::decode(hex).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            reason: format!("not valid hex: {e}"),
        })
    }
}

fn var_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
