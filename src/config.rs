// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Adapter Settings and Runtime Configuration
//!
//! Adapters are built from settings documents supplied by the host process.
//! This module defines their shape and a JSON parser; where the documents
//! come from (files, a vault, a database) is the host's concern.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_TIMEOUT_SECS` | HTTP timeout for node requests, in seconds | `30` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};
use crate::models::Currency;
use crate::rpc::DEFAULT_TIMEOUT;

/// Environment variable name for the node request timeout.
pub const RPC_TIMEOUT_SECS_ENV: &str = "RPC_TIMEOUT_SECS";

/// Environment variable name for the log output format.
///
/// `json` emits one JSON object per event; anything else is human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for a read-only chain adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainSettings {
    /// Node endpoint (JSON-RPC URL or TRON HTTP API base URL).
    pub uri: String,
    /// Every currency this adapter reports on: exactly one native asset plus
    /// any number of tokens.
    pub currencies: Vec<Currency>,
}

impl BlockchainSettings {
    pub fn from_json(raw: &str) -> ChainResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ChainError::Config(format!("Invalid blockchain settings: {e}")))
    }
}

/// Settings for a wallet adapter: one currency on one node-managed account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    pub currency: Currency,
    pub wallet: WalletEndpoint,
}

impl WalletSettings {
    pub fn from_json(raw: &str) -> ChainResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ChainError::Config(format!("Invalid wallet settings: {e}")))
    }
}

/// The node and the account a wallet adapter acts for.
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletEndpoint {
    pub uri: String,
    pub address: String,
    /// Account passphrase (EVM), private key (TRON) or address label
    /// (bitcoind). Never logged.
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for WalletEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletEndpoint")
            .field("uri", &self.uri)
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Node request timeout from `RPC_TIMEOUT_SECS`, falling back to 30 seconds
/// when unset or unparseable.
pub fn rpc_timeout() -> Duration {
    std::env::var(RPC_TIMEOUT_SECS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` for filtering and `LOG_FORMAT` for output. Calling it
/// twice is harmless: the second install is ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}
