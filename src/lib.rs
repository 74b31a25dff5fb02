// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multichain Gateway - Chain Abstraction Layer
//!
//! This crate lets an exchange backend observe deposits and send withdrawals
//! on UTXO, EVM and TRON chains through one canonical transaction model.
//! Adapters talk to trusted nodes only; nothing here holds keys.
//!
//! ## Modules
//!
//! - `amount` - Minor-unit to decimal conversion
//! - `blockchain` - Chain and wallet adapters per chain family
//! - `config` - Adapter settings, timeouts and tracing setup
//! - `error` - Shared error taxonomy
//! - `models` - Currencies, transactions and blocks
//! - `options` - Fee option layering
//! - `rpc` - Node transports (JSON-RPC 2.0, TRON HTTP API)

pub mod amount;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod options;
pub mod rpc;

pub use blockchain::{new_blockchain, new_wallet, Blockchain, ChainFamily, NewAddress, Wallet};
pub use error::{ChainError, ChainResult};
pub use models::{AssetKind, Block, Currency, Transaction, TxStatus};
pub use options::{FeeOptions, GasPriceRate};
