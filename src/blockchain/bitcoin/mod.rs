// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! bitcoind-compatible UTXO chains.
//!
//! One record per paid output; sources and fee come from the outputs the
//! transaction's inputs spend.

mod blockchain;
mod types;
mod wallet;

pub use blockchain::{BitcoinBlockchain, INPUT_LOOKUP_CONCURRENCY};
pub use wallet::BitcoinWallet;
