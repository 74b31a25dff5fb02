// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON: native TRX, TRC10 assets and TRC20 contracts over the full node
//! HTTP API.

mod address;
mod blockchain;
mod types;
mod wallet;

pub use address::{TronAddress, ADDRESS_LEN, ADDRESS_PREFIX};
pub use blockchain::TronBlockchain;
pub use wallet::{TronWallet, DEFAULT_FEE_LIMIT};
