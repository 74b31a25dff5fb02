// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum-compatible chains: native value transfers and ERC-20 tokens.

mod blockchain;
pub(crate) mod erc20;
mod types;
mod wallet;

pub use blockchain::EvmBlockchain;
pub use erc20::TRANSFER_TOPIC;
pub use wallet::{normalize_address, EvmWallet, NATIVE_DEFAULTS, TOKEN_DEFAULTS};
