// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM JSON-RPC payloads and the transaction view the normalizer works on.

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, Bytes, B256, U256, U64};
use num_bigint::{BigInt, Sign};
use serde::Deserialize;

use crate::error::{ChainError, ChainResult};

/// `eth_getBlockBy{Hash,Number}` with full transaction objects.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    pub hash: B256,
    pub number: U64,
    #[serde(default)]
    pub transactions: Vec<alloy::rpc::types::Transaction>,
}

/// The receipt fields classification needs. Pre-Byzantium receipts carry
/// no `status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    #[serde(default)]
    pub status: Option<U64>,
    pub gas_used: U64,
    #[serde(default)]
    pub effective_gas_price: Option<U256>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    /// Set when a reorg dropped the log
    #[serde(default)]
    pub removed: bool,
}

/// Chain-agnostic view of a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxView {
    pub hash: B256,
    /// Recovered from the signature
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: u64,
    /// Gas price for legacy transactions, max fee per gas otherwise
    pub max_fee_per_gas: u128,
    pub input: Bytes,
}

impl TxView {
    /// Build the view, recovering the sender from the signature rather than
    /// trusting the node's `from` field.
    pub fn from_rpc(tx: &alloy::rpc::types::Transaction) -> ChainResult<Self> {
        let envelope = tx.inner.inner();
        let hash = *envelope.tx_hash();
        let from = envelope.recover_signer().map_err(|e| {
            ChainError::Decode(format!("Sender recovery failed for {hash:#x}: {e}"))
        })?;

        Ok(Self {
            hash,
            from,
            to: envelope.to(),
            value: envelope.value(),
            gas_limit: envelope.gas_limit(),
            max_fee_per_gas: envelope.max_fee_per_gas(),
            input: envelope.input().clone(),
        })
    }
}

pub fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}

pub fn bigint_to_u256(value: &BigInt) -> ChainResult<U256> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus {
        return Err(ChainError::Decode(format!("Negative quantity {value}")));
    }
    U256::try_from_be_slice(&bytes)
        .ok_or_else(|| ChainError::Decode(format!("Quantity {value} exceeds 256 bits")))
}

/// Lowercase `0x` form used for every address leaving the adapter.
pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}
