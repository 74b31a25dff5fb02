// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON address codec.
//!
//! Users and settings see Base58Check (`T...`); the HTTP API and contract
//! logs use hex. The hex form is 21 bytes: the `0x41` network prefix followed
//! by the 20-byte account id that ABI words and log topics carry.

use std::fmt;
use std::str::FromStr;

use alloy::hex;

use crate::error::{ChainError, ChainResult};

pub const ADDRESS_PREFIX: u8 = 0x41;
pub const ADDRESS_LEN: usize = 21;
const BASE58_LEN: usize = 34;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TronAddress([u8; ADDRESS_LEN]);

impl TronAddress {
    pub fn from_base58(s: &str) -> ChainResult<Self> {
        let data = bs58::decode(s.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
        Self::from_slice(&data).map_err(|reason| ChainError::InvalidAddress(format!("{s}: {reason}")))
    }

    /// Parse `41...`, with or without `0x`.
    pub fn from_hex(s: &str) -> ChainResult<Self> {
        let data = hex::decode(s.trim()).map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
        Self::from_slice(&data).map_err(|reason| ChainError::InvalidAddress(format!("{s}: {reason}")))
    }

    /// Build from the 20-byte account id found in logs and ABI words.
    pub fn from_account_id(id: &[u8]) -> ChainResult<Self> {
        if id.len() != ADDRESS_LEN - 1 {
            return Err(ChainError::InvalidAddress(format!(
                "expected a 20-byte account id, got {} bytes",
                id.len()
            )));
        }
        let mut inner = [0u8; ADDRESS_LEN];
        inner[0] = ADDRESS_PREFIX;
        inner[1..].copy_from_slice(id);
        Ok(Self(inner))
    }

    /// Parse the prefix-less 40-char hex used by log addresses and topics.
    /// Longer input (a 64-char topic) contributes its low 20 bytes.
    pub fn from_log_hex(s: &str) -> ChainResult<Self> {
        let data = hex::decode(s.trim()).map_err(|e| ChainError::InvalidAddress(format!("{s}: {e}")))?;
        if data.len() < ADDRESS_LEN - 1 {
            return Err(ChainError::InvalidAddress(format!("{s}: too short")));
        }
        Self::from_account_id(&data[data.len() - (ADDRESS_LEN - 1)..])
    }

    fn from_slice(data: &[u8]) -> Result<Self, String> {
        let inner: [u8; ADDRESS_LEN] = data
            .try_into()
            .map_err(|_| format!("expected {ADDRESS_LEN} bytes, got {}", data.len()))?;
        if inner[0] != ADDRESS_PREFIX {
            return Err(format!("prefix must be 0x{ADDRESS_PREFIX:x}"));
        }
        Ok(Self(inner))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// Lowercase `41...` hex, as the HTTP API expects it.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The account id without the network prefix.
    pub fn account_id(&self) -> &[u8] {
        &self.0[1..]
    }

    /// The account id left-padded to one 32-byte ABI word, hex encoded.
    pub fn abi_word(&self) -> String {
        format!("{:0>64}", hex::encode(self.account_id()))
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TronAddress({} / {})", self.to_base58(), self.to_hex())
    }
}

impl FromStr for TronAddress {
    type Err = ChainError;

    /// Accepts either form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == BASE58_LEN && s.starts_with('T') {
            return Self::from_base58(s);
        }
        let bare = s.strip_prefix("0x").unwrap_or(s);
        if bare.len() == ADDRESS_LEN * 2 && bare.starts_with("41") {
            return Self::from_hex(bare);
        }
        Err(ChainError::InvalidAddress(format!(
            "{s}: expected Base58 (T...) or 21-byte hex (41...)"
        )))
    }
}
