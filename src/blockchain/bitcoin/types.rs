// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! bitcoind RPC payloads.

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::Value;

use crate::amount::{deserialize_decimal, parse_decimal};
use crate::error::{ChainError, ChainResult};

/// `getblock <hash> 2`
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub hash: String,
    pub height: u64,
    #[serde(default)]
    pub tx: Vec<RawTransaction>,
}

/// `getrawtransaction <txid> 1`, also embedded in verbose blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub vout: Vec<TxOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxInput {
    /// Absent on coinbase inputs
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
}

impl TxInput {
    /// The previous output this input spends, `None` for coinbase.
    pub fn outpoint(&self) -> Option<(&str, u32)> {
        match (self.txid.as_deref(), self.vout) {
            (Some(txid), Some(n)) if !txid.is_empty() => Some((txid, n)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxOutput {
    #[serde(deserialize_with = "deserialize_decimal")]
    pub value: BigDecimal,
    pub n: u32,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: ScriptPubKey,
}

/// Newer nodes report a single `address`; older ones an `addresses` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl ScriptPubKey {
    pub fn destination(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or_else(|| self.addresses.first().map(String::as_str))
            .filter(|a| !a.is_empty())
    }
}

/// `gettransaction <txid>` (wallet RPC). `fee` is negative for sends.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletTransaction {
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub fee: Option<BigDecimal>,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "deserialize_decimal")] BigDecimal);

    Option::<Wrapped>::deserialize(deserializer).map(|w| w.map(|Wrapped(v)| v))
}

/// `listaddressgroupings`: groups of `[address, amount, label?]` entries.
pub type AddressGroupings = Vec<Vec<Vec<Value>>>;

/// Flatten groupings into `(address, amount)` pairs.
pub fn grouping_entries(groups: &AddressGroupings) -> ChainResult<Vec<(&str, BigDecimal)>> {
    groups
        .iter()
        .flatten()
        .map(|entry| {
            let address = entry.first().and_then(Value::as_str);
            let amount = entry.get(1);
            match (address, amount) {
                (Some(address), Some(Value::Number(n))) => {
                    Ok((address, parse_decimal(&n.to_string())?))
                }
                _ => Err(ChainError::Decode(format!(
                    "Malformed listaddressgroupings entry: {}",
                    Value::Array(entry.clone())
                ))),
            }
        })
        .collect()
}
