// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Canonical Data Model
//!
//! Every chain adapter speaks these types regardless of how the underlying
//! chain represents value movement.
//!
//! ## Currency
//!
//! A [`Currency`] is one tradeable asset on one chain. Its [`AssetKind`] says
//! whether it is the chain's native coin or a token, and carries the token's
//! identifier. Settings files use the flat option keys of the exchange
//! backend (`erc20_contract_address`, `trc10_asset_id`, `gas_limit`, ...);
//! they are turned into the typed form when deserialized, so a currency with
//! two conflicting token identifiers never reaches an adapter.
//!
//! ## Transaction
//!
//! [`Transaction`] amounts and fees are always canonical decimals. A `None`
//! fee means "unknown", which is different from zero.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::options::FeeOptions;

// =============================================================================
// Currency
// =============================================================================

/// What kind of asset a currency is on its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AssetKind {
    /// The chain's own coin (BTC, ETH, TRX).
    Native,
    /// ERC-20 token identified by its contract address.
    Erc20 { contract_address: String },
    /// TRON asset-id token.
    Trc10 { asset_id: String },
    /// TRON smart-contract token identified by its Base58 contract address.
    Trc20 { contract_address: String },
}

impl AssetKind {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetKind::Native)
    }
}

/// A tradeable asset served by an adapter instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CurrencyConfig", into = "CurrencyConfig")]
pub struct Currency {
    /// Unique per adapter instance (e.g. "eth", "usdt").
    pub id: String,
    /// Decimal exponent between minor units and canonical amounts.
    pub subunits: u32,
    pub asset: AssetKind,
    /// Currency-level fee parameters (second layer of option resolution).
    pub fees: FeeOptions,
}

impl Currency {
    pub fn native(id: impl Into<String>, subunits: u32) -> Self {
        Self {
            id: id.into(),
            subunits,
            asset: AssetKind::Native,
            fees: FeeOptions::default(),
        }
    }

    pub fn token(id: impl Into<String>, subunits: u32, asset: AssetKind) -> Self {
        Self {
            id: id.into(),
            subunits,
            asset,
            fees: FeeOptions::default(),
        }
    }

    pub fn with_fees(mut self, fees: FeeOptions) -> Self {
        self.fees = fees;
        self
    }

    pub fn is_native(&self) -> bool {
        self.asset.is_native()
    }
}

/// Flat settings-file form of a currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CurrencyConfig {
    id: String,
    subunits: u32,
    #[serde(default)]
    options: CurrencyOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CurrencyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    erc20_contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trc10_asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trc20_contract_address: Option<String>,
    #[serde(flatten)]
    fees: FeeOptions,
}

impl TryFrom<CurrencyConfig> for Currency {
    type Error = String;

    fn try_from(config: CurrencyConfig) -> Result<Self, Self::Error> {
        let CurrencyOptions {
            erc20_contract_address,
            trc10_asset_id,
            trc20_contract_address,
            fees,
        } = config.options;

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let asset = match (
            non_empty(erc20_contract_address),
            non_empty(trc10_asset_id),
            non_empty(trc20_contract_address),
        ) {
            (None, None, None) => AssetKind::Native,
            (Some(contract_address), None, None) => AssetKind::Erc20 { contract_address },
            (None, Some(asset_id), None) => AssetKind::Trc10 { asset_id },
            (None, None, Some(contract_address)) => AssetKind::Trc20 { contract_address },
            _ => {
                return Err(format!(
                    "currency `{}` has more than one token identifier",
                    config.id
                ))
            }
        };

        Ok(Currency {
            id: config.id,
            subunits: config.subunits,
            asset,
            fees,
        })
    }
}

impl From<Currency> for CurrencyConfig {
    fn from(currency: Currency) -> Self {
        let mut options = CurrencyOptions {
            fees: currency.fees,
            ..Default::default()
        };
        match currency.asset {
            AssetKind::Native => {}
            AssetKind::Erc20 { contract_address } => {
                options.erc20_contract_address = Some(contract_address)
            }
            AssetKind::Trc10 { asset_id } => options.trc10_asset_id = Some(asset_id),
            AssetKind::Trc20 { contract_address } => {
                options.trc20_contract_address = Some(contract_address)
            }
        }
        CurrencyConfig {
            id: currency.id,
            subunits: currency.subunits,
            options,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted by a wallet, outcome not yet observed
    #[default]
    Pending,
    /// Observed on chain as successful
    Succeed,
    /// Observed on chain as failed or reverted
    Failed,
    /// Set by business rules outside this crate
    Skipped,
    /// Set by business rules outside this crate
    Rejected,
}

impl TxStatus {
    /// Terminal states owned by the caller; the core never overwrites them.
    pub fn is_externally_assigned(self) -> bool {
        matches!(self, TxStatus::Skipped | TxStatus::Rejected)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxStatus::Pending => "pending",
            TxStatus::Succeed => "succeed",
            TxStatus::Failed => "failed",
            TxStatus::Skipped => "skipped",
            TxStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Canonical unit of value movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Currency id of the moved asset
    pub currency: String,
    /// Currency id the fee was paid in
    pub currency_fee: String,
    /// Source addresses (several for UTXO spends from multiple wallets)
    pub from_addresses: Vec<String>,
    pub to_address: String,
    /// Canonical decimal amount
    pub amount: BigDecimal,
    /// Canonical decimal fee, `None` when unknown
    pub fee: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Set once a broadcast succeeds
    pub tx_hash: Option<String>,
    pub status: TxStatus,
    /// Transfer parameters (call-site layer of option resolution)
    #[serde(default, skip_serializing_if = "FeeOptions::is_empty")]
    pub options: FeeOptions,
}

impl Transaction {
    /// A new outgoing transfer, not yet submitted.
    pub fn withdrawal(
        currency: impl Into<String>,
        to_address: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        let currency = currency.into();
        Self {
            currency_fee: currency.clone(),
            currency,
            from_addresses: Vec::new(),
            to_address: to_address.into(),
            amount,
            fee: None,
            block_number: None,
            tx_hash: None,
            status: TxStatus::Pending,
            options: FeeOptions::default(),
        }
    }

    pub fn from_address(&self) -> Option<&str> {
        self.from_addresses.first().map(String::as_str)
    }

    /// Record a successful submission. Externally assigned terminal states
    /// are left untouched.
    pub fn mark_submitted(&mut self, tx_hash: String) {
        self.tx_hash = Some(tx_hash);
        if !self.status.is_externally_assigned() {
            self.status = TxStatus::Pending;
        }
    }
}

// =============================================================================
// Block
// =============================================================================

/// A block and the canonical transactions found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub number: u64,
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::options::GasPriceRate;

    #[test]
    fn currency_from_flat_options() {
        let json = r#"{
            "id": "usdt",
            "subunits": 6,
            "options": {
                "erc20_contract_address": "0xdac17f958d2ee523a2206206994597c13d831ec7",
                "gas_limit": 90000,
                "gas_rate": "fast"
            }
        }"#;
        let currency: Currency = serde_json::from_str(json).unwrap();
        assert_eq!(currency.id, "usdt");
        assert_eq!(
            currency.asset,
            AssetKind::Erc20 {
                contract_address: "0xdac17f958d2ee523a2206206994597c13d831ec7".into()
            }
        );
        assert_eq!(currency.fees.gas_limit, Some(90_000));
        assert_eq!(currency.fees.gas_rate, Some(GasPriceRate::Fast));
    }

    #[test]
    fn currency_without_options_is_native() {
        let currency: Currency = serde_json::from_str(r#"{"id": "btc", "subunits": 8}"#).unwrap();
        assert!(currency.is_native());
        assert!(currency.fees.is_empty());
    }

    #[test]
    fn empty_contract_address_means_native() {
        let json = r#"{"id": "eth", "subunits": 18, "options": {"erc20_contract_address": ""}}"#;
        let currency: Currency = serde_json::from_str(json).unwrap();
        assert!(currency.is_native());
    }

    #[test]
    fn conflicting_token_identifiers_are_rejected() {
        let json = r#"{
            "id": "bad",
            "subunits": 6,
            "options": {"trc10_asset_id": "1002000", "trc20_contract_address": "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"}
        }"#;
        let err = serde_json::from_str::<Currency>(json).unwrap_err();
        assert!(err.to_string().contains("more than one token identifier"));
    }

    #[test]
    fn currency_serializes_back_to_flat_form() {
        let currency = Currency::token(
            "btt",
            6,
            AssetKind::Trc10 {
                asset_id: "1002000".into(),
            },
        );
        let value = serde_json::to_value(&currency).unwrap();
        assert_eq!(value["options"]["trc10_asset_id"], "1002000");

        let back: Currency = serde_json::from_value(value).unwrap();
        assert_eq!(back, currency);
    }

    #[test]
    fn submission_preserves_external_terminal_states() {
        let mut tx = Transaction::withdrawal("eth", "0xabc", BigDecimal::from_str("1").unwrap());
        tx.status = TxStatus::Rejected;
        tx.mark_submitted("0xhash".into());
        assert_eq!(tx.status, TxStatus::Rejected);
        assert_eq!(tx.tx_hash.as_deref(), Some("0xhash"));

        let mut tx = Transaction::withdrawal("eth", "0xabc", BigDecimal::from_str("1").unwrap());
        tx.mark_submitted("0xhash".into());
        assert_eq!(tx.status, TxStatus::Pending);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TxStatus::Succeed).unwrap(), "\"succeed\"");
        assert_eq!(TxStatus::Skipped.to_string(), "skipped");
    }
}
