// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain adapters.
//!
//! Each chain family implements the same two capabilities:
//!
//! - [`Blockchain`]: read blocks, transactions and balances, normalized into
//!   [`crate::models`] types
//! - [`Wallet`]: create addresses and submit transfers from one
//!   node-managed account
//!
//! Families share no implementation. The [`ChainFamily`] tag picks one at
//! construction through [`new_blockchain`] and [`new_wallet`].

pub mod bitcoin;
pub mod evm;
mod registry;
pub mod tron;

use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::amount::from_minor_units;
use crate::config::{BlockchainSettings, WalletSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{Block, Currency, Transaction};
use crate::options::FeeOptions;

pub use registry::CurrencyRegistry;

/// Chain family tag used to select an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// bitcoind-compatible UTXO chains
    Bitcoin,
    /// Ethereum-compatible account chains
    Evm,
    Tron,
}

impl std::fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChainFamily::Bitcoin => "bitcoin",
            ChainFamily::Evm => "evm",
            ChainFamily::Tron => "tron",
        };
        f.write_str(s)
    }
}

impl FromStr for ChainFamily {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" | "utxo" => Ok(ChainFamily::Bitcoin),
            "evm" | "eth" | "ethereum" => Ok(ChainFamily::Evm),
            "tron" | "trx" => Ok(ChainFamily::Tron),
            other => Err(ChainError::Config(format!("Unknown chain family: {other}"))),
        }
    }
}

/// Read access to one chain.
#[async_trait]
pub trait Blockchain: Send + Sync {
    fn family(&self) -> ChainFamily;

    async fn get_latest_block_number(&self, cancel: &CancellationToken) -> ChainResult<u64>;

    async fn get_block_by_hash(&self, cancel: &CancellationToken, hash: &str) -> ChainResult<Block>;

    async fn get_block_by_number(&self, cancel: &CancellationToken, number: u64)
        -> ChainResult<Block>;

    /// Every canonical record carried by one transaction. A UTXO payment to
    /// several recipients or a contract call emitting several token
    /// transfers yields several records.
    async fn get_transactions(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> ChainResult<Vec<Transaction>>;

    /// The first record of [`Blockchain::get_transactions`].
    async fn get_transaction(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> ChainResult<Transaction> {
        self.get_transactions(cancel, tx_hash)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::NotFound(format!("No transfer records in {tx_hash}")))
    }

    async fn get_balance_of_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
        currency_id: &str,
    ) -> ChainResult<BigDecimal>;
}

/// A freshly created deposit address and the secret needed to spend from it.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub address: String,
    pub secret: String,
}

impl std::fmt::Debug for NewAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAddress")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Write access for one currency on one node-managed account.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn family(&self) -> ChainFamily;

    async fn create_address(&self, cancel: &CancellationToken) -> ChainResult<NewAddress>;

    /// Submit `tx` and return it annotated with hash, fee (when known) and
    /// `pending` status. `overrides` is the call-site option layer.
    async fn create_transaction(
        &self,
        cancel: &CancellationToken,
        tx: Transaction,
        overrides: &FeeOptions,
    ) -> ChainResult<Transaction>;

    async fn load_balance(&self, cancel: &CancellationToken) -> ChainResult<BigDecimal>;

    /// Plan the native-currency transfer that lets deposit addresses pay for
    /// sweeping `token_currency`. Never submits. `None` when nothing needs
    /// funding.
    async fn prepare_deposit_collection(
        &self,
        cancel: &CancellationToken,
        funding_tx: Transaction,
        spreads: &[Transaction],
        token_currency: &Currency,
    ) -> ChainResult<Option<Transaction>>;
}

/// Build a read adapter for `family`.
pub fn new_blockchain(
    family: ChainFamily,
    settings: BlockchainSettings,
) -> ChainResult<Box<dyn Blockchain>> {
    let adapter: Box<dyn Blockchain> = match family {
        ChainFamily::Bitcoin => Box::new(bitcoin::BitcoinBlockchain::new(settings)?),
        ChainFamily::Evm => Box::new(evm::EvmBlockchain::new(settings)?),
        ChainFamily::Tron => Box::new(tron::TronBlockchain::new(settings)?),
    };
    Ok(adapter)
}

/// Build a wallet adapter for `family`.
pub fn new_wallet(family: ChainFamily, settings: WalletSettings) -> ChainResult<Box<dyn Wallet>> {
    let adapter: Box<dyn Wallet> = match family {
        ChainFamily::Bitcoin => Box::new(bitcoin::BitcoinWallet::new(settings)?),
        ChainFamily::Evm => Box::new(evm::EvmWallet::new(settings)?),
        ChainFamily::Tron => Box::new(tron::TronWallet::new(settings)?),
    };
    Ok(adapter)
}

// =============================================================================
// Helpers shared by the wallet implementations
// =============================================================================

/// Refuse transactions whose status was settled by business rules.
pub(crate) fn ensure_submittable(tx: &Transaction) -> ChainResult<()> {
    if tx.status.is_externally_assigned() {
        return Err(ChainError::invalid_transaction(
            tx.tx_hash.clone().unwrap_or_default(),
            format!("status {} cannot be submitted", tx.status),
        ));
    }
    Ok(())
}

/// A wallet only moves its own currency.
pub(crate) fn ensure_wallet_currency(tx: &Transaction, currency: &Currency) -> ChainResult<()> {
    if tx.currency != currency.id {
        return Err(ChainError::CurrencyNotFound(format!(
            "{} (wallet holds {})",
            tx.currency, currency.id
        )));
    }
    Ok(())
}

/// Deposit funding is paid from the native-currency wallet.
pub(crate) fn ensure_native_wallet(currency: &Currency) -> ChainResult<()> {
    if !currency.is_native() {
        return Err(ChainError::Config(format!(
            "Deposit funding needs the native wallet, this one holds {}",
            currency.id
        )));
    }
    Ok(())
}

/// Fill in a funding transaction: `per_transfer_fee` native minor units for
/// every spread, plus the options the sweeps will run with.
pub(crate) fn funding_transaction(
    mut funding_tx: Transaction,
    native: &Currency,
    per_transfer_fee: u128,
    spreads: usize,
    options: FeeOptions,
) -> Transaction {
    let total = BigInt::from(per_transfer_fee) * BigInt::from(spreads);
    funding_tx.amount = from_minor_units(&total, native.subunits);
    funding_tx.currency = native.id.clone();
    funding_tx.currency_fee = native.id.clone();
    funding_tx.options = funding_tx.options.overlay(&options);
    funding_tx
}
