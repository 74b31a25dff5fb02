// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! UTXO chain reader.

use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::{StreamExt, TryStreamExt};
use num_bigint::Sign;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::types::{grouping_entries, AddressGroupings, RawBlock, RawTransaction, TxInput, TxOutput};
use crate::blockchain::{Blockchain, ChainFamily, CurrencyRegistry};
use crate::config::{rpc_timeout, BlockchainSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{Block, Currency, Transaction, TxStatus};
use crate::rpc::{JsonRpcHttp, RpcClient, RpcTransport};

/// Previous-transaction lookups in flight per normalized transaction.
pub const INPUT_LOOKUP_CONCURRENCY: usize = 8;

pub struct BitcoinBlockchain {
    rpc: RpcClient,
    currency: Currency,
}

impl BitcoinBlockchain {
    pub fn new(settings: BlockchainSettings) -> ChainResult<Self> {
        let transport = JsonRpcHttp::new(&settings.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: BlockchainSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        let registry = CurrencyRegistry::new(settings.currencies)?;
        if let Some(token) = registry.tokens().first() {
            return Err(ChainError::Config(format!(
                "UTXO chains carry no tokens, got {}",
                token.id
            )));
        }

        tracing::info!(
            uri = %settings.uri,
            currency = %registry.native().id,
            "Bitcoin adapter configured"
        );

        Ok(Self {
            rpc: RpcClient::new(transport),
            currency: registry.native().clone(),
        })
    }

    /// Normalize one transaction into a record per paid, addressed output.
    async fn build_transactions(
        &self,
        cancel: &CancellationToken,
        tx: &RawTransaction,
        block_number: Option<u64>,
    ) -> ChainResult<Vec<Transaction>> {
        let recipients: Vec<(&str, &TxOutput)> = tx
            .vout
            .iter()
            .filter(|out| out.value.sign() == Sign::Plus)
            .filter_map(|out| out.script_pub_key.destination().map(|addr| (addr, out)))
            .collect();

        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let spent = self.resolve_inputs(cancel, &tx.vin).await?;
        let from_addresses = source_addresses(&spent);
        let fee = compute_fee(&spent, &tx.vout);

        Ok(recipients
            .into_iter()
            .map(|(to_address, out)| Transaction {
                currency: self.currency.id.clone(),
                currency_fee: self.currency.id.clone(),
                from_addresses: from_addresses.clone(),
                to_address: to_address.to_string(),
                amount: out.value.clone(),
                fee: fee.clone(),
                block_number,
                tx_hash: Some(tx.txid.clone()),
                status: TxStatus::Succeed,
                options: Default::default(),
            })
            .collect())
    }

    /// Fetch the output spent by every non-coinbase input, in input order.
    ///
    /// `None` marks an input whose previous transaction has no output at the
    /// referenced index.
    async fn resolve_inputs(
        &self,
        cancel: &CancellationToken,
        inputs: &[TxInput],
    ) -> ChainResult<Vec<Option<TxOutput>>> {
        let lookups: Vec<_> = inputs
            .iter()
            .filter_map(TxInput::outpoint)
            .map(|(txid, n)| self.previous_output(cancel, txid.to_owned(), n))
            .collect();

        futures::stream::iter(lookups)
            .buffered(INPUT_LOOKUP_CONCURRENCY)
            .try_collect()
            .await
    }

    async fn previous_output(
        &self,
        cancel: &CancellationToken,
        txid: String,
        n: u32,
    ) -> ChainResult<Option<TxOutput>> {
        let prev: RawTransaction = self
            .rpc
            .call(cancel, "getrawtransaction", json!([txid, 1]))
            .await?;
        Ok(prev.vout.into_iter().find(|out| out.n == n))
    }

    async fn block_by_hash(&self, cancel: &CancellationToken, hash: &str) -> ChainResult<Block> {
        let raw: RawBlock = self.rpc.call(cancel, "getblock", json!([hash, 2])).await?;

        let mut transactions = Vec::new();
        for tx in &raw.tx {
            transactions.extend(self.build_transactions(cancel, tx, Some(raw.height)).await?);
        }

        tracing::debug!(
            block = raw.height,
            records = transactions.len(),
            "Normalized bitcoin block"
        );

        Ok(Block {
            hash: raw.hash,
            number: raw.height,
            transactions,
        })
    }
}

/// Unique source addresses, first-seen order.
fn source_addresses(spent: &[Option<TxOutput>]) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for address in spent
        .iter()
        .flatten()
        .filter_map(|out| out.script_pub_key.destination())
    {
        if !addresses.iter().any(|a| a == address) {
            addresses.push(address.to_string());
        }
    }
    addresses
}

/// Inputs minus outputs. Unknown when any spent output is missing or when
/// nothing was spent (coinbase).
fn compute_fee(spent: &[Option<TxOutput>], outputs: &[TxOutput]) -> Option<BigDecimal> {
    if spent.is_empty() {
        return None;
    }

    let inputs = spent
        .iter()
        .map(|out| out.as_ref().map(|o| &o.value))
        .try_fold(BigDecimal::from(0), |acc, value| value.map(|v| acc + v))?;
    let paid = outputs
        .iter()
        .fold(BigDecimal::from(0), |acc, out| acc + &out.value);

    Some(inputs - paid)
}

#[async_trait]
impl Blockchain for BitcoinBlockchain {
    fn family(&self) -> ChainFamily {
        ChainFamily::Bitcoin
    }

    async fn get_latest_block_number(&self, cancel: &CancellationToken) -> ChainResult<u64> {
        self.rpc.call(cancel, "getblockcount", json!([])).await
    }

    async fn get_block_by_hash(&self, cancel: &CancellationToken, hash: &str) -> ChainResult<Block> {
        self.block_by_hash(cancel, hash).await
    }

    async fn get_block_by_number(
        &self,
        cancel: &CancellationToken,
        number: u64,
    ) -> ChainResult<Block> {
        let hash: String = self.rpc.call(cancel, "getblockhash", json!([number])).await?;
        self.block_by_hash(cancel, &hash).await
    }

    async fn get_transactions(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> ChainResult<Vec<Transaction>> {
        let raw: RawTransaction = self
            .rpc
            .call(cancel, "getrawtransaction", json!([tx_hash, 1]))
            .await?;
        self.build_transactions(cancel, &raw, None).await
    }

    async fn get_balance_of_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
        currency_id: &str,
    ) -> ChainResult<BigDecimal> {
        if currency_id != self.currency.id {
            return Err(ChainError::CurrencyNotFound(currency_id.to_string()));
        }

        let groups: AddressGroupings = self
            .rpc
            .call(cancel, "listaddressgroupings", json!([]))
            .await?;

        grouping_entries(&groups)?
            .into_iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(address))
            .map(|(_, amount)| amount)
            .ok_or_else(|| ChainError::NotFound(format!("No balance for address {address}")))
    }
}
