// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON chain reader.
//!
//! The first contract entry of a transaction decides how it is read:
//! `TransferContract` is a native TRX transfer, `TransferAssetContract` a
//! TRC10 transfer, and anything else a contract call whose execution info
//! is scanned for TRC20 `Transfer` events.

use std::str::FromStr;
use std::sync::Arc;

use alloy::hex;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::address::TronAddress;
use super::types::{
    Account, ConstantResult, RawBlock, RawTransaction, TransactionInfo, TRANSFER_ASSET_CONTRACT,
    TRANSFER_CONTRACT,
};
use crate::amount::{from_minor_units, from_minor_units_u64, parse_hex_quantity};
use crate::blockchain::evm::erc20::{transfer_recipient, TRANSFER_TOPIC};
use crate::blockchain::{Blockchain, ChainFamily, CurrencyRegistry};
use crate::config::{rpc_timeout, BlockchainSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{AssetKind, Block, Currency, Transaction, TxStatus};
use crate::rpc::{RpcClient, RpcTransport, TronHttpApi};

/// Execution-info lookups in flight while normalizing a block.
const INFO_LOOKUP_CONCURRENCY: usize = 8;

/// A configured TRC20 token and its decoded contract address.
#[derive(Debug, Clone)]
struct Trc20Contract {
    address: TronAddress,
    currency: Currency,
}

/// Decode every TRC20 contract address once, at construction.
fn trc20_contracts(registry: &CurrencyRegistry) -> ChainResult<Vec<Trc20Contract>> {
    registry
        .tokens()
        .iter()
        .filter_map(|currency| match &currency.asset {
            AssetKind::Trc20 { contract_address } => Some((currency, contract_address)),
            _ => None,
        })
        .map(|(currency, contract_address)| {
            let address = TronAddress::from_str(contract_address).map_err(|e| {
                ChainError::Config(format!("Invalid contract address for {}: {e}", currency.id))
            })?;
            Ok(Trc20Contract {
                address,
                currency: currency.clone(),
            })
        })
        .collect()
}

pub struct TronBlockchain {
    rpc: RpcClient,
    native: Currency,
    trc20: Vec<Trc20Contract>,
    registry: CurrencyRegistry,
}

impl TronBlockchain {
    pub fn new(settings: BlockchainSettings) -> ChainResult<Self> {
        let transport = TronHttpApi::new(&settings.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: BlockchainSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        let registry = CurrencyRegistry::new(settings.currencies)?;
        if let Some(token) = registry
            .tokens()
            .iter()
            .find(|c| matches!(c.asset, AssetKind::Erc20 { .. }))
        {
            return Err(ChainError::Config(format!(
                "TRON adapters carry TRC10/TRC20 tokens, {} is ERC-20",
                token.id
            )));
        }
        let trc20 = trc20_contracts(&registry)?;

        tracing::info!(
            uri = %settings.uri,
            native = %registry.native().id,
            tokens = registry.tokens().len(),
            "TRON adapter configured"
        );

        Ok(Self {
            rpc: RpcClient::new(transport),
            native: registry.native().clone(),
            trc20,
            registry,
        })
    }

    fn trc20_by_contract(&self, contract: &TronAddress) -> Option<&Trc20Contract> {
        self.trc20.iter().find(|t| t.address == *contract)
    }

    fn trc10_by_asset_id(&self, asset_id: &str) -> Option<&Currency> {
        self.registry
            .tokens()
            .iter()
            .find(|c| matches!(&c.asset, AssetKind::Trc10 { asset_id: id } if id == asset_id))
    }

    async fn transaction_info(
        &self,
        cancel: &CancellationToken,
        tx_id: &str,
    ) -> ChainResult<TransactionInfo> {
        let info: TransactionInfo = self
            .rpc
            .call(cancel, "wallet/gettransactioninfobyid", json!({ "value": tx_id }))
            .await?;
        if info.id.is_empty() {
            return Err(ChainError::NotFound(format!("Execution info for {tx_id}")));
        }
        Ok(info)
    }

    /// Canonical records for one transaction. Chain data that is readable
    /// but not a usable transfer comes back as a semantic error.
    async fn normalize(
        &self,
        cancel: &CancellationToken,
        tx: &RawTransaction,
        block_number: Option<u64>,
    ) -> ChainResult<Vec<Transaction>> {
        let contract = tx
            .contract()
            .ok_or_else(|| ChainError::invalid_transaction(&tx.tx_id, "no contract entry"))?;
        let value = &contract.parameter.value;

        if contract.kind != TRANSFER_CONTRACT && contract.kind != TRANSFER_ASSET_CONTRACT {
            let info = self.transaction_info(cancel, &tx.tx_id).await?;
            return self.normalize_contract_call(tx, &info, block_number);
        }

        if value.amount == 0 {
            return Err(ChainError::invalid_transaction(&tx.tx_id, "zero amount"));
        }
        if tx.reverted() {
            return Err(ChainError::invalid_transaction(&tx.tx_id, "reverted"));
        }

        let currency = if contract.kind == TRANSFER_CONTRACT {
            &self.native
        } else {
            let asset_id = decode_asset_name(&value.asset_name).ok_or_else(|| {
                ChainError::invalid_transaction(&tx.tx_id, "asset name is not hex text")
            })?;
            self.trc10_by_asset_id(&asset_id)
                .ok_or_else(|| ChainError::CurrencyNotFound(format!("TRC10 asset {asset_id}")))?
        };

        let status = match tx.ret.first().and_then(|r| r.contract_ret.as_deref()) {
            Some("SUCCESS") => TxStatus::Succeed,
            Some(_) => TxStatus::Failed,
            None => TxStatus::Pending,
        };

        Ok(vec![Transaction {
            currency: currency.id.clone(),
            currency_fee: self.native.id.clone(),
            from_addresses: vec![TronAddress::from_hex(&value.owner_address)?.to_base58()],
            to_address: TronAddress::from_hex(&value.to_address)?.to_base58(),
            amount: from_minor_units_u64(value.amount, currency.subunits),
            // Bandwidth is usually covered by the free allowance
            fee: None,
            block_number,
            tx_hash: Some(tx.tx_id.clone()),
            status,
            options: Default::default(),
        }])
    }

    fn normalize_contract_call(
        &self,
        tx: &RawTransaction,
        info: &TransactionInfo,
        block_number: Option<u64>,
    ) -> ChainResult<Vec<Transaction>> {
        let status = if info.succeeded() {
            TxStatus::Succeed
        } else {
            TxStatus::Failed
        };
        let fee = from_minor_units_u64(info.fee, self.native.subunits);
        let block_number = info.block_number.or(block_number);
        let record = |currency: &Currency, from: String, to: String, amount: BigDecimal| Transaction {
            currency: currency.id.clone(),
            currency_fee: self.native.id.clone(),
            from_addresses: vec![from],
            to_address: to,
            amount,
            fee: Some(fee.clone()),
            block_number,
            tx_hash: Some(tx.tx_id.clone()),
            status,
            options: Default::default(),
        };

        if info.log.is_empty() {
            if status != TxStatus::Failed || info.contract_address.is_empty() {
                return Ok(Vec::new());
            }
            let called = TronAddress::from_hex(&info.contract_address)?;
            let tokens: Vec<&Trc20Contract> =
                self.trc20.iter().filter(|t| t.address == called).collect();
            if tokens.is_empty() {
                return Ok(Vec::new());
            }
            let value = tx.contract().map(|c| &c.parameter.value);
            let from = value
                .map(|v| TronAddress::from_hex(&v.owner_address))
                .transpose()?
                .map(|a| a.to_base58())
                .unwrap_or_default();
            let to = value
                .and_then(|v| hex::decode(&v.data).ok())
                .and_then(|data| transfer_recipient(&data))
                .map(|to| TronAddress::from_account_id(to.as_slice()))
                .transpose()?
                .map(|a| a.to_base58())
                .unwrap_or_default();
            return Ok(tokens
                .into_iter()
                .map(|token| record(&token.currency, from.clone(), to.clone(), BigDecimal::from(0)))
                .collect());
        }

        let mut records = Vec::new();
        for log in &info.log {
            if log.topics.len() < 3 || !is_transfer_topic(&log.topics[0]) {
                continue;
            }
            let contract = TronAddress::from_log_hex(&log.address)?;
            let Some(token) = self.trc20_by_contract(&contract) else {
                tracing::debug!(
                    tx_hash = %tx.tx_id,
                    contract = %contract,
                    "Skipping transfer log from unconfigured contract"
                );
                continue;
            };
            records.push(record(
                &token.currency,
                TronAddress::from_log_hex(&log.topics[1])?.to_base58(),
                TronAddress::from_log_hex(&log.topics[2])?.to_base58(),
                from_minor_units(&parse_hex_quantity(&log.data)?, token.currency.subunits),
            ));
        }
        Ok(records)
    }

    async fn build_block(&self, cancel: &CancellationToken, raw: RawBlock) -> ChainResult<Block> {
        let number = raw.number().ok_or_else(|| ChainError::NotFound("Block".to_string()))?;

        let lookups: Vec<_> = raw
            .transactions
            .iter()
            .map(|tx| self.normalize(cancel, tx, Some(number)))
            .collect();
        let results: Vec<ChainResult<Vec<Transaction>>> = futures::stream::iter(lookups)
            .buffered(INFO_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut transactions = Vec::new();
        for (tx, result) in raw.transactions.iter().zip(results) {
            match result {
                Ok(records) => transactions.extend(records),
                Err(e) if e.is_semantic() => {
                    tracing::debug!(block = number, tx_hash = %tx.tx_id, error = %e, "Skipping transaction");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(block = number, records = transactions.len(), "Normalized TRON block");

        Ok(Block {
            hash: raw.block_id,
            number,
            transactions,
        })
    }

    async fn account(&self, cancel: &CancellationToken, owner: &TronAddress) -> ChainResult<Account> {
        self.rpc
            .call(cancel, "wallet/getaccount", json!({ "address": owner.to_hex() }))
            .await
    }
}

/// `balanceOf(owner)` through a constant call, in token minor units.
pub(super) async fn trc20_balance(
    rpc: &RpcClient,
    cancel: &CancellationToken,
    contract: &TronAddress,
    owner: &TronAddress,
) -> ChainResult<num_bigint::BigInt> {
    let result: ConstantResult = rpc
        .call(
            cancel,
            "wallet/triggerconstantcontract",
            json!({
                "owner_address": owner.to_hex(),
                "contract_address": contract.to_hex(),
                "function_selector": "balanceOf(address)",
                "parameter": owner.abi_word(),
            }),
        )
        .await?;
    let word = result
        .constant_result
        .first()
        .ok_or_else(|| ChainError::Decode("Empty constant_result for balanceOf".to_string()))?;
    parse_hex_quantity(word)
}

/// TRC10 asset names travel as hex of the asset id text.
fn decode_asset_name(raw: &str) -> Option<String> {
    String::from_utf8(hex::decode(raw).ok()?).ok()
}

fn is_transfer_topic(topic: &str) -> bool {
    let topic = topic.strip_prefix("0x").unwrap_or(topic);
    topic.eq_ignore_ascii_case(&hex::encode(TRANSFER_TOPIC))
}

#[async_trait]
impl Blockchain for TronBlockchain {
    fn family(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    async fn get_latest_block_number(&self, cancel: &CancellationToken) -> ChainResult<u64> {
        let block: RawBlock = self.rpc.call(cancel, "wallet/getnowblock", json!({})).await?;
        block
            .number()
            .ok_or_else(|| ChainError::Decode("getnowblock returned no header".to_string()))
    }

    async fn get_block_by_hash(&self, cancel: &CancellationToken, hash: &str) -> ChainResult<Block> {
        let raw: RawBlock = self
            .rpc
            .call(cancel, "wallet/getblockbyid", json!({ "value": hash }))
            .await?;
        if raw.number().is_none() {
            return Err(ChainError::NotFound(format!("Block {hash}")));
        }
        self.build_block(cancel, raw).await
    }

    async fn get_block_by_number(
        &self,
        cancel: &CancellationToken,
        number: u64,
    ) -> ChainResult<Block> {
        let raw: RawBlock = self
            .rpc
            .call(cancel, "wallet/getblockbynum", json!({ "num": number }))
            .await?;
        if raw.number().is_none() {
            return Err(ChainError::NotFound(format!("Block {number}")));
        }
        self.build_block(cancel, raw).await
    }

    async fn get_transactions(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> ChainResult<Vec<Transaction>> {
        let tx: RawTransaction = self
            .rpc
            .call(cancel, "wallet/gettransactionbyid", json!({ "value": tx_hash }))
            .await?;
        if tx.tx_id.is_empty() {
            return Err(ChainError::NotFound(format!("Transaction {tx_hash}")));
        }
        self.normalize(cancel, &tx, None).await
    }

    async fn get_balance_of_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
        currency_id: &str,
    ) -> ChainResult<BigDecimal> {
        let currency = self.registry.get(currency_id)?;
        let owner = TronAddress::from_str(address)?;

        let units = match &currency.asset {
            AssetKind::Trc20 { .. } => {
                let contract = self
                    .trc20
                    .iter()
                    .find(|t| t.currency.id == currency.id)
                    .ok_or_else(|| ChainError::CurrencyNotFound(currency.id.clone()))?;
                trc20_balance(&self.rpc, cancel, &contract.address, &owner).await?
            }
            AssetKind::Trc10 { asset_id } => self.account(cancel, &owner).await?.asset_balance(asset_id).into(),
            _ => self.account(cancel, &owner).await?.balance.into(),
        };

        Ok(from_minor_units(&units, currency.subunits))
    }
}
