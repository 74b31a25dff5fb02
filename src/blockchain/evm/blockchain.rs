// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain reader.
//!
//! A transaction's receipt decides what it was:
//!
//! 1. receipt has logs: scan them for ERC-20 `Transfer` events emitted by a
//!    configured contract, one record per matching log
//! 2. no logs, receipt failed and the transaction called a configured
//!    contract: one zero-amount failed record for that token
//! 3. otherwise: one native record, unless it created a contract

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::erc20::{balance_of_calldata, decode_word, topic_address, transfer_recipient, TRANSFER_TOPIC};
use super::types::{format_address, u256_to_bigint, RpcBlock, RpcReceipt, TxView};
use crate::amount::from_minor_units;
use crate::blockchain::{Blockchain, ChainFamily, CurrencyRegistry};
use crate::config::{rpc_timeout, BlockchainSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{AssetKind, Block, Currency, Transaction, TxStatus};
use crate::rpc::{JsonRpcHttp, RpcClient, RpcTransport};

/// Receipt lookups in flight while normalizing a block.
const RECEIPT_LOOKUP_CONCURRENCY: usize = 8;

/// A configured ERC-20 token and its parsed contract address.
#[derive(Debug, Clone)]
struct TokenContract {
    address: Address,
    currency: Currency,
}

/// Parse every token's contract address once, at construction.
fn token_contracts(registry: &CurrencyRegistry) -> ChainResult<Vec<TokenContract>> {
    registry
        .tokens()
        .iter()
        .map(|currency| match &currency.asset {
            AssetKind::Erc20 { contract_address } => Ok(TokenContract {
                address: Address::from_str(contract_address.trim()).map_err(|e| {
                    ChainError::Config(format!(
                        "Invalid contract address for {}: {e}",
                        currency.id
                    ))
                })?,
                currency: currency.clone(),
            }),
            other => Err(ChainError::Config(format!(
                "EVM adapters only carry ERC-20 tokens, {} is {other:?}",
                currency.id
            ))),
        })
        .collect()
}

pub struct EvmBlockchain {
    rpc: RpcClient,
    native: Currency,
    tokens: Vec<TokenContract>,
    registry: CurrencyRegistry,
}

impl EvmBlockchain {
    pub fn new(settings: BlockchainSettings) -> ChainResult<Self> {
        let transport = JsonRpcHttp::new(&settings.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: BlockchainSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        let registry = CurrencyRegistry::new(settings.currencies)?;
        let tokens = token_contracts(&registry)?;

        tracing::info!(
            uri = %settings.uri,
            native = %registry.native().id,
            tokens = tokens.len(),
            "EVM adapter configured"
        );

        Ok(Self {
            rpc: RpcClient::new(transport),
            native: registry.native().clone(),
            tokens,
            registry,
        })
    }

    fn token_by_contract(&self, contract: &Address) -> Option<&TokenContract> {
        self.tokens.iter().find(|t| t.address == *contract)
    }

    async fn receipt(&self, cancel: &CancellationToken, tx: &TxView) -> ChainResult<RpcReceipt> {
        let hash = format!("{:#x}", tx.hash);
        let receipt: Option<RpcReceipt> = self
            .rpc
            .call(cancel, "eth_getTransactionReceipt", json!([hash]))
            .await?;
        receipt.ok_or_else(|| ChainError::NotFound(format!("No receipt for {hash}")))
    }

    /// Turn one transaction and its receipt into canonical records.
    fn normalize(
        &self,
        tx: &TxView,
        receipt: &RpcReceipt,
        block_number: Option<u64>,
    ) -> Vec<Transaction> {
        let status = receipt_status(receipt);
        let block_number = receipt.block_number.map(|n| n.to::<u64>()).or(block_number);
        let record = |currency: &Currency, to: String, amount: BigDecimal, fee: BigDecimal| {
            Transaction {
                currency: currency.id.clone(),
                currency_fee: self.native.id.clone(),
                from_addresses: vec![format_address(&tx.from)],
                to_address: to,
                amount,
                fee: Some(fee),
                block_number,
                tx_hash: Some(format!("{:#x}", tx.hash)),
                status,
                options: Default::default(),
            }
        };

        if !receipt.logs.is_empty() {
            let fee = self.token_fee(tx, receipt);
            return receipt
                .logs
                .iter()
                .filter(|log| !log.removed && log.topics.len() >= 3)
                .filter(|log| log.topics[0] == TRANSFER_TOPIC)
                .filter_map(|log| {
                    let Some(token) = self.token_by_contract(&log.address) else {
                        tracing::debug!(
                            tx_hash = %tx.hash,
                            contract = %log.address,
                            "Skipping transfer log from unconfigured contract"
                        );
                        return None;
                    };
                    let mut transfer = record(
                        &token.currency,
                        format_address(&topic_address(&log.topics[2])),
                        from_minor_units(
                            &num_bigint::BigInt::from_bytes_be(num_bigint::Sign::Plus, &log.data),
                            token.currency.subunits,
                        ),
                        fee.clone(),
                    );
                    transfer.from_addresses = vec![format_address(&topic_address(&log.topics[1]))];
                    Some(transfer)
                })
                .collect();
        }

        let called_tokens: Vec<&TokenContract> = match (status, tx.to.as_ref()) {
            (TxStatus::Failed, Some(to)) => self.tokens.iter().filter(|t| t.address == *to).collect(),
            _ => Vec::new(),
        };
        if !called_tokens.is_empty() {
            let recipient = transfer_recipient(&tx.input)
                .map(|to| format_address(&to))
                .unwrap_or_default();
            let fee = self.token_fee(tx, receipt);
            return called_tokens
                .into_iter()
                .map(|token| {
                    record(&token.currency, recipient.clone(), BigDecimal::from(0), fee.clone())
                })
                .collect();
        }

        let Some(to) = tx.to else {
            tracing::debug!(tx_hash = %tx.hash, "Skipping contract creation");
            return Vec::new();
        };

        // cost - value
        let fee = U256::from(tx.gas_limit).saturating_mul(U256::from(tx.max_fee_per_gas));
        vec![record(
            &self.native,
            format_address(&to),
            from_minor_units(&u256_to_bigint(tx.value), self.native.subunits),
            from_minor_units(&u256_to_bigint(fee), self.native.subunits),
        )]
    }

    /// Gas used times effective gas price, in native currency.
    fn token_fee(&self, tx: &TxView, receipt: &RpcReceipt) -> BigDecimal {
        let price = receipt
            .effective_gas_price
            .unwrap_or_else(|| U256::from(tx.max_fee_per_gas));
        let fee = U256::from(receipt.gas_used.to::<u64>()).saturating_mul(price);
        from_minor_units(&u256_to_bigint(fee), self.native.subunits)
    }

    async fn build_block(&self, cancel: &CancellationToken, raw: RpcBlock) -> ChainResult<Block> {
        let number = raw.number.to::<u64>();
        let views = raw
            .transactions
            .iter()
            .map(TxView::from_rpc)
            .collect::<ChainResult<Vec<_>>>()?;

        let lookups: Vec<_> = views.iter().map(|view| self.receipt(cancel, view)).collect();
        let receipts: Vec<RpcReceipt> = futures::stream::iter(lookups)
            .buffered(RECEIPT_LOOKUP_CONCURRENCY)
            .try_collect()
            .await?;

        let transactions: Vec<Transaction> = views
            .iter()
            .zip(receipts.iter())
            .flat_map(|(view, receipt)| self.normalize(view, receipt, Some(number)))
            .collect();

        tracing::debug!(block = number, records = transactions.len(), "Normalized EVM block");

        Ok(Block {
            hash: format!("{:#x}", raw.hash),
            number,
            transactions,
        })
    }
}

fn receipt_status(receipt: &RpcReceipt) -> TxStatus {
    match receipt.status.map(|s| s.to::<u64>()) {
        Some(1) => TxStatus::Succeed,
        Some(0) => TxStatus::Failed,
        _ => TxStatus::Pending,
    }
}

fn parse_address(address: &str) -> ChainResult<Address> {
    Address::from_str(address.trim()).map_err(|e| ChainError::InvalidAddress(format!("{address}: {e}")))
}

#[async_trait]
impl Blockchain for EvmBlockchain {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    async fn get_latest_block_number(&self, cancel: &CancellationToken) -> ChainResult<u64> {
        let number: alloy::primitives::U64 = self.rpc.call(cancel, "eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }

    async fn get_block_by_hash(&self, cancel: &CancellationToken, hash: &str) -> ChainResult<Block> {
        let raw: Option<RpcBlock> = self
            .rpc
            .call(cancel, "eth_getBlockByHash", json!([hash, true]))
            .await?;
        let raw = raw.ok_or_else(|| ChainError::NotFound(format!("Block {hash}")))?;
        self.build_block(cancel, raw).await
    }

    async fn get_block_by_number(
        &self,
        cancel: &CancellationToken,
        number: u64,
    ) -> ChainResult<Block> {
        let raw: Option<RpcBlock> = self
            .rpc
            .call(cancel, "eth_getBlockByNumber", json!([format!("{number:#x}"), true]))
            .await?;
        let raw = raw.ok_or_else(|| ChainError::NotFound(format!("Block {number}")))?;
        self.build_block(cancel, raw).await
    }

    async fn get_transactions(
        &self,
        cancel: &CancellationToken,
        tx_hash: &str,
    ) -> ChainResult<Vec<Transaction>> {
        let tx: Option<alloy::rpc::types::Transaction> = self
            .rpc
            .call(cancel, "eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        let tx = tx.ok_or_else(|| ChainError::NotFound(format!("Transaction {tx_hash}")))?;

        let view = TxView::from_rpc(&tx)?;
        let receipt = self.receipt(cancel, &view).await?;
        Ok(self.normalize(&view, &receipt, tx.block_number))
    }

    async fn get_balance_of_address(
        &self,
        cancel: &CancellationToken,
        address: &str,
        currency_id: &str,
    ) -> ChainResult<BigDecimal> {
        let currency = self.registry.get(currency_id)?;
        let owner = parse_address(address)?;

        let units = match &currency.asset {
            AssetKind::Erc20 { .. } => {
                let contract = self
                    .tokens
                    .iter()
                    .find(|t| t.currency.id == currency.id)
                    .ok_or_else(|| ChainError::CurrencyNotFound(currency.id.clone()))?;
                let output: alloy::primitives::Bytes = self
                    .rpc
                    .call(
                        cancel,
                        "eth_call",
                        json!([
                            {"to": format_address(&contract.address), "data": balance_of_calldata(owner)},
                            "latest"
                        ]),
                    )
                    .await?;
                decode_word(&output)?
            }
            _ => {
                self.rpc
                    .call::<U256>(
                        cancel,
                        "eth_getBalance",
                        json!([format_address(&owner), "latest"]),
                    )
                    .await?
            }
        };

        Ok(from_minor_units(&u256_to_bigint(units), currency.subunits))
    }
}

#[cfg(test)]
mod tests {
    use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
    use alloy::primitives::{Bytes, TxKind, B256};
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use serde_json::Value;

    use super::super::erc20::transfer_calldata;
    use super::*;
    use crate::rpc::mock::MockTransport;

    pub const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_slice(&[0x42; 32]).unwrap()
    }

    /// Node-format JSON of a signed legacy transaction. The node-reported
    /// `from` is deliberately wrong.
    fn signed_tx(to: Option<Address>, value: U256, input: Bytes) -> (Value, String) {
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce: 7,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: to.map(TxKind::Call).unwrap_or(TxKind::Create),
            value,
            input,
        };
        let signature = signer().sign_hash_sync(&tx.signature_hash()).unwrap();
        let envelope: TxEnvelope = tx.into_signed(signature).into();
        let hash = format!("{:#x}", envelope.tx_hash());

        let mut json = serde_json::to_value(&envelope).unwrap();
        json["from"] = json!(format_address(&Address::ZERO));
        (json, hash)
    }

    fn settings() -> BlockchainSettings {
        BlockchainSettings {
            uri: "http://127.0.0.1:8545".into(),
            currencies: vec![
                Currency::native("eth", 18),
                Currency::token(
                    "usdt",
                    6,
                    AssetKind::Erc20 {
                        contract_address: USDT.into(),
                    },
                ),
            ],
        }
    }

    fn adapter(mock: MockTransport) -> EvmBlockchain {
        EvmBlockchain::with_transport(settings(), Arc::new(mock)).unwrap()
    }

    fn padded(tail: &str) -> String {
        format!("0x{tail:0>64}")
    }

    fn usdt() -> Address {
        Address::from_str(USDT).unwrap()
    }

    #[test]
    fn sender_is_recovered_from_signature() {
        let (json, _) = signed_tx(Some(usdt()), U256::ZERO, Bytes::new());
        let tx: alloy::rpc::types::Transaction = serde_json::from_value(json).unwrap();

        let view = TxView::from_rpc(&tx).unwrap();
        assert_eq!(view.from, signer().address());
        assert_ne!(view.from, Address::ZERO);
        assert_eq!(view.gas_limit, 21_000);
        assert_eq!(view.max_fee_per_gas, 20_000_000_000);
    }

    #[tokio::test]
    async fn native_transfer_fee_is_cost_minus_value() {
        let to = Address::from_str("0x00000000000000000000000000000000000000cc").unwrap();
        let (tx, hash) = signed_tx(Some(to), U256::from(1_500_000_000_000_000_000u64), Bytes::new());
        let mock = MockTransport::new()
            .on_params("eth_getTransactionByHash", json!([hash]), tx)
            .on(
                "eth_getTransactionReceipt",
                json!({"status": "0x1", "gasUsed": "0x5208", "blockNumber": "0x10", "logs": []}),
            );
        let chain = adapter(mock);

        let records = chain
            .get_transactions(&CancellationToken::new(), &hash)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.currency, "eth");
        assert_eq!(record.amount, dec("1.5"));
        // 21000 * 20 gwei
        assert_eq!(record.fee, Some(dec("0.00042")));
        assert_eq!(record.to_address, "0x00000000000000000000000000000000000000cc");
        assert_eq!(record.from_addresses, vec![format_address(&signer().address())]);
        assert_eq!(record.status, TxStatus::Succeed);
        assert_eq!(record.block_number, Some(16));
        assert_eq!(record.tx_hash.as_deref(), Some(hash.as_str()));
    }

    #[tokio::test]
    async fn transfer_log_yields_token_record() {
        let recipient = Address::from_str("0x000000000000000000000000000000000000bbbb").unwrap();
        let (tx, hash) = signed_tx(
            Some(usdt()),
            U256::ZERO,
            transfer_calldata(recipient, U256::from(100_000u64)),
        );
        let receipt = json!({
            "status": "0x1",
            "gasUsed": "0xea60",
            "effectiveGasPrice": "0x4a817c800",
            "logs": [
                {
                    "address": USDT,
                    "topics": [format!("{TRANSFER_TOPIC:#x}"), padded("aaaa"), padded("bbbb")],
                    "data": "0x0186A0"
                },
                {
                    "address": "0x00000000000000000000000000000000deadbeef",
                    "topics": [format!("{TRANSFER_TOPIC:#x}"), padded("aaaa"), padded("cccc")],
                    "data": "0x01"
                }
            ]
        });
        let mock = MockTransport::new()
            .on_params("eth_getTransactionByHash", json!([hash]), tx)
            .on("eth_getTransactionReceipt", receipt);
        let chain = adapter(mock);
        let cancel = CancellationToken::new();

        let records = chain.get_transactions(&cancel, &hash).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.currency, "usdt");
        assert_eq!(record.currency_fee, "eth");
        assert_eq!(record.amount, dec("0.1"));
        assert_eq!(record.from_addresses, vec!["0x000000000000000000000000000000000000aaaa".to_string()]);
        assert_eq!(record.to_address, "0x000000000000000000000000000000000000bbbb");
        // 60000 * 20 gwei
        assert_eq!(record.fee, Some(dec("0.0012")));

        let again = chain.get_transactions(&cancel, &hash).await.unwrap();
        assert_eq!(records, again);
    }

    #[tokio::test]
    async fn failed_token_call_without_logs() {
        let recipient = Address::from_str("0x000000000000000000000000000000000000bbbb").unwrap();
        let (tx, hash) = signed_tx(
            Some(usdt()),
            U256::ZERO,
            transfer_calldata(recipient, U256::from(5u8)),
        );
        let mock = MockTransport::new()
            .on_params("eth_getTransactionByHash", json!([hash]), tx)
            .on(
                "eth_getTransactionReceipt",
                json!({"status": "0x0", "gasUsed": "0x5208", "logs": []}),
            );
        let chain = adapter(mock);

        let record = chain
            .get_transaction(&CancellationToken::new(), &hash)
            .await
            .unwrap();
        assert_eq!(record.currency, "usdt");
        assert_eq!(record.amount, BigDecimal::from(0));
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(record.to_address, "0x000000000000000000000000000000000000bbbb");
    }

    #[tokio::test]
    async fn failed_call_yields_a_record_per_token_on_the_contract() {
        let recipient = Address::from_str("0x000000000000000000000000000000000000bbbb").unwrap();
        let (tx, hash) = signed_tx(
            Some(usdt()),
            U256::ZERO,
            transfer_calldata(recipient, U256::from(5u8)),
        );
        let mock = MockTransport::new()
            .on_params("eth_getTransactionByHash", json!([hash]), tx)
            .on(
                "eth_getTransactionReceipt",
                json!({"status": "0x0", "gasUsed": "0x5208", "logs": []}),
            );
        let mut settings = settings();
        settings.currencies.push(Currency::token(
            "usdt-omni",
            6,
            AssetKind::Erc20 {
                contract_address: USDT.to_lowercase(),
            },
        ));
        let chain = EvmBlockchain::with_transport(settings, Arc::new(mock)).unwrap();

        let records = chain
            .get_transactions(&CancellationToken::new(), &hash)
            .await
            .unwrap();
        let currencies: Vec<&str> = records.iter().map(|r| r.currency.as_str()).collect();
        assert_eq!(currencies, vec!["usdt", "usdt-omni"]);
        assert!(records.iter().all(|r| r.status == TxStatus::Failed));
        assert!(records.iter().all(|r| r.amount == BigDecimal::from(0)));
    }

    #[tokio::test]
    async fn contract_creation_yields_nothing() {
        let (tx, hash) = signed_tx(None, U256::ZERO, Bytes::from_static(&[0x60, 0x80]));
        let mock = MockTransport::new()
            .on_params("eth_getTransactionByHash", json!([hash]), tx)
            .on(
                "eth_getTransactionReceipt",
                json!({"status": "0x1", "gasUsed": "0x5208", "logs": []}),
            );
        let chain = adapter(mock);
        let cancel = CancellationToken::new();

        assert!(chain.get_transactions(&cancel, &hash).await.unwrap().is_empty());
        assert!(matches!(
            chain.get_transaction(&cancel, &hash).await,
            Err(ChainError::NotFound(_))
        ));
    }

    #[test]
    fn receipt_status_mapping() {
        let receipt = |status: Value| -> RpcReceipt {
            serde_json::from_value(json!({"status": status, "gasUsed": "0x0"})).unwrap()
        };
        assert_eq!(receipt_status(&receipt(json!("0x1"))), TxStatus::Succeed);
        assert_eq!(receipt_status(&receipt(json!("0x0"))), TxStatus::Failed);
        assert_eq!(receipt_status(&receipt(Value::Null)), TxStatus::Pending);
    }

    #[tokio::test]
    async fn block_normalizes_every_transaction() {
        let to = Address::from_str("0x00000000000000000000000000000000000000cc").unwrap();
        let (tx, hash) = signed_tx(Some(to), U256::from(1u8), Bytes::new());
        let block = json!({
            "hash": format!("{:#x}", B256::repeat_byte(0xab)),
            "number": "0x64",
            "transactions": [tx]
        });
        let mock = MockTransport::new()
            .on_params("eth_getBlockByNumber", json!(["0x64", true]), block)
            .on_params(
                "eth_getTransactionReceipt",
                json!([hash]),
                json!({"status": "0x1", "gasUsed": "0x5208", "logs": []}),
            );
        let chain = adapter(mock);

        let block = chain
            .get_block_by_number(&CancellationToken::new(), 100)
            .await
            .unwrap();
        assert_eq!(block.number, 100);
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].block_number, Some(100));
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let chain = adapter(MockTransport::new().on("eth_getBlockByHash", Value::Null));
        let err = chain
            .get_block_by_hash(&CancellationToken::new(), "0xdead")
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::NotFound(_)));
    }

    #[tokio::test]
    async fn balances_for_native_and_token() {
        let mut word = [0u8; 32];
        word[29..].copy_from_slice(&[0x01, 0x86, 0xa0]);
        let mock = MockTransport::new()
            .on("eth_getBalance", json!("0xde0b6b3a7640000"))
            .on("eth_call", json!(format!("0x{}", alloy::hex::encode(word))));
        let chain = adapter(mock);
        let cancel = CancellationToken::new();
        let owner = "0x000000000000000000000000000000000000aaaa";

        assert_eq!(
            chain.get_balance_of_address(&cancel, owner, "eth").await.unwrap(),
            dec("1")
        );
        assert_eq!(
            chain.get_balance_of_address(&cancel, owner, "usdt").await.unwrap(),
            dec("0.1")
        );
        assert!(matches!(
            chain.get_balance_of_address(&cancel, "not-an-address", "eth").await,
            Err(ChainError::InvalidAddress(_))
        ));
        assert!(matches!(
            chain.get_balance_of_address(&cancel, owner, "dai").await,
            Err(ChainError::CurrencyNotFound(_))
        ));
    }

    #[test]
    fn non_erc20_tokens_are_rejected() {
        let mut settings = settings();
        settings.currencies.push(Currency::token(
            "btt",
            6,
            AssetKind::Trc10 {
                asset_id: "1002000".into(),
            },
        ));
        assert!(EvmBlockchain::with_transport(settings, Arc::new(MockTransport::new())).is_err());
    }
}
