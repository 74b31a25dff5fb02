// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON wallet backed by a full node's HTTP API.
//!
//! Native and TRC10 transfers use the node's one-shot `easytransfer*`
//! endpoints. TRC20 transfers go through trigger, sign and broadcast, and
//! the signed envelope is checked before it leaves.

use std::str::FromStr;
use std::sync::Arc;

use alloy::hex;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use super::address::TronAddress;
use super::blockchain::trc20_balance;
use super::types::Account;
use crate::amount::{from_minor_units, to_minor_units};
use crate::blockchain::evm::erc20::transfer_calldata;
use crate::blockchain::{
    ensure_native_wallet, ensure_submittable, ensure_wallet_currency, funding_transaction, ChainFamily,
    NewAddress, Wallet,
};
use crate::config::{rpc_timeout, WalletEndpoint, WalletSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{AssetKind, Currency, Transaction};
use crate::options::{resolve, FeeOptions};
use crate::rpc::{RpcClient, RpcTransport, TronHttpApi};

/// Energy ceiling for a TRC20 transfer, in sun.
pub const DEFAULT_FEE_LIMIT: u64 = 1_000_000;

const TRC20_DEFAULTS: FeeOptions = FeeOptions {
    gas_limit: None,
    gas_price: None,
    gas_rate: None,
    fee_limit: Some(DEFAULT_FEE_LIMIT),
};

/// What the wallet's currency is on chain.
#[derive(Debug, Clone)]
enum Asset {
    Trx,
    Trc10(String),
    Trc20(TronAddress),
}

pub struct TronWallet {
    rpc: RpcClient,
    currency: Currency,
    asset: Asset,
    owner: TronAddress,
    wallet: WalletEndpoint,
}

/// Node acknowledgement attached to transfer and trigger responses.
#[derive(Debug, Default, Deserialize)]
struct Ack {
    #[serde(default)]
    result: bool,
    #[serde(default)]
    code: Option<String>,
    /// Hex-encoded text
    #[serde(default)]
    message: Option<String>,
}

impl Ack {
    fn reason(&self) -> String {
        let message = self
            .message
            .as_deref()
            .map(|m| {
                hex::decode(m)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
                    .unwrap_or_else(|| m.to_string())
            })
            .unwrap_or_default();
        match &self.code {
            Some(code) => format!("{code}: {message}"),
            None => message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    result: Ack,
    #[serde(default)]
    transaction: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeneratedAddress {
    address: String,
    #[serde(rename = "privateKey")]
    private_key: String,
}

impl TronWallet {
    pub fn new(settings: WalletSettings) -> ChainResult<Self> {
        let transport = TronHttpApi::new(&settings.wallet.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: WalletSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        let asset = match &settings.currency.asset {
            AssetKind::Native => Asset::Trx,
            AssetKind::Trc10 { asset_id } => Asset::Trc10(asset_id.clone()),
            AssetKind::Trc20 { contract_address } => Asset::Trc20(
                TronAddress::from_str(contract_address)
                    .map_err(|e| ChainError::Config(format!("Invalid contract address: {e}")))?,
            ),
            AssetKind::Erc20 { .. } => {
                return Err(ChainError::Config(format!(
                    "{} is an ERC-20 token, not a TRON asset",
                    settings.currency.id
                )))
            }
        };
        let owner = TronAddress::from_str(&settings.wallet.address)
            .map_err(|e| ChainError::Config(format!("Invalid wallet address: {e}")))?;

        Ok(Self {
            rpc: RpcClient::new(transport),
            currency: settings.currency,
            asset,
            owner,
            wallet: settings.wallet,
        })
    }

    /// Submit through an `easytransfer*` endpoint and return the txID.
    async fn easy_transfer(
        &self,
        cancel: &CancellationToken,
        method: &str,
        body: Value,
    ) -> ChainResult<String> {
        let response: TransferResponse = self.rpc.call(cancel, method, body).await?;
        if !response.result.result {
            return Err(ChainError::BroadcastRejected(response.result.reason()));
        }
        response
            .transaction
            .as_ref()
            .and_then(|tx| tx["txID"].as_str())
            .map(str::to_string)
            .ok_or_else(|| ChainError::Decode(format!("{method} returned no txID")))
    }

    /// Trigger, sign, verify and broadcast a TRC20 `transfer`.
    async fn trc20_transfer(
        &self,
        cancel: &CancellationToken,
        contract: &TronAddress,
        to: &TronAddress,
        units: &BigInt,
        fee_limit: u64,
    ) -> ChainResult<String> {
        let amount = U256::from_str(&units.to_string())
            .map_err(|e| ChainError::Decode(format!("Amount {units} out of range: {e}")))?;
        let calldata = transfer_calldata(Address::from_slice(to.account_id()), amount);

        let triggered: TransferResponse = self
            .rpc
            .call(
                cancel,
                "wallet/triggersmartcontract",
                json!({
                    "owner_address": self.owner.to_hex(),
                    "contract_address": contract.to_hex(),
                    "function_selector": "transfer(address,uint256)",
                    // ABI arguments without the 4-byte selector
                    "parameter": hex::encode(&calldata[4..]),
                    "fee_limit": fee_limit,
                    "call_value": 0,
                }),
            )
            .await?;
        let unsigned = match (triggered.result.result, triggered.transaction) {
            (true, Some(tx)) => tx,
            _ => {
                return Err(ChainError::rpc(
                    "wallet/triggersmartcontract",
                    triggered.result.reason(),
                ))
            }
        };

        let signed: Value = self
            .rpc
            .call(
                cancel,
                "wallet/gettransactionsign",
                json!({ "transaction": unsigned, "privateKey": self.wallet.secret }),
            )
            .await?;
        let txid = verify_txid(&signed)?;

        let broadcast: Ack = self
            .rpc
            .call(cancel, "wallet/broadcasttransaction", signed)
            .await?;
        if !broadcast.result {
            return Err(ChainError::BroadcastRejected(broadcast.reason()));
        }
        Ok(txid)
    }

    async fn account(&self, cancel: &CancellationToken) -> ChainResult<Account> {
        self.rpc
            .call(cancel, "wallet/getaccount", json!({ "address": self.owner.to_hex() }))
            .await
    }
}

/// Check that a signed envelope's `txID` is the sha256 of its raw data and
/// return it.
fn verify_txid(signed: &Value) -> ChainResult<String> {
    let txid = signed["txID"]
        .as_str()
        .ok_or_else(|| ChainError::Decode("Signed transaction has no txID".to_string()))?;
    let raw_hex = signed["raw_data_hex"]
        .as_str()
        .ok_or_else(|| ChainError::Decode("Signed transaction has no raw_data_hex".to_string()))?;
    let raw = hex::decode(raw_hex)
        .map_err(|e| ChainError::Decode(format!("Invalid raw_data_hex: {e}")))?;

    let expected = hex::encode(Sha256::digest(&raw));
    if !expected.eq_ignore_ascii_case(txid) {
        return Err(ChainError::Decode(format!(
            "txID {txid} does not match raw data hash {expected}"
        )));
    }
    if signed["signature"].as_array().map_or(true, |s| s.is_empty()) {
        return Err(ChainError::Decode(format!("Transaction {txid} is unsigned")));
    }
    Ok(txid.to_string())
}

#[async_trait]
impl Wallet for TronWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Tron
    }

    async fn create_address(&self, cancel: &CancellationToken) -> ChainResult<NewAddress> {
        let generated: GeneratedAddress = self
            .rpc
            .call(cancel, "wallet/generateaddress", json!({}))
            .await?;
        // Round-trip through the codec so a malformed reply never reaches
        // the caller
        let address = TronAddress::from_str(&generated.address)?;
        Ok(NewAddress {
            address: address.to_base58(),
            secret: generated.private_key,
        })
    }

    async fn create_transaction(
        &self,
        cancel: &CancellationToken,
        mut tx: Transaction,
        overrides: &FeeOptions,
    ) -> ChainResult<Transaction> {
        ensure_submittable(&tx)?;
        ensure_wallet_currency(&tx, &self.currency)?;

        let to = TronAddress::from_str(&tx.to_address)?;
        let units = to_minor_units(&tx.amount, self.currency.subunits)?;
        let units_u64 = || {
            units
                .to_u64()
                .ok_or_else(|| ChainError::Decode(format!("Amount {units} out of range")))
        };

        let txid = match &self.asset {
            Asset::Trx => {
                self.easy_transfer(
                    cancel,
                    "wallet/easytransferbyprivate",
                    json!({
                        "privateKey": self.wallet.secret,
                        "toAddress": to.to_hex(),
                        "amount": units_u64()?,
                    }),
                )
                .await?
            }
            Asset::Trc10(asset_id) => {
                self.easy_transfer(
                    cancel,
                    "wallet/easytransferassetbyprivate",
                    json!({
                        "privateKey": self.wallet.secret,
                        "toAddress": to.to_hex(),
                        "assetId": asset_id,
                        "amount": units_u64()?,
                    }),
                )
                .await?
            }
            Asset::Trc20(contract) => {
                let options = resolve([&TRC20_DEFAULTS, &self.currency.fees, overrides]);
                let fee_limit = options.fee_limit.unwrap_or(DEFAULT_FEE_LIMIT);
                let txid = self
                    .trc20_transfer(cancel, contract, &to, &units, fee_limit)
                    .await?;
                tx.options = options;
                txid
            }
        };

        tracing::info!(
            tx_hash = %txid,
            currency = %self.currency.id,
            to = %to,
            amount = %tx.amount,
            "Submitted TRON transfer"
        );

        tx.from_addresses = vec![self.owner.to_base58()];
        tx.to_address = to.to_base58();
        tx.mark_submitted(txid);
        Ok(tx)
    }

    async fn load_balance(&self, cancel: &CancellationToken) -> ChainResult<BigDecimal> {
        let units = match &self.asset {
            Asset::Trx => BigInt::from(self.account(cancel).await?.balance),
            Asset::Trc10(asset_id) => BigInt::from(self.account(cancel).await?.asset_balance(asset_id)),
            Asset::Trc20(contract) => trc20_balance(&self.rpc, cancel, contract, &self.owner).await?,
        };
        Ok(from_minor_units(&units, self.currency.subunits))
    }

    /// One fee limit of TRX per TRC20 sweep. TRC10 transfers only consume
    /// bandwidth and need no funding.
    async fn prepare_deposit_collection(
        &self,
        _cancel: &CancellationToken,
        funding_tx: Transaction,
        spreads: &[Transaction],
        token_currency: &Currency,
    ) -> ChainResult<Option<Transaction>> {
        ensure_native_wallet(&self.currency)?;
        if spreads.is_empty() {
            return Ok(None);
        }
        match &token_currency.asset {
            AssetKind::Trc20 { .. } => {}
            AssetKind::Native | AssetKind::Trc10 { .. } => return Ok(None),
            AssetKind::Erc20 { .. } => {
                return Err(ChainError::Config(format!(
                    "{} is not a TRON token",
                    token_currency.id
                )))
            }
        }

        let options = resolve([&TRC20_DEFAULTS, &token_currency.fees]);
        let fee_limit = options.fee_limit.unwrap_or(DEFAULT_FEE_LIMIT);

        Ok(Some(funding_transaction(
            funding_tx,
            &self.currency,
            u128::from(fee_limit),
            spreads.len(),
            FeeOptions {
                fee_limit: Some(fee_limit),
                ..Default::default()
            },
        )))
    }
}
