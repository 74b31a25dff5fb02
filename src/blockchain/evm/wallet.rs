// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Node-managed EVM accounts (`personal_*` namespace).

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256, U64};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::erc20::{balance_of_calldata, decode_word, transfer_calldata};
use super::types::{bigint_to_u256, format_address, u256_to_bigint};
use crate::amount::{from_minor_units, to_minor_units};
use crate::blockchain::{
    ensure_native_wallet, ensure_submittable, ensure_wallet_currency, funding_transaction, ChainFamily, NewAddress, Wallet,
};
use crate::config::{rpc_timeout, WalletEndpoint, WalletSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{AssetKind, Currency, Transaction};
use crate::options::{resolve, FeeOptions, GasPriceRate};
use crate::rpc::{JsonRpcHttp, RpcClient, RpcTransport};

/// Native transfer defaults.
pub const NATIVE_DEFAULTS: FeeOptions = FeeOptions {
    gas_limit: Some(21_000),
    gas_price: None,
    gas_rate: Some(GasPriceRate::Standard),
    fee_limit: None,
};

/// ERC-20 transfer defaults.
pub const TOKEN_DEFAULTS: FeeOptions = FeeOptions {
    gas_limit: Some(90_000),
    gas_price: None,
    gas_rate: Some(GasPriceRate::Standard),
    fee_limit: None,
};

pub struct EvmWallet {
    rpc: RpcClient,
    currency: Currency,
    /// Parsed ERC-20 contract when the wallet holds a token
    contract: Option<Address>,
    wallet: WalletEndpoint,
}

impl EvmWallet {
    pub fn new(settings: WalletSettings) -> ChainResult<Self> {
        let transport = JsonRpcHttp::new(&settings.wallet.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: WalletSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        let contract = match &settings.currency.asset {
            AssetKind::Native => None,
            AssetKind::Erc20 { contract_address } => Some(
                Address::from_str(contract_address.trim())
                    .map_err(|e| ChainError::Config(format!("Invalid contract address: {e}")))?,
            ),
            other => {
                return Err(ChainError::Config(format!(
                    "EVM wallets hold native or ERC-20 currencies, got {other:?}"
                )))
            }
        };

        Ok(Self {
            rpc: RpcClient::new(transport),
            currency: settings.currency,
            contract,
            wallet: settings.wallet,
        })
    }

    /// Node-suggested gas price adjusted for the rate class.
    async fn gas_price(&self, cancel: &CancellationToken, rate: GasPriceRate) -> ChainResult<u64> {
        let suggested: U64 = self.rpc.call(cancel, "eth_gasPrice", json!([])).await?;
        Ok(rate.apply(suggested.to::<u64>()))
    }

    /// Resolve options and make sure a gas price is set.
    async fn effective_options(
        &self,
        cancel: &CancellationToken,
        layers: [&FeeOptions; 3],
    ) -> ChainResult<FeeOptions> {
        let mut options = resolve(layers);
        if options.gas_price.is_none() {
            let rate = options.gas_rate.unwrap_or_default();
            options.gas_price = Some(self.gas_price(cancel, rate).await?);
        }
        Ok(options)
    }

    async fn send(&self, cancel: &CancellationToken, call: Value) -> ChainResult<String> {
        self.rpc
            .call(
                cancel,
                "personal_sendTransaction",
                json!([call, self.wallet.secret]),
            )
            .await
    }
}

/// Lowercase `0x` form, adding the prefix when missing.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    let bare = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    format!("0x{}", bare.to_ascii_lowercase())
}

fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

#[async_trait]
impl Wallet for EvmWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    async fn create_address(&self, cancel: &CancellationToken) -> ChainResult<NewAddress> {
        let secret = uuid::Uuid::new_v4().simple().to_string();
        let address: String = self
            .rpc
            .call(cancel, "personal_newAccount", json!([secret]))
            .await?;
        Ok(NewAddress {
            address: normalize_address(&address),
            secret,
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
        let recipient = Address::from_str(tx.to_address.trim())
            .map_err(|e| ChainError::InvalidAddress(format!("{}: {e}", tx.to_address)))?;

        let defaults = if self.contract.is_some() {
            &TOKEN_DEFAULTS
        } else {
            &NATIVE_DEFAULTS
        };
        let options = self
            .effective_options(cancel, [defaults, &self.currency.fees, overrides])
            .await?;
        let gas = quantity(options.gas_limit.unwrap_or_default());
        let gas_price = quantity(options.gas_price.unwrap_or_default());

        let amount = bigint_to_u256(&to_minor_units(&tx.amount, self.currency.subunits)?)?;
        let from = normalize_address(&self.wallet.address);
        let to = format_address(&recipient);

        let call = match self.contract {
            Some(contract) => json!({
                "from": from,
                "to": format_address(&contract),
                "data": transfer_calldata(recipient, amount),
                "gas": gas,
                "gasPrice": gas_price,
            }),
            None => json!({
                "from": from,
                "to": to,
                "value": format!("{amount:#x}"),
                "gas": gas,
                "gasPrice": gas_price,
            }),
        };

        let txid = self.send(cancel, call).await?;

        tracing::info!(
            tx_hash = %txid,
            currency = %self.currency.id,
            to = %to,
            amount = %tx.amount,
            "Submitted EVM transfer"
        );

        tx.from_addresses = vec![from];
        tx.to_address = to;
        tx.options = options;
        tx.mark_submitted(txid);
        Ok(tx)
    }

    async fn load_balance(&self, cancel: &CancellationToken) -> ChainResult<BigDecimal> {
        let owner = normalize_address(&self.wallet.address);
        let units = match self.contract {
            Some(contract) => {
                let owner = Address::from_str(&owner)
                    .map_err(|e| ChainError::InvalidAddress(format!("{owner}: {e}")))?;
                let output: Bytes = self
                    .rpc
                    .call(
                        cancel,
                        "eth_call",
                        json!([
                            {"to": format_address(&contract), "data": balance_of_calldata(owner)},
                            "latest"
                        ]),
                    )
                    .await?;
                decode_word(&output)?
            }
            None => {
                self.rpc
                    .call::<U256>(cancel, "eth_getBalance", json!([owner, "latest"]))
                    .await?
            }
        };
        Ok(from_minor_units(&u256_to_bigint(units), self.currency.subunits))
    }

    /// `gas_limit * gas_price` per sweep, using the token's options.
    async fn prepare_deposit_collection(
        &self,
        cancel: &CancellationToken,
        funding_tx: Transaction,
        spreads: &[Transaction],
        token_currency: &Currency,
    ) -> ChainResult<Option<Transaction>> {
        ensure_native_wallet(&self.currency)?;
        if token_currency.is_native() || spreads.is_empty() {
            return Ok(None);
        }
        if !matches!(token_currency.asset, AssetKind::Erc20 { .. }) {
            return Err(ChainError::Config(format!(
                "{} is not an ERC-20 token",
                token_currency.id
            )));
        }

        let options = self
            .effective_options(
                cancel,
                [&TOKEN_DEFAULTS, &token_currency.fees, &FeeOptions::default()],
            )
            .await?;
        let per_transfer = u128::from(options.gas_limit.unwrap_or_default())
            * u128::from(options.gas_price.unwrap_or_default());

        let sweep_options = FeeOptions {
            gas_limit: options.gas_limit,
            gas_price: options.gas_price,
            ..Default::default()
        };

        Ok(Some(funding_transaction(
            funding_tx,
            &self.currency,
            per_transfer,
            spreads.len(),
            sweep_options,
        )))
    }
}
