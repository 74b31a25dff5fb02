// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! bitcoind wallet RPC.

use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::types::{grouping_entries, AddressGroupings, WalletTransaction};
use crate::blockchain::{
    ensure_submittable, ensure_wallet_currency, ChainFamily, NewAddress, Wallet,
};
use crate::config::{rpc_timeout, WalletEndpoint, WalletSettings};
use crate::error::{ChainError, ChainResult};
use crate::models::{Currency, Transaction};
use crate::options::FeeOptions;
use crate::rpc::{JsonRpcHttp, RpcClient, RpcTransport};

pub struct BitcoinWallet {
    rpc: RpcClient,
    currency: Currency,
    wallet: WalletEndpoint,
}

impl BitcoinWallet {
    pub fn new(settings: WalletSettings) -> ChainResult<Self> {
        let transport = JsonRpcHttp::new(&settings.wallet.uri, rpc_timeout())?;
        Self::with_transport(settings, Arc::new(transport))
    }

    pub fn with_transport(
        settings: WalletSettings,
        transport: Arc<dyn RpcTransport>,
    ) -> ChainResult<Self> {
        if !settings.currency.is_native() {
            return Err(ChainError::Config(format!(
                "UTXO wallets hold only the native coin, got {}",
                settings.currency.id
            )));
        }

        Ok(Self {
            rpc: RpcClient::new(transport),
            currency: settings.currency,
            wallet: settings.wallet,
        })
    }
}

#[async_trait]
impl Wallet for BitcoinWallet {
    fn family(&self) -> ChainFamily {
        ChainFamily::Bitcoin
    }

    /// New address labelled with a random 32-character secret.
    async fn create_address(&self, cancel: &CancellationToken) -> ChainResult<NewAddress> {
        let secret = uuid::Uuid::new_v4().simple().to_string();
        let address: String = self.rpc.call(cancel, "getnewaddress", json!([secret])).await?;
        Ok(NewAddress { address, secret })
    }

    async fn create_transaction(
        &self,
        cancel: &CancellationToken,
        mut tx: Transaction,
        _overrides: &FeeOptions,
    ) -> ChainResult<Transaction> {
        ensure_submittable(&tx)?;
        ensure_wallet_currency(&tx, &self.currency)?;

        let txid: String = self
            .rpc
            .call(
                cancel,
                "sendtoaddress",
                json!([tx.to_address, tx.amount.to_string(), "", "", false]),
            )
            .await?;

        tracing::info!(
            tx_hash = %txid,
            to = %tx.to_address,
            amount = %tx.amount,
            "Submitted bitcoin transfer"
        );

        // the node knows the fee once the wallet has recorded the send
        match self
            .rpc
            .call::<WalletTransaction>(cancel, "gettransaction", json!([txid]))
            .await
        {
            Ok(details) => tx.fee = details.fee.map(|fee| fee.abs()),
            Err(ChainError::Cancelled) => return Err(ChainError::Cancelled),
            Err(e) => tracing::warn!(tx_hash = %txid, error = %e, "Fee lookup failed"),
        }

        tx.currency_fee = self.currency.id.clone();
        if tx.from_addresses.is_empty() && !self.wallet.address.is_empty() {
            tx.from_addresses.push(self.wallet.address.clone());
        }
        tx.mark_submitted(txid);
        Ok(tx)
    }

    /// Sum of every grouping entry for the wallet address.
    async fn load_balance(&self, cancel: &CancellationToken) -> ChainResult<BigDecimal> {
        let groups: AddressGroupings = self
            .rpc
            .call(cancel, "listaddressgroupings", json!([]))
            .await?;

        Ok(grouping_entries(&groups)?
            .into_iter()
            .filter(|(address, _)| address.eq_ignore_ascii_case(&self.wallet.address))
            .fold(BigDecimal::from(0), |acc, (_, amount)| acc + amount))
    }

    /// UTXO chains have no tokens to sweep.
    async fn prepare_deposit_collection(
        &self,
        _cancel: &CancellationToken,
        _funding_tx: Transaction,
        _spreads: &[Transaction],
        _token_currency: &Currency,
    ) -> ChainResult<Option<Transaction>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::models::TxStatus;
    use crate::rpc::mock::MockTransport;

    fn settings() -> WalletSettings {
        WalletSettings {
            currency: Currency::native("btc", 8),
            wallet: WalletEndpoint {
                uri: "http://127.0.0.1:8332".into(),
                address: "bc1qhot".into(),
                secret: String::new(),
            },
        }
    }

    fn wallet(mock: MockTransport) -> (BitcoinWallet, Arc<MockTransport>) {
        let mock = Arc::new(mock);
        (BitcoinWallet::with_transport(settings(), mock.clone()).unwrap(), mock)
    }

    #[tokio::test]
    async fn create_address_labels_with_secret() {
        let (wallet, mock) = wallet(MockTransport::new().on("getnewaddress", json!("bc1qnew")));

        let created = wallet.create_address(&CancellationToken::new()).await.unwrap();
        assert_eq!(created.address, "bc1qnew");
        assert_eq!(created.secret.len(), 32);
        assert_eq!(mock.calls_to("getnewaddress"), vec![json!([created.secret])]);
    }

    #[tokio::test]
    async fn submission_records_hash_and_fee() {
        let (wallet, mock) = wallet(
            MockTransport::new()
                .on("sendtoaddress", json!("txid01"))
                .on("gettransaction", json!({"amount": -0.3, "fee": -0.0000141})),
        );
        let tx = Transaction::withdrawal("btc", "bc1qdest", BigDecimal::from_str("0.3").unwrap());

        let sent = wallet
            .create_transaction(&CancellationToken::new(), tx, &FeeOptions::default())
            .await
            .unwrap();
        assert_eq!(sent.tx_hash.as_deref(), Some("txid01"));
        assert_eq!(sent.status, TxStatus::Pending);
        assert_eq!(sent.fee, Some(BigDecimal::from_str("0.0000141").unwrap()));
        assert_eq!(sent.from_addresses, vec!["bc1qhot".to_string()]);
        assert_eq!(
            mock.calls_to("sendtoaddress"),
            vec![json!(["bc1qdest", "0.3", "", "", false])]
        );
    }

    #[tokio::test]
    async fn rejected_transactions_are_not_sent() {
        let (wallet, mock) = wallet(MockTransport::new().on("sendtoaddress", json!("txid01")));
        let mut tx = Transaction::withdrawal("btc", "bc1qdest", BigDecimal::from(1));
        tx.status = TxStatus::Rejected;

        assert!(wallet
            .create_transaction(&CancellationToken::new(), tx, &FeeOptions::default())
            .await
            .is_err());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn transfer_of_another_currency_is_refused() {
        let (wallet, mock) = wallet(MockTransport::new().on("sendtoaddress", json!("txid01")));
        let tx = Transaction::withdrawal("ltc", "bc1qdest", BigDecimal::from(1));

        let err = wallet
            .create_transaction(&CancellationToken::new(), tx, &FeeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::CurrencyNotFound(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn balance_sums_wallet_entries() {
        let (wallet, _) = wallet(MockTransport::new().on(
            "listaddressgroupings",
            json!([[["bc1qhot", 0.5], ["bc1qother", 2.0]], [["BC1QHOT", 0.25, "change"]]]),
        ));

        let balance = wallet.load_balance(&CancellationToken::new()).await.unwrap();
        assert_eq!(balance, BigDecimal::from_str("0.75").unwrap());
    }

    #[tokio::test]
    async fn deposit_collection_needs_no_funding() {
        let (wallet, mock) = wallet(MockTransport::new());
        let funding = Transaction::withdrawal("btc", "bc1qdeposit", BigDecimal::from(0));
        let spreads = vec![funding.clone()];

        let planned = wallet
            .prepare_deposit_collection(
                &CancellationToken::new(),
                funding,
                &spreads,
                &Currency::native("btc", 8),
            )
            .await
            .unwrap();
        assert!(planned.is_none());
        assert!(mock.calls().is_empty());
    }
}
