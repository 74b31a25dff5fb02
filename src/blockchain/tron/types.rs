// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! java-tron HTTP API payloads.
//!
//! Unknown ids come back as `{}` rather than an error, so identifying fields
//! default to empty and callers check them.

use serde::Deserialize;

pub const TRANSFER_CONTRACT: &str = "TransferContract";
pub const TRANSFER_ASSET_CONTRACT: &str = "TransferAssetContract";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBlock {
    #[serde(rename = "blockID", default)]
    pub block_id: String,
    #[serde(default)]
    pub block_header: Option<BlockHeader>,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl RawBlock {
    /// `None` for the empty object returned for unknown blocks.
    pub fn number(&self) -> Option<u64> {
        self.block_header.as_ref().map(|h| h.raw_data.number)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    pub raw_data: BlockRawData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRawData {
    #[serde(default)]
    pub number: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "txID", default)]
    pub tx_id: String,
    #[serde(default)]
    pub ret: Vec<ContractResult>,
    #[serde(default)]
    pub raw_data: TxRawData,
}

impl RawTransaction {
    pub fn contract(&self) -> Option<&Contract> {
        self.raw_data.contract.first()
    }

    pub fn reverted(&self) -> bool {
        self.ret
            .first()
            .is_some_and(|r| r.contract_ret.as_deref() == Some("REVERT"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractResult {
    #[serde(rename = "contractRet", default)]
    pub contract_ret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxRawData {
    #[serde(default)]
    pub contract: Vec<Contract>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameter: ContractParameter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractParameter {
    pub value: ContractValue,
}

/// Union of the fields used across transfer and trigger contracts. All
/// addresses are `41...` hex.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractValue {
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub owner_address: String,
    #[serde(default)]
    pub to_address: String,
    /// Hex of the TRC10 asset id
    #[serde(default)]
    pub asset_name: String,
    #[serde(default)]
    pub contract_address: String,
    /// Hex calldata of a contract trigger
    #[serde(default)]
    pub data: String,
}

/// `wallet/gettransactioninfobyid`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: String,
    /// Total fee in sun
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(rename = "contract_address", default)]
    pub contract_address: String,
    #[serde(default)]
    pub receipt: Receipt,
    #[serde(default)]
    pub log: Vec<Log>,
}

impl TransactionInfo {
    pub fn succeeded(&self) -> bool {
        self.receipt.result.as_deref() == Some("SUCCESS")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub result: Option<String>,
}

/// Contract event. `address` and `topics` are hex without `0x` or the
/// network prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
}

/// `wallet/getaccount`. Empty for accounts never activated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub balance: u64,
    #[serde(rename = "assetV2", default)]
    pub asset_v2: Vec<AssetBalance>,
}

impl Account {
    /// TRC10 holding for `asset_id`, zero when absent.
    pub fn asset_balance(&self, asset_id: &str) -> u64 {
        self.asset_v2
            .iter()
            .find(|a| a.key == asset_id)
            .map(|a| a.value)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    pub key: String,
    pub value: u64,
}

/// `wallet/triggerconstantcontract`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstantResult {
    #[serde(default)]
    pub constant_result: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_ids_decode_as_empty() {
        let block: RawBlock = serde_json::from_value(json!({})).unwrap();
        assert!(block.number().is_none());

        let tx: RawTransaction = serde_json::from_value(json!({})).unwrap();
        assert!(tx.tx_id.is_empty());
        assert!(tx.contract().is_none());

        let info: TransactionInfo = serde_json::from_value(json!({})).unwrap();
        assert!(info.id.is_empty());
        assert!(!info.succeeded());
    }

    #[test]
    fn transfer_payload() {
        let tx: RawTransaction = serde_json::from_value(json!({
            "txID": "abc",
            "ret": [{"contractRet": "REVERT"}],
            "raw_data": {"contract": [{
                "type": "TransferContract",
                "parameter": {
                    "type_url": "type.googleapis.com/protocol.TransferContract",
                    "value": {"amount": 1000, "owner_address": "41aa", "to_address": "41bb"}
                }
            }]}
        }))
        .unwrap();
        assert!(tx.reverted());
        let contract = tx.contract().unwrap();
        assert_eq!(contract.kind, TRANSFER_CONTRACT);
        assert_eq!(contract.parameter.value.amount, 1000);
    }

    #[test]
    fn account_asset_lookup() {
        let account: Account = serde_json::from_value(json!({
            "balance": 5,
            "assetV2": [{"key": "1002000", "value": 42}]
        }))
        .unwrap();
        assert_eq!(account.asset_balance("1002000"), 42);
        assert_eq!(account.asset_balance("1000001"), 0);
    }
}
