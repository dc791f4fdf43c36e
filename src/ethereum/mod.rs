pub mod abi;
pub mod contract;
pub mod erc20;
pub mod fees;
pub mod history;
pub mod keys;
pub mod mirrora;
pub mod provider;
pub mod transaction;
pub mod transfer;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Address and raw private key derived for one request; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub address: String,
    pub private_key: String,
}

/// Fully priced, unsigned transaction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub nonce: u64,
    pub chain_id: u64,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: U256,
    pub gas_price: U256,
    pub to: Address,
}

/// Hex-encoded view of [`TxParams`] for callers that sign elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParamsPreview {
    pub nonce: String,
    pub chain_id: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub gas_limit: String,
    pub gas_price: String,
    pub to: String,
}

impl From<&TxParams> for TxParamsPreview {
    fn from(params: &TxParams) -> Self {
        Self {
            nonce: format!("{:#x}", params.nonce),
            chain_id: format!("{:#x}", params.chain_id),
            value: format!("{:#x}", params.value),
            data: (!params.data.is_empty()).then(|| format!("0x{}", hex::encode(&params.data))),
            gas_limit: format!("{:#x}", params.gas_limit),
            gas_price: format!("{:#x}", params.gas_price),
            to: params.to.to_checksum(None),
        }
    }
}

/// Signed raw payload, consumed immediately by submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw_bytes: Bytes,
    pub transaction_hash: TxHash,
}

/// Advisory fee preview; `error` is set instead of failing the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub error: bool,
    /// Fee in the chain's base unit (e.g. ETH, BNB).
    pub value: f64,
    /// Exact fee in the smallest denomination, as a decimal string.
    pub fee_wei: String,
    pub message: String,
}

impl FeeEstimate {
    pub fn insufficient_funds() -> Self {
        Self {
            error: true,
            value: 0.0,
            fee_wei: "0".to_string(),
            message: "Insufficient funds".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_id: String,
    pub transaction_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceInfo {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Balance in the smallest denomination.
    pub raw: String,
    /// Human-readable balance; only set for native balances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Send,
    Receive,
}

/// Transaction record normalized from the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub transaction_url: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub value: f64,
    pub from: String,
    pub to: String,
    pub confirmations: u64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub direction: Option<TransferDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    pub error: bool,
}
