//! Transaction history served by the external indexer.

use alloy::primitives::Address;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::provider::ChainContext;
use super::{utils, TransactionRecord, TransferDirection};
use crate::error::{WalletError, WalletResult};

#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
    network: String,
    timeout_secs: u64,
}

impl IndexerClient {
    pub fn new(context: &ChainContext) -> WalletResult<Self> {
        let base_url = context.config.indexer_url.as_deref().ok_or_else(|| {
            WalletError::Indexer(format!(
                "No indexer configured for network '{}'",
                context.name
            ))
        })?;

        let timeout_secs = context.config.rpc_timeout_secs;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WalletError::Indexer(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            network: context
                .config
                .indexer_network
                .clone()
                .unwrap_or_else(|| context.name.clone()),
            timeout_secs,
        })
    }

    pub fn transactions_url(&self, address: Address, contract: Option<Address>) -> String {
        let prefix = format!(
            "{}/network/{}/address/{}",
            self.base_url,
            self.network,
            address.to_checksum(None)
        );
        match contract {
            Some(contract) => format!("{}/contract-txs/{}", prefix, contract.to_checksum(None)),
            None => format!("{}/basic-txs", prefix),
        }
    }

    pub fn transaction_url(&self, transaction_id: &str) -> String {
        format!(
            "{}/network/{}/transaction/{}",
            self.base_url, self.network, transaction_id
        )
    }

    /// GET `url` and unwrap the `{data: ...}` envelope.
    async fn fetch(&self, url: &str) -> WalletResult<Value> {
        tracing::debug!(url, "Querying indexer");

        let mut response: Value = self
            .client
            .get(url)
            .header("content-type", "application/json")
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| self.request_error(e))?
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.request_error(e)
                } else {
                    WalletError::Indexer(format!("Failed to parse indexer response: {}", e))
                }
            })?;

        match response.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(WalletError::Indexer(
                "Indexer response has no 'data' field".to_string(),
            )),
        }
    }

    fn request_error(&self, error: reqwest::Error) -> WalletError {
        if error.is_timeout() {
            tracing::warn!(base_url = %self.base_url, "Indexer timeout");
            WalletError::Indexer(format!(
                "Indexer request timed out after {} seconds",
                self.timeout_secs
            ))
        } else {
            WalletError::Indexer(error.to_string())
        }
    }
}

/// Transactions touching `address`, native or for one token contract.
pub async fn get_transactions(
    context: &ChainContext,
    address: Address,
    contract: Option<Address>,
) -> WalletResult<Vec<TransactionRecord>> {
    let indexer = IndexerClient::new(context)?;
    let url = indexer.transactions_url(address, contract);
    let (data, latest_block) = tokio::try_join!(indexer.fetch(&url), context.ensure_available())?;

    let items = data
        .as_array()
        .ok_or_else(|| WalletError::Indexer("Expected a list of transactions".to_string()))?;

    items
        .iter()
        .map(|item| {
            normalize(
                item,
                latest_block,
                context.config.explorer_tx_url.as_deref(),
                Some(address),
            )
        })
        .collect()
}

pub async fn get_transaction(
    context: &ChainContext,
    transaction_id: &str,
) -> WalletResult<TransactionRecord> {
    let transaction_id = transaction_id.trim();
    if transaction_id.is_empty() || !transaction_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(WalletError::InvalidArgument(format!(
            "Invalid transaction id: '{}'",
            transaction_id
        )));
    }

    let indexer = IndexerClient::new(context)?;
    let url = indexer.transaction_url(transaction_id);
    let (data, latest_block) = tokio::try_join!(indexer.fetch(&url), context.ensure_available())?;

    normalize(
        &data,
        latest_block,
        context.config.explorer_tx_url.as_deref(),
        None,
    )
}

/// Map one indexer item to a [`TransactionRecord`]. Token transfers carry
/// their amount and recipient under `contract`, which wins over the
/// top-level fields. `owner` decides the send/receive direction.
pub fn normalize(
    item: &Value,
    latest_block: u64,
    explorer_tx_url: Option<&str>,
    owner: Option<Address>,
) -> WalletResult<TransactionRecord> {
    let transaction_id = non_empty_str(&item["_id"])
        .or_else(|| non_empty_str(&item["id"]))
        .ok_or_else(|| WalletError::Indexer("Transaction record has no id".to_string()))?
        .to_string();

    let contract = &item["contract"];
    let block_number = as_u64(&item["blockNumber"]).unwrap_or(0);
    let from = item["from"].as_str().unwrap_or_default().to_string();
    let to = non_empty_str(&contract["to"])
        .or_else(|| item["to"].as_str())
        .unwrap_or_default()
        .to_string();
    let value = as_f64(&contract["value"])
        .or_else(|| as_f64(&item["value"]))
        .unwrap_or(0.0);

    let direction = owner.map(|owner| {
        if from.eq_ignore_ascii_case(&owner.to_string()) {
            TransferDirection::Send
        } else {
            TransferDirection::Receive
        }
    });

    Ok(TransactionRecord {
        transaction_url: utils::transaction_url(explorer_tx_url, &transaction_id),
        transaction_id,
        block_number,
        timestamp: as_i64(&item["timestamp"]).unwrap_or(0),
        value,
        from,
        to,
        confirmations: latest_block.saturating_sub(block_number),
        direction,
        contract_address: non_empty_str(&contract["address"]).map(str::to_string),
        error: is_error(&item["error"]),
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The indexer stores an empty string for successful transactions.
fn is_error(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        _ => true,
    }
}
