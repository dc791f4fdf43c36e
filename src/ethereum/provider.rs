use crate::config::{Config, NetworkConfig};
use crate::error::{ChainError, WalletError, WalletResult};
use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::{
        http::{Client, Http},
        TransportError, TransportResult,
    },
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub type ChainResult<T> = Result<T, ChainError>;

/// One RPC endpoint. Every method is a single round trip; nothing is cached
/// and nothing is retried.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Transaction count including the pending pool.
    async fn pending_nonce(&self, address: Address) -> ChainResult<u64>;

    async fn gas_price(&self) -> ChainResult<u128>;

    async fn balance(&self, address: Address) -> ChainResult<U256>;

    async fn block_number(&self) -> ChainResult<u64>;

    async fn estimate_gas(&self, request: &TransactionRequest) -> ChainResult<u64>;

    /// `eth_call` against the latest state.
    async fn call(&self, request: &TransactionRequest) -> ChainResult<Bytes>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<TxHash>;
}

/// [`ChainClient`] backed by an alloy HTTP provider.
pub struct RpcChainClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
    timeout_secs: u64,
}

impl RpcChainClient {
    pub fn new(network_config: &NetworkConfig) -> ChainResult<Self> {
        let url = reqwest::Url::parse(&network_config.rpc_url).map_err(|e| {
            ChainError::InvalidEndpoint {
                url: network_config.rpc_url.clone(),
                reason: e.to_string(),
            }
        })?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            rpc_url: network_config.rpc_url.clone(),
            timeout_secs: network_config.rpc_timeout_secs,
        })
    }

    async fn with_timeout<T, F>(&self, method: &'static str, request: F) -> ChainResult<T>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        match timeout(Duration::from_secs(self.timeout_secs), request.into_future()).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                let message = describe_rpc_error(&e);
                tracing::warn!(rpc_url = %self.rpc_url, method, error = %message, "RPC error");
                Err(ChainError::Rpc { message })
            }
            Err(_) => {
                tracing::warn!(rpc_url = %self.rpc_url, method, "RPC timeout");
                Err(ChainError::Timeout {
                    secs: self.timeout_secs,
                })
            }
        }
    }
}

impl fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> ChainResult<u64> {
        self.with_timeout("eth_chainId", self.provider.get_chain_id())
            .await
    }

    async fn pending_nonce(&self, address: Address) -> ChainResult<u64> {
        self.with_timeout(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending(),
        )
        .await
    }

    async fn gas_price(&self) -> ChainResult<u128> {
        self.with_timeout("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    async fn balance(&self, address: Address) -> ChainResult<U256> {
        self.with_timeout("eth_getBalance", self.provider.get_balance(address))
            .await
    }

    async fn block_number(&self) -> ChainResult<u64> {
        self.with_timeout("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> ChainResult<u64> {
        self.with_timeout("eth_estimateGas", self.provider.estimate_gas(request))
            .await
    }

    async fn call(&self, request: &TransactionRequest) -> ChainResult<Bytes> {
        self.with_timeout("eth_call", self.provider.call(request))
            .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<TxHash> {
        let pending = self
            .with_timeout(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(raw),
            )
            .await?;
        Ok(*pending.tx_hash())
    }
}

/// Prefer a decoded revert reason, then the node's message, then the
/// transport's own text.
pub fn describe_rpc_error(error: &TransportError) -> String {
    if let Some(payload) = error.as_error_resp() {
        if let Some(reason) = payload
            .as_revert_data()
            .and_then(|data| alloy::sol_types::decode_revert_reason(&data))
        {
            return reason;
        }
        return payload.message.to_string();
    }
    error.to_string()
}

/// A configured network together with its client.
#[derive(Clone)]
pub struct ChainContext {
    pub name: String,
    pub config: NetworkConfig,
    pub client: Arc<dyn ChainClient>,
}

impl ChainContext {
    pub fn new(name: impl Into<String>, config: NetworkConfig, client: Arc<dyn ChainClient>) -> Self {
        Self {
            name: name.into(),
            config,
            client,
        }
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }

    /// Health probe run before reads that report chain state.
    pub async fn ensure_available(&self) -> WalletResult<u64> {
        match self.client.block_number().await {
            Ok(block) => Ok(block),
            Err(e) => {
                tracing::debug!(network = %self.name, error = %e, "Health probe failed");
                Err(WalletError::ChainUnavailable(
                    "Network Service Temporarily Disable".to_string(),
                ))
            }
        }
    }
}

impl fmt::Debug for ChainContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainContext")
            .field("name", &self.name)
            .field("chain_id", &self.config.chain_id)
            .finish()
    }
}

pub struct ProviderManager {
    networks: HashMap<String, ChainContext>,
    default_network: String,
}

impl ProviderManager {
    pub fn new(config: &Config) -> WalletResult<Self> {
        let mut networks = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let client = RpcChainClient::new(network_config)?;
            networks.insert(
                network_name.clone(),
                ChainContext::new(network_name.clone(), network_config.clone(), Arc::new(client)),
            );
        }

        Ok(Self {
            networks,
            default_network: config.default_network.clone(),
        })
    }

    #[cfg(test)]
    pub fn from_contexts(default_network: &str, contexts: Vec<ChainContext>) -> Self {
        Self {
            networks: contexts
                .into_iter()
                .map(|context| (context.name.clone(), context))
                .collect(),
            default_network: default_network.to_string(),
        }
    }

    pub fn network(&self, network: Option<&str>) -> WalletResult<&ChainContext> {
        let network_name = network.unwrap_or(&self.default_network);
        self.networks
            .get(network_name)
            .ok_or_else(|| WalletError::UnknownNetwork(network_name.to_string()))
    }

    pub fn default_network(&self) -> &str {
        &self.default_network
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.networks.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderManager")
            .field("networks", &self.get_available_networks())
            .field("default_network", &self.default_network)
            .finish()
    }
}
