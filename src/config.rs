use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    /// Known contract addresses, keyed by network then label.
    #[serde(default)]
    pub contracts: HashMap<String, HashMap<String, String>>,
    pub security: SecurityConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Base URL a transaction hash is appended to, e.g. `https://etherscan.io/tx`.
    pub explorer_tx_url: Option<String>,
    pub indexer_url: Option<String>,
    /// Network slug used in indexer paths; defaults to the network name.
    pub indexer_network: Option<String>,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_native_decimals() -> u8 {
    18
}

fn default_rpc_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub transport: String,
}

impl NetworkConfig {
    fn new(rpc_url: &str, chain_id: u64, explorer_tx_url: &str, native_symbol: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            explorer_tx_url: Some(explorer_tx_url.to_string()),
            indexer_url: None,
            indexer_network: None,
            native_symbol: native_symbol.to_string(),
            native_decimals: default_native_decimals(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "bsc-testnet".to_string(),
            NetworkConfig::new(
                "https://data-seed-prebsc-1-s1.binance.org:8545/",
                97,
                "https://testnet.bscscan.com/tx",
                "tBNB",
            ),
        );

        networks.insert(
            "ethereum".to_string(),
            NetworkConfig::new(
                "https://eth-mainnet.g.alchemy.com/v2/demo",
                1,
                "https://etherscan.io/tx",
                "ETH",
            ),
        );

        networks.insert(
            "sepolia".to_string(),
            NetworkConfig::new(
                "https://eth-sepolia.g.alchemy.com/v2/demo",
                11155111,
                "https://sepolia.etherscan.io/tx",
                "ETH",
            ),
        );

        let mut bsc_contracts = HashMap::new();
        bsc_contracts.insert(
            "mirrora".to_string(),
            "0x788F4D9990980dF1140F891b7A5Bbae17CA12529".to_string(),
        );
        bsc_contracts.insert(
            "erc20".to_string(),
            "0x5Adef3e057A4ab8DF7227b505bcf479ad5B065aa".to_string(),
        );

        let mut contracts = HashMap::new();
        contracts.insert("bsc-testnet".to_string(), bsc_contracts);

        Self {
            networks,
            default_network: "bsc-testnet".to_string(),
            contracts,
            security: SecurityConfig {
                allow_write_operations: false,
            },
            server: ServerConfig {
                transport: "stdio".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[allow(dead_code)]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Check that the default network is configured and the transport is supported
    pub fn validate(&self) -> Result<()> {
        if !self.networks.contains_key(&self.default_network) {
            return Err(anyhow!(
                "Default network '{}' has no [networks.{}] section",
                self.default_network,
                self.default_network
            ));
        }
        if self.server.transport != "stdio" {
            return Err(anyhow!(
                "Unsupported transport '{}', only 'stdio' is available",
                self.server.transport
            ));
        }
        Ok(())
    }

    fn apply_env_vars(&mut self) {
        let default_network = self.default_network.clone();
        let Some(network) = self.networks.get_mut(&default_network) else {
            return;
        };

        if let Ok(rpc_url) = std::env::var("WALLET_RPC_URL") {
            tracing::info!("Using WALLET_RPC_URL for network {}", default_network);
            network.rpc_url = rpc_url;
        }

        if let Ok(indexer_url) = std::env::var("WALLET_INDEXER_URL") {
            tracing::info!("Using WALLET_INDEXER_URL for network {}", default_network);
            network.indexer_url = Some(indexer_url);
        }

        for (network_name, network_config) in &self.networks {
            if network_config.rpc_url.contains("/demo") {
                tracing::warn!(
                    "Using demo RPC endpoint for {}, set WALLET_RPC_URL or edit the config file",
                    network_name
                );
            }
        }
    }

    /// Known contracts for a network, empty when none are configured.
    pub fn known_contracts(&self, network: &str) -> HashMap<String, String> {
        self.contracts.get(network).cloned().unwrap_or_default()
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<std::path::PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("wallet-mcp").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Wallet MCP Server Configuration File

# Network used when a tool call does not name one
default_network = "bsc-testnet"

[networks.bsc-testnet]
rpc_url = "https://data-seed-prebsc-1-s1.binance.org:8545/"
chain_id = 97
explorer_tx_url = "https://testnet.bscscan.com/tx"
# indexer_url = "https://indexer.example.com"
# indexer_network = "bsc-testnet"
native_symbol = "tBNB"
native_decimals = 18
rpc_timeout_secs = 5

[networks.sepolia]
rpc_url = "https://eth-sepolia.g.alchemy.com/v2/YOUR_API_KEY_HERE"
chain_id = 11155111
explorer_tx_url = "https://sepolia.etherscan.io/tx"
native_symbol = "ETH"

# Known contract addresses per network
[contracts.bsc-testnet]
mirrora = "0x788F4D9990980dF1140F891b7A5Bbae17CA12529"
erc20 = "0x5Adef3e057A4ab8DF7227b505bcf479ad5B065aa"

[security]
allow_write_operations = false

[server]
transport = "stdio"

# Environment variables that can be used:
# WALLET_RPC_URL - overrides the default network's RPC endpoint
# WALLET_INDEXER_URL - overrides the default network's indexer endpoint
"#;
        sample_config.to_string()
    }
}
