//! Mirrora NFT marketplace and its mintable test token.
//!
//! Both contracts are looked up by label in the per-network `contracts`
//! table, then driven through the generic contract engine.

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, U256};
use serde_json::{json, Value};

use super::contract::{self, ContractCall};
use super::provider::ChainContext;
use super::{utils, WriteResult};
use crate::config::Config;
use crate::error::{WalletError, WalletResult};

pub const MARKETPLACE_LABEL: &str = "mirrora";
pub const TOKEN_LABEL: &str = "erc20";

const MARKETPLACE_ABI: &str = r#"[
  {"type":"function","name":"buy","stateMutability":"payable","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"startSale","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"},{"name":"price","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"stopSale","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"updatePrice","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"},{"name":"price","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"tokenInfo","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"owner","type":"address"},{"name":"price","type":"uint256"},{"name":"onSale","type":"bool"}]}
]"#;

const MINTABLE_TOKEN_ABI: &str = r#"[
  {"type":"function","name":"mint","stateMutability":"nonpayable","inputs":[],"outputs":[]}
]"#;

pub fn marketplace_abi() -> WalletResult<JsonAbi> {
    serde_json::from_str(MARKETPLACE_ABI)
        .map_err(|e| WalletError::Abi(format!("Failed to parse marketplace ABI: {}", e)))
}

fn mintable_token_abi() -> WalletResult<JsonAbi> {
    serde_json::from_str(MINTABLE_TOKEN_ABI)
        .map_err(|e| WalletError::Abi(format!("Failed to parse token ABI: {}", e)))
}

/// A state-changing marketplace call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketAction {
    Buy { token_id: U256 },
    StartSale { token_id: U256, price: U256 },
    StopSale { token_id: U256 },
    UpdatePrice { token_id: U256, price: U256 },
}

impl MarketAction {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::StartSale { .. } => "startSale",
            Self::StopSale { .. } => "stopSale",
            Self::UpdatePrice { .. } => "updatePrice",
        }
    }

    fn args(&self) -> Vec<Value> {
        match self {
            Self::Buy { token_id } | Self::StopSale { token_id } => {
                vec![json!(token_id.to_string())]
            }
            Self::StartSale { token_id, price } | Self::UpdatePrice { token_id, price } => {
                vec![json!(token_id.to_string()), json!(price.to_string())]
            }
        }
    }
}

/// Address stored under `label` for `network`.
pub fn configured_contract(config: &Config, network: &str, label: &str) -> WalletResult<Address> {
    let contracts = config.known_contracts(network);
    let address = contracts.get(label).ok_or_else(|| {
        WalletError::InvalidArgument(format!(
            "No '{}' contract configured for network '{}'",
            label, network
        ))
    })?;
    utils::validate_address(address)
}

/// Sign and send a marketplace call. `value` is only accepted by `buy`.
pub async fn write(
    context: &ChainContext,
    marketplace: Address,
    action: MarketAction,
    private_key: &str,
    value: Option<U256>,
) -> WalletResult<WriteResult> {
    let abi = marketplace_abi()?;
    let args = action.args();
    let call = ContractCall::new(&abi, action.method(), marketplace, &args);

    tracing::info!(
        network = %context.name,
        marketplace = %marketplace,
        method = action.method(),
        "Submitting marketplace call"
    );
    contract::write_contract(context, &call, private_key, None, value).await
}

/// `{owner, price, onSale}` for a listed token.
pub async fn token_info(
    context: &ChainContext,
    marketplace: Address,
    token_id: U256,
) -> WalletResult<Value> {
    let abi = marketplace_abi()?;
    let args = [json!(token_id.to_string())];
    contract::read_contract(context, &ContractCall::new(&abi, "tokenInfo", marketplace, &args))
        .await
}

/// Call the faucet-style `mint()` of the marketplace's payment token.
pub async fn mint_token(
    context: &ChainContext,
    token: Address,
    private_key: &str,
) -> WalletResult<WriteResult> {
    let abi = mintable_token_abi()?;
    let call = ContractCall::new(&abi, "mint", token, &[]);
    contract::write_contract(context, &call, private_key, None, None).await
}
