//! Standard ERC-20 surface on top of the contract engine.

use alloy::json_abi::JsonAbi;
use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use serde_json::{json, Value};

use super::contract::{self, ContractCall};
use super::provider::ChainContext;
use super::{BalanceInfo, WriteResult};
use crate::error::{WalletError, WalletResult};

pub const READ_METHODS: &[&str] = &[
    "decimals",
    "balanceOf",
    "allowance",
    "totalSupply",
    "name",
    "symbol",
];

pub const WRITE_METHODS: &[&str] = &[
    "transfer",
    "approve",
    "transferFrom",
    "increaseAllowance",
    "decreaseAllowance",
];

const ERC20_ABI: &str = r#"[
  {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"decimals","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint8"}]},
  {"type":"function","name":"totalSupply","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"allowance","stateMutability":"view","inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"transfer","stateMutability":"nonpayable","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"approve","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"transferFrom","stateMutability":"nonpayable","inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"increaseAllowance","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"addedValue","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"function","name":"decreaseAllowance","stateMutability":"nonpayable","inputs":[{"name":"spender","type":"address"},{"name":"subtractedValue","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
  {"type":"event","name":"Transfer","anonymous":false,"inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]},
  {"type":"event","name":"Approval","anonymous":false,"inputs":[{"name":"owner","type":"address","indexed":true},{"name":"spender","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]}
]"#;

pub fn standard_abi() -> WalletResult<JsonAbi> {
    serde_json::from_str(ERC20_ABI)
        .map_err(|e| WalletError::Abi(format!("Failed to parse ERC-20 ABI: {}", e)))
}

fn ensure_supported(method: &str, allowed: &[&str]) -> WalletResult<()> {
    if allowed.contains(&method) {
        Ok(())
    } else {
        Err(WalletError::InvalidArgument(format!(
            "Unsupported ERC-20 method '{}'. Supported: {}",
            method,
            allowed.join(", ")
        )))
    }
}

pub async fn read(
    context: &ChainContext,
    token: Address,
    method: &str,
    args: &[Value],
) -> WalletResult<Value> {
    ensure_supported(method, READ_METHODS)?;
    let abi = standard_abi()?;
    contract::read_contract(context, &ContractCall::new(&abi, method, token, args)).await
}

pub async fn write(
    context: &ChainContext,
    token: Address,
    method: &str,
    private_key: &str,
    args: &[Value],
) -> WalletResult<WriteResult> {
    ensure_supported(method, WRITE_METHODS)?;
    let abi = standard_abi()?;
    let call = ContractCall::new(&abi, method, token, args);
    contract::write_contract(context, &call, private_key, None, None).await
}

/// Native balance, or the token balance when `token` is given.
pub async fn get_balance(
    context: &ChainContext,
    address: Address,
    token: Option<Address>,
) -> WalletResult<BalanceInfo> {
    context.ensure_available().await?;

    match token {
        None => {
            let balance = context.client().balance(address).await?;
            let formatted = format_units(balance, context.config.native_decimals)
                .map_err(|e| WalletError::InvalidArgument(e.to_string()))?;

            Ok(BalanceInfo {
                address: address.to_checksum(None),
                contract_address: None,
                raw: balance.to_string(),
                formatted: Some(formatted),
                symbol: Some(context.config.native_symbol.clone()),
            })
        }
        Some(token) => {
            let raw = read(context, token, "balanceOf", &[json!(address.to_checksum(None))]).await?;
            let raw = match raw {
                Value::String(s) => s,
                other => other.to_string(),
            };

            Ok(BalanceInfo {
                address: address.to_checksum(None),
                contract_address: Some(token.to_checksum(None)),
                raw,
                formatted: None,
                symbol: None,
            })
        }
    }
}

/// Templated `transfer(to, amount)` arguments.
pub fn transfer_args(to: Address, amount: U256) -> [Value; 2] {
    [json!(to.to_checksum(None)), json!(amount.to_string())]
}
