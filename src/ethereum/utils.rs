use alloy::primitives::{Address, U256};
use std::str::FromStr;

use crate::error::{WalletError, WalletResult};

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> WalletResult<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(WalletError::InvalidAddress(
            "Address cannot be empty".to_string(),
        ));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(WalletError::InvalidAddress(format!(
            "'{}'. Ethereum addresses must start with '0x'",
            address
        )));
    }

    if address.len() != 42 {
        return Err(WalletError::InvalidAddress(format!(
            "'{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        )));
    }

    let hex_part = &address[2..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::InvalidAddress(format!(
            "'{}'. Contains non-hexadecimal characters",
            address
        )));
    }

    Address::from_str(address)
        .map_err(|e| WalletError::InvalidAddress(format!("'{}': {}", address, e)))
}

/// Validates function name
pub fn validate_function_name(function_name: &str) -> WalletResult<()> {
    let Some(first) = function_name.chars().next() else {
        return Err(WalletError::InvalidArgument(
            "Function name cannot be empty".to_string(),
        ));
    };

    if !first.is_ascii_alphabetic() && first != '_' && first != '$' {
        return Err(WalletError::InvalidArgument(format!(
            "Invalid function name: '{}'. Function names must start with a letter or underscore",
            function_name
        )));
    }

    if !function_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(WalletError::InvalidArgument(format!(
            "Invalid function name: '{}'. Function names can only contain letters, numbers, and underscores",
            function_name
        )));
    }

    Ok(())
}

/// Parses a non-negative integer given in decimal or `0x` hex.
pub fn parse_quantity(value_str: &str) -> WalletResult<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(WalletError::InvalidArgument(
            "Value cannot be empty".to_string(),
        ));
    }

    if let Some(hex) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        U256::from_str_radix(hex, 16).map_err(|_| {
            WalletError::InvalidArgument(format!("Invalid hexadecimal value: '{}'", value_str))
        })
    } else {
        U256::from_str_radix(value_str, 10).map_err(|_| {
            WalletError::InvalidArgument(format!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            ))
        })
    }
}

/// Parses `0x`-prefixed (or bare) hex into bytes.
pub fn decode_hex_data(data: &str) -> WalletResult<Vec<u8>> {
    let data = data.trim();
    let hex_str = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    hex::decode(hex_str)
        .map_err(|e| WalletError::InvalidArgument(format!("Invalid hex data '{}': {}", data, e)))
}

/// Joins an explorer base URL and a transaction id.
pub fn transaction_url(explorer_tx_url: Option<&str>, transaction_id: &str) -> String {
    match explorer_tx_url {
        Some(base) if !base.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), transaction_id)
        }
        _ => transaction_id.to_string(),
    }
}

/// Creates user-friendly error messages for common RPC errors
///
/// The node's own wording is kept at the end of every message.
pub fn interpret_rpc_error(error: &str) -> String {
    let lower = error.to_lowercase();
    if lower.contains("insufficient funds") {
        format!(
            "Insufficient funds to cover value and gas costs ({})",
            error
        )
    } else if lower.contains("nonce too low") {
        format!(
            "Nonce too low, another transaction from this address was already mined with this nonce ({})",
            error
        )
    } else if lower.contains("intrinsic gas too low") || lower.contains("gas required exceeds allowance") {
        format!("Gas limit too low for this transaction ({})", error)
    } else if lower.contains("underpriced") {
        format!("Gas price too low to be accepted by the node ({})", error)
    } else if lower.contains("execution reverted") {
        format!("The contract reverted execution ({})", error)
    } else if lower.contains("connection refused") || lower.contains("network unreachable") {
        format!("Cannot connect to RPC endpoint ({})", error)
    } else if lower.contains("rate limit") {
        format!("RPC endpoint rate limit reached ({})", error)
    } else {
        error.to_string()
    }
}
