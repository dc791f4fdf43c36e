use thiserror::Error;

/// Failures reported by a [`ChainClient`](crate::ethereum::provider::ChainClient).
///
/// The message is already normalized: a decoded revert reason is preferred
/// over the node's error message, which is preferred over transport text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("{message}")]
    Rpc { message: String },

    #[error("RPC request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl ChainError {
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
        }
    }
}

/// Errors raised at the wallet / contract component boundaries.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    ChainUnavailable(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Contract read failed: {0}")]
    ContractRead(String),

    #[error("Transaction submission failed: {0}")]
    TransactionSubmission(String),

    #[error("Indexer request failed: {0}")]
    Indexer(String),

    #[error("Network '{0}' is not configured")]
    UnknownNetwork(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub type WalletResult<T> = Result<T, WalletError>;
