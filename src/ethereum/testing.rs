//! Scripted in-memory chain used by unit tests.

use alloy::consensus::{TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::sync::Mutex;

use super::provider::{ChainClient, ChainResult};
use crate::config::NetworkConfig;
use crate::error::ChainError;

pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const TOKEN: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

#[derive(Default)]
struct MockState {
    call_result: Bytes,
    estimate_error: Option<String>,
    call_error: Option<String>,
    send_error: Option<String>,
    block_error: bool,
    estimates: Vec<TransactionRequest>,
    calls: Vec<TransactionRequest>,
    sent: Vec<Bytes>,
}

pub struct MockChain {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_estimate: u64,
    pub block: u64,
    pub balance: U256,
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            chain_id: 31337,
            nonce: 4,
            gas_price: 1_000_000_001,
            gas_estimate: 21_001,
            block: 1_000,
            balance: U256::from(5_000_000_000_000_000_000u128),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_call_result(self, result: Vec<u8>) -> Self {
        self.state.lock().unwrap().call_result = result.into();
        self
    }

    pub fn fail_estimate(&self, message: &str) {
        self.state.lock().unwrap().estimate_error = Some(message.to_string());
    }

    pub fn fail_call(&self, message: &str) {
        self.state.lock().unwrap().call_error = Some(message.to_string());
    }

    pub fn fail_send(&self, message: &str) {
        self.state.lock().unwrap().send_error = Some(message.to_string());
    }

    pub fn fail_block_number(&self) {
        self.state.lock().unwrap().block_error = true;
    }

    pub fn estimate_requests(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().estimates.clone()
    }

    pub fn call_requests(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Decode the only submitted transaction.
    pub fn single_sent(&self) -> (TxLegacy, TxHash) {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one submitted transaction");
        decode_legacy(&sent[0])
    }
}

pub fn decode_legacy(raw: &[u8]) -> (TxLegacy, TxHash) {
    match TxEnvelope::decode_2718(&mut &raw[..]).expect("valid EIP-2718 payload") {
        TxEnvelope::Legacy(signed) => (signed.tx().clone(), *signed.hash()),
        other => panic!("expected a legacy transaction, got {:?}", other),
    }
}

pub fn network_config() -> NetworkConfig {
    NetworkConfig {
        rpc_url: "http://127.0.0.1:8545".to_string(),
        chain_id: 31337,
        explorer_tx_url: Some("https://explorer.test/tx".to_string()),
        indexer_url: None,
        indexer_network: None,
        native_symbol: "ETH".to_string(),
        native_decimals: 18,
        rpc_timeout_secs: 5,
    }
}

pub fn address(value: &str) -> Address {
    value.parse().expect("valid address")
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self, _address: Address) -> ChainResult<u64> {
        Ok(self.nonce)
    }

    async fn gas_price(&self) -> ChainResult<u128> {
        Ok(self.gas_price)
    }

    async fn balance(&self, _address: Address) -> ChainResult<U256> {
        Ok(self.balance)
    }

    async fn block_number(&self) -> ChainResult<u64> {
        if self.state.lock().unwrap().block_error {
            return Err(ChainError::rpc("connection refused"));
        }
        Ok(self.block)
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> ChainResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.estimates.push(request.clone());
        match &state.estimate_error {
            Some(message) => Err(ChainError::rpc(message.clone())),
            None => Ok(self.gas_estimate),
        }
    }

    async fn call(&self, request: &TransactionRequest) -> ChainResult<Bytes> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());
        match &state.call_error {
            Some(message) => Err(ChainError::rpc(message.clone())),
            None => Ok(state.call_result.clone()),
        }
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ChainResult<TxHash> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.send_error {
            return Err(ChainError::rpc(message.clone()));
        }
        state.sent.push(Bytes::copy_from_slice(raw));
        Ok(keccak256(raw))
    }
}
