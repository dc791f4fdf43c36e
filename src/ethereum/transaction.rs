//! Transaction building, signing and submission.
//!
//! A transaction moves through [`TransactionDraft`] (unbuilt), [`TxParams`]
//! (priced), [`SignedTransaction`] and finally a submitted hash. Confirmation
//! tracking is left to callers and the indexer.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{TransactionBuilder, TxSignerSync};
use alloy::primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::fmt;

use super::provider::{ChainClient, ChainContext, ChainResult};
use super::{utils, SignedTransaction, TransactionResult, TxParams};
use crate::error::{WalletError, WalletResult};

/// What a transaction does; selects the gas margin policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Plain value transfer to an account.
    NativeTransfer,
    /// Templated `transfer(to, amount)` on a token contract.
    TokenTransfer,
    /// Any other contract method, including raw forwarded calldata.
    ContractInvocation,
}

impl TransferKind {
    /// Margin policy table. Only generic contract invocations are padded.
    pub fn applies_margin(self) -> bool {
        match self {
            TransferKind::NativeTransfer => false,
            TransferKind::TokenTransfer => false,
            TransferKind::ContractInvocation => true,
        }
    }

    fn adjust(self, value: U256) -> U256 {
        if self.applies_margin() {
            apply_margin(value)
        } else {
            value
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferKind::NativeTransfer => "native_transfer",
            TransferKind::TokenTransfer => "token_transfer",
            TransferKind::ContractInvocation => "contract_invocation",
        };
        f.write_str(name)
    }
}

/// `round(value * 1.5)`, halves rounded up.
pub fn apply_margin(value: U256) -> U256 {
    (value * U256::from(3u8) + U256::from(1u8)) / U256::from(2u8)
}

/// Eth-call style request shared by estimation and reads.
pub fn call_request(from: Option<Address>, to: Address, value: U256, data: Bytes) -> TransactionRequest {
    let request = TransactionRequest::default()
        .with_to(to)
        .with_value(value)
        .with_input(data);
    match from {
        Some(from) => request.with_from(from),
        None => request,
    }
}

/// An unpriced transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub kind: TransferKind,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl TransactionDraft {
    pub fn native(from: Address, to: Address, value: U256) -> Self {
        Self {
            kind: TransferKind::NativeTransfer,
            from,
            to,
            value,
            data: Bytes::new(),
        }
    }

    pub fn contract(kind: TransferKind, from: Address, contract: Address, value: U256, data: Bytes) -> Self {
        Self {
            kind,
            from,
            to: contract,
            value,
            data,
        }
    }

    pub fn call_request(&self) -> TransactionRequest {
        call_request(Some(self.from), self.to, self.value, self.data.clone())
    }

    /// Estimated gas limit and current gas price, margin applied per kind.
    pub async fn gas_quote(&self, client: &dyn ChainClient) -> ChainResult<(U256, U256)> {
        let request = self.call_request();
        let (gas_limit, gas_price) =
            tokio::try_join!(client.estimate_gas(&request), client.gas_price())?;

        Ok((
            self.kind.adjust(U256::from(gas_limit)),
            self.kind.adjust(U256::from(gas_price)),
        ))
    }

    /// Fetch nonce, chain id, gas estimate and gas price concurrently. Nothing
    /// is cached between builds.
    pub async fn price(self, client: &dyn ChainClient) -> WalletResult<TxParams> {
        let (nonce, chain_id, (gas_limit, gas_price)) = tokio::try_join!(
            client.pending_nonce(self.from),
            client.chain_id(),
            self.gas_quote(client),
        )?;

        tracing::debug!(
            kind = %self.kind,
            from = %self.from,
            to = %self.to,
            nonce,
            chain_id,
            gas_limit = %gas_limit,
            gas_price = %gas_price,
            "Transaction priced"
        );

        Ok(TxParams {
            nonce,
            chain_id,
            value: self.value,
            data: self.data,
            gas_limit,
            gas_price,
            to: self.to,
        })
    }
}

/// Sign priced parameters as an EIP-155 legacy transaction. Local only.
pub fn sign(params: &TxParams, signer: &PrivateKeySigner) -> WalletResult<SignedTransaction> {
    let gas_limit = u64::try_from(params.gas_limit).map_err(|_| {
        WalletError::InvalidArgument(format!("Gas limit {} exceeds 64 bits", params.gas_limit))
    })?;
    let gas_price = u128::try_from(params.gas_price).map_err(|_| {
        WalletError::InvalidArgument(format!("Gas price {} exceeds 128 bits", params.gas_price))
    })?;

    let mut tx = TxLegacy {
        chain_id: Some(params.chain_id),
        nonce: params.nonce,
        gas_price,
        gas_limit,
        to: TxKind::Call(params.to),
        value: params.value,
        input: params.data.clone(),
    };

    let signature = signer
        .sign_transaction_sync(&mut tx)
        .map_err(|e| WalletError::InvalidPrivateKey(format!("Signing failed: {}", e)))?;
    let envelope = TxEnvelope::from(tx.into_signed(signature));

    Ok(SignedTransaction {
        transaction_hash: *envelope.tx_hash(),
        raw_bytes: envelope.encoded_2718().into(),
    })
}

/// Broadcast a signed payload. Node rejections keep their original wording.
pub async fn submit(client: &dyn ChainClient, signed: &SignedTransaction) -> WalletResult<TxHash> {
    client
        .send_raw_transaction(&signed.raw_bytes)
        .await
        .map_err(|e| WalletError::TransactionSubmission(utils::interpret_rpc_error(&e.to_string())))
}

/// Price, sign and submit a draft with the given key.
pub async fn send(
    context: &ChainContext,
    draft: TransactionDraft,
    signer: &PrivateKeySigner,
) -> WalletResult<TxHash> {
    let kind = draft.kind;
    let params = draft.price(context.client()).await?;
    let signed = sign(&params, signer)?;
    let tx_hash = submit(context.client(), &signed).await?;

    tracing::info!(
        network = %context.name,
        kind = %kind,
        from = %signer.address(),
        to = %params.to,
        tx_hash = %tx_hash,
        gas_limit = %params.gas_limit,
        gas_price = %params.gas_price,
        "Transaction submitted"
    );

    Ok(tx_hash)
}

/// Submit a transaction signed elsewhere.
pub async fn push_raw_transaction(context: &ChainContext, raw_hex: &str) -> WalletResult<TransactionResult> {
    let raw = utils::decode_hex_data(raw_hex)?;
    if raw.is_empty() {
        return Err(WalletError::InvalidArgument(
            "Raw transaction cannot be empty".to_string(),
        ));
    }

    let tx_hash = context
        .client()
        .send_raw_transaction(&raw)
        .await
        .map_err(|e| WalletError::TransactionSubmission(utils::interpret_rpc_error(&e.to_string())))?;

    tracing::info!(network = %context.name, tx_hash = %tx_hash, "Raw transaction submitted");

    let transaction_id = tx_hash.to_string();
    Ok(TransactionResult {
        transaction_url: utils::transaction_url(
            context.config.explorer_tx_url.as_deref(),
            &transaction_id,
        ),
        transaction_id,
    })
}
