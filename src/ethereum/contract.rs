use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, U256};
use serde_json::Value;

use super::provider::ChainContext;
use super::transaction::{self, TransactionDraft, TransferKind};
use super::{abi, fees, keys, utils, FeeEstimate, WriteResult};
use crate::error::{WalletError, WalletResult};

/// A method call described by an ABI: which contract, which method, which
/// positional arguments.
#[derive(Debug, Clone, Copy)]
pub struct ContractCall<'a> {
    pub abi: &'a JsonAbi,
    pub method: &'a str,
    pub contract: Address,
    pub args: &'a [Value],
}

impl<'a> ContractCall<'a> {
    pub fn new(abi: &'a JsonAbi, method: &'a str, contract: Address, args: &'a [Value]) -> Self {
        Self {
            abi,
            method,
            contract,
            args,
        }
    }
}

/// Run a method through `eth_call` and decode its outputs.
pub async fn read_contract(context: &ChainContext, call: &ContractCall<'_>) -> WalletResult<Value> {
    let function = abi::resolve_function(call.abi, call.method)?;
    let data = abi::encode_call(function, call.args)?;

    tracing::debug!(
        network = %context.name,
        contract = %call.contract,
        method = call.method,
        "Calling contract"
    );

    let request = transaction::call_request(None, call.contract, U256::ZERO, data);
    let output = context
        .client()
        .call(&request)
        .await
        .map_err(|e| WalletError::ContractRead(utils::interpret_rpc_error(&e.to_string())))?;

    abi::decode_output(function, &output).map_err(|e| WalletError::ContractRead(e.to_string()))
}

/// Build the draft for a contract write.
///
/// With `explicit_data` the calldata is used verbatim and the ABI is not
/// consulted. Otherwise the method is encoded and a non-zero `value` is only
/// accepted for payable methods.
pub fn invocation_draft(
    call: &ContractCall<'_>,
    kind: TransferKind,
    from: Address,
    explicit_data: Option<Bytes>,
    value: Option<U256>,
) -> WalletResult<TransactionDraft> {
    let value = value.unwrap_or(U256::ZERO);

    let data = match explicit_data {
        Some(data) => data,
        None => {
            let function = abi::resolve_function(call.abi, call.method)?;
            if !value.is_zero() && !abi::is_payable(function) {
                return Err(WalletError::InvalidArgument(format!(
                    "Method '{}' is not payable; value must be 0",
                    call.method
                )));
            }
            abi::encode_call(function, call.args)?
        }
    };

    Ok(TransactionDraft::contract(kind, from, call.contract, value, data))
}

/// Encode, price (with margin), sign and submit a contract write.
pub async fn write_contract(
    context: &ChainContext,
    call: &ContractCall<'_>,
    private_key: &str,
    explicit_data: Option<Bytes>,
    value: Option<U256>,
) -> WalletResult<WriteResult> {
    let signer = keys::parse_private_key(private_key)?;
    let draft = invocation_draft(
        call,
        TransferKind::ContractInvocation,
        signer.address(),
        explicit_data,
        value,
    )?;

    let tx_hash = transaction::send(context, draft, &signer).await?;
    Ok(WriteResult {
        transaction_id: tx_hash.to_string(),
    })
}

/// Fee preview for [`write_contract`], margin included. Never fails.
pub async fn estimate_write_contract_fee(
    context: &ChainContext,
    call: &ContractCall<'_>,
    from: Address,
    explicit_data: Option<Bytes>,
    value: Option<U256>,
) -> FeeEstimate {
    match invocation_draft(call, TransferKind::ContractInvocation, from, explicit_data, value) {
        Ok(draft) => fees::quote(context, &draft).await,
        Err(e) => {
            tracing::debug!(
                network = %context.name,
                method = call.method,
                error = %e,
                "Fee estimation failed"
            );
            FeeEstimate::insufficient_funds()
        }
    }
}
