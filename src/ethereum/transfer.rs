use alloy::primitives::{Address, U256};

use super::contract::{self, ContractCall};
use super::provider::ChainContext;
use super::transaction::{self, TransactionDraft, TransferKind};
use super::{erc20, keys, utils, TransactionResult, TxParamsPreview};
use crate::error::{WalletError, WalletResult};

/// Draft a native transfer, or a token `transfer(to, amount)` when a
/// contract is given. `amount` is already in base units.
pub fn transfer_draft(
    from: Address,
    to: Address,
    amount: U256,
    contract: Option<Address>,
) -> WalletResult<TransactionDraft> {
    match contract {
        None => Ok(TransactionDraft::native(from, to, amount)),
        Some(token) => {
            let abi = erc20::standard_abi()?;
            let args = erc20::transfer_args(to, amount);
            let call = ContractCall::new(&abi, "transfer", token, &args);
            contract::invocation_draft(&call, TransferKind::TokenTransfer, from, None, None)
        }
    }
}

pub async fn transfer(
    context: &ChainContext,
    private_key: &str,
    to: Address,
    amount: U256,
    contract: Option<Address>,
) -> WalletResult<TransactionResult> {
    if contract.is_none() && amount.is_zero() {
        return Err(WalletError::InvalidArgument(
            "Transfer amount must be greater than 0".to_string(),
        ));
    }

    let signer = keys::parse_private_key(private_key)?;
    let draft = transfer_draft(signer.address(), to, amount, contract)?;
    let tx_hash = transaction::send(context, draft, &signer).await?;

    let transaction_id = tx_hash.to_string();
    Ok(TransactionResult {
        transaction_url: utils::transaction_url(
            context.config.explorer_tx_url.as_deref(),
            &transaction_id,
        ),
        transaction_id,
    })
}

/// Same pricing as [`transfer`], returned unsigned for external signing.
pub async fn generate_tx_params(
    context: &ChainContext,
    from: Address,
    to: Address,
    amount: U256,
    contract: Option<Address>,
) -> WalletResult<TxParamsPreview> {
    let draft = transfer_draft(from, to, amount, contract)?;
    let params = draft.price(context.client()).await?;
    Ok(TxParamsPreview::from(&params))
}
