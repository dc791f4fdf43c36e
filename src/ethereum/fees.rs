use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};

use super::provider::ChainContext;
use super::transaction::TransactionDraft;
use super::{transfer, FeeEstimate};

/// Fee preview for a native or token transfer. No margin is applied.
pub async fn estimate_fee(
    context: &ChainContext,
    from: Address,
    to: Address,
    value: U256,
    contract: Option<Address>,
) -> FeeEstimate {
    match transfer::transfer_draft(from, to, value, contract) {
        Ok(draft) => quote(context, &draft).await,
        Err(e) => {
            tracing::debug!(network = %context.name, error = %e, "Fee estimation failed");
            FeeEstimate::insufficient_funds()
        }
    }
}

/// Quote the fee for a draft. Failures come back as
/// [`FeeEstimate::insufficient_funds`] instead of an error.
pub async fn quote(context: &ChainContext, draft: &TransactionDraft) -> FeeEstimate {
    match draft.gas_quote(context.client()).await {
        Ok((gas_limit, gas_price)) => {
            match fee_estimate(gas_limit * gas_price, context.config.native_decimals) {
                Some(estimate) => estimate,
                None => FeeEstimate::insufficient_funds(),
            }
        }
        Err(e) => {
            tracing::debug!(
                network = %context.name,
                kind = %draft.kind,
                from = %draft.from,
                to = %draft.to,
                error = %e,
                "Fee estimation failed"
            );
            FeeEstimate::insufficient_funds()
        }
    }
}

fn fee_estimate(fee_wei: U256, decimals: u8) -> Option<FeeEstimate> {
    let formatted = format_units(fee_wei, decimals).ok()?;
    let value = formatted.parse::<f64>().ok()?;

    Some(FeeEstimate {
        error: false,
        value,
        fee_wei: fee_wei.to_string(),
        message: "Fee successfully estimated".to_string(),
    })
}
