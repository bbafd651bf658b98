//! Receipt confirmation
//!
//! Waits until a transaction is mined and buried under the configured number
//! of blocks. Reverted receipts are returned as-is; callers decide what a
//! failed status means for their stage.

use alloy::primitives::B256;
use tracing::{debug, info};

use crate::endpoint::{ChainEndpoint, TxReceipt};
use crate::error::{BridgeError, RpcError};
use crate::retry::{Poller, WaitOptions};

/// Result of checking a transaction receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    /// No receipt yet
    Pending,
    /// Mined, waiting for this many more blocks
    WaitingConfirmations(u64),
    /// Mined with enough confirmations (succeeded or reverted)
    Confirmed(TxReceipt),
}

/// Single confirmation probe
pub async fn check_confirmation(
    endpoint: &dyn ChainEndpoint,
    tx_hash: B256,
    required_confirmations: u64,
) -> Result<ConfirmationResult, RpcError> {
    let Some(receipt) = endpoint.receipt(tx_hash).await? else {
        return Ok(ConfirmationResult::Pending);
    };

    let head = endpoint.block_number().await?;
    let confirmations = head.saturating_sub(receipt.block_number) + 1;
    if confirmations < required_confirmations {
        return Ok(ConfirmationResult::WaitingConfirmations(
            required_confirmations - confirmations,
        ));
    }

    Ok(ConfirmationResult::Confirmed(receipt))
}

/// Poll until `tx_hash` has `required_confirmations`
pub async fn wait_for_receipt(
    endpoint: &dyn ChainEndpoint,
    tx_hash: B256,
    required_confirmations: u64,
    opts: &WaitOptions,
) -> Result<TxReceipt, BridgeError> {
    let mut poller = Poller::new(
        format!("receipt of {} on {}", tx_hash, endpoint.layer()),
        opts,
    );

    loop {
        match check_confirmation(endpoint, tx_hash, required_confirmations).await {
            Ok(ConfirmationResult::Confirmed(receipt)) => {
                info!(
                    layer = %endpoint.layer(),
                    tx_hash = %tx_hash,
                    block = receipt.block_number,
                    success = receipt.status,
                    "Transaction confirmed"
                );
                return Ok(receipt);
            }
            Ok(ConfirmationResult::WaitingConfirmations(remaining)) => {
                poller.succeeded();
                debug!(what = %poller.what(), remaining, "Waiting for confirmations");
            }
            Ok(ConfirmationResult::Pending) => {
                poller.succeeded();
                debug!(what = %poller.what(), "Transaction not mined yet");
            }
            Err(e) => poller.absorb(e.into())?,
        }
        poller.tick().await?;
    }
}
