//! Common Test Assertions
//!
//! Helpers for checking lifecycle event streams and balance movements after
//! a flow has run.

use alloy::primitives::U256;
use eyre::{eyre, Result};

use crate::types::{LifecycleEvent, Message, MessageStatus};

/// Assert that event stages never go backwards
pub fn assert_monotonic_stages(events: &[LifecycleEvent]) -> Result<()> {
    for pair in events.windows(2) {
        if pair[1].stage < pair[0].stage {
            return Err(eyre!(
                "Stage regressed from {} to {} for {}",
                pair[0].stage,
                pair[1].stage,
                pair[0].tx_hash
            ));
        }
    }
    Ok(())
}

/// Assert that every stage in `expected` was reported, in order
pub fn assert_stages_seen(events: &[LifecycleEvent], expected: &[MessageStatus]) -> Result<()> {
    let mut seen: Vec<MessageStatus> = events.iter().map(|e| e.stage).collect();
    seen.dedup();
    let mut remaining = expected.iter().peekable();
    for stage in &seen {
        if remaining.peek() == Some(&stage) {
            remaining.next();
        }
    }
    if let Some(missing) = remaining.next() {
        return Err(eyre!("Stage {} never reported; saw {:?}", missing, seen));
    }
    Ok(())
}

/// Assert that a balance moved up by exactly `expected`
pub fn assert_balance_increased(before: U256, after: U256, expected: U256) -> Result<()> {
    let actual = after.saturating_sub(before);
    if after < before || actual != expected {
        return Err(eyre!(
            "Balance increase mismatch: expected {}, got {} (before: {}, after: {})",
            expected,
            actual,
            before,
            after
        ));
    }
    Ok(())
}

/// Assert that a withdrawal recorded both of its L1 stage transactions
pub fn assert_withdrawal_settled(message: &Message) -> Result<()> {
    if message.status != MessageStatus::Relayed {
        return Err(eyre!("Withdrawal {} ended at {}", message.tx_hash, message.status));
    }
    if message.prove_tx.is_none() || message.finalize_tx.is_none() {
        return Err(eyre!(
            "Withdrawal {} is missing stage transactions (prove {:?}, finalize {:?})",
            message.tx_hash,
            message.prove_tx,
            message.finalize_tx
        ));
    }
    Ok(())
}
