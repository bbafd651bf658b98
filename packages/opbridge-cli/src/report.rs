//! Human-readable amounts and progress lines

use alloy::primitives::{B256, U256};
use opbridge_rs::{Balances, LifecycleEvent};
use tracing::info;

const WEI_PER_GWEI: u64 = 1_000_000_000;

pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// `wei` as gwei with up to nine decimals, trailing zeros dropped
pub fn format_gwei(wei: U256) -> String {
    let unit = U256::from(WEI_PER_GWEI);
    let whole = wei / unit;
    let frac = (wei % unit).to::<u64>();
    if frac == 0 {
        return format!("{} gwei", whole);
    }
    let digits = format!("{:09}", frac);
    format!("{}.{} gwei", whole, digits.trim_end_matches('0'))
}

/// Explorer link for `tx_hash`, or the bare hash without an explorer
pub fn tx_link(explorer: Option<&str>, tx_hash: B256) -> String {
    match explorer {
        Some(base) => format!("{}/tx/{}", base, tx_hash),
        None => tx_hash.to_string(),
    }
}

pub fn log_balances(label: &str, balances: &Balances) {
    info!(
        l1 = %format_gwei(balances.l1),
        l2 = %format_gwei(balances.l2),
        "{} balances",
        label
    );
}

pub fn log_event(explorer: Option<&str>, event: &LifecycleEvent) {
    match event.stage_tx {
        Some(tx) => info!(
            msg = %event.message.short_hash(),
            direction = %event.direction,
            stage = %event.stage,
            elapsed_secs = event.elapsed.as_secs(),
            tx = %tx_link(explorer, tx),
            "Transaction submitted"
        ),
        None => info!(
            msg = %event.message.short_hash(),
            direction = %event.direction,
            stage = %event.stage,
            elapsed_secs = event.elapsed.as_secs(),
            "Stage reached"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gwei() {
        assert_eq!(format_gwei(gwei_to_wei(1000)), "1000 gwei");
        assert_eq!(format_gwei(U256::from(1_500_000_000u64)), "1.5 gwei");
        assert_eq!(format_gwei(U256::from(1u64)), "0.000000001 gwei");
        assert_eq!(format_gwei(U256::ZERO), "0 gwei");
    }

    #[test]
    fn test_tx_link() {
        let hash = B256::repeat_byte(0xab);
        assert_eq!(tx_link(None, hash), hash.to_string());
        assert_eq!(
            tx_link(Some("https://goerli.etherscan.io"), hash),
            format!("https://goerli.etherscan.io/tx/{}", hash)
        );
    }
}
