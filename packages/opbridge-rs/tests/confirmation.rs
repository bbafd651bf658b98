//! Receipt confirmation against a single mock chain

use alloy::primitives::{Address, Bytes, U256};
use opbridge_rs::confirmation::{check_confirmation, wait_for_receipt, ConfirmationResult};
use opbridge_rs::testing::{MockChain, TEST_SIGNER};
use opbridge_rs::{BridgeError, ChainEndpoint, Layer, PollPolicy, RpcError, TxRequest, WaitOptions};
use std::time::Duration;

fn funded_chain() -> MockChain {
    let chain = MockChain::new(Layer::L1, 1, TEST_SIGNER);
    chain.set_balance(TEST_SIGNER, U256::from(10u64.pow(18)));
    chain
}

fn transfer() -> TxRequest {
    TxRequest {
        to: Address::repeat_byte(0x42),
        data: Bytes::new(),
        value: U256::from(1_000),
    }
}

fn opts(secs: u64) -> WaitOptions {
    WaitOptions::new(
        Duration::from_secs(secs),
        PollPolicy::with_interval(Duration::from_secs(2)),
    )
}

#[tokio::test]
async fn test_pending_until_receipt_appears() {
    let chain = funded_chain();
    chain.hold_receipts(true);
    let hash = chain.send_transaction(&transfer()).await.unwrap();

    assert_eq!(
        check_confirmation(&chain, hash, 1).await.unwrap(),
        ConfirmationResult::Pending
    );

    chain.release_receipts();
    match check_confirmation(&chain, hash, 1).await.unwrap() {
        ConfirmationResult::Confirmed(receipt) => {
            assert!(receipt.status);
            assert_eq!(receipt.tx_hash, hash);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_counts_confirmations_from_head() {
    let chain = funded_chain();
    let hash = chain.send_transaction(&transfer()).await.unwrap();

    assert_eq!(
        check_confirmation(&chain, hash, 3).await.unwrap(),
        ConfirmationResult::WaitingConfirmations(2)
    );

    chain.mine_blocks(2);
    assert!(matches!(
        check_confirmation(&chain, hash, 3).await.unwrap(),
        ConfirmationResult::Confirmed(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_without_receipt() {
    let chain = funded_chain();
    chain.hold_receipts(true);
    let hash = chain.send_transaction(&transfer()).await.unwrap();

    let err = wait_for_receipt(&chain, hash, 1, &opts(20)).await.unwrap_err();

    assert!(matches!(err, BridgeError::Timeout { .. }));
    // One probe per 2s interval plus the first
    assert_eq!(chain.call_count("receipt"), 11);
}

#[tokio::test(start_paused = true)]
async fn test_wait_survives_transient_errors() {
    let chain = funded_chain();
    let hash = chain.send_transaction(&transfer()).await.unwrap();
    chain.fail_next("receipt", RpcError::Transport("connection reset".into()), 3);

    let receipt = wait_for_receipt(&chain, hash, 1, &opts(120)).await.unwrap();

    assert_eq!(receipt.tx_hash, hash);
    assert_eq!(chain.call_count("receipt"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_reverted_receipts() {
    struct RevertAll;

    impl opbridge_rs::testing::Responder for RevertAll {
        fn on_transaction(
            &self,
            _layer: Layer,
            _from: Address,
            _tx: &TxRequest,
            _block: u64,
            _timestamp: u64,
        ) -> Result<Vec<alloy::primitives::Log>, String> {
            Err("always".into())
        }

        fn on_call(&self, _layer: Layer, _from: Address, _tx: &TxRequest) -> Result<Bytes, RpcError> {
            Ok(Bytes::new())
        }
    }

    let chain = funded_chain();
    chain.set_responder(std::sync::Arc::new(RevertAll));
    let hash = chain.send_transaction(&transfer()).await.unwrap();

    let receipt = wait_for_receipt(&chain, hash, 1, &opts(10)).await.unwrap();

    assert!(!receipt.status);
    // Value is returned on revert, gas is not
    assert_eq!(
        chain.balance_of(TEST_SIGNER),
        U256::from(10u64.pow(18)) - chain.gas_cost()
    );
}
