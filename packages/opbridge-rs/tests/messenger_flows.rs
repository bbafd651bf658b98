//! Messenger Flow Integration Tests
//!
//! Full deposit and withdrawal flows against the in-memory OP stack from
//! `opbridge_rs::testing`. Time is paused, so challenge windows and poll
//! intervals run instantly.
//!
//! ## Running
//!
//! ```bash
//! cd packages/opbridge-rs
//! cargo test --test messenger_flows
//! ```

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use opbridge_rs::config::L2_TO_L1_MESSAGE_PASSER;
use opbridge_rs::registry::STANDARD_TOKEN;
use opbridge_rs::testing::*;
use opbridge_rs::tracker::ResolvedWithdrawal;
use opbridge_rs::{
    BridgeError, CancelSignal, ChainEndpoint, CrossDomainMessenger, Direction, Layer,
    LifecycleEvent, Message, MessageStatus, OutputProposal, PollPolicy, ProofProvider, RpcError,
    RpcProofProvider, WaitOptions, WithdrawalProof,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn gwei(amount: u64) -> U256 {
    U256::from(amount) * U256::from(1_000_000_000u64)
}

fn opts() -> WaitOptions {
    WaitOptions::new(
        Duration::from_secs(3_600),
        PollPolicy::with_interval(Duration::from_secs(1)),
    )
}

fn short_opts(secs: u64) -> WaitOptions {
    WaitOptions::new(
        Duration::from_secs(secs),
        PollPolicy::with_interval(Duration::from_secs(1)),
    )
}

fn with_events(
    stack: &OpStack,
) -> (CrossDomainMessenger, mpsc::UnboundedReceiver<LifecycleEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let messenger = messenger(stack).unwrap().with_events(tx);
    (messenger, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn total_calls(stack: &OpStack) -> usize {
    stack.l1.total_calls() + stack.l2.total_calls()
}

/// Reports every output as not covering the withdrawal
struct NeverCovered;

#[async_trait]
impl ProofProvider for NeverCovered {
    async fn build_proof(
        &self,
        withdrawal: &ResolvedWithdrawal,
        output: &OutputProposal,
    ) -> Result<WithdrawalProof, BridgeError> {
        Err(BridgeError::ProofUnavailable {
            reason: format!(
                "output {} does not include withdrawal {}",
                output.index, withdrawal.withdrawal_hash
            ),
        })
    }
}

/// Valid output root proof with the storage proof dropped
struct EmptyInclusionProof(RpcProofProvider);

#[async_trait]
impl ProofProvider for EmptyInclusionProof {
    async fn build_proof(
        &self,
        withdrawal: &ResolvedWithdrawal,
        output: &OutputProposal,
    ) -> Result<WithdrawalProof, BridgeError> {
        let mut proof = self.0.build_proof(withdrawal, output).await?;
        proof.withdrawal_proof.clear();
        Ok(proof)
    }
}

// ============================================================================
// Deposits
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_deposit_native_relays_exact_amount() {
    init_tracing();
    let stack = funded_stack(600);
    let (messenger, mut rx) = with_events(&stack);
    let l2_before = stack.l2.balance_of(TEST_SIGNER);

    let message = messenger.deposit_native(gwei(1000), &opts()).await.unwrap();

    assert_eq!(message.direction, Direction::Deposit);
    assert_eq!(message.status, MessageStatus::Relayed);
    assert!(message.source_block.is_some());
    assert!(message.prove_tx.is_none());
    assert_balance_increased(l2_before, stack.l2.balance_of(TEST_SIGNER), gwei(1000)).unwrap();
    assert_eq!(
        stack.l1.balance_of(TEST_SIGNER),
        U256::from(ONE_ETHER) - gwei(1000) - stack.l1.gas_cost()
    );
    assert!(!messenger.tracker().is_tracked(message.tx_hash));

    let events = drain(&mut rx);
    assert_eq!(events[0].stage, MessageStatus::Submitted);
    assert_eq!(events[0].stage_tx, Some(message.tx_hash));
    assert_eq!(events.last().unwrap().stage, MessageStatus::Relayed);
    assert_monotonic_stages(&events).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_deposit_insufficient_balance_sends_nothing() {
    let stack = funded_stack(600);
    stack.l1.set_balance(TEST_SIGNER, gwei(10));
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &opts())
        .await
        .unwrap_err();

    match failure.error {
        BridgeError::InsufficientBalance {
            layer,
            required,
            available,
        } => {
            assert_eq!(layer, Layer::L1);
            assert_eq!(required, gwei(1000));
            assert_eq!(available, gwei(10));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(failure.message.is_none());
    assert_eq!(stack.l1.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deposit_insufficient_balance_for_gas() {
    let stack = funded_stack(600);
    stack.l1.set_balance(TEST_SIGNER, gwei(1000));
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &opts())
        .await
        .unwrap_err();

    match failure.error {
        BridgeError::InsufficientBalance { required, .. } => {
            assert_eq!(required, gwei(1000) + stack.l1.gas_cost());
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(stack.l1.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deposit_timeout_is_resumable() {
    let stack = funded_stack(600);
    stack.relay_after(10_000);
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &short_opts(30))
        .await
        .unwrap_err();

    match &failure.error {
        BridgeError::Timeout { last, .. } => assert_eq!(*last, MessageStatus::Submitted),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(failure.error.is_resumable());

    let mut message = *failure.message.unwrap();
    assert_eq!(message.status, MessageStatus::Submitted);
    assert!(message.source_block.is_some());

    stack.relay_after(1);
    messenger.resume(&mut message, &opts()).await.unwrap();
    assert_eq!(message.status, MessageStatus::Relayed);
    assert_eq!(stack.l1.sent_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deposit_relay_failure() {
    let stack = funded_stack(600);
    stack.fail_relays();
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &opts())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::RelayFailed { .. }));
    assert!(!failure.error.is_resumable());
    assert_eq!(failure.message.unwrap().status, MessageStatus::Submitted);
}

#[tokio::test(start_paused = true)]
async fn test_transient_rpc_errors_are_retried() {
    let stack = funded_stack(600);
    stack
        .l2
        .fail_next("call", RpcError::Transport("connection reset".into()), 2);
    let messenger = messenger(&stack).unwrap();

    let message = messenger.deposit_native(gwei(1000), &opts()).await.unwrap();

    assert_eq!(message.status, MessageStatus::Relayed);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_rpc_error_is_stage_unreachable() {
    let stack = funded_stack(600);
    stack
        .l2
        .fail_always("call", RpcError::Decode("short return data".into()));
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &opts())
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::StageUnreachable { .. }));
    let mut message = *failure.message.unwrap();

    stack.l2.clear_failures();
    messenger.resume(&mut message, &opts()).await.unwrap();
    assert_eq!(message.status, MessageStatus::Relayed);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_transport_error_ends_unreachable_at_deadline() {
    let stack = funded_stack(600);
    stack
        .l2
        .fail_always("call", RpcError::Transport("connection refused".into()));
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_native(gwei(1000), &short_opts(60))
        .await
        .unwrap_err();

    match failure.error {
        BridgeError::StageUnreachable { reason, .. } => {
            assert!(reason.contains("connection refused"), "{}", reason)
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_token_deposit_approves_bridge_first() {
    let stack = funded_stack(600);
    let l1_token = Address::repeat_byte(0x11);
    let l2_token = Address::repeat_byte(0x22);
    stack.register_token_pair(l1_token, l2_token);
    stack.mint_token(Layer::L1, l1_token, TEST_SIGNER, U256::from(500));
    let messenger = messenger(&stack).unwrap();

    let message = messenger
        .deposit_token(STANDARD_TOKEN, l1_token, l2_token, U256::from(200), &opts())
        .await
        .unwrap();

    assert_eq!(message.status, MessageStatus::Relayed);
    assert_eq!(message.bridge, STANDARD_TOKEN);
    assert_eq!(stack.token_balance(Layer::L1, l1_token, TEST_SIGNER), U256::from(300));
    assert_eq!(stack.token_balance(Layer::L2, l2_token, TEST_SIGNER), U256::from(200));
    assert_eq!(
        stack.allowance(l1_token, TEST_SIGNER, L1_STANDARD_BRIDGE),
        U256::ZERO
    );
    // approve + depositERC20To
    assert_eq!(stack.l1.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_token_deposit_short_balance_sends_nothing() {
    let stack = funded_stack(600);
    let l1_token = Address::repeat_byte(0x11);
    let l2_token = Address::repeat_byte(0x22);
    stack.register_token_pair(l1_token, l2_token);
    stack.mint_token(Layer::L1, l1_token, TEST_SIGNER, U256::from(50));
    let messenger = messenger(&stack).unwrap();

    let failure = messenger
        .deposit_token(STANDARD_TOKEN, l1_token, l2_token, U256::from(200), &opts())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        BridgeError::InsufficientBalance { layer: Layer::L1, .. }
    ));
    assert_eq!(stack.l1.sent_count(), 0);
}

// ============================================================================
// Withdrawals
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_withdraw_native_full_lifecycle() {
    init_tracing();
    let stack = funded_stack(600);
    stack.l1.set_clock_step(120);
    let (messenger, mut rx) = with_events(&stack);
    let l1_before = stack.l1.balance_of(TEST_SIGNER);

    let message = messenger.withdraw_native(gwei(1000), &opts()).await.unwrap();

    assert_withdrawal_settled(&message).unwrap();
    assert_eq!(stack.prove_count(), 1);
    assert_eq!(stack.finalize_count(), 1);
    assert_eq!(stack.l1.sent_count(), 2);
    assert_eq!(
        stack.l1.balance_of(TEST_SIGNER),
        l1_before + gwei(1000) - stack.l1.gas_cost() * U256::from(2)
    );

    let events = drain(&mut rx);
    assert_monotonic_stages(&events).unwrap();
    assert_stages_seen(
        &events,
        &[
            MessageStatus::Submitted,
            MessageStatus::ReadyToProve,
            MessageStatus::InChallengePeriod,
            MessageStatus::ReadyForRelay,
            MessageStatus::Relayed,
        ],
    )
    .unwrap();

    let stage_txs: Vec<_> = events.iter().filter_map(|e| e.stage_tx).collect();
    assert_eq!(
        stage_txs,
        vec![
            message.tx_hash,
            message.prove_tx.unwrap(),
            message.finalize_tx.unwrap()
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_token_withdrawal_credits_l1_token() {
    let stack = funded_stack(600);
    stack.l1.set_clock_step(120);
    let l1_token = Address::repeat_byte(0x11);
    let l2_token = Address::repeat_byte(0x22);
    stack.register_token_pair(l1_token, l2_token);
    stack.mint_token(Layer::L2, l2_token, TEST_SIGNER, U256::from(200));
    let messenger = messenger(&stack).unwrap();

    let message = messenger
        .withdraw_token(STANDARD_TOKEN, l1_token, l2_token, U256::from(150), &opts())
        .await
        .unwrap();

    assert_withdrawal_settled(&message).unwrap();
    assert_eq!(stack.token_balance(Layer::L2, l2_token, TEST_SIGNER), U256::from(50));
    assert_eq!(stack.token_balance(Layer::L1, l1_token, TEST_SIGNER), U256::from(150));
}

#[tokio::test(start_paused = true)]
async fn test_proof_unavailable_stops_at_ready_to_prove() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack)
        .unwrap()
        .with_proof_provider(Arc::new(NeverCovered));

    let failure = messenger
        .withdraw_native(gwei(1000), &short_opts(30))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::ProofUnavailable { .. }));
    let message = failure.message.unwrap();
    assert_eq!(message.status, MessageStatus::ReadyToProve);
    assert!(message.prove_tx.is_none());
    assert_eq!(stack.prove_count(), 0);
    assert_eq!(stack.l1.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_period_boundary() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack).unwrap();

    // The L1 clock only moves when blocks are mined, so the flow stalls in
    // the challenge window until the deadline.
    let failure = messenger
        .withdraw_native(gwei(1000), &short_opts(60))
        .await
        .unwrap_err();
    match &failure.error {
        BridgeError::Timeout { last, .. } => {
            assert_eq!(*last, MessageStatus::InChallengePeriod)
        }
        other => panic!("unexpected error {:?}", other),
    }
    let mut message = *failure.message.unwrap();
    assert_eq!(message.status, MessageStatus::InChallengePeriod);

    let withdrawal = messenger.tracker().resolve_withdrawal(&message).await.unwrap();
    let proven = messenger
        .tracker()
        .proven_withdrawal(withdrawal.withdrawal_hash)
        .await
        .unwrap()
        .unwrap();
    let proven_at = proven.timestamp as u64;

    stack.l1.set_timestamp(proven_at + 599);
    assert_eq!(
        messenger.get_status(&message).await.unwrap(),
        MessageStatus::InChallengePeriod
    );

    // Exactly at the end of the window is still inside it
    stack.l1.set_timestamp(proven_at + 600);
    assert_eq!(
        messenger.get_status(&message).await.unwrap(),
        MessageStatus::InChallengePeriod
    );

    stack.l1.set_timestamp(proven_at + 601);
    assert_eq!(
        messenger.get_status(&message).await.unwrap(),
        MessageStatus::ReadyForRelay
    );

    messenger.resume(&mut message, &opts()).await.unwrap();
    assert_eq!(message.status, MessageStatus::Relayed);
    assert_eq!(stack.prove_count(), 1);
    assert_eq!(stack.finalize_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_resume_from_snapshot() {
    let stack = funded_stack(600);
    stack.l1.set_clock_step(120);
    let (handle, signal) = CancelSignal::channel();
    let (messenger, mut rx) = with_events(&stack);
    let cancellable = opts().with_cancel(signal);

    let flow = messenger.withdraw_native(gwei(1000), &cancellable);
    let watcher = async {
        while let Some(event) = rx.recv().await {
            if event.stage == MessageStatus::InChallengePeriod {
                handle.cancel();
                return Some(event.message);
            }
        }
        None
    };
    let (result, snapshot) = tokio::time::timeout(Duration::from_secs(7_200), async {
        tokio::join!(flow, watcher)
    })
    .await
    .expect("flow did not stop");

    let failure = result.unwrap_err();
    assert!(matches!(failure.error, BridgeError::Cancelled { .. }));

    // Persist and reload the snapshot the way a caller would
    let snapshot = snapshot.expect("no challenge period event");
    assert!(snapshot.prove_tx.is_some());
    let json = serde_json::to_string(&snapshot).unwrap();
    let mut restored: Message = serde_json::from_str(&json).unwrap();

    messenger.resume(&mut restored, &opts()).await.unwrap();

    assert_withdrawal_settled(&restored).unwrap();
    assert_eq!(restored.prove_tx, snapshot.prove_tx);
    assert_eq!(stack.prove_count(), 1);
    assert_eq!(stack.finalize_count(), 1);
    assert_eq!(stack.l1.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_resume_submits_nothing() {
    let stack = funded_stack(600);
    stack.l1.set_clock_step(120);
    let stalled = messenger(&stack)
        .unwrap()
        .with_proof_provider(Arc::new(NeverCovered));
    let failure = stalled
        .withdraw_native(gwei(1000), &short_opts(30))
        .await
        .unwrap_err();
    let mut message = *failure.message.unwrap();
    assert_eq!(message.status, MessageStatus::ReadyToProve);

    let messenger = messenger(&stack).unwrap();
    let (handle, signal) = CancelSignal::channel();
    handle.cancel();
    let sent_before = stack.l1.sent_count();

    let err = messenger
        .resume(&mut message, &opts().with_cancel(signal))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Cancelled { .. }), "{:?}", err);
    assert_eq!(stack.l1.sent_count(), sent_before);
    assert_eq!(stack.prove_count(), 0);
    assert_eq!(message.status, MessageStatus::ReadyToProve);
    assert!(message.prove_tx.is_none());

    messenger.resume(&mut message, &opts()).await.unwrap();
    assert_withdrawal_settled(&message).unwrap();
    assert_eq!(stack.prove_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_deposit_sends_nothing() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack).unwrap();
    let (handle, signal) = CancelSignal::channel();
    handle.cancel();

    let failure = messenger
        .deposit_native(gwei(1000), &opts().with_cancel(signal))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, BridgeError::Cancelled { .. }));
    assert!(failure.message.is_none());
    assert_eq!(stack.l1.sent_count(), 0);
    assert_eq!(stack.l2.sent_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reverted_prove_reports_reason() {
    let stack = funded_stack(600);
    let l2: Arc<dyn ChainEndpoint> = stack.l2.clone();
    let messenger = messenger(&stack)
        .unwrap()
        .with_proof_provider(Arc::new(EmptyInclusionProof(RpcProofProvider::new(
            l2,
            L2_TO_L1_MESSAGE_PASSER,
        ))));

    let failure = messenger
        .withdraw_native(gwei(1000), &opts())
        .await
        .unwrap_err();

    match &failure.error {
        BridgeError::SubmissionReverted { layer, reason, .. } => {
            assert_eq!(*layer, Layer::L1);
            assert!(reason.contains("invalid withdrawal inclusion proof"), "{}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
    let message = failure.message.unwrap();
    assert!(message.prove_tx.is_some());
    assert_eq!(message.status, MessageStatus::ReadyToProve);
    assert_eq!(stack.prove_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_prove_and_finalize() {
    let stack = funded_stack(600);
    stack.l1.set_clock_step(120);
    let stalled = messenger(&stack)
        .unwrap()
        .with_proof_provider(Arc::new(NeverCovered));
    let failure = stalled
        .withdraw_native(gwei(1000), &short_opts(30))
        .await
        .unwrap_err();
    let mut message = *failure.message.unwrap();

    let messenger = messenger(&stack).unwrap();
    messenger.prove_message(&mut message, &opts()).await.unwrap();
    assert_eq!(message.status, MessageStatus::InChallengePeriod);
    assert!(message.prove_tx.is_some());

    messenger.finalize_message(&mut message, &opts()).await.unwrap();
    assert_withdrawal_settled(&message).unwrap();
    assert_eq!(stack.prove_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_prove_rejects_deposits() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack).unwrap();
    let mut deposit = messenger.deposit_native(gwei(1), &opts()).await.unwrap();

    let err = messenger
        .prove_message(&mut deposit, &opts())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::InvalidConfiguration(_)));
}

// ============================================================================
// Tracker
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_on_relayed_message_makes_no_calls() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack).unwrap();
    let mut message = messenger.deposit_native(gwei(1000), &opts()).await.unwrap();
    let before = total_calls(&stack);

    messenger
        .tracker()
        .wait_for_status(&mut message, MessageStatus::Relayed, &opts())
        .await
        .unwrap();
    assert_eq!(
        messenger.get_status(&message).await.unwrap(),
        MessageStatus::Relayed
    );

    assert_eq!(total_calls(&stack), before);
}

#[tokio::test(start_paused = true)]
async fn test_second_wait_on_same_message_is_rejected() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack).unwrap();
    let relayed = messenger.deposit_native(gwei(1000), &opts()).await.unwrap();

    let mut message = Message {
        status: MessageStatus::Submitted,
        ..relayed
    };
    let guard = messenger.tracker().track(message.tx_hash).unwrap();

    let err = messenger
        .tracker()
        .wait_for_status(&mut message, MessageStatus::Relayed, &opts())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::AlreadyTracked(hash) if hash == message.tx_hash));

    drop(guard);
    messenger
        .tracker()
        .wait_for_status(&mut message, MessageStatus::Relayed, &opts())
        .await
        .unwrap();
    assert_eq!(message.status, MessageStatus::Relayed);
}

#[tokio::test(start_paused = true)]
async fn test_recorded_status_never_regresses() {
    let stack = funded_stack(600);
    let messenger = messenger(&stack)
        .unwrap()
        .with_proof_provider(Arc::new(NeverCovered));
    let failure = messenger
        .withdraw_native(gwei(1000), &short_opts(10))
        .await
        .unwrap_err();
    let message = *failure.message.unwrap();
    assert_eq!(
        messenger.get_status(&message).await.unwrap(),
        MessageStatus::ReadyToProve
    );

    // The chain has no proof yet; the recorded stage wins
    let ahead = Message {
        status: MessageStatus::InChallengePeriod,
        ..message
    };
    assert_eq!(
        messenger.get_status(&ahead).await.unwrap(),
        MessageStatus::InChallengePeriod
    );
}

// ============================================================================
// Construction
// ============================================================================

#[tokio::test]
async fn test_balances_for_signer() {
    let stack = funded_stack(600);
    stack.l2.set_balance(TEST_SIGNER, gwei(5));
    let messenger = messenger(&stack).unwrap();

    let balances = messenger.get_balances().await.unwrap();

    assert_eq!(balances.l1, U256::from(ONE_ETHER));
    assert_eq!(balances.l2, gwei(5));
}

#[test]
fn test_endpoints_must_match_layers() {
    let stack = funded_stack(600);
    let err = CrossDomainMessenger::new(stack.config(), stack.l2.clone(), stack.l1.clone())
        .err()
        .unwrap();
    assert!(matches!(err, BridgeError::InvalidConfiguration(_)));
}

#[test]
fn test_endpoints_must_share_signer() {
    let stack = funded_stack(600);
    let other = Arc::new(MockChain::new(
        Layer::L2,
        L2_CHAIN_ID,
        Address::repeat_byte(0x77),
    ));
    let err = CrossDomainMessenger::new(stack.config(), stack.l1.clone(), other)
        .err()
        .unwrap();
    assert!(matches!(err, BridgeError::InvalidConfiguration(_)));
}
