//! Live network tests
//!
//! These tests talk to real L1/L2 nodes and are ignored by default.
//!
//! Run with: cargo test --test live_network -- --ignored --nocapture
//!
//! Required environment variables:
//! - L1_RPC_URL
//! - L2_RPC_URL
//! - MNEMONIC (funded on both layers for the transfer tests)

use opbridge_rs::{
    connect_endpoint, CrossDomainMessenger, Layer, MessageStatus, MessengerConfig, SignerIdentity,
};
use std::env;

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{} must be set for live tests", name))
}

async fn live_messenger() -> CrossDomainMessenger {
    let identity = SignerIdentity::from_mnemonic(&required("MNEMONIC")).unwrap();
    let l1 = connect_endpoint(Layer::L1, &required("L1_RPC_URL"), &identity)
        .await
        .unwrap();
    let l2 = connect_endpoint(Layer::L2, &required("L2_RPC_URL"), &identity)
        .await
        .unwrap();
    CrossDomainMessenger::new(MessengerConfig::goerli_defaults(), l1, l2).unwrap()
}

#[tokio::test]
#[ignore = "requires L1/L2 RPC endpoints"]
async fn test_live_balances() {
    let messenger = live_messenger().await;

    let balances = messenger.get_balances().await.unwrap();

    println!("L1: {} wei, L2: {} wei", balances.l1, balances.l2);
}

#[tokio::test]
#[ignore = "requires L1/L2 RPC endpoints and a funded signer"]
async fn test_live_deposit_relays() {
    let messenger = live_messenger().await;
    let opts = messenger.config().wait_options();
    let before = messenger.get_balances().await.unwrap();

    let amount = alloy::primitives::U256::from(1_000_000_000_000u64);
    let message = messenger.deposit_native(amount, &opts).await.unwrap();

    assert_eq!(message.status, MessageStatus::Relayed);
    let after = messenger.get_balances().await.unwrap();
    assert!(after.l2 >= before.l2 + amount);
}
