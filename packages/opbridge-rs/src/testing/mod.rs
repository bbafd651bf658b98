//! Testing Utilities Module
//!
//! In-memory L1/L2 chains for exercising full deposit and withdrawal flows
//! without a node.
//!
//! ## Submodules
//!
//! - `mock_chain` - `ChainEndpoint` over an in-memory ledger with failure injection
//! - `op_stack` - Bridge, messenger, portal and oracle contracts on two mock chains
//! - `assertions` - Common flow assertions

pub mod assertions;
pub mod mock_chain;
pub mod op_stack;

pub use assertions::*;
pub use mock_chain::{mock_header, mock_storage_root, revert, MockChain, Responder, GENESIS_TIMESTAMP};
pub use op_stack::*;

use alloy::primitives::{address, Address, U256};
use std::sync::Arc;

use crate::error::BridgeError;
use crate::messenger::CrossDomainMessenger;

/// First account of the `test ... junk` development mnemonic
pub const TEST_SIGNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// One ether, in wei
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

/// Deployment with `TEST_SIGNER` funded with one ether on both layers
pub fn funded_stack(challenge_period: u64) -> OpStack {
    let stack = OpStack::new(TEST_SIGNER, challenge_period);
    stack.l1.set_balance(TEST_SIGNER, U256::from(ONE_ETHER));
    stack.l2.set_balance(TEST_SIGNER, U256::from(ONE_ETHER));
    stack
}

/// Messenger bound to both chains of `stack`
pub fn messenger(stack: &OpStack) -> Result<CrossDomainMessenger, BridgeError> {
    CrossDomainMessenger::new(stack.config(), Arc::clone(&stack.l1) as _, Arc::clone(&stack.l2) as _)
}
