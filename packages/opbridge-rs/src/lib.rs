//! OPBridge-RS: Cross-Domain Messenger for OP-Stack Bridges
//!
//! This crate moves native ether and ERC-20 tokens between an L1 and an
//! optimistic rollup L2, and follows every cross-domain message until it is
//! settled on the destination chain:
//!
//! - **Endpoint** - `ChainEndpoint` RPC surface, alloy-backed `EvmEndpoint`
//! - **Signer** - One mnemonic-derived identity shared by both layers
//! - **Registry** - Named bridge pairs with deposit/withdraw encoding
//! - **Tracker** - Message lifecycle state machine (`MessageStatusTracker`)
//! - **Messenger** - Deposit/withdraw orchestration (`CrossDomainMessenger`)
//! - **Proof** - Withdrawal proof collaborator (`ProofProvider`)
//! - **Testing Module** - In-memory L1/L2 chains for flow tests
//!
//! ## Feature Flags
//!
//! - `testing` - Enable the mock chains and OP-stack harness

pub mod config;
pub mod confirmation;
pub mod contracts;
pub mod endpoint;
pub mod error;
pub mod hash;
pub mod messenger;
pub mod proof;
pub mod redact;
pub mod registry;
pub mod retry;
pub mod signer;
pub mod tracker;
pub mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use config::{ContractAddresses, MessengerConfig};
pub use endpoint::{connect_endpoint, ChainEndpoint, EvmEndpoint, TxReceipt, TxRequest};
pub use error::{BridgeError, FlowFailure, RpcError};
pub use messenger::CrossDomainMessenger;
pub use proof::{OutputProposal, ProofProvider, RpcProofProvider, WithdrawalProof};
pub use registry::{BridgeAdapterRegistry, BridgeConfig, BridgeKind, BridgePair};
pub use retry::{CancelHandle, CancelSignal, PollPolicy, WaitOptions};
pub use signer::SignerIdentity;
pub use tracker::MessageStatusTracker;
pub use types::{
    AssetKind, Balances, Direction, Layer, LifecycleEvent, Message, MessageStatus,
};
