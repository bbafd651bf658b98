//! Common types for cross-domain messages

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One of the two ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    L1,
    L2,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L1 => "L1",
            Layer::L2 => "L2",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a cross-domain message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// L1 -> L2
    Deposit,
    /// L2 -> L1
    Withdrawal,
}

impl Direction {
    /// Layer the initiating transaction is sent to
    pub fn source(&self) -> Layer {
        match self {
            Direction::Deposit => Layer::L1,
            Direction::Withdrawal => Layer::L2,
        }
    }

    /// Layer the message settles on
    pub fn destination(&self) -> Layer {
        match self {
            Direction::Deposit => Layer::L2,
            Direction::Withdrawal => Layer::L1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Deposit => f.write_str("deposit"),
            Direction::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

/// What is being moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AssetKind {
    /// Ether on both layers
    Native,
    /// An ERC-20 with a paired token on the other layer
    Token { l1_token: Address, l2_token: Address },
}

impl AssetKind {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetKind::Native)
    }
}

/// Lifecycle stage of a cross-domain message
///
/// The derive order is the lifecycle order; comparisons are meaningful.
/// Deposits only use `Submitted` and `Relayed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    /// Source transaction mined
    Submitted,
    /// Output root covering the withdrawal is published on L1
    ReadyToProve,
    /// Proof accepted; the challenge window is running
    InChallengePeriod,
    /// Challenge window elapsed; finalization allowed
    ReadyForRelay,
    /// Executed on the destination chain
    Relayed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Submitted => "SUBMITTED",
            MessageStatus::ReadyToProve => "READY_TO_PROVE",
            MessageStatus::InChallengePeriod => "IN_CHALLENGE_PERIOD",
            MessageStatus::ReadyForRelay => "READY_FOR_RELAY",
            MessageStatus::Relayed => "RELAYED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Relayed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cross-domain value transfer and its lifecycle record
///
/// Serializable so callers can persist it and resume an interrupted flow
/// without resubmitting transactions that were already mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Hash of the initiating transaction on the source chain
    pub tx_hash: B256,
    pub direction: Direction,
    pub asset: AssetKind,
    pub amount: U256,
    /// Registry name of the bridge pair used
    pub bridge: String,
    pub from: Address,
    pub to: Address,
    pub status: MessageStatus,
    /// Block the initiating transaction was mined in
    #[serde(default)]
    pub source_block: Option<u64>,
    #[serde(default)]
    pub prove_tx: Option<B256>,
    #[serde(default)]
    pub finalize_tx: Option<B256>,
}

impl Message {
    /// Raise the status, never lower it. Returns true if it changed.
    pub fn advance(&mut self, status: MessageStatus) -> bool {
        if status > self.status {
            self.status = status;
            true
        } else {
            false
        }
    }

    pub fn short_hash(&self) -> String {
        let hex = format!("{:x}", self.tx_hash);
        format!("0x{}…{}", &hex[..8], &hex[hex.len() - 6..])
    }
}

/// Native balances of the signer on both layers, in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub l1: U256,
    pub l2: U256,
}

/// Structured notification emitted as a flow progresses
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Source transaction hash of the message
    pub tx_hash: B256,
    pub direction: Direction,
    /// Stage the message is in after this event
    pub stage: MessageStatus,
    /// Transaction submitted for this stage, if any
    pub stage_tx: Option<B256>,
    /// Time since the flow started
    pub elapsed: Duration,
    /// Snapshot of the message, suitable for persisting
    pub message: Message,
}
