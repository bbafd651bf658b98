//! Error types for bridge operations
//!
//! `RpcError` is what a `ChainEndpoint` returns; `BridgeError` is what the
//! tracker and messenger surface to callers.

use alloy::primitives::{B256, U256};
use std::time::Duration;
use thiserror::Error;

use crate::retry::is_transient_message;
use crate::types::{Layer, Message, MessageStatus};

/// Failure of a single RPC round trip
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// Connection-level failure (timeout, refused, reset)
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Response { code: i64, message: String },

    /// The node answered but the payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl RpcError {
    /// Whether retrying the same request later can succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::Response { message, .. } => is_transient_message(message),
            RpcError::Decode(_) => false,
        }
    }

    /// Message text without the variant prefix (used as a revert reason)
    pub fn reason(&self) -> &str {
        match self {
            RpcError::Transport(m) | RpcError::Decode(m) => m,
            RpcError::Response { message, .. } => message,
        }
    }
}

/// Errors surfaced by the tracker and the messenger
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bad addresses or bridge setup, detected before any network call
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Balance precheck failed; nothing was submitted
    #[error("insufficient balance on {layer}: need {required} wei, have {available} wei")]
    InsufficientBalance {
        layer: Layer,
        required: U256,
        available: U256,
    },

    /// The node refused the transaction
    #[error("transaction rejected by {layer}: {reason}")]
    TransactionRejected { layer: Layer, reason: String },

    /// The transaction was mined with a failed status
    #[error("transaction {tx_hash} reverted on {layer}: {reason}")]
    SubmissionReverted {
        layer: Layer,
        tx_hash: B256,
        reason: String,
    },

    /// The published output root does not cover the withdrawal yet
    #[error("withdrawal proof unavailable: {reason}")]
    ProofUnavailable { reason: String },

    /// Querying status failed with a non-transient RPC or decoding error
    #[error("cannot determine {what}: {reason}")]
    StageUnreachable { what: String, reason: String },

    /// Deadline elapsed without the awaited transition
    #[error("timed out after {waited:?} waiting for {what} (last status {last})")]
    Timeout {
        what: String,
        waited: Duration,
        last: MessageStatus,
    },

    /// Another flow is already tracking this message
    #[error("message {0} is already being tracked")]
    AlreadyTracked(B256),

    /// The caller's cancel signal fired
    #[error("cancelled while waiting for {what}")]
    Cancelled { what: String },

    /// The L2 messenger executed the deposit and it failed
    #[error("deposit message {message_hash} failed to relay on L2")]
    RelayFailed { message_hash: B256 },

    /// RPC failure outside of a status wait (balance checks, submissions prep)
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl BridgeError {
    /// Whether the same flow can be resumed from the recorded message
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout { .. }
                | BridgeError::Cancelled { .. }
                | BridgeError::ProofUnavailable { .. }
                | BridgeError::StageUnreachable { .. }
                | BridgeError::Rpc(_)
        )
    }
}

/// A failed high-level operation, carrying the message as far as it got
///
/// `message` is `None` only when the failure happened before the initiating
/// transaction was accepted by the node.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct FlowFailure {
    #[source]
    pub error: BridgeError,
    pub message: Option<Box<Message>>,
}

impl FlowFailure {
    pub fn with_message(error: BridgeError, message: Message) -> Self {
        Self {
            error,
            message: Some(Box::new(message)),
        }
    }
}

impl From<BridgeError> for FlowFailure {
    fn from(error: BridgeError) -> Self {
        Self {
            error,
            message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        assert!(RpcError::Transport("connection reset".into()).is_transient());
        assert!(!RpcError::Decode("bad abi".into()).is_transient());
    }

    #[test]
    fn test_response_errors_are_classified() {
        let limited = RpcError::Response {
            code: -32005,
            message: "rate limit exceeded".into(),
        };
        let reverted = RpcError::Response {
            code: 3,
            message: "execution reverted: OptimismPortal: withdrawal hash has already been proven"
                .into(),
        };
        assert!(limited.is_transient());
        assert!(!reverted.is_transient());
    }

    #[test]
    fn test_resumable_kinds() {
        assert!(BridgeError::Cancelled { what: "x".into() }.is_resumable());
        assert!(!BridgeError::InvalidConfiguration("x".into()).is_resumable());
        assert!(!BridgeError::SubmissionReverted {
            layer: Layer::L1,
            tx_hash: B256::ZERO,
            reason: "x".into(),
        }
        .is_resumable());
    }
}
