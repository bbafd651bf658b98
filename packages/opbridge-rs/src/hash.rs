//! Identifier derivation for cross-domain messages
//!
//! These match the hashing done by the OP-stack contracts:
//! - `Hashing.hashCrossDomainMessage` (deposits, keyed in `successfulMessages`)
//! - `Hashing.hashWithdrawal` (withdrawals, keyed in the portal)
//! - `Hashing.hashOutputRootProof` (output roots)

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};

use crate::contracts::{
    L2CrossDomainMessenger, LegacyCrossDomainMessenger, OutputRootProof, WithdrawalTransaction,
};

/// Fields of a message sent through a `CrossDomainMessenger`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossDomainMessage {
    pub nonce: U256,
    pub sender: Address,
    pub target: Address,
    pub value: U256,
    pub gas_limit: U256,
    pub data: Bytes,
}

/// Message version, stored in the top two bytes of the nonce
pub fn decode_version(nonce: U256) -> u16 {
    let version: U256 = nonce >> 240;
    version.to::<u16>()
}

/// Put `version` into the top two bytes of `nonce`
pub fn encode_versioned_nonce(nonce: U256, version: u16) -> U256 {
    (U256::from(version) << 240) | nonce
}

/// Hash under which the L2 messenger records a relayed message
///
/// Returns `None` for message versions the contracts do not define.
pub fn cross_domain_message_hash(message: &CrossDomainMessage) -> Option<B256> {
    let encoded = match decode_version(message.nonce) {
        0 => LegacyCrossDomainMessenger::relayMessageCall {
            _target: message.target,
            _sender: message.sender,
            _message: message.data.clone(),
            _messageNonce: message.nonce,
        }
        .abi_encode(),
        1 => L2CrossDomainMessenger::relayMessageCall {
            _nonce: message.nonce,
            _sender: message.sender,
            _target: message.target,
            _value: message.value,
            _minGasLimit: message.gas_limit,
            _message: message.data.clone(),
        }
        .abi_encode(),
        _ => return None,
    };
    Some(keccak256(encoded))
}

/// `keccak256(abi.encode(nonce, sender, target, value, gasLimit, data))`
pub fn withdrawal_hash(tx: &WithdrawalTransaction) -> B256 {
    let encoded = (
        tx.nonce,
        tx.sender,
        tx.target,
        tx.value,
        tx.gasLimit,
        tx.data.clone(),
    )
        .abi_encode_params();
    keccak256(encoded)
}

/// Storage slot of `sentMessages[withdrawalHash]` in the `L2ToL1MessagePasser`
pub fn message_passer_storage_slot(withdrawal_hash: B256) -> B256 {
    keccak256((withdrawal_hash, U256::ZERO).abi_encode_params())
}

/// Output root committed to by an `OutputRootProof`
pub fn output_root(proof: &OutputRootProof) -> B256 {
    keccak256(
        (
            proof.version,
            proof.stateRoot,
            proof.messagePasserStorageRoot,
            proof.latestBlockhash,
        )
            .abi_encode_params(),
    )
}
