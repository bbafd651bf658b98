//! Withdrawal proofs
//!
//! A withdrawal is proven against an L2 output root published by the
//! `L2OutputOracle`. The proof is the output root preimage plus a storage
//! proof of `sentMessages[withdrawalHash]` in the `L2ToL1MessagePasser`.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::contracts::{L2OutputOracle, OutputRootProof};
use crate::endpoint::{read_contract, ChainEndpoint};
use crate::error::{BridgeError, RpcError};
use crate::hash::{message_passer_storage_slot, output_root};
use crate::tracker::ResolvedWithdrawal;

/// Output root published on L1, with its oracle index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputProposal {
    pub index: U256,
    pub output_root: B256,
    pub timestamp: u128,
    pub l2_block_number: u64,
}

/// Arguments of `OptimismPortal.proveWithdrawalTransaction` besides the
/// withdrawal itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalProof {
    pub l2_output_index: U256,
    pub output_root_proof: OutputRootProof,
    pub withdrawal_proof: Vec<Bytes>,
}

/// Builds proofs for withdrawals
#[async_trait]
pub trait ProofProvider: Send + Sync {
    /// Proof of `withdrawal` against `output`
    ///
    /// Fails with `ProofUnavailable` when `output` does not cover the
    /// withdrawal's L2 block.
    async fn build_proof(
        &self,
        withdrawal: &ResolvedWithdrawal,
        output: &OutputProposal,
    ) -> Result<WithdrawalProof, BridgeError>;
}

/// First output proposal covering `l2_block`
pub async fn output_for_block(
    l1: &dyn ChainEndpoint,
    oracle: Address,
    l2_block: u64,
) -> Result<OutputProposal, BridgeError> {
    let latest = read_contract(l1, oracle, &L2OutputOracle::latestBlockNumberCall {}, None)
        .await?
        ._0;
    if latest < U256::from(l2_block) {
        return Err(BridgeError::ProofUnavailable {
            reason: format!(
                "latest output covers L2 block {}, withdrawal is in block {}",
                latest, l2_block
            ),
        });
    }

    let index = read_contract(
        l1,
        oracle,
        &L2OutputOracle::getL2OutputIndexAfterCall {
            _l2BlockNumber: U256::from(l2_block),
        },
        None,
    )
    .await?
    ._0;

    let output = read_contract(
        l1,
        oracle,
        &L2OutputOracle::getL2OutputCall { _l2OutputIndex: index },
        None,
    )
    .await?
    ._0;

    let l2_block_number = u64::try_from(output.l2BlockNumber).map_err(|_| {
        RpcError::Decode(format!("output L2 block {} exceeds u64", output.l2BlockNumber))
    })?;

    debug!(
        index = %index,
        output_root = %output.outputRoot,
        l2_block = l2_block_number,
        "Found output proposal"
    );

    Ok(OutputProposal {
        index,
        output_root: output.outputRoot,
        timestamp: output.timestamp,
        l2_block_number,
    })
}

/// Proofs from L2 `eth_getProof` and block headers
pub struct RpcProofProvider {
    l2: Arc<dyn ChainEndpoint>,
    message_passer: Address,
}

impl RpcProofProvider {
    pub fn new(l2: Arc<dyn ChainEndpoint>, message_passer: Address) -> Self {
        Self { l2, message_passer }
    }
}

#[async_trait]
impl ProofProvider for RpcProofProvider {
    async fn build_proof(
        &self,
        withdrawal: &ResolvedWithdrawal,
        output: &OutputProposal,
    ) -> Result<WithdrawalProof, BridgeError> {
        if output.l2_block_number < withdrawal.l2_block {
            return Err(BridgeError::ProofUnavailable {
                reason: format!(
                    "output {} ends at L2 block {}, before withdrawal block {}",
                    output.index, output.l2_block_number, withdrawal.l2_block
                ),
            });
        }

        let slot = message_passer_storage_slot(withdrawal.withdrawal_hash);
        let storage = self
            .l2
            .storage_proof(self.message_passer, slot, output.l2_block_number)
            .await?;

        let header = self
            .l2
            .block_header(Some(output.l2_block_number))
            .await?
            .ok_or_else(|| BridgeError::ProofUnavailable {
                reason: format!("L2 block {} not available", output.l2_block_number),
            })?;

        let output_root_proof = OutputRootProof {
            version: B256::ZERO,
            stateRoot: header.state_root,
            messagePasserStorageRoot: storage.storage_hash,
            latestBlockhash: header.hash,
        };

        let computed = output_root(&output_root_proof);
        if computed != output.output_root {
            return Err(BridgeError::StageUnreachable {
                what: format!("proof for withdrawal {}", withdrawal.withdrawal_hash),
                reason: format!(
                    "L2 block {} hashes to output root {}, oracle has {}",
                    output.l2_block_number, computed, output.output_root
                ),
            });
        }

        Ok(WithdrawalProof {
            l2_output_index: output.index,
            output_root_proof,
            withdrawal_proof: storage.proof,
        })
    }
}
