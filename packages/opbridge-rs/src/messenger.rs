//! Cross-domain messenger
//!
//! Orchestrates deposits (L1 -> L2) and withdrawals (L2 -> L1):
//!
//! ```text
//! deposit:    submit -> mined -> SUBMITTED -> RELAYED
//! withdrawal: submit -> mined -> SUBMITTED -> READY_TO_PROVE -> prove
//!             -> IN_CHALLENGE_PERIOD -> READY_FOR_RELAY -> finalize -> RELAYED
//! ```
//!
//! Every stage transaction hash is recorded on the `Message` before it is
//! awaited, and on-chain state is checked before every submission, so a
//! `Message` saved from any `LifecycleEvent` can be handed to `resume`
//! without sending anything twice.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{MessengerConfig, ResolvedContracts};
use crate::confirmation::wait_for_receipt;
use crate::contracts::{OptimismPortal, ERC20};
use crate::endpoint::{read_contract, ChainEndpoint, TxReceipt, TxRequest};
use crate::error::{BridgeError, FlowFailure, RpcError};
use crate::proof::{output_for_block, ProofProvider, RpcProofProvider, WithdrawalProof};
use crate::registry::BridgeAdapterRegistry;
use crate::retry::{Poller, WaitOptions};
use crate::tracker::{MessageStatusTracker, ResolvedWithdrawal};
use crate::types::{
    AssetKind, Balances, Direction, Layer, LifecycleEvent, Message, MessageStatus,
};

/// Deposit and withdrawal orchestration for one signer
pub struct CrossDomainMessenger {
    l1: Arc<dyn ChainEndpoint>,
    l2: Arc<dyn ChainEndpoint>,
    config: MessengerConfig,
    contracts: ResolvedContracts,
    registry: BridgeAdapterRegistry,
    tracker: MessageStatusTracker,
    proofs: Arc<dyn ProofProvider>,
    events: Option<mpsc::UnboundedSender<LifecycleEvent>>,
}

impl CrossDomainMessenger {
    /// Validate `config` and bind it to the two endpoints
    pub fn new(
        config: MessengerConfig,
        l1: Arc<dyn ChainEndpoint>,
        l2: Arc<dyn ChainEndpoint>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;

        if l1.layer() != Layer::L1 || l2.layer() != Layer::L2 {
            return Err(BridgeError::InvalidConfiguration(format!(
                "endpoints are ({}, {}), expected (L1, L2)",
                l1.layer(),
                l2.layer()
            )));
        }
        if l1.signer_address() != l2.signer_address() {
            return Err(BridgeError::InvalidConfiguration(format!(
                "endpoints sign as different accounts: {} on L1, {} on L2",
                l1.signer_address(),
                l2.signer_address()
            )));
        }

        let contracts = config.contracts.resolve()?;
        let registry = BridgeAdapterRegistry::new(&config.bridges)?;
        let tracker = MessageStatusTracker::new(
            Arc::clone(&l1),
            Arc::clone(&l2),
            contracts,
            config.challenge_period(),
        );
        let proofs: Arc<dyn ProofProvider> = Arc::new(RpcProofProvider::new(
            Arc::clone(&l2),
            contracts.l2_to_l1_message_passer,
        ));

        info!(
            signer = %l1.signer_address(),
            l1_chain_id = l1.chain_id(),
            l2_chain_id = l2.chain_id(),
            bridges = ?registry.names(),
            challenge_period_secs = config.challenge_period_secs,
            "Cross-domain messenger ready"
        );

        Ok(Self {
            l1,
            l2,
            config,
            contracts,
            registry,
            tracker,
            proofs,
            events: None,
        })
    }

    /// Replace the default RPC proof builder
    pub fn with_proof_provider(mut self, proofs: Arc<dyn ProofProvider>) -> Self {
        self.proofs = proofs;
        self
    }

    /// Send a `LifecycleEvent` to `events` at every stage and submission
    pub fn with_events(mut self, events: mpsc::UnboundedSender<LifecycleEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn tracker(&self) -> &MessageStatusTracker {
        &self.tracker
    }

    pub fn registry(&self) -> &BridgeAdapterRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    pub fn signer_address(&self) -> Address {
        self.l1.signer_address()
    }

    fn endpoint(&self, layer: Layer) -> &dyn ChainEndpoint {
        match layer {
            Layer::L1 => self.l1.as_ref(),
            Layer::L2 => self.l2.as_ref(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Native balances of the signer on both layers
    pub async fn get_balances(&self) -> Result<Balances, BridgeError> {
        let signer = self.signer_address();
        let l1 = self.l1.balance(signer).await?;
        let l2 = self.l2.balance(signer).await?;
        debug!(l1 = %l1, l2 = %l2, "Fetched balances");
        Ok(Balances { l1, l2 })
    }

    /// Current lifecycle stage of `message`, never lower than recorded
    pub async fn get_status(&self, message: &Message) -> Result<MessageStatus, BridgeError> {
        self.tracker.get_status(message).await
    }

    // =========================================================================
    // High-level flows
    // =========================================================================

    /// Deposit `amount` wei of ether to the signer's L2 account and wait
    /// until it is relayed
    pub async fn deposit_native(
        &self,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<Message, FlowFailure> {
        let bridge = self.registry.for_asset(&AssetKind::Native)?.name.clone();
        self.initiate(Direction::Deposit, AssetKind::Native, &bridge, amount, opts)
            .await
    }

    /// Withdraw `amount` wei of ether to the signer's L1 account, proving and
    /// finalizing along the way
    pub async fn withdraw_native(
        &self,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<Message, FlowFailure> {
        let bridge = self.registry.for_asset(&AssetKind::Native)?.name.clone();
        self.initiate(Direction::Withdrawal, AssetKind::Native, &bridge, amount, opts)
            .await
    }

    /// Deposit `amount` of `l1_token` through `bridge`, approving the
    /// bridge first if the allowance is short
    pub async fn deposit_token(
        &self,
        bridge: &str,
        l1_token: Address,
        l2_token: Address,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<Message, FlowFailure> {
        let asset = AssetKind::Token { l1_token, l2_token };
        self.initiate(Direction::Deposit, asset, bridge, amount, opts)
            .await
    }

    /// Withdraw `amount` of `l2_token` through `bridge`
    pub async fn withdraw_token(
        &self,
        bridge: &str,
        l1_token: Address,
        l2_token: Address,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<Message, FlowFailure> {
        let asset = AssetKind::Token { l1_token, l2_token };
        self.initiate(Direction::Withdrawal, asset, bridge, amount, opts)
            .await
    }

    /// Continue `message` from its recorded state until it is relayed
    ///
    /// Recorded stage transactions are awaited, never resubmitted.
    pub async fn resume(&self, message: &mut Message, opts: &WaitOptions) -> Result<(), BridgeError> {
        let _guard = self.tracker.track(message.tx_hash)?;
        info!(
            tx_hash = %message.tx_hash,
            direction = %message.direction,
            status = %message.status,
            "Resuming message"
        );
        self.drive(message, opts, Instant::now()).await
    }

    /// Wait until `message` can be proven, then prove it
    pub async fn prove_message(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
    ) -> Result<(), BridgeError> {
        require_withdrawal(message, "prove")?;
        let _guard = self.tracker.track(message.tx_hash)?;
        let started = Instant::now();
        self.ensure_mined(message, opts, started).await?;
        self.wait_stage(message, MessageStatus::ReadyToProve, opts, started)
            .await?;
        self.prove_stage(message, opts, started).await
    }

    /// Wait until the challenge window of `message` has passed, then
    /// finalize it
    pub async fn finalize_message(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
    ) -> Result<(), BridgeError> {
        require_withdrawal(message, "finalize")?;
        if message.status < MessageStatus::InChallengePeriod && message.prove_tx.is_none() {
            let proven = self.tracker.get_status(message).await?;
            if proven < MessageStatus::InChallengePeriod {
                return Err(BridgeError::StageUnreachable {
                    what: format!("finalization of {}", message.short_hash()),
                    reason: format!("withdrawal is not proven (status {})", proven),
                });
            }
        }
        let _guard = self.tracker.track(message.tx_hash)?;
        let started = Instant::now();
        self.wait_stage(message, MessageStatus::ReadyForRelay, opts, started)
            .await?;
        self.finalize_stage(message, opts, started).await
    }

    // =========================================================================
    // Flow internals
    // =========================================================================

    async fn initiate(
        &self,
        direction: Direction,
        asset: AssetKind,
        bridge: &str,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<Message, FlowFailure> {
        let started = Instant::now();
        let pair = self.registry.get(bridge)?;
        let signer = self.signer_address();
        let source = self.endpoint(direction.source());

        let request = match direction {
            Direction::Deposit => {
                pair.encode_deposit(&asset, signer, amount, self.config.min_gas_limit)?
            }
            Direction::Withdrawal => {
                pair.encode_withdraw(&asset, signer, amount, self.config.min_gas_limit)?
            }
        };

        match asset {
            AssetKind::Token { l1_token, l2_token } => {
                let token = match direction {
                    Direction::Deposit => l1_token,
                    Direction::Withdrawal => l2_token,
                };
                self.check_token_balance(source, token, amount).await?;
                if direction == Direction::Deposit {
                    self.ensure_allowance(l1_token, pair.l1_bridge, amount, opts)
                        .await?;
                }
            }
            AssetKind::Native => {}
        }

        info!(
            direction = %direction,
            bridge = %pair.name,
            amount = %amount,
            "Initiating cross-domain transfer"
        );

        let tx_hash = self.submit(source, &request, opts).await?;
        let mut message = Message {
            tx_hash,
            direction,
            asset,
            amount,
            bridge: pair.name.clone(),
            from: signer,
            to: signer,
            status: MessageStatus::Submitted,
            source_block: None,
            prove_tx: None,
            finalize_tx: None,
        };
        self.emit(&message, Some(tx_hash), started);

        let result = match self.tracker.track(tx_hash) {
            Ok(_guard) => self.drive(&mut message, opts, started).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(
                    tx_hash = %message.tx_hash,
                    direction = %message.direction,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Cross-domain transfer relayed"
                );
                Ok(message)
            }
            Err(error) => {
                warn!(
                    tx_hash = %message.tx_hash,
                    status = %message.status,
                    error = %error,
                    "Cross-domain transfer stopped"
                );
                Err(FlowFailure::with_message(error, message))
            }
        }
    }

    /// Explicit driver loop over the recorded status
    async fn drive(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
        started: Instant,
    ) -> Result<(), BridgeError> {
        self.ensure_mined(message, opts, started).await?;

        loop {
            if message.status != MessageStatus::Relayed && opts.cancel.is_cancelled() {
                return Err(BridgeError::Cancelled {
                    what: format!("{} to leave {}", message.short_hash(), message.status),
                });
            }
            match (message.direction, message.status) {
                (_, MessageStatus::Relayed) => return Ok(()),
                (Direction::Deposit, _) => {
                    self.wait_stage(message, MessageStatus::Relayed, opts, started)
                        .await?
                }
                (Direction::Withdrawal, MessageStatus::Submitted) => {
                    self.wait_stage(message, MessageStatus::ReadyToProve, opts, started)
                        .await?
                }
                (Direction::Withdrawal, MessageStatus::ReadyToProve) => {
                    self.prove_stage(message, opts, started).await?
                }
                (Direction::Withdrawal, MessageStatus::InChallengePeriod) => {
                    self.wait_stage(message, MessageStatus::ReadyForRelay, opts, started)
                        .await?
                }
                (Direction::Withdrawal, MessageStatus::ReadyForRelay) => {
                    self.finalize_stage(message, opts, started).await?
                }
            }
        }
    }

    /// Wait for the source transaction and record its block
    async fn ensure_mined(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
        started: Instant,
    ) -> Result<(), BridgeError> {
        if message.source_block.is_some() {
            return Ok(());
        }
        let source = self.endpoint(message.direction.source());
        let receipt = self.confirm(source, message.tx_hash, None, opts).await?;
        message.source_block = Some(receipt.block_number);
        info!(
            tx_hash = %message.tx_hash,
            block = receipt.block_number,
            status = %message.status,
            "Source transaction mined"
        );
        self.emit(message, None, started);
        Ok(())
    }

    async fn wait_stage(
        &self,
        message: &mut Message,
        target: MessageStatus,
        opts: &WaitOptions,
        started: Instant,
    ) -> Result<(), BridgeError> {
        self.tracker
            .wait_tracked(message, target, opts, |m| self.emit(m, None, started))
            .await
    }

    async fn prove_stage(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
        started: Instant,
    ) -> Result<(), BridgeError> {
        let withdrawal = self.tracker.resolve_withdrawal(message).await?;

        if let Some(prove_tx) = message.prove_tx {
            info!(tx_hash = %message.tx_hash, prove_tx = %prove_tx, "Awaiting recorded prove transaction");
            self.confirm(self.l1.as_ref(), prove_tx, None, opts).await?;
            return self.record_stage(message, MessageStatus::InChallengePeriod, started);
        }

        if self.tracker.is_finalized(withdrawal.withdrawal_hash).await? {
            return self.record_stage(message, MessageStatus::Relayed, started);
        }
        if self
            .tracker
            .proven_withdrawal(withdrawal.withdrawal_hash)
            .await?
            .is_some()
        {
            info!(tx_hash = %message.tx_hash, "Withdrawal already proven on L1");
            return self.record_stage(message, MessageStatus::InChallengePeriod, started);
        }

        let proof = self.wait_for_proof(message, &withdrawal, opts).await?;
        let request = TxRequest {
            to: self.contracts.optimism_portal,
            data: OptimismPortal::proveWithdrawalTransactionCall {
                _tx: withdrawal.transaction.clone(),
                _l2OutputIndex: proof.l2_output_index,
                _outputRootProof: proof.output_root_proof,
                _withdrawalProof: proof.withdrawal_proof,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
        };

        let prove_tx = self.submit(self.l1.as_ref(), &request, opts).await?;
        message.prove_tx = Some(prove_tx);
        info!(tx_hash = %message.tx_hash, prove_tx = %prove_tx, "Prove transaction submitted");
        self.emit(message, Some(prove_tx), started);

        self.confirm(self.l1.as_ref(), prove_tx, Some(&request), opts)
            .await?;
        self.record_stage(message, MessageStatus::InChallengePeriod, started)
    }

    /// Build the proof, retrying at the poll interval while the published
    /// output does not cover the withdrawal yet
    async fn wait_for_proof(
        &self,
        message: &Message,
        withdrawal: &ResolvedWithdrawal,
        opts: &WaitOptions,
    ) -> Result<WithdrawalProof, BridgeError> {
        let mut poller = Poller::new(format!("proof of {}", message.short_hash()), opts);
        poller.last_status = message.status;

        loop {
            let attempt = match output_for_block(
                self.l1.as_ref(),
                self.contracts.l2_output_oracle,
                withdrawal.l2_block,
            )
            .await
            {
                Ok(output) => self.proofs.build_proof(withdrawal, &output).await,
                Err(e) => Err(e),
            };

            let unavailable = match attempt {
                Ok(proof) => return Ok(proof),
                Err(BridgeError::ProofUnavailable { reason }) => {
                    poller.succeeded();
                    debug!(tx_hash = %message.tx_hash, reason = %reason, "Proof not available yet");
                    reason
                }
                Err(e) => {
                    poller.absorb(e)?;
                    String::new()
                }
            };

            match poller.tick().await {
                Ok(()) => {}
                Err(BridgeError::Timeout { .. }) if !unavailable.is_empty() => {
                    return Err(BridgeError::ProofUnavailable {
                        reason: unavailable,
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn finalize_stage(
        &self,
        message: &mut Message,
        opts: &WaitOptions,
        started: Instant,
    ) -> Result<(), BridgeError> {
        let withdrawal = self.tracker.resolve_withdrawal(message).await?;

        if let Some(finalize_tx) = message.finalize_tx {
            info!(tx_hash = %message.tx_hash, finalize_tx = %finalize_tx, "Awaiting recorded finalize transaction");
            self.confirm(self.l1.as_ref(), finalize_tx, None, opts)
                .await?;
        } else if self.tracker.is_finalized(withdrawal.withdrawal_hash).await? {
            info!(tx_hash = %message.tx_hash, "Withdrawal already finalized on L1");
        } else {
            let request = TxRequest {
                to: self.contracts.optimism_portal,
                data: OptimismPortal::finalizeWithdrawalTransactionCall {
                    _tx: withdrawal.transaction.clone(),
                }
                .abi_encode()
                .into(),
                value: U256::ZERO,
            };

            let finalize_tx = self.submit(self.l1.as_ref(), &request, opts).await?;
            message.finalize_tx = Some(finalize_tx);
            info!(tx_hash = %message.tx_hash, finalize_tx = %finalize_tx, "Finalize transaction submitted");
            self.emit(message, Some(finalize_tx), started);

            self.confirm(self.l1.as_ref(), finalize_tx, Some(&request), opts)
                .await?;
        }

        self.wait_stage(message, MessageStatus::Relayed, opts, started)
            .await
    }

    fn record_stage(
        &self,
        message: &mut Message,
        status: MessageStatus,
        started: Instant,
    ) -> Result<(), BridgeError> {
        if message.advance(status) {
            info!(tx_hash = %message.tx_hash, status = %message.status, "Message status recorded");
            self.emit(message, None, started);
        }
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Balance precheck, then sign and broadcast `request`. Nothing is sent
    /// once the caller has cancelled.
    async fn submit(
        &self,
        endpoint: &dyn ChainEndpoint,
        request: &TxRequest,
        opts: &WaitOptions,
    ) -> Result<B256, BridgeError> {
        let layer = endpoint.layer();
        if opts.cancel.is_cancelled() {
            return Err(BridgeError::Cancelled {
                what: format!("submission on {}", layer),
            });
        }
        let available = endpoint.balance(endpoint.signer_address()).await?;
        if available < request.value {
            return Err(BridgeError::InsufficientBalance {
                layer,
                required: request.value,
                available,
            });
        }

        let gas = endpoint
            .estimate_gas(request)
            .await
            .map_err(|e| rejected(layer, e))?;
        let gas_price = endpoint.gas_price().await?;
        let required = request.value + U256::from(gas) * U256::from(gas_price);
        if available < required {
            return Err(BridgeError::InsufficientBalance {
                layer,
                required,
                available,
            });
        }

        let tx_hash = endpoint
            .send_transaction(request)
            .await
            .map_err(|e| rejected(layer, e))?;
        debug!(layer = %layer, tx_hash = %tx_hash, gas, gas_price, "Submitted transaction");
        Ok(tx_hash)
    }

    /// Wait until `tx_hash` is mined; a failed receipt becomes
    /// `SubmissionReverted` with the reason from replaying `request`
    async fn confirm(
        &self,
        endpoint: &dyn ChainEndpoint,
        tx_hash: B256,
        request: Option<&TxRequest>,
        opts: &WaitOptions,
    ) -> Result<TxReceipt, BridgeError> {
        let receipt =
            wait_for_receipt(endpoint, tx_hash, self.config.confirmations, opts).await?;
        if receipt.status {
            return Ok(receipt);
        }

        let reason = match request {
            Some(request) => revert_reason(endpoint, request, receipt.block_number).await,
            None => "transaction reverted".to_string(),
        };
        Err(BridgeError::SubmissionReverted {
            layer: endpoint.layer(),
            tx_hash,
            reason,
        })
    }

    async fn check_token_balance(
        &self,
        endpoint: &dyn ChainEndpoint,
        token: Address,
        amount: U256,
    ) -> Result<(), BridgeError> {
        let available = read_contract(
            endpoint,
            token,
            &ERC20::balanceOfCall {
                account: endpoint.signer_address(),
            },
            None,
        )
        .await?
        ._0;
        if available < amount {
            return Err(BridgeError::InsufficientBalance {
                layer: endpoint.layer(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Approve the L1 bridge for `amount` of `token` if needed
    async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        opts: &WaitOptions,
    ) -> Result<(), BridgeError> {
        let owner = self.signer_address();
        let allowance = read_contract(
            self.l1.as_ref(),
            token,
            &ERC20::allowanceCall { owner, spender },
            None,
        )
        .await?
        ._0;
        if allowance >= amount {
            debug!(token = %token, allowance = %allowance, "Allowance sufficient");
            return Ok(());
        }

        let request = TxRequest {
            to: token,
            data: ERC20::approveCall { spender, amount }.abi_encode().into(),
            value: U256::ZERO,
        };
        let tx_hash = self.submit(self.l1.as_ref(), &request, opts).await?;
        info!(token = %token, spender = %spender, tx_hash = %tx_hash, "Approval submitted");
        self.confirm(self.l1.as_ref(), tx_hash, Some(&request), opts)
            .await?;
        Ok(())
    }

    fn emit(&self, message: &Message, stage_tx: Option<B256>, started: Instant) {
        let Some(events) = &self.events else {
            return;
        };
        let event = LifecycleEvent {
            tx_hash: message.tx_hash,
            direction: message.direction,
            stage: message.status,
            stage_tx,
            elapsed: started.elapsed(),
            message: message.clone(),
        };
        if events.send(event).is_err() {
            debug!(tx_hash = %message.tx_hash, "Lifecycle event receiver dropped");
        }
    }
}

fn require_withdrawal(message: &Message, action: &str) -> Result<(), BridgeError> {
    if message.direction != Direction::Withdrawal {
        return Err(BridgeError::InvalidConfiguration(format!(
            "cannot {} {}: only withdrawals have that stage",
            action,
            message.short_hash()
        )));
    }
    Ok(())
}

/// Transient send/estimate failures stay RPC errors; anything else means
/// the node refused the transaction
fn rejected(layer: Layer, err: RpcError) -> BridgeError {
    if err.is_transient() {
        BridgeError::Rpc(err)
    } else {
        BridgeError::TransactionRejected {
            layer,
            reason: err.reason().to_string(),
        }
    }
}

/// Replay `request` against the parent of the block it was mined in
async fn revert_reason(endpoint: &dyn ChainEndpoint, request: &TxRequest, block: u64) -> String {
    match endpoint.call(request, Some(block.saturating_sub(1))).await {
        Err(e) => e.reason().to_string(),
        Ok(_) => "transaction reverted without a reason".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_transient_errors() {
        let transient = rejected(Layer::L1, RpcError::Transport("connection reset".into()));
        assert!(matches!(transient, BridgeError::Rpc(_)));

        let refused = rejected(
            Layer::L2,
            RpcError::Response {
                code: -32000,
                message: "insufficient funds for gas * price + value".into(),
            },
        );
        match refused {
            BridgeError::TransactionRejected { layer, reason } => {
                assert_eq!(layer, Layer::L2);
                assert!(reason.starts_with("insufficient funds"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
