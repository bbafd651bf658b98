//! Message status tracker
//!
//! Derives the lifecycle stage of a cross-domain message from fresh chain
//! state on every poll:
//!
//! - Deposits: `successfulMessages(hash)` on the L2 messenger decides
//!   between `Submitted` and `Relayed`.
//! - Withdrawals: `finalizedWithdrawals`, `provenWithdrawals` and the output
//!   oracle's `latestBlockNumber` on L1, checked in that order.
//!
//! The reported status is `max(observed, recorded)`; a lower observation is
//! logged and ignored.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ResolvedContracts;
use crate::contracts::{
    L1CrossDomainMessenger, L2CrossDomainMessenger, L2OutputOracle, L2ToL1MessagePasser,
    OptimismPortal, WithdrawalTransaction,
};
use crate::endpoint::{read_contract, ChainEndpoint, TxReceipt};
use crate::error::{BridgeError, RpcError};
use crate::hash::{cross_domain_message_hash, withdrawal_hash, CrossDomainMessage};
use crate::retry::{Poller, WaitOptions};
use crate::types::{Direction, Message, MessageStatus};

/// Identifiers of a deposit, derived from its L1 receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeposit {
    /// Key of `successfulMessages` on the L2 messenger
    pub message_hash: B256,
    pub message: CrossDomainMessage,
}

/// Identifiers of a withdrawal, derived from its L2 receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWithdrawal {
    /// Key of `provenWithdrawals` / `finalizedWithdrawals` on the portal
    pub withdrawal_hash: B256,
    pub transaction: WithdrawalTransaction,
    /// L2 block the withdrawal was initiated in
    pub l2_block: u64,
}

/// Proven state of a withdrawal as stored by the portal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenWithdrawal {
    pub output_root: B256,
    pub timestamp: u128,
    pub l2_output_index: u128,
}

enum Resolved {
    Deposit(ResolvedDeposit),
    Withdrawal(ResolvedWithdrawal),
}

/// Releases the per-message tracking slot on drop
#[derive(Debug)]
pub struct TrackGuard {
    hash: B256,
    tracked: Arc<Mutex<HashSet<B256>>>,
}

impl Drop for TrackGuard {
    fn drop(&mut self) {
        let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        tracked.remove(&self.hash);
    }
}

/// Lifecycle state machine over the two chain endpoints
#[derive(Clone)]
pub struct MessageStatusTracker {
    l1: Arc<dyn ChainEndpoint>,
    l2: Arc<dyn ChainEndpoint>,
    contracts: ResolvedContracts,
    challenge_period: Duration,
    tracked: Arc<Mutex<HashSet<B256>>>,
}

impl MessageStatusTracker {
    pub fn new(
        l1: Arc<dyn ChainEndpoint>,
        l2: Arc<dyn ChainEndpoint>,
        contracts: ResolvedContracts,
        challenge_period: Duration,
    ) -> Self {
        Self {
            l1,
            l2,
            contracts,
            challenge_period,
            tracked: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn challenge_period(&self) -> Duration {
        self.challenge_period
    }

    /// Claim the tracking slot for `tx_hash`; fails if another flow holds it
    pub fn track(&self, tx_hash: B256) -> Result<TrackGuard, BridgeError> {
        let mut tracked = self.tracked.lock().unwrap_or_else(|e| e.into_inner());
        if !tracked.insert(tx_hash) {
            return Err(BridgeError::AlreadyTracked(tx_hash));
        }
        Ok(TrackGuard {
            hash: tx_hash,
            tracked: Arc::clone(&self.tracked),
        })
    }

    pub fn is_tracked(&self, tx_hash: B256) -> bool {
        self.tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&tx_hash)
    }

    // =========================================================================
    // Identifier derivation
    // =========================================================================

    async fn source_receipt(
        &self,
        endpoint: &dyn ChainEndpoint,
        tx_hash: B256,
    ) -> Result<TxReceipt, BridgeError> {
        let receipt = endpoint.receipt(tx_hash).await?.ok_or_else(|| {
            BridgeError::StageUnreachable {
                what: format!("message {}", tx_hash),
                reason: format!("source transaction has no receipt on {}", endpoint.layer()),
            }
        })?;
        if !receipt.status {
            return Err(BridgeError::SubmissionReverted {
                layer: endpoint.layer(),
                tx_hash,
                reason: "source transaction reverted".to_string(),
            });
        }
        Ok(receipt)
    }

    /// Derive the L2 relay hash of a deposit from its L1 messenger logs
    pub async fn resolve_deposit(&self, message: &Message) -> Result<ResolvedDeposit, BridgeError> {
        let receipt = self.source_receipt(self.l1.as_ref(), message.tx_hash).await?;
        resolve_deposit_logs(&receipt, self.contracts.l1_cross_domain_messenger)
    }

    /// Rebuild the withdrawal transaction from its `MessagePassed` log
    pub async fn resolve_withdrawal(
        &self,
        message: &Message,
    ) -> Result<ResolvedWithdrawal, BridgeError> {
        let receipt = self.source_receipt(self.l2.as_ref(), message.tx_hash).await?;
        resolve_withdrawal_logs(&receipt, self.contracts.l2_to_l1_message_passer)
    }

    async fn resolve(&self, message: &Message) -> Result<Resolved, BridgeError> {
        match message.direction {
            Direction::Deposit => self.resolve_deposit(message).await.map(Resolved::Deposit),
            Direction::Withdrawal => self
                .resolve_withdrawal(message)
                .await
                .map(Resolved::Withdrawal),
        }
    }

    // =========================================================================
    // Chain reads
    // =========================================================================

    /// Portal record of a proven withdrawal, `None` if not proven
    pub async fn proven_withdrawal(
        &self,
        withdrawal_hash: B256,
    ) -> Result<Option<ProvenWithdrawal>, BridgeError> {
        let proven = read_contract(
            self.l1.as_ref(),
            self.contracts.optimism_portal,
            &OptimismPortal::provenWithdrawalsCall { withdrawalHash: withdrawal_hash },
            None,
        )
        .await?;
        if proven.timestamp == 0 {
            return Ok(None);
        }
        Ok(Some(ProvenWithdrawal {
            output_root: proven.outputRoot,
            timestamp: proven.timestamp,
            l2_output_index: proven.l2OutputIndex,
        }))
    }

    pub async fn is_finalized(&self, withdrawal_hash: B256) -> Result<bool, BridgeError> {
        let finalized = read_contract(
            self.l1.as_ref(),
            self.contracts.optimism_portal,
            &OptimismPortal::finalizedWithdrawalsCall { withdrawalHash: withdrawal_hash },
            None,
        )
        .await?;
        Ok(finalized._0)
    }

    /// Highest L2 block covered by a published output root
    pub async fn latest_output_block(&self) -> Result<U256, BridgeError> {
        let latest = read_contract(
            self.l1.as_ref(),
            self.contracts.l2_output_oracle,
            &L2OutputOracle::latestBlockNumberCall {},
            None,
        )
        .await?;
        Ok(latest._0)
    }

    async fn observe_deposit(&self, deposit: &ResolvedDeposit) -> Result<MessageStatus, BridgeError> {
        let messenger = self.contracts.l2_cross_domain_messenger;
        let relayed = read_contract(
            self.l2.as_ref(),
            messenger,
            &L2CrossDomainMessenger::successfulMessagesCall { msgHash: deposit.message_hash },
            None,
        )
        .await?;
        if relayed._0 {
            return Ok(MessageStatus::Relayed);
        }

        let failed = read_contract(
            self.l2.as_ref(),
            messenger,
            &L2CrossDomainMessenger::failedMessagesCall { msgHash: deposit.message_hash },
            None,
        )
        .await?;
        if failed._0 {
            return Err(BridgeError::RelayFailed {
                message_hash: deposit.message_hash,
            });
        }

        Ok(MessageStatus::Submitted)
    }

    async fn observe_withdrawal(
        &self,
        withdrawal: &ResolvedWithdrawal,
    ) -> Result<MessageStatus, BridgeError> {
        if self.is_finalized(withdrawal.withdrawal_hash).await? {
            return Ok(MessageStatus::Relayed);
        }

        if let Some(proven) = self.proven_withdrawal(withdrawal.withdrawal_hash).await? {
            let now = self.l1.latest_block_timestamp().await?;
            // The portal only finalizes once the L1 clock is strictly past the window
            let window_end = proven.timestamp + self.challenge_period.as_secs() as u128;
            return Ok(if u128::from(now) > window_end {
                MessageStatus::ReadyForRelay
            } else {
                MessageStatus::InChallengePeriod
            });
        }

        if self.latest_output_block().await? >= U256::from(withdrawal.l2_block) {
            return Ok(MessageStatus::ReadyToProve);
        }

        Ok(MessageStatus::Submitted)
    }

    async fn observe(&self, resolved: &Resolved) -> Result<MessageStatus, BridgeError> {
        match resolved {
            Resolved::Deposit(deposit) => self.observe_deposit(deposit).await,
            Resolved::Withdrawal(withdrawal) => self.observe_withdrawal(withdrawal).await,
        }
    }

    /// Fold an observation into the recorded status
    fn reconcile(message: &Message, observed: MessageStatus) -> MessageStatus {
        if observed < message.status {
            warn!(
                tx_hash = %message.tx_hash,
                observed = %observed,
                recorded = %message.status,
                "Observed status is behind the recorded one, keeping recorded"
            );
            return message.status;
        }
        observed
    }

    /// One fresh observation, never lower than `message.status`
    pub async fn get_status(&self, message: &Message) -> Result<MessageStatus, BridgeError> {
        if message.status.is_terminal() {
            return Ok(message.status);
        }
        let resolved = self.resolve(message).await?;
        let observed = self.observe(&resolved).await?;
        Ok(Self::reconcile(message, observed))
    }

    // =========================================================================
    // Waiting
    // =========================================================================

    /// Poll until `message` reaches `target`, updating `message.status`
    ///
    /// Returns immediately without any RPC when the recorded status is
    /// already at or past `target`. A concurrent wait on the same message
    /// fails with `AlreadyTracked`.
    pub async fn wait_for_status(
        &self,
        message: &mut Message,
        target: MessageStatus,
        opts: &WaitOptions,
    ) -> Result<(), BridgeError> {
        if message.status >= target {
            return Ok(());
        }
        let _guard = self.track(message.tx_hash)?;
        self.wait_tracked(message, target, opts, |_| {}).await
    }

    /// `wait_for_status` for a caller that already holds the tracking slot
    ///
    /// `on_advance` runs after every recorded status change.
    pub(crate) async fn wait_tracked<F>(
        &self,
        message: &mut Message,
        target: MessageStatus,
        opts: &WaitOptions,
        mut on_advance: F,
    ) -> Result<(), BridgeError>
    where
        F: FnMut(&Message) + Send,
    {
        if message.status >= target {
            return Ok(());
        }

        let mut poller = Poller::new(format!("{} of {}", target, message.short_hash()), opts);
        poller.last_status = message.status;
        let mut resolved = None;

        loop {
            let probe = match &resolved {
                Some(r) => self.observe(r).await,
                None => match self.resolve(message).await {
                    Ok(r) => {
                        let status = self.observe(&r).await;
                        resolved = Some(r);
                        status
                    }
                    Err(e) => Err(e),
                },
            };

            match probe {
                Ok(observed) => {
                    poller.succeeded();
                    let status = Self::reconcile(message, observed);
                    if message.advance(status) {
                        info!(
                            tx_hash = %message.tx_hash,
                            direction = %message.direction,
                            status = %message.status,
                            "Message status advanced"
                        );
                        on_advance(message);
                    } else {
                        debug!(
                            tx_hash = %message.tx_hash,
                            status = %message.status,
                            target = %target,
                            "Status unchanged"
                        );
                    }
                    if message.status >= target {
                        return Ok(());
                    }
                    poller.last_status = message.status;
                }
                Err(e) => poller.absorb(e)?,
            }

            poller.tick().await?;
        }
    }
}

impl std::fmt::Debug for MessageStatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStatusTracker")
            .field("l1_chain_id", &self.l1.chain_id())
            .field("l2_chain_id", &self.l2.chain_id())
            .field("contracts", &self.contracts)
            .field("challenge_period", &self.challenge_period)
            .finish()
    }
}

fn undecodable(what: &str, err: impl std::fmt::Display) -> BridgeError {
    BridgeError::Rpc(RpcError::Decode(format!("{}: {}", what, err)))
}

/// Deposit identifiers from the `SentMessage` / `SentMessageExtension1` pair
pub fn resolve_deposit_logs(
    receipt: &TxReceipt,
    l1_messenger: Address,
) -> Result<ResolvedDeposit, BridgeError> {
    let mut sent = None;
    let mut value = U256::ZERO;

    for log in receipt.logs.iter().filter(|log| log.address == l1_messenger) {
        match log.topics().first() {
            Some(topic) if *topic == L1CrossDomainMessenger::SentMessage::SIGNATURE_HASH => {
                if sent.is_none() {
                    let event =
                        L1CrossDomainMessenger::SentMessage::decode_log_data(&log.data, true)
                            .map_err(|e| undecodable("SentMessage", e))?;
                    sent = Some(event);
                }
            }
            Some(topic)
                if *topic == L1CrossDomainMessenger::SentMessageExtension1::SIGNATURE_HASH =>
            {
                let event =
                    L1CrossDomainMessenger::SentMessageExtension1::decode_log_data(&log.data, true)
                        .map_err(|e| undecodable("SentMessageExtension1", e))?;
                value = event.value;
                break;
            }
            _ => {}
        }
    }

    let sent = sent.ok_or_else(|| BridgeError::StageUnreachable {
        what: format!("deposit {}", receipt.tx_hash),
        reason: format!("no SentMessage event from {}", l1_messenger),
    })?;

    let message = CrossDomainMessage {
        nonce: sent.messageNonce,
        sender: sent.sender,
        target: sent.target,
        value,
        gas_limit: sent.gasLimit,
        data: sent.message,
    };
    let message_hash =
        cross_domain_message_hash(&message).ok_or_else(|| BridgeError::StageUnreachable {
            what: format!("deposit {}", receipt.tx_hash),
            reason: format!("unsupported message nonce {}", message.nonce),
        })?;

    Ok(ResolvedDeposit {
        message_hash,
        message,
    })
}

/// Withdrawal identifiers from the `MessagePassed` event
pub fn resolve_withdrawal_logs(
    receipt: &TxReceipt,
    message_passer: Address,
) -> Result<ResolvedWithdrawal, BridgeError> {
    let log = receipt
        .logs
        .iter()
        .filter(|log| log.address == message_passer)
        .find(|log| {
            log.topics().first() == Some(&L2ToL1MessagePasser::MessagePassed::SIGNATURE_HASH)
        })
        .ok_or_else(|| BridgeError::StageUnreachable {
            what: format!("withdrawal {}", receipt.tx_hash),
            reason: format!("no MessagePassed event from {}", message_passer),
        })?;

    let event = L2ToL1MessagePasser::MessagePassed::decode_log_data(&log.data, true)
        .map_err(|e| undecodable("MessagePassed", e))?;

    let transaction = WithdrawalTransaction {
        nonce: event.nonce,
        sender: event.sender,
        target: event.target,
        value: event.value,
        gasLimit: event.gasLimit,
        data: event.data,
    };
    let hash = withdrawal_hash(&transaction);
    if hash != event.withdrawalHash {
        return Err(BridgeError::StageUnreachable {
            what: format!("withdrawal {}", receipt.tx_hash),
            reason: format!(
                "computed withdrawal hash {} does not match emitted {}",
                hash, event.withdrawalHash
            ),
        });
    }

    Ok(ResolvedWithdrawal {
        withdrawal_hash: hash,
        transaction,
        l2_block: receipt.block_number,
    })
}
