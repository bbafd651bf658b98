//! In-memory OP-stack deployment
//!
//! `OpStack` wires two `MockChain`s to a shared contract state playing the
//! L1 bridge, L1 messenger, portal and output oracle on L1 and the standard
//! bridge, messenger and message passer predeploys on L2.
//!
//! Relays and output proposals happen on their own after a configurable
//! number of status queries, so flows progress while the messenger polls.

use alloy::primitives::{address, Address, Bytes, Log, B256, U256};
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::mock_chain::{mock_header, mock_storage_root, revert, MockChain, Responder};
use crate::config::{
    ContractAddresses, MessengerConfig, L2_CROSS_DOMAIN_MESSENGER, L2_ETH_TOKEN,
    L2_STANDARD_BRIDGE, L2_TO_L1_MESSAGE_PASSER,
};
use crate::contracts::{
    L1CrossDomainMessenger, L1StandardBridge, L2CrossDomainMessenger, L2OutputOracle,
    L2StandardBridge, L2ToL1MessagePasser, OptimismPortal, OutputRootProof,
    WithdrawalTransaction, ERC20,
};
use crate::endpoint::TxRequest;
use crate::error::RpcError;
use crate::hash::{
    cross_domain_message_hash, encode_versioned_nonce, output_root, withdrawal_hash,
    CrossDomainMessage,
};
use crate::registry::BridgeConfig;
use crate::types::Layer;

pub const L1_STANDARD_BRIDGE: Address = address!("00000000000000000000000000000000000b1d9e");
pub const L1_CROSS_DOMAIN_MESSENGER: Address = address!("00000000000000000000000000000000000c0de1");
pub const OPTIMISM_PORTAL: Address = address!("00000000000000000000000000000000000f0a11");
pub const L2_OUTPUT_ORACLE: Address = address!("00000000000000000000000000000000000a11ce");

pub const L1_CHAIN_ID: u64 = 5;
pub const L2_CHAIN_ID: u64 = 420;

#[derive(Debug, Clone)]
struct PendingDeposit {
    to: Address,
    amount: U256,
    l2_token: Option<Address>,
    polls_left: usize,
}

#[derive(Debug, Clone)]
struct PendingWithdrawal {
    to: Address,
    amount: U256,
    l1_token: Option<Address>,
    l2_block: u64,
}

#[derive(Debug, Clone, Copy)]
struct Output {
    root: B256,
    timestamp: u128,
    l2_block: u64,
}

#[derive(Debug)]
struct OpState {
    challenge_period: u64,
    relay_after_polls: usize,
    fail_relays: bool,
    publish_after_polls: Option<usize>,
    oracle_polls: usize,
    message_nonce: u64,
    deposits: HashMap<B256, PendingDeposit>,
    relayed: HashSet<B256>,
    failed: HashSet<B256>,
    withdrawals: HashMap<B256, PendingWithdrawal>,
    outputs: Vec<Output>,
    proven: HashMap<B256, (B256, u128, u128)>,
    finalized: HashSet<B256>,
    prove_count: usize,
    finalize_count: usize,
    token_pairs: HashMap<Address, Address>,
    token_balances: HashMap<(Layer, Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
}

/// Two mock chains sharing one OP-stack contract state
pub struct OpStack {
    pub l1: Arc<MockChain>,
    pub l2: Arc<MockChain>,
    contracts: Arc<OpContracts>,
}

struct OpContracts {
    l1: Weak<MockChain>,
    l2: Weak<MockChain>,
    state: Mutex<OpState>,
}

impl OpStack {
    /// Deployment with `signer` as the only account on both layers
    pub fn new(signer: Address, challenge_period: u64) -> Self {
        let l1 = Arc::new(MockChain::new(Layer::L1, L1_CHAIN_ID, signer));
        let l2 = Arc::new(MockChain::new(Layer::L2, L2_CHAIN_ID, signer));
        let contracts = Arc::new(OpContracts {
            l1: Arc::downgrade(&l1),
            l2: Arc::downgrade(&l2),
            state: Mutex::new(OpState {
                challenge_period,
                relay_after_polls: 2,
                fail_relays: false,
                publish_after_polls: Some(2),
                oracle_polls: 0,
                message_nonce: 0,
                deposits: HashMap::new(),
                relayed: HashSet::new(),
                failed: HashSet::new(),
                withdrawals: HashMap::new(),
                outputs: Vec::new(),
                proven: HashMap::new(),
                finalized: HashSet::new(),
                prove_count: 0,
                finalize_count: 0,
                token_pairs: HashMap::new(),
                token_balances: HashMap::new(),
                allowances: HashMap::new(),
            }),
        });
        l1.set_responder(contracts.clone());
        l2.set_responder(contracts.clone());
        Self { l1, l2, contracts }
    }

    /// Messenger configuration pointing at this deployment
    pub fn config(&self) -> MessengerConfig {
        MessengerConfig {
            contracts: ContractAddresses {
                l1_cross_domain_messenger: L1_CROSS_DOMAIN_MESSENGER.to_string(),
                optimism_portal: OPTIMISM_PORTAL.to_string(),
                l2_output_oracle: L2_OUTPUT_ORACLE.to_string(),
                l2_cross_domain_messenger: L2_CROSS_DOMAIN_MESSENGER.to_string(),
                l2_to_l1_message_passer: L2_TO_L1_MESSAGE_PASSER.to_string(),
            },
            bridges: vec![
                BridgeConfig::native(&L1_STANDARD_BRIDGE.to_string()),
                BridgeConfig::standard(&L1_STANDARD_BRIDGE.to_string()),
            ],
            challenge_period_secs: self.state().challenge_period,
            poll_interval_ms: 1_000,
            wait_timeout_secs: 3_600,
            confirmations: 1,
            min_gas_limit: 200_000,
        }
    }

    fn state(&self) -> MutexGuard<'_, OpState> {
        self.contracts.state()
    }

    /// Relay deposits on the `polls`-th `successfulMessages` query. Pending
    /// deposits are brought forward, never pushed back.
    pub fn relay_after(&self, polls: usize) {
        let mut state = self.state();
        state.relay_after_polls = polls;
        for deposit in state.deposits.values_mut() {
            deposit.polls_left = deposit.polls_left.min(polls);
        }
    }

    /// Execute relays as failed instead of successful
    pub fn fail_relays(&self) {
        self.state().fail_relays = true;
    }

    /// Publish an output at the L2 head every `polls` oracle queries;
    /// `None` publishes only on `publish_output`
    pub fn auto_publish_after(&self, polls: Option<usize>) {
        let mut state = self.state();
        state.publish_after_polls = polls;
        state.oracle_polls = 0;
    }

    /// Publish an output root covering the current L2 head
    pub fn publish_output(&self) -> u64 {
        self.contracts.publish_output()
    }

    pub fn latest_output_block(&self) -> u64 {
        self.state().outputs.last().map(|o| o.l2_block).unwrap_or(0)
    }

    pub fn prove_count(&self) -> usize {
        self.state().prove_count
    }

    pub fn finalize_count(&self) -> usize {
        self.state().finalize_count
    }

    pub fn is_proven(&self, withdrawal_hash: B256) -> bool {
        self.state().proven.contains_key(&withdrawal_hash)
    }

    pub fn register_token_pair(&self, l1_token: Address, l2_token: Address) {
        self.state().token_pairs.insert(l2_token, l1_token);
    }

    pub fn mint_token(&self, layer: Layer, token: Address, owner: Address, amount: U256) {
        let mut state = self.state();
        *state.token_balances.entry((layer, token, owner)).or_default() += amount;
    }

    pub fn token_balance(&self, layer: Layer, token: Address, owner: Address) -> U256 {
        self.state()
            .token_balances
            .get(&(layer, token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }
}

fn selector(tx: &TxRequest) -> [u8; 4] {
    let mut selector = [0u8; 4];
    if tx.data.len() >= 4 {
        selector.copy_from_slice(&tx.data[..4]);
    }
    selector
}

fn decode<C: SolCall>(tx: &TxRequest) -> Result<C, String> {
    C::abi_decode(&tx.data, true).map_err(|e| format!("bad {} calldata: {}", C::SIGNATURE, e))
}

fn bad_call(reason: String) -> RpcError {
    RpcError::Response {
        code: -32602,
        message: reason,
    }
}

fn emitted<E: SolEvent>(address: Address, event: &E) -> Log {
    Log {
        address,
        data: event.encode_log_data(),
    }
}

impl OpContracts {
    fn state(&self) -> MutexGuard<'_, OpState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn chain(&self, layer: Layer) -> Option<Arc<MockChain>> {
        match layer {
            Layer::L1 => self.l1.upgrade(),
            Layer::L2 => self.l2.upgrade(),
        }
    }

    fn credit(&self, layer: Layer, to: Address, amount: U256) {
        if let Some(chain) = self.chain(layer) {
            chain.credit(to, amount);
        }
    }

    fn l1_timestamp(&self) -> u64 {
        self.chain(Layer::L1).map(|c| c.timestamp()).unwrap_or(0)
    }

    fn publish_output(&self) -> u64 {
        let l2_block = self.chain(Layer::L2).map(|c| c.head()).unwrap_or(0);
        let timestamp = self.l1_timestamp();
        let header = mock_header(Layer::L2, l2_block);
        let root = output_root(&OutputRootProof {
            version: B256::ZERO,
            stateRoot: header.state_root,
            messagePasserStorageRoot: mock_storage_root(Layer::L2, l2_block),
            latestBlockhash: header.hash,
        });
        self.state().outputs.push(Output {
            root,
            timestamp: u128::from(timestamp),
            l2_block,
        });
        l2_block
    }

    fn next_nonce(state: &mut OpState) -> U256 {
        state.message_nonce += 1;
        encode_versioned_nonce(U256::from(state.message_nonce), 1)
    }

    // =========================================================================
    // L1 transactions
    // =========================================================================

    fn send_message(
        &self,
        from: Address,
        to: Address,
        amount: U256,
        value: U256,
        l2_token: Option<Address>,
        min_gas_limit: u32,
    ) -> Vec<Log> {
        let mut state = self.state();
        let message = CrossDomainMessage {
            nonce: Self::next_nonce(&mut state),
            sender: L1_STANDARD_BRIDGE,
            target: L2_STANDARD_BRIDGE,
            value,
            gas_limit: U256::from(min_gas_limit),
            data: Bytes::from((from, to, amount).abi_encode_params()),
        };
        if let Some(hash) = cross_domain_message_hash(&message) {
            let polls_left = state.relay_after_polls;
            state.deposits.insert(
                hash,
                PendingDeposit {
                    to,
                    amount,
                    l2_token,
                    polls_left,
                },
            );
        }

        vec![
            emitted(
                L1_CROSS_DOMAIN_MESSENGER,
                &L1CrossDomainMessenger::SentMessage {
                    target: message.target,
                    sender: message.sender,
                    message: message.data.clone(),
                    messageNonce: message.nonce,
                    gasLimit: message.gas_limit,
                },
            ),
            emitted(
                L1_CROSS_DOMAIN_MESSENGER,
                &L1CrossDomainMessenger::SentMessageExtension1 {
                    sender: message.sender,
                    value: message.value,
                },
            ),
        ]
    }

    fn l1_bridge(&self, from: Address, tx: &TxRequest) -> Result<Vec<Log>, String> {
        match selector(tx) {
            L1StandardBridge::depositETHToCall::SELECTOR => {
                let call = decode::<L1StandardBridge::depositETHToCall>(tx)?;
                Ok(self.send_message(from, call._to, tx.value, tx.value, None, call._minGasLimit))
            }
            L1StandardBridge::depositERC20ToCall::SELECTOR => {
                let call = decode::<L1StandardBridge::depositERC20ToCall>(tx)?;
                {
                    let mut state = self.state();
                    let allowance_key = (call._l1Token, from, L1_STANDARD_BRIDGE);
                    let allowance = state.allowances.get(&allowance_key).copied().unwrap_or_default();
                    if allowance < call._amount {
                        return Err("ERC20: insufficient allowance".to_string());
                    }
                    let balance_key = (Layer::L1, call._l1Token, from);
                    let balance = state.token_balances.get(&balance_key).copied().unwrap_or_default();
                    if balance < call._amount {
                        return Err("ERC20: transfer amount exceeds balance".to_string());
                    }
                    state.allowances.insert(allowance_key, allowance - call._amount);
                    state.token_balances.insert(balance_key, balance - call._amount);
                }
                Ok(self.send_message(
                    from,
                    call._to,
                    call._amount,
                    U256::ZERO,
                    Some(call._l2Token),
                    call._minGasLimit,
                ))
            }
            _ => Err("L1StandardBridge: unknown function".to_string()),
        }
    }

    /// Checks shared by `proveWithdrawalTransaction` and its `eth_call` replay
    fn check_prove(
        state: &OpState,
        call: &OptimismPortal::proveWithdrawalTransactionCall,
    ) -> Result<B256, String> {
        let hash = withdrawal_hash(&call._tx);
        let withdrawal = state
            .withdrawals
            .get(&hash)
            .ok_or("OptimismPortal: unknown withdrawal")?;
        if state.proven.contains_key(&hash) {
            return Err("OptimismPortal: withdrawal hash has already been proven".to_string());
        }
        let index = usize::try_from(call._l2OutputIndex)
            .map_err(|_| "L2OutputOracle: output index out of range".to_string())?;
        let output = state
            .outputs
            .get(index)
            .ok_or("L2OutputOracle: output index out of range")?;
        if output_root(&call._outputRootProof) != output.root {
            return Err("OptimismPortal: invalid output root proof".to_string());
        }
        if output.l2_block < withdrawal.l2_block {
            return Err("OptimismPortal: output does not cover withdrawal".to_string());
        }
        if call._withdrawalProof.is_empty() {
            return Err("OptimismPortal: invalid withdrawal inclusion proof".to_string());
        }
        Ok(hash)
    }

    fn check_finalize(
        state: &OpState,
        tx: &WithdrawalTransaction,
        now: u64,
    ) -> Result<B256, String> {
        let hash = withdrawal_hash(tx);
        if state.finalized.contains(&hash) {
            return Err("OptimismPortal: withdrawal has already been finalized".to_string());
        }
        let (_, proven_at, _) = state
            .proven
            .get(&hash)
            .ok_or("OptimismPortal: withdrawal has not been proven yet")?;
        if u128::from(now) <= proven_at + u128::from(state.challenge_period) {
            return Err(
                "OptimismPortal: proven withdrawal finalization period has not elapsed"
                    .to_string(),
            );
        }
        Ok(hash)
    }

    fn portal(&self, tx: &TxRequest, timestamp: u64) -> Result<Vec<Log>, String> {
        match selector(tx) {
            OptimismPortal::proveWithdrawalTransactionCall::SELECTOR => {
                let call = decode::<OptimismPortal::proveWithdrawalTransactionCall>(tx)?;
                let mut state = self.state();
                let hash = Self::check_prove(&state, &call)?;
                let index = call._l2OutputIndex.to::<u128>();
                let root = output_root(&call._outputRootProof);
                state.proven.insert(hash, (root, u128::from(timestamp), index));
                state.prove_count += 1;
                Ok(Vec::new())
            }
            OptimismPortal::finalizeWithdrawalTransactionCall::SELECTOR => {
                let call = decode::<OptimismPortal::finalizeWithdrawalTransactionCall>(tx)?;
                let withdrawal = {
                    let mut state = self.state();
                    let hash = Self::check_finalize(&state, &call._tx, timestamp)?;
                    state.finalized.insert(hash);
                    state.finalize_count += 1;
                    let withdrawal = state.withdrawals.get(&hash).cloned();
                    if let Some(w) = &withdrawal {
                        if let Some(token) = w.l1_token {
                            *state
                                .token_balances
                                .entry((Layer::L1, token, w.to))
                                .or_default() += w.amount;
                        }
                    }
                    withdrawal
                };
                if let Some(w) = withdrawal {
                    if w.l1_token.is_none() {
                        self.credit(Layer::L1, w.to, w.amount);
                    }
                }
                Ok(Vec::new())
            }
            _ => Err("OptimismPortal: unknown function".to_string()),
        }
    }

    fn approve(&self, from: Address, tx: &TxRequest) -> Result<Vec<Log>, String> {
        let call = decode::<ERC20::approveCall>(tx)?;
        self.state()
            .allowances
            .insert((tx.to, from, call.spender), call.amount);
        Ok(Vec::new())
    }

    // =========================================================================
    // L2 transactions
    // =========================================================================

    fn l2_bridge(
        &self,
        from: Address,
        tx: &TxRequest,
        block: u64,
    ) -> Result<Vec<Log>, String> {
        let call = decode::<L2StandardBridge::withdrawToCall>(tx)?;
        let mut state = self.state();

        let (l1_token, value) = if call._l2Token == L2_ETH_TOKEN {
            if tx.value != call._amount {
                return Err("L2StandardBridge: bridging ETH must include sufficient ETH value".into());
            }
            (None, call._amount)
        } else {
            let l1_token = *state
                .token_pairs
                .get(&call._l2Token)
                .ok_or("L2StandardBridge: unknown token")?;
            let key = (Layer::L2, call._l2Token, from);
            let balance = state.token_balances.get(&key).copied().unwrap_or_default();
            if balance < call._amount {
                return Err("ERC20: burn amount exceeds balance".into());
            }
            state.token_balances.insert(key, balance - call._amount);
            (Some(l1_token), U256::ZERO)
        };

        let transaction = WithdrawalTransaction {
            nonce: Self::next_nonce(&mut state),
            sender: L2_CROSS_DOMAIN_MESSENGER,
            target: L1_CROSS_DOMAIN_MESSENGER,
            value,
            gasLimit: U256::from(call._minGasLimit),
            data: Bytes::from((from, call._to, call._amount).abi_encode_params()),
        };
        let hash = withdrawal_hash(&transaction);
        state.withdrawals.insert(
            hash,
            PendingWithdrawal {
                to: call._to,
                amount: call._amount,
                l1_token,
                l2_block: block,
            },
        );

        Ok(vec![emitted(
            L2_TO_L1_MESSAGE_PASSER,
            &L2ToL1MessagePasser::MessagePassed {
                nonce: transaction.nonce,
                sender: transaction.sender,
                target: transaction.target,
                value: transaction.value,
                gasLimit: transaction.gasLimit,
                data: transaction.data,
                withdrawalHash: hash,
            },
        )])
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// `successfulMessages` query; relays the deposit once its polls run out
    fn successful_messages(&self, hash: B256) -> bool {
        let relay = {
            let mut state = self.state();
            if state.relayed.contains(&hash) {
                return true;
            }
            let fail = state.fail_relays;
            let Some(pending) = state.deposits.get_mut(&hash) else {
                return false;
            };
            pending.polls_left = pending.polls_left.saturating_sub(1);
            if pending.polls_left > 0 {
                return false;
            }
            let pending = pending.clone();
            state.deposits.remove(&hash);
            if fail {
                state.failed.insert(hash);
                return false;
            }
            state.relayed.insert(hash);
            if let Some(token) = pending.l2_token {
                *state
                    .token_balances
                    .entry((Layer::L2, token, pending.to))
                    .or_default() += pending.amount;
                None
            } else {
                Some(pending)
            }
        };
        if let Some(pending) = relay {
            self.credit(Layer::L2, pending.to, pending.amount);
        }
        true
    }

    fn latest_block_number(&self) -> u64 {
        let publish = {
            let mut state = self.state();
            state.oracle_polls += 1;
            match state.publish_after_polls {
                Some(every) if state.oracle_polls >= every => {
                    state.oracle_polls = 0;
                    true
                }
                _ => false,
            }
        };
        if publish {
            self.publish_output();
        }
        self.state().outputs.last().map(|o| o.l2_block).unwrap_or(0)
    }

    fn oracle_call(&self, tx: &TxRequest) -> Result<Vec<u8>, RpcError> {
        let encoded = match selector(tx) {
            L2OutputOracle::latestBlockNumberCall::SELECTOR => {
                U256::from(self.latest_block_number()).abi_encode()
            }
            L2OutputOracle::getL2OutputIndexAfterCall::SELECTOR => {
                let call = decode::<L2OutputOracle::getL2OutputIndexAfterCall>(tx).map_err(bad_call)?;
                let state = self.state();
                let index = state
                    .outputs
                    .iter()
                    .position(|o| U256::from(o.l2_block) >= call._l2BlockNumber)
                    .ok_or_else(|| {
                        revert("L2OutputOracle: cannot get output for a block that has not been proposed")
                    })?;
                U256::from(index).abi_encode()
            }
            L2OutputOracle::getL2OutputCall::SELECTOR => {
                let call = decode::<L2OutputOracle::getL2OutputCall>(tx).map_err(bad_call)?;
                let state = self.state();
                let output = usize::try_from(call._l2OutputIndex)
                    .ok()
                    .and_then(|i| state.outputs.get(i).copied())
                    .ok_or_else(|| revert("L2OutputOracle: output index out of range"))?;
                (output.root, output.timestamp, u128::from(output.l2_block)).abi_encode_params()
            }
            L2OutputOracle::FINALIZATION_PERIOD_SECONDSCall::SELECTOR => {
                U256::from(self.state().challenge_period).abi_encode()
            }
            _ => return Err(revert("L2OutputOracle: unknown function")),
        };
        Ok(encoded)
    }

    fn portal_call(&self, tx: &TxRequest) -> Result<Vec<u8>, RpcError> {
        let encoded = match selector(tx) {
            OptimismPortal::provenWithdrawalsCall::SELECTOR => {
                let call = decode::<OptimismPortal::provenWithdrawalsCall>(tx).map_err(bad_call)?;
                let (root, timestamp, index) = self
                    .state()
                    .proven
                    .get(&call.withdrawalHash)
                    .copied()
                    .unwrap_or((B256::ZERO, 0, 0));
                (root, timestamp, index).abi_encode_params()
            }
            OptimismPortal::finalizedWithdrawalsCall::SELECTOR => {
                let call = decode::<OptimismPortal::finalizedWithdrawalsCall>(tx).map_err(bad_call)?;
                self.state().finalized.contains(&call.withdrawalHash).abi_encode()
            }
            OptimismPortal::proveWithdrawalTransactionCall::SELECTOR => {
                let call =
                    decode::<OptimismPortal::proveWithdrawalTransactionCall>(tx).map_err(bad_call)?;
                Self::check_prove(&self.state(), &call).map_err(|e| revert(&e))?;
                Vec::new()
            }
            OptimismPortal::finalizeWithdrawalTransactionCall::SELECTOR => {
                let call = decode::<OptimismPortal::finalizeWithdrawalTransactionCall>(tx)
                    .map_err(bad_call)?;
                let now = self.l1_timestamp();
                Self::check_finalize(&self.state(), &call._tx, now).map_err(|e| revert(&e))?;
                Vec::new()
            }
            _ => return Err(revert("OptimismPortal: unknown function")),
        };
        Ok(encoded)
    }

    fn token_call(&self, layer: Layer, tx: &TxRequest) -> Result<Vec<u8>, RpcError> {
        let token = tx.to;
        let encoded = match selector(tx) {
            ERC20::allowanceCall::SELECTOR => {
                let call = decode::<ERC20::allowanceCall>(tx).map_err(bad_call)?;
                self.state()
                    .allowances
                    .get(&(token, call.owner, call.spender))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            ERC20::balanceOfCall::SELECTOR => {
                let call = decode::<ERC20::balanceOfCall>(tx).map_err(bad_call)?;
                self.token_balance_encoded(layer, token, call.account)
            }
            _ => Vec::new(),
        };
        Ok(encoded)
    }

    fn token_balance_encoded(&self, layer: Layer, token: Address, owner: Address) -> Vec<u8> {
        self.state()
            .token_balances
            .get(&(layer, token, owner))
            .copied()
            .unwrap_or_default()
            .abi_encode()
    }

    fn messenger_call(&self, tx: &TxRequest) -> Result<Vec<u8>, RpcError> {
        let encoded = match selector(tx) {
            L2CrossDomainMessenger::successfulMessagesCall::SELECTOR => {
                let call = decode::<L2CrossDomainMessenger::successfulMessagesCall>(tx)
                    .map_err(bad_call)?;
                self.successful_messages(call.msgHash).abi_encode()
            }
            L2CrossDomainMessenger::failedMessagesCall::SELECTOR => {
                let call =
                    decode::<L2CrossDomainMessenger::failedMessagesCall>(tx).map_err(bad_call)?;
                self.state().failed.contains(&call.msgHash).abi_encode()
            }
            _ => return Err(revert("L2CrossDomainMessenger: unknown function")),
        };
        Ok(encoded)
    }
}

impl Responder for OpContracts {
    fn on_transaction(
        &self,
        layer: Layer,
        from: Address,
        tx: &TxRequest,
        block: u64,
        timestamp: u64,
    ) -> Result<Vec<Log>, String> {
        match layer {
            Layer::L1 if tx.to == L1_STANDARD_BRIDGE => self.l1_bridge(from, tx),
            Layer::L1 if tx.to == OPTIMISM_PORTAL => self.portal(tx, timestamp),
            Layer::L2 if tx.to == L2_STANDARD_BRIDGE => self.l2_bridge(from, tx, block),
            _ if selector(tx) == ERC20::approveCall::SELECTOR => self.approve(from, tx),
            _ => Ok(Vec::new()),
        }
    }

    fn on_call(&self, layer: Layer, _from: Address, tx: &TxRequest) -> Result<Bytes, RpcError> {
        let encoded = match layer {
            Layer::L1 if tx.to == L2_OUTPUT_ORACLE => self.oracle_call(tx)?,
            Layer::L1 if tx.to == OPTIMISM_PORTAL => self.portal_call(tx)?,
            Layer::L2 if tx.to == L2_CROSS_DOMAIN_MESSENGER => self.messenger_call(tx)?,
            _ => self.token_call(layer, tx)?,
        };
        Ok(Bytes::from(encoded))
    }
}
