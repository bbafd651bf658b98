//! In-memory chain endpoint
//!
//! Transactions are mined instantly into their own block. Contract
//! behaviour is delegated to a `Responder`; the ledger lock is never held
//! while the responder runs, so a responder may credit either chain.

use alloy::primitives::{keccak256, Address, Bytes, Log, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::endpoint::{BlockHeader, ChainEndpoint, StorageProof, TxReceipt, TxRequest};
use crate::error::RpcError;
use crate::types::Layer;

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Contract logic behind a `MockChain`
pub trait Responder: Send + Sync {
    /// Execute a mined transaction. `Err(reason)` marks the receipt as
    /// reverted.
    fn on_transaction(
        &self,
        layer: Layer,
        from: Address,
        tx: &TxRequest,
        block: u64,
        timestamp: u64,
    ) -> Result<Vec<Log>, String>;

    /// Answer an `eth_call`
    fn on_call(&self, layer: Layer, from: Address, tx: &TxRequest) -> Result<Bytes, RpcError>;
}

/// Header every `MockChain` reports for block `number`
pub fn mock_header(layer: Layer, number: u64) -> BlockHeader {
    BlockHeader {
        number,
        hash: keccak256(format!("{}:block:{}", layer, number)),
        state_root: keccak256(format!("{}:state:{}", layer, number)),
        timestamp: GENESIS_TIMESTAMP + number * 2,
    }
}

/// Message passer storage root every `MockChain` reports at `block`
pub fn mock_storage_root(layer: Layer, block: u64) -> B256 {
    keccak256(format!("{}:storage:{}", layer, block))
}

/// Revert error as a node reports it from `eth_call` / `eth_estimateGas`
pub fn revert(reason: &str) -> RpcError {
    RpcError::Response {
        code: 3,
        message: format!("execution reverted: {}", reason),
    }
}

#[derive(Debug)]
struct Ledger {
    head: u64,
    timestamp: u64,
    block_time: u64,
    clock_step: u64,
    tx_counter: u64,
    gas_price: u128,
    gas_estimate: u64,
    balances: HashMap<Address, U256>,
    receipts: HashMap<B256, TxReceipt>,
    withheld: Vec<B256>,
    hold_receipts: bool,
    sent: Vec<TxRequest>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<RpcError>>,
    always_fail: HashMap<&'static str, RpcError>,
}

/// `ChainEndpoint` backed by an in-memory ledger
pub struct MockChain {
    layer: Layer,
    chain_id: u64,
    signer: Address,
    ledger: Mutex<Ledger>,
    responder: RwLock<Option<Arc<dyn Responder>>>,
}

impl MockChain {
    pub fn new(layer: Layer, chain_id: u64, signer: Address) -> Self {
        Self {
            layer,
            chain_id,
            signer,
            ledger: Mutex::new(Ledger {
                head: 1,
                timestamp: GENESIS_TIMESTAMP,
                block_time: 12,
                clock_step: 0,
                tx_counter: 0,
                gas_price: 1_000_000_000,
                gas_estimate: 21_000,
                balances: HashMap::new(),
                receipts: HashMap::new(),
                withheld: Vec::new(),
                hold_receipts: false,
                sent: Vec::new(),
                calls: HashMap::new(),
                failures: HashMap::new(),
                always_fail: HashMap::new(),
            }),
            responder: RwLock::new(None),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn responder(&self) -> Option<Arc<dyn Responder>> {
        self.responder
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_responder(&self, responder: Arc<dyn Responder>) {
        *self.responder.write().unwrap_or_else(|e| e.into_inner()) = Some(responder);
    }

    /// Count the call and pop any injected failure
    fn enter(&self, method: &'static str) -> Result<(), RpcError> {
        let mut ledger = self.ledger();
        *ledger.calls.entry(method).or_default() += 1;
        if let Some(err) = ledger.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if let Some(err) = ledger.always_fail.get(method) {
            return Err(err.clone());
        }
        Ok(())
    }

    // =========================================================================
    // Setup
    // =========================================================================

    pub fn set_balance(&self, address: Address, amount: U256) {
        self.ledger().balances.insert(address, amount);
    }

    pub fn credit(&self, address: Address, amount: U256) {
        let mut ledger = self.ledger();
        let balance = ledger.balances.entry(address).or_default();
        *balance += amount;
    }

    pub fn set_gas(&self, gas_estimate: u64, gas_price: u128) {
        let mut ledger = self.ledger();
        ledger.gas_estimate = gas_estimate;
        ledger.gas_price = gas_price;
    }

    pub fn set_timestamp(&self, timestamp: u64) {
        self.ledger().timestamp = timestamp;
    }

    pub fn advance_time(&self, secs: u64) {
        self.ledger().timestamp += secs;
    }

    /// Seconds added to the clock after every latest-timestamp query
    pub fn set_clock_step(&self, secs: u64) {
        self.ledger().clock_step = secs;
    }

    pub fn mine_blocks(&self, count: u64) {
        let mut guard = self.ledger();
        let ledger = &mut *guard;
        ledger.head += count;
        ledger.timestamp += count * ledger.block_time;
    }

    /// Keep new receipts hidden until `release_receipts`
    pub fn hold_receipts(&self, hold: bool) {
        self.ledger().hold_receipts = hold;
    }

    pub fn release_receipts(&self) {
        let mut ledger = self.ledger();
        ledger.hold_receipts = false;
        ledger.withheld.clear();
    }

    /// Fail the next `times` calls of `method` with `err`
    pub fn fail_next(&self, method: &'static str, err: RpcError, times: usize) {
        let mut ledger = self.ledger();
        let queue = ledger.failures.entry(method).or_default();
        queue.extend(std::iter::repeat(err).take(times));
    }

    /// Fail every call of `method` with `err`
    pub fn fail_always(&self, method: &'static str, err: RpcError) {
        self.ledger().always_fail.insert(method, err);
    }

    pub fn clear_failures(&self) {
        let mut ledger = self.ledger();
        ledger.failures.clear();
        ledger.always_fail.clear();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn head(&self) -> u64 {
        self.ledger().head
    }

    pub fn timestamp(&self) -> u64 {
        self.ledger().timestamp
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.ledger()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    /// Gas cost charged for every mined transaction
    pub fn gas_cost(&self) -> U256 {
        let ledger = self.ledger();
        U256::from(ledger.gas_estimate) * U256::from(ledger.gas_price)
    }

    pub fn sent_transactions(&self) -> Vec<TxRequest> {
        self.ledger().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.ledger().sent.len()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.ledger().calls.get(method).copied().unwrap_or(0)
    }

    /// RPC calls of any kind made so far
    pub fn total_calls(&self) -> usize {
        self.ledger().calls.values().sum()
    }

    pub fn mined_receipt(&self, tx_hash: B256) -> Option<TxReceipt> {
        self.ledger().receipts.get(&tx_hash).cloned()
    }
}

#[async_trait]
impl ChainEndpoint for MockChain {
    fn layer(&self) -> Layer {
        self.layer
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        self.enter("balance")?;
        Ok(self.balance_of(address))
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.enter("block_number")?;
        Ok(self.head())
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.enter("gas_price")?;
        Ok(self.ledger().gas_price)
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64, RpcError> {
        self.enter("estimate_gas")?;
        Ok(self.ledger().gas_estimate)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError> {
        self.enter("send_transaction")?;

        let (tx_hash, block, timestamp) = {
            let mut guard = self.ledger();
            let ledger = &mut *guard;
            let gas = U256::from(ledger.gas_estimate) * U256::from(ledger.gas_price);
            let balance = ledger.balances.get(&self.signer).copied().unwrap_or_default();
            if balance < tx.value + gas {
                return Err(RpcError::Response {
                    code: -32000,
                    message: "insufficient funds for gas * price + value".to_string(),
                });
            }
            ledger.balances.insert(self.signer, balance - tx.value - gas);

            ledger.tx_counter += 1;
            ledger.head += 1;
            ledger.timestamp += ledger.block_time;
            ledger.sent.push(tx.clone());
            let tx_hash = keccak256(format!("{}:{}:tx:{}", self.layer, self.chain_id, ledger.tx_counter));
            (tx_hash, ledger.head, ledger.timestamp)
        };

        let outcome = match self.responder() {
            Some(responder) => responder.on_transaction(self.layer, self.signer, tx, block, timestamp),
            None => Ok(Vec::new()),
        };

        let mut guard = self.ledger();
        let ledger = &mut *guard;
        let (status, logs) = match outcome {
            Ok(logs) => {
                if !tx.value.is_zero() && tx.to != self.signer {
                    let to = ledger.balances.entry(tx.to).or_default();
                    *to += tx.value;
                }
                (true, logs)
            }
            Err(_) => {
                // Reverted: value stays with the sender, gas is spent
                let balance = ledger.balances.entry(self.signer).or_default();
                *balance += tx.value;
                (false, Vec::new())
            }
        };
        if ledger.hold_receipts {
            ledger.withheld.push(tx_hash);
        }
        ledger.receipts.insert(
            tx_hash,
            TxReceipt {
                tx_hash,
                block_number: block,
                status,
                logs,
            },
        );
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        self.enter("receipt")?;
        let ledger = self.ledger();
        if ledger.withheld.contains(&tx_hash) {
            return Ok(None);
        }
        Ok(ledger.receipts.get(&tx_hash).cloned())
    }

    async fn call(&self, tx: &TxRequest, _block: Option<u64>) -> Result<Bytes, RpcError> {
        self.enter("call")?;
        match self.responder() {
            Some(responder) => responder.on_call(self.layer, self.signer, tx),
            None => Ok(Bytes::new()),
        }
    }

    async fn storage_proof(
        &self,
        _address: Address,
        slot: B256,
        block: u64,
    ) -> Result<StorageProof, RpcError> {
        self.enter("storage_proof")?;
        Ok(StorageProof {
            storage_hash: mock_storage_root(self.layer, block),
            proof: vec![Bytes::copy_from_slice(slot.as_slice())],
        })
    }

    async fn block_header(&self, block: Option<u64>) -> Result<Option<BlockHeader>, RpcError> {
        self.enter("block_header")?;
        let ledger = self.ledger();
        match block {
            Some(number) if number > ledger.head => Ok(None),
            Some(number) => Ok(Some(mock_header(self.layer, number))),
            None => Ok(Some(BlockHeader {
                timestamp: ledger.timestamp,
                ..mock_header(self.layer, ledger.head)
            })),
        }
    }

    async fn latest_block_timestamp(&self) -> Result<u64, RpcError> {
        self.enter("latest_block_timestamp")?;
        let mut guard = self.ledger();
        let ledger = &mut *guard;
        let now = ledger.timestamp;
        ledger.timestamp += ledger.clock_step;
        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MockChain {
        let chain = MockChain::new(Layer::L1, 5, Address::repeat_byte(1));
        chain.set_balance(Address::repeat_byte(1), U256::from(10_000_000_000_000u64));
        chain.set_gas(21_000, 1);
        chain
    }

    #[tokio::test]
    async fn test_transfer_is_mined_instantly() {
        let chain = chain();
        let tx = TxRequest {
            to: Address::repeat_byte(2),
            data: Bytes::new(),
            value: U256::from(1_000),
        };
        let hash = chain.send_transaction(&tx).await.unwrap();

        let receipt = chain.receipt(hash).await.unwrap().unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.block_number, chain.head());
        assert_eq!(chain.balance_of(Address::repeat_byte(2)), U256::from(1_000));
        assert_eq!(chain.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let chain = chain();
        chain.fail_next("block_number", RpcError::Transport("reset".into()), 2);

        assert!(chain.block_number().await.is_err());
        assert!(chain.block_number().await.is_err());
        assert!(chain.block_number().await.is_ok());
        assert_eq!(chain.call_count("block_number"), 3);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected() {
        let chain = MockChain::new(Layer::L2, 42, Address::repeat_byte(1));
        let tx = TxRequest {
            to: Address::repeat_byte(2),
            data: Bytes::new(),
            value: U256::from(1),
        };
        assert!(chain.send_transaction(&tx).await.is_err());
        assert_eq!(chain.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_clock_step() {
        let chain = chain();
        chain.set_clock_step(120);
        let first = chain.latest_block_timestamp().await.unwrap();
        let second = chain.latest_block_timestamp().await.unwrap();
        assert_eq!(second - first, 120);
    }
}
