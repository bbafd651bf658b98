//! Chain endpoint
//!
//! `ChainEndpoint` is the narrow RPC surface the tracker and messenger use.
//! `EvmEndpoint` implements it over an alloy HTTP provider with the signer's
//! wallet attached; the testing module implements it in memory.

use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    network::TransactionBuilder,
    primitives::{Address, Bytes, Log, B256, U256, U64},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::{
        http::{Client, Http},
        RpcError as TransportRpcError, TransportErrorKind,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BridgeError, RpcError};
use crate::signer::SignerIdentity;
use crate::types::Layer;

/// Contract call or value transfer from the signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    /// Read-only call with no value attached
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }
}

/// Mined transaction as seen by the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    /// `true` if execution succeeded
    pub status: bool,
    pub logs: Vec<Log>,
}

/// Header fields needed for output root proofs and challenge timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub state_root: B256,
    pub timestamp: u64,
}

/// `eth_getProof` result for one storage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProof {
    /// Storage root of the account
    pub storage_hash: B256,
    /// Merkle-Patricia proof nodes for the slot
    pub proof: Vec<Bytes>,
}

/// RPC surface of one layer, bound to the signer's account
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    fn layer(&self) -> Layer;

    fn chain_id(&self) -> u64;

    /// Account that signs every transaction sent through this endpoint
    fn signer_address(&self) -> Address;

    async fn balance(&self, address: Address) -> Result<U256, RpcError>;

    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, RpcError>;

    /// Sign and broadcast; returns as soon as the node accepted the transaction
    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError>;

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError>;

    /// `eth_call` from the signer at `block` (latest when `None`)
    async fn call(&self, tx: &TxRequest, block: Option<u64>) -> Result<Bytes, RpcError>;

    async fn storage_proof(
        &self,
        address: Address,
        slot: B256,
        block: u64,
    ) -> Result<StorageProof, RpcError>;

    /// Header at `block` (latest when `None`)
    async fn block_header(&self, block: Option<u64>) -> Result<Option<BlockHeader>, RpcError>;

    async fn latest_block_timestamp(&self) -> Result<u64, RpcError> {
        self.block_header(None)
            .await?
            .map(|header| header.timestamp)
            .ok_or_else(|| RpcError::Decode("node returned no latest block".to_string()))
    }
}

/// `eth_call` a view function and decode its return values
pub async fn read_contract<C>(
    endpoint: &dyn ChainEndpoint,
    to: Address,
    call: &C,
    block: Option<u64>,
) -> Result<C::Return, RpcError>
where
    C: SolCall + Sync,
    C::Return: Send,
{
    let output = endpoint
        .call(&TxRequest::call(to, call.abi_encode()), block)
        .await?;
    C::abi_decode_returns(&output, true).map_err(|e| {
        RpcError::Decode(format!(
            "{} returned undecodable data: {}",
            C::SIGNATURE,
            e
        ))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeader {
    number: U64,
    hash: B256,
    state_root: B256,
    timestamp: U64,
}

impl From<RawHeader> for BlockHeader {
    fn from(raw: RawHeader) -> Self {
        Self {
            number: raw.number.to::<u64>(),
            hash: raw.hash,
            state_root: raw.state_root,
            timestamp: raw.timestamp.to::<u64>(),
        }
    }
}

fn block_tag(block: Option<u64>) -> BlockNumberOrTag {
    block
        .map(BlockNumberOrTag::Number)
        .unwrap_or(BlockNumberOrTag::Latest)
}

/// Map alloy transport errors onto `RpcError`
fn map_transport(err: TransportRpcError<TransportErrorKind>) -> RpcError {
    match err {
        TransportRpcError::ErrorResp(payload) => RpcError::Response {
            code: payload.code,
            message: payload.message.to_string(),
        },
        TransportRpcError::DeserError { err, .. } => RpcError::Decode(err.to_string()),
        TransportRpcError::NullResp => RpcError::Decode("null response".to_string()),
        other => RpcError::Transport(other.to_string()),
    }
}

/// `ChainEndpoint` over an alloy provider
pub struct EvmEndpoint<P> {
    provider: P,
    layer: Layer,
    chain_id: u64,
    signer: Address,
}

impl<P> EvmEndpoint<P>
where
    P: Provider<Http<Client>> + Send + Sync + 'static,
{
    pub fn new(provider: P, layer: Layer, chain_id: u64, signer: Address) -> Self {
        Self {
            provider,
            layer,
            chain_id,
            signer,
        }
    }

    fn request(&self, tx: &TxRequest) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.signer)
            .with_to(tx.to)
            .with_input(tx.data.clone())
            .with_value(tx.value)
    }
}

#[async_trait]
impl<P> ChainEndpoint for EvmEndpoint<P>
where
    P: Provider<Http<Client>> + Send + Sync + 'static,
{
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
        self.provider
            .get_balance(address)
            .await
            .map_err(map_transport)
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.provider.get_block_number().await.map_err(map_transport)
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.provider.get_gas_price().await.map_err(map_transport)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, RpcError> {
        self.provider
            .estimate_gas(&self.request(tx))
            .await
            .map_err(map_transport)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<B256, RpcError> {
        let pending = self
            .provider
            .send_transaction(self.request(tx))
            .await
            .map_err(map_transport)?;
        let tx_hash = *pending.tx_hash();
        debug!(layer = %self.layer, tx_hash = %tx_hash, to = %tx.to, "Transaction broadcast");
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let Some(receipt) = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(map_transport)?
        else {
            return Ok(None);
        };

        // Pending receipts carry no block number yet
        let Some(block_number) = receipt.block_number else {
            return Ok(None);
        };

        Ok(Some(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number,
            status: receipt.status(),
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }))
    }

    async fn call(&self, tx: &TxRequest, block: Option<u64>) -> Result<Bytes, RpcError> {
        let request = self.request(tx);
        let call = self.provider.call(&request);
        let call = match block {
            Some(number) => call.block(BlockId::number(number)),
            None => call,
        };
        call.await.map_err(map_transport)
    }

    async fn storage_proof(
        &self,
        address: Address,
        slot: B256,
        block: u64,
    ) -> Result<StorageProof, RpcError> {
        let response = self
            .provider
            .get_proof(address, vec![slot])
            .block_id(BlockId::number(block))
            .await
            .map_err(map_transport)?;

        let proof = response
            .storage_proof
            .into_iter()
            .next()
            .map(|entry| entry.proof)
            .ok_or_else(|| RpcError::Decode("eth_getProof returned no storage proof".into()))?;

        Ok(StorageProof {
            storage_hash: response.storage_hash,
            proof,
        })
    }

    async fn block_header(&self, block: Option<u64>) -> Result<Option<BlockHeader>, RpcError> {
        let raw: Option<RawHeader> = self
            .provider
            .raw_request("eth_getBlockByNumber".into(), (block_tag(block), false))
            .await
            .map_err(map_transport)?;
        Ok(raw.map(BlockHeader::from))
    }
}

/// Connect to `rpc_url` as `layer`, signing with `identity`
pub async fn connect_endpoint(
    layer: Layer,
    rpc_url: &str,
    identity: &SignerIdentity,
) -> Result<Arc<dyn ChainEndpoint>, BridgeError> {
    let url = rpc_url.parse().map_err(|e| {
        BridgeError::InvalidConfiguration(format!("invalid {} RPC URL '{}': {}", layer, rpc_url, e))
    })?;

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(identity.wallet())
        .on_http(url);

    let chain_id = provider.get_chain_id().await.map_err(map_transport)?;

    info!(
        layer = %layer,
        rpc_url = %rpc_url,
        chain_id = chain_id,
        address = %identity.address(),
        "Connected chain endpoint"
    );

    Ok(Arc::new(EvmEndpoint::new(
        provider,
        layer,
        chain_id,
        identity.address(),
    )))
}
