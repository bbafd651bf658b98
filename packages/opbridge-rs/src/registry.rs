//! Bridge adapter registry
//!
//! Maps bridge names to their L1/L2 contract pair and the calldata encoding
//! for deposits and withdrawals. All addresses are validated when the
//! registry is built, before any network call.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::config::{L2_ETH_TOKEN, L2_STANDARD_BRIDGE};
use crate::contracts::{L1StandardBridge, L2StandardBridge};
use crate::endpoint::TxRequest;
use crate::error::BridgeError;
use crate::types::AssetKind;

/// Name of the ether bridge pair
pub const NATIVE_ASSET: &str = "native-asset";
/// Name of the ERC-20 bridge pair
pub const STANDARD_TOKEN: &str = "standard-token";

/// Encoding family of a bridge pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BridgeKind {
    /// `depositETHTo` / `withdrawTo(L2_ETH_TOKEN, ..)` with value attached
    NativeAsset,
    /// `depositERC20To` / `withdrawTo(l2Token, ..)`
    StandardToken,
}

/// Bridge pair as configured (unvalidated)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub name: String,
    pub kind: BridgeKind,
    pub l1_bridge: String,
    #[serde(default = "default_l2_bridge")]
    pub l2_bridge: String,
}

fn default_l2_bridge() -> String {
    L2_STANDARD_BRIDGE.to_string()
}

impl BridgeConfig {
    /// Ether pair using the L2 standard bridge predeploy
    pub fn native(l1_bridge: &str) -> Self {
        Self {
            name: NATIVE_ASSET.to_string(),
            kind: BridgeKind::NativeAsset,
            l1_bridge: l1_bridge.to_string(),
            l2_bridge: default_l2_bridge(),
        }
    }

    /// ERC-20 pair using the L2 standard bridge predeploy
    pub fn standard(l1_bridge: &str) -> Self {
        Self {
            name: STANDARD_TOKEN.to_string(),
            kind: BridgeKind::StandardToken,
            l1_bridge: l1_bridge.to_string(),
            l2_bridge: default_l2_bridge(),
        }
    }
}

/// Validated, immutable bridge pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgePair {
    pub name: String,
    pub kind: BridgeKind,
    pub l1_bridge: Address,
    pub l2_bridge: Address,
}

impl BridgePair {
    pub fn supports(&self, asset: &AssetKind) -> bool {
        match (self.kind, asset) {
            (BridgeKind::NativeAsset, AssetKind::Native) => true,
            (BridgeKind::StandardToken, AssetKind::Token { .. }) => true,
            _ => false,
        }
    }

    fn check(&self, asset: &AssetKind) -> Result<(), BridgeError> {
        if self.supports(asset) {
            Ok(())
        } else {
            Err(BridgeError::InvalidConfiguration(format!(
                "bridge '{}' ({:?}) cannot carry {:?}",
                self.name, self.kind, asset
            )))
        }
    }

    /// L1 transaction that starts a deposit of `amount` to `to` on L2
    pub fn encode_deposit(
        &self,
        asset: &AssetKind,
        to: Address,
        amount: U256,
        min_gas_limit: u32,
    ) -> Result<TxRequest, BridgeError> {
        self.check(asset)?;
        let request = match *asset {
            AssetKind::Native => TxRequest {
                to: self.l1_bridge,
                data: L1StandardBridge::depositETHToCall {
                    _to: to,
                    _minGasLimit: min_gas_limit,
                    _extraData: Bytes::new(),
                }
                .abi_encode()
                .into(),
                value: amount,
            },
            AssetKind::Token { l1_token, l2_token } => TxRequest {
                to: self.l1_bridge,
                data: L1StandardBridge::depositERC20ToCall {
                    _l1Token: l1_token,
                    _l2Token: l2_token,
                    _to: to,
                    _amount: amount,
                    _minGasLimit: min_gas_limit,
                    _extraData: Bytes::new(),
                }
                .abi_encode()
                .into(),
                value: U256::ZERO,
            },
        };
        Ok(request)
    }

    /// L2 transaction that starts a withdrawal of `amount` to `to` on L1
    pub fn encode_withdraw(
        &self,
        asset: &AssetKind,
        to: Address,
        amount: U256,
        min_gas_limit: u32,
    ) -> Result<TxRequest, BridgeError> {
        self.check(asset)?;
        let (l2_token, value) = match *asset {
            AssetKind::Native => (L2_ETH_TOKEN, amount),
            AssetKind::Token { l2_token, .. } => (l2_token, U256::ZERO),
        };
        Ok(TxRequest {
            to: self.l2_bridge,
            data: L2StandardBridge::withdrawToCall {
                _l2Token: l2_token,
                _to: to,
                _amount: amount,
                _minGasLimit: min_gas_limit,
                _extraData: Bytes::new(),
            }
            .abi_encode()
            .into(),
            value,
        })
    }
}

/// Named bridge pairs, resolved and validated up front
#[derive(Debug, Clone, Default)]
pub struct BridgeAdapterRegistry {
    pairs: HashMap<String, BridgePair>,
}

impl BridgeAdapterRegistry {
    pub fn new(configs: &[BridgeConfig]) -> Result<Self, BridgeError> {
        let mut pairs = HashMap::new();
        for config in configs {
            let pair = BridgePair {
                name: config.name.clone(),
                kind: config.kind,
                l1_bridge: parse_address(&format!("{}.l1_bridge", config.name), &config.l1_bridge)?,
                l2_bridge: parse_address(&format!("{}.l2_bridge", config.name), &config.l2_bridge)?,
            };
            if pairs.insert(config.name.clone(), pair).is_some() {
                return Err(BridgeError::InvalidConfiguration(format!(
                    "bridge '{}' configured twice",
                    config.name
                )));
            }
            debug!(bridge = %config.name, kind = ?config.kind, "Registered bridge pair");
        }
        Ok(Self { pairs })
    }

    pub fn get(&self, name: &str) -> Result<&BridgePair, BridgeError> {
        self.pairs.get(name).ok_or_else(|| {
            BridgeError::InvalidConfiguration(format!("unknown bridge '{}'", name))
        })
    }

    /// Default pair for an asset: `native-asset` for ether, `standard-token`
    /// for ERC-20s, falling back to any pair of the right kind.
    pub fn for_asset(&self, asset: &AssetKind) -> Result<&BridgePair, BridgeError> {
        let preferred = if asset.is_native() {
            NATIVE_ASSET
        } else {
            STANDARD_TOKEN
        };
        if let Some(pair) = self.pairs.get(preferred) {
            if pair.supports(asset) {
                return Ok(pair);
            }
        }
        let mut candidates: Vec<&BridgePair> =
            self.pairs.values().filter(|p| p.supports(asset)).collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates.into_iter().next().ok_or_else(|| {
            BridgeError::InvalidConfiguration(format!("no bridge configured for {:?}", asset))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pairs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parse a `0x`-prefixed, 20-byte, non-zero hex address
pub fn parse_address(field: &str, value: &str) -> Result<Address, BridgeError> {
    let invalid = |why: &str| {
        BridgeError::InvalidConfiguration(format!("{}: '{}' {}", field, value, why))
    };

    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| invalid("is missing the 0x prefix"))?;
    if digits.len() != 40 {
        return Err(invalid("must be 40 hex digits"));
    }
    hex::decode(digits).map_err(|_| invalid("is not valid hex"))?;

    let address = Address::from_str(value).map_err(|e| invalid(&e.to_string()))?;
    if address.is_zero() {
        return Err(invalid("is the zero address"));
    }
    Ok(address)
}
