//! Messenger configuration
//!
//! Everything the core needs is passed in through these structs; the
//! library itself never reads files or the environment.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::BridgeError;
use crate::registry::{parse_address, BridgeConfig};
use crate::retry::{PollPolicy, WaitOptions};

/// `L2CrossDomainMessenger` predeploy
pub const L2_CROSS_DOMAIN_MESSENGER: Address = address!("4200000000000000000000000000000000000007");
/// `L2StandardBridge` predeploy
pub const L2_STANDARD_BRIDGE: Address = address!("4200000000000000000000000000000000000010");
/// `L2ToL1MessagePasser` predeploy
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");
/// Legacy ERC-20 address standing for ether on L2
pub const L2_ETH_TOKEN: Address = address!("DeadDeAddeAddEAddeadDEaDDEAdDeaDDeAD0000");

/// Contract addresses the tracker reads from
///
/// Raw strings as configured; `resolve` parses and validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub l1_cross_domain_messenger: String,
    pub optimism_portal: String,
    pub l2_output_oracle: String,
    #[serde(default = "default_l2_messenger")]
    pub l2_cross_domain_messenger: String,
    #[serde(default = "default_message_passer")]
    pub l2_to_l1_message_passer: String,
}

fn default_l2_messenger() -> String {
    L2_CROSS_DOMAIN_MESSENGER.to_string()
}

fn default_message_passer() -> String {
    L2_TO_L1_MESSAGE_PASSER.to_string()
}

/// Parsed form of `ContractAddresses`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedContracts {
    pub l1_cross_domain_messenger: Address,
    pub optimism_portal: Address,
    pub l2_output_oracle: Address,
    pub l2_cross_domain_messenger: Address,
    pub l2_to_l1_message_passer: Address,
}

impl ContractAddresses {
    pub fn resolve(&self) -> Result<ResolvedContracts, BridgeError> {
        Ok(ResolvedContracts {
            l1_cross_domain_messenger: parse_address(
                "l1_cross_domain_messenger",
                &self.l1_cross_domain_messenger,
            )?,
            optimism_portal: parse_address("optimism_portal", &self.optimism_portal)?,
            l2_output_oracle: parse_address("l2_output_oracle", &self.l2_output_oracle)?,
            l2_cross_domain_messenger: parse_address(
                "l2_cross_domain_messenger",
                &self.l2_cross_domain_messenger,
            )?,
            l2_to_l1_message_passer: parse_address(
                "l2_to_l1_message_passer",
                &self.l2_to_l1_message_passer,
            )?,
        })
    }
}

/// Full configuration for a `CrossDomainMessenger`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessengerConfig {
    pub contracts: ContractAddresses,
    pub bridges: Vec<BridgeConfig>,
    /// Finalization period of the `L2OutputOracle`, in seconds
    pub challenge_period_secs: u64,
    /// Delay between status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Default deadline for a single wait, in seconds
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    /// Blocks a transaction must be buried under before it counts as mined
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Gas limit requested for execution on the other layer
    #[serde(default = "default_min_gas_limit")]
    pub min_gas_limit: u32,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_wait_timeout_secs() -> u64 {
    60 * 60
}

fn default_confirmations() -> u64 {
    1
}

fn default_min_gas_limit() -> u32 {
    200_000
}

impl MessengerConfig {
    /// Contracts and bridges of the OP Goerli deployment. Handy for local
    /// runs; production should configure addresses explicitly.
    pub fn goerli_defaults() -> Self {
        Self {
            contracts: ContractAddresses {
                l1_cross_domain_messenger: "0x232903d65f058c94957c8bB5942775264faFC69f".into(),
                optimism_portal: "0xc1f6CB9144a62e23EAA5014950709879617c0541".into(),
                l2_output_oracle: "0xC4a5A26fAFAb352d5e4D286b4b521b4cDb59b98b".into(),
                l2_cross_domain_messenger: default_l2_messenger(),
                l2_to_l1_message_passer: default_message_passer(),
            },
            bridges: vec![
                BridgeConfig::native("0xD267904d2D4b6FD38a41Fb2fA547C2A5E124f142"),
                BridgeConfig::standard("0xD267904d2D4b6FD38a41Fb2fA547C2A5E124f142"),
            ],
            challenge_period_secs: 12,
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_secs: default_wait_timeout_secs(),
            confirmations: default_confirmations(),
            min_gas_limit: default_min_gas_limit(),
        }
    }

    pub fn challenge_period(&self) -> Duration {
        Duration::from_secs(self.challenge_period_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::with_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Wait options built from the configured defaults
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(
            Duration::from_secs(self.wait_timeout_secs),
            self.poll_policy(),
        )
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.contracts.resolve()?;
        if self.poll_interval_ms == 0 {
            return Err(BridgeError::InvalidConfiguration(
                "poll interval must be greater than 0".to_string(),
            ));
        }
        if self.confirmations == 0 {
            return Err(BridgeError::InvalidConfiguration(
                "confirmations must be at least 1".to_string(),
            ));
        }
        if self.bridges.is_empty() {
            return Err(BridgeError::InvalidConfiguration(
                "at least one bridge must be configured".to_string(),
            ));
        }
        Ok(())
    }
}
