//! CLI configuration
//!
//! Everything comes from the environment (optionally a `.env` file). Contract
//! addresses default to the OP Goerli deployment.

use eyre::{eyre, Result, WrapErr};
use opbridge_rs::redact::Redacted;
use opbridge_rs::MessengerConfig;
use std::env;
use std::str::FromStr;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// BIP-39 phrase of the signing account (same account on both layers)
    pub mnemonic: Redacted<String>,

    /// L1 RPC URL
    pub l1_rpc_url: String,
    /// L2 RPC URL
    pub l2_rpc_url: String,

    /// Contracts, bridges and timing handed to the messenger
    pub messenger: MessengerConfig,

    /// Block explorer base URL for transaction links (e.g. https://goerli.etherscan.io)
    pub explorer_url: Option<String>,
}

impl Config {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    /// Build from the current process environment only
    pub fn from_env() -> Result<Self> {
        let infura_key = env::var("GOERLI_INFURA_KEY").ok();
        let l1_rpc_url = rpc_url("L1_RPC_URL", infura_key.as_deref(), "goerli")?;
        let l2_rpc_url = rpc_url("L2_RPC_URL", infura_key.as_deref(), "optimism-goerli")?;

        let mut messenger = MessengerConfig::goerli_defaults();
        if let Ok(bridge) = env::var("L1_STANDARD_BRIDGE") {
            for pair in &mut messenger.bridges {
                pair.l1_bridge = bridge.clone();
            }
        }
        if let Ok(address) = env::var("L1_CROSS_DOMAIN_MESSENGER") {
            messenger.contracts.l1_cross_domain_messenger = address;
        }
        if let Ok(address) = env::var("OPTIMISM_PORTAL") {
            messenger.contracts.optimism_portal = address;
        }
        if let Ok(address) = env::var("L2_OUTPUT_ORACLE") {
            messenger.contracts.l2_output_oracle = address;
        }
        if let Some(secs) = parse_var("CHALLENGE_PERIOD_SECS")? {
            messenger.challenge_period_secs = secs;
        }
        if let Some(ms) = parse_var("POLL_INTERVAL_MS")? {
            messenger.poll_interval_ms = ms;
        }
        if let Some(secs) = parse_var("WAIT_TIMEOUT_SECS")? {
            messenger.wait_timeout_secs = secs;
        }
        if let Some(confirmations) = parse_var("CONFIRMATIONS")? {
            messenger.confirmations = confirmations;
        }
        if let Some(gas) = parse_var("MIN_GAS_LIMIT")? {
            messenger.min_gas_limit = gas;
        }
        messenger
            .validate()
            .wrap_err("Invalid bridge configuration")?;

        Ok(Self {
            mnemonic: Redacted(env::var("MNEMONIC").map_err(|_| eyre!("MNEMONIC required"))?),
            l1_rpc_url,
            l2_rpc_url,
            messenger,
            explorer_url: env::var("EXPLORER_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string()),
        })
    }
}

/// Explicit URL, else the Infura endpoint for `network` when a key is set
fn rpc_url(name: &str, infura_key: Option<&str>, network: &str) -> Result<String> {
    if let Ok(url) = env::var(name) {
        return Ok(url);
    }
    match infura_key {
        Some(key) => Ok(format!("https://{}.infura.io/v3/{}", network, key)),
        None => Err(eyre!("{} required (or set GOERLI_INFURA_KEY)", name)),
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| eyre!("Invalid {}: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
