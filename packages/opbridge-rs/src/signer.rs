//! Signer identity
//!
//! One BIP-39 mnemonic, derived at `m/44'/60'/0'/0/0`, signs on both layers.
//! The phrase is kept in a `Redacted` wrapper so it never reaches logs.

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner},
};
use tracing::info;

use crate::error::BridgeError;
use crate::redact::Redacted;

const VALID_WORD_COUNTS: [usize; 4] = [12, 15, 18, 24];

/// Account derived from a mnemonic, shared by the L1 and L2 endpoints
#[derive(Clone)]
pub struct SignerIdentity {
    phrase: Redacted<String>,
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for SignerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerIdentity")
            .field("address", &self.signer.address())
            .field("phrase", &self.phrase)
            .finish()
    }
}

impl SignerIdentity {
    /// Derive the first account of `phrase`
    pub fn from_mnemonic(phrase: &str) -> Result<Self, BridgeError> {
        Self::from_mnemonic_index(phrase, 0)
    }

    /// Derive account `index` (`m/44'/60'/0'/0/{index}`) of `phrase`
    pub fn from_mnemonic_index(phrase: &str, index: u32) -> Result<Self, BridgeError> {
        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let words = normalized.split(' ').filter(|w| !w.is_empty()).count();
        if !VALID_WORD_COUNTS.contains(&words) {
            return Err(BridgeError::InvalidConfiguration(format!(
                "mnemonic must have 12, 15, 18 or 24 words, got {}",
                words
            )));
        }

        bip39::Mnemonic::parse(normalized.as_str()).map_err(|e| {
            BridgeError::InvalidConfiguration(format!("invalid mnemonic: {}", e))
        })?;

        let signer = MnemonicBuilder::<English>::default()
            .phrase(normalized.as_str())
            .index(index)
            .and_then(|builder| builder.build())
            .map_err(|e| {
                BridgeError::InvalidConfiguration(format!("mnemonic derivation failed: {}", e))
            })?;

        info!(address = %signer.address(), index, "Signer identity derived");

        Ok(Self {
            phrase: Redacted(normalized),
            signer,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Wallet for alloy providers
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}
