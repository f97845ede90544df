// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wallet signing seam
//!
//! The decryption client never holds the user's wallet key directly; it asks
//! a [`WalletSigner`] to sign typed data. Browser wallets, hardware wallets
//! and the local key used by the CLI all sit behind this trait. A user
//! declining the prompt surfaces as [`WalletError::Rejected`].

use async_trait::async_trait;
use ethers::types::Address;
use k256::ecdsa::SigningKey;
use thiserror::Error;
use tracing::debug;

use super::eip712::UserDecryptTypedData;
use super::signature::{address_from_verifying_key, Eip712Signature};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("user rejected the signature request")]
    Rejected,

    #[error("wallet unavailable: {0}")]
    Unavailable(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Chain the wallet is currently connected to
    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn sign_typed_data(
        &self,
        typed_data: &UserDecryptTypedData,
    ) -> Result<Eip712Signature, WalletError>;
}

/// Wallet backed by an in-memory secp256k1 key
pub struct LocalWalletSigner {
    key: SigningKey,
    address: Address,
    chain_id: u64,
}

impl LocalWalletSigner {
    pub fn new(key: SigningKey, chain_id: u64) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self {
            key,
            address,
            chain_id,
        }
    }

    pub fn random(chain_id: u64) -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng), chain_id)
    }

    pub fn from_private_key_hex(hex_key: &str, chain_id: u64) -> Result<Self, WalletError> {
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|e| WalletError::Unavailable(format!("private key hex: {}", e)))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| WalletError::Unavailable(format!("private key: {}", e)))?;
        Ok(Self::new(key, chain_id))
    }
}

impl std::fmt::Debug for LocalWalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWalletSigner")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id)
    }

    async fn sign_typed_data(
        &self,
        typed_data: &UserDecryptTypedData,
    ) -> Result<Eip712Signature, WalletError> {
        let digest = typed_data.digest();
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| WalletError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;

        debug!("signed user-decrypt request for {:?}", self.address);
        Ok(Eip712Signature(bytes))
    }
}
