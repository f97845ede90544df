// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ephemeral decryption keypair
//!
//! Generated fresh for every decryption session. The public half is signed
//! into the EIP-712 request; the relayer seals cleartexts to it. The private
//! half never leaves the process and is redacted from `Debug` output.

use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use std::fmt;

use super::error::CryptoError;
use super::sealing::{open_value, SealedValue};

pub struct EphemeralKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))?;
        let secret = SecretKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidKey {
            key_type: "ephemeral_private_key".to_string(),
            reason: e.to_string(),
        })?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// 33-byte SEC1 compressed public key
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.to_sec1_bytes().into_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Unprefixed hex, for the relayer request only
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    /// Open a value the relayer sealed to this keypair
    pub fn open(&self, sealed: &SealedValue, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        open_value(sealed, aad, &self.secret.to_bytes())
    }
}

impl fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}
