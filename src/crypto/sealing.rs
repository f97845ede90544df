// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cleartext sealing for user decryption
//!
//! The relayer never returns a bare cleartext over the wire. For each value it
//! generates a one-off sender key, performs ECDH with the session's ephemeral
//! public key and encrypts the 32-byte big-endian value with the ciphertext
//! handle as AAD.
//!
//! Wire layout: `sender_pub (33) ‖ nonce (24) ‖ ciphertext+tag`

use k256::SecretKey;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::ecdh::derive_shared_key;
use super::encryption::{decrypt_with_aead, encrypt_with_aead, NONCE_LEN};
use super::error::CryptoError;

const SENDER_KEY_LEN: usize = 33;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue(#[serde(with = "crate::fhe::engine::hex_bytes")] pub Vec<u8>);

impl SealedValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Seal `plaintext` to `recipient_pub` (33 or 65 byte SEC1)
pub fn seal_value(
    plaintext: &[u8],
    aad: &[u8],
    recipient_pub: &[u8],
) -> Result<SealedValue, CryptoError> {
    let sender = SecretKey::random(&mut OsRng);
    let key = derive_shared_key(recipient_pub, &sender.to_bytes())?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = encrypt_with_aead(plaintext, &nonce, aad, &key)?;

    let mut out = Vec::with_capacity(SENDER_KEY_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&sender.public_key().to_sec1_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(SealedValue(out))
}

/// Open a sealed value with the recipient's 32-byte private key
pub fn open_value(
    sealed: &SealedValue,
    aad: &[u8],
    recipient_priv: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let bytes = sealed.as_bytes();
    if bytes.len() < SENDER_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidPayload {
            field: "sealed".to_string(),
            reason: format!("too short: {} bytes", bytes.len()),
        });
    }
    let (sender_pub, rest) = bytes.split_at(SENDER_KEY_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_shared_key(sender_pub, recipient_priv)?;
    decrypt_with_aead(ciphertext, nonce, aad, &key)
}
