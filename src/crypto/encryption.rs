// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Encryption/Decryption
//!
//! Authenticated encryption used to seal cleartext values to a decryption
//! session's ephemeral key. The ciphertext handle travels as AAD so a sealed
//! value cannot be replayed under a different handle.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use super::error::CryptoError;

pub const NONCE_LEN: usize = 24;
pub const KEY_LEN: usize = 32;

fn cipher_for(key: &[u8], nonce: &[u8], operation: &str) -> Result<XChaCha20Poly1305, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidPayload {
            field: "nonce".to_string(),
            reason: format!("expected {} bytes, got {}", NONCE_LEN, nonce.len()),
        });
    }
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKey {
            key_type: "aead_key".to_string(),
            reason: format!("expected {} bytes, got {}", KEY_LEN, key.len()),
        });
    }
    XChaCha20Poly1305::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "aead_key".to_string(),
        reason: format!("{} cipher setup: {}", operation, e),
    })
}

/// Decrypt data using XChaCha20-Poly1305 AEAD
///
/// # Arguments
///
/// * `ciphertext` - Encrypted data (includes authentication tag)
/// * `nonce` - 24-byte nonce
/// * `aad` - Additional authenticated data (may be empty)
/// * `key` - 32-byte encryption key
///
/// # Errors
///
/// Fails when the tag does not verify (wrong key, tampered data, AAD
/// mismatch) or the nonce/key sizes are wrong.
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key, nonce, "decrypt")?;
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed {
            operation: "aead_open".to_string(),
            reason: "authentication tag mismatch".to_string(),
        })
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// Returns the ciphertext with the 16-byte tag appended.
///
/// **Never reuse a nonce with the same key.**
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(key, nonce, "encrypt")?;
    cipher
        .encrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Other(format!("encryption failed: {}", e)))
}
