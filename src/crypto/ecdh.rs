// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange
//!
//! secp256k1 Diffie-Hellman between a decryption session's ephemeral key and
//! the relayer's per-value sender key. Both sides derive the same 32-byte
//! XChaCha20-Poly1305 key with HKDF-SHA256.

use hkdf::Hkdf;
use k256::{elliptic_curve::sec1::FromEncodedPoint, EncodedPoint, PublicKey, SecretKey};
use sha2::Sha256;

use super::error::CryptoError;

const HKDF_INFO: &[u8] = b"fhe-roll/user-decrypt/v1";

/// Derive a shared encryption key using ECDH
///
/// # Arguments
///
/// * `peer_pub` - Peer public key (33 bytes compressed or 65 bytes uncompressed)
/// * `own_priv` - Own private key (32 bytes)
///
/// # Returns
///
/// A 32-byte encryption key suitable for XChaCha20-Poly1305
pub fn derive_shared_key(peer_pub: &[u8], own_priv: &[u8]) -> Result<[u8; 32], CryptoError> {
    if own_priv.len() != 32 {
        return Err(CryptoError::InvalidKey {
            key_type: "private_key".to_string(),
            reason: format!("expected 32 bytes, got {}", own_priv.len()),
        });
    }

    let secret = SecretKey::from_slice(own_priv).map_err(|e| CryptoError::InvalidKey {
        key_type: "private_key".to_string(),
        reason: e.to_string(),
    })?;

    if peer_pub.len() != 33 && peer_pub.len() != 65 {
        return Err(CryptoError::InvalidKey {
            key_type: "peer_public_key".to_string(),
            reason: format!("expected 33 or 65 bytes, got {}", peer_pub.len()),
        });
    }

    let encoded_point = EncodedPoint::from_bytes(peer_pub).map_err(|e| CryptoError::InvalidKey {
        key_type: "peer_public_key".to_string(),
        reason: e.to_string(),
    })?;

    let peer = Option::<PublicKey>::from(PublicKey::from_encoded_point(&encoded_point)).ok_or_else(
        || CryptoError::InvalidKey {
            key_type: "peer_public_key".to_string(),
            reason: "point is not on the curve".to_string(),
        },
    )?;

    let shared_secret = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());

    let hkdf = Hkdf::<Sha256>::new(None, shared_secret.raw_secret_bytes());
    let mut derived_key = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut derived_key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;

    Ok(derived_key)
}
