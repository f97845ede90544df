// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDSA Signature Recovery
//!
//! Recovers the Ethereum address that produced a 65-byte `r ‖ s ‖ v`
//! signature over a 32-byte digest. The relayer uses this to confirm that a
//! user-decrypt request was authorised by the wallet it names.

use ethers::types::Address;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use std::fmt;

use super::error::CryptoError;
use super::keccak256;

/// 65-byte EIP-712 signature (`r ‖ s ‖ v`, v in {27, 28})
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Eip712Signature(pub [u8; 65]);

impl Eip712Signature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 65] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature {
            operation: "parse".to_string(),
            reason: format!("expected 65 bytes, got {}", bytes.len()),
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", self.to_hex_unprefixed())
    }

    /// Relayer wire form: no `0x` prefix
    pub fn to_hex_unprefixed(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Eip712Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eip712Signature({})", self.to_hex())
    }
}

/// Ethereum address of an uncompressed or compressed secp256k1 public key
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // skip the 0x04 prefix
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recover the signer's address from a signature over `digest`
///
/// # Arguments
///
/// * `signature` - 65 bytes: r (32) ‖ s (32) ‖ v (0/1 or 27/28)
/// * `digest` - 32-byte prehash (e.g. an EIP-712 digest)
///
/// # Errors
///
/// Returns `CryptoError::InvalidSignature` for wrong sizes, a bad recovery
/// id, or when no public key can be recovered.
pub fn recover_signer(signature: &[u8], digest: &[u8]) -> Result<Address, CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignature {
            operation: "recover".to_string(),
            reason: format!("expected 65 bytes, got {}", signature.len()),
        });
    }
    if digest.len() != 32 {
        return Err(CryptoError::InvalidSignature {
            operation: "recover".to_string(),
            reason: format!("expected 32-byte digest, got {}", digest.len()),
        });
    }

    let mut v = signature[64];
    // Ethereum-style recovery ids
    if v >= 27 {
        v -= 27;
    }
    if v > 3 {
        return Err(CryptoError::InvalidSignature {
            operation: "recover".to_string(),
            reason: format!("invalid recovery id {}", signature[64]),
        });
    }

    let recovery_id = RecoveryId::try_from(v).map_err(|e| CryptoError::InvalidSignature {
        operation: "recover".to_string(),
        reason: e.to_string(),
    })?;
    let sig = Signature::try_from(&signature[..64]).map_err(|e| CryptoError::InvalidSignature {
        operation: "recover".to_string(),
        reason: e.to_string(),
    })?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id).map_err(|e| {
        CryptoError::InvalidSignature {
            operation: "recover".to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(address_from_verifying_key(&key))
}
