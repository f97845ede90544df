// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error type shared by the decryption-side cryptography: EIP-712 signature
//! recovery, ephemeral key handling, ECDH key derivation and sealed value
//! opening.
//!
//! ## Error Variants
//!
//! - **InvalidSignature**: ECDSA signature parsing or recovery failed
//! - **InvalidKey**: Invalid key (wrong size, invalid point, malformed hex)
//! - **KeyDerivationFailed**: ECDH or HKDF key derivation failed
//! - **DecryptionFailed**: AEAD opening failed (wrong key, tampered value, AAD mismatch)
//! - **InvalidPayload**: Sealed payload validation failed (size, encoding)
//! - **Other**: Library errors or unexpected failures
//!
//! ## Usage Example
//!
//! ```rust
//! use fhe_roll_ledger::crypto::CryptoError;
//!
//! fn check_signature(sig: &[u8]) -> Result<(), CryptoError> {
//!     if sig.len() != 65 {
//!         return Err(CryptoError::InvalidSignature {
//!             operation: "user_decrypt".to_string(),
//!             reason: format!("expected 65 bytes, got {}", sig.len()),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// ECDSA signature parsing or recovery failed
    InvalidSignature {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid cryptographic key
    InvalidKey {
        /// Type of key that failed (e.g., "ephemeral_public_key", "wallet_private_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// ECDH shared secret or HKDF expansion failed
    KeyDerivationFailed {
        /// Which key derivation operation failed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// AEAD opening failed
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// Sealed payload validation failed
    InvalidPayload {
        /// Which field failed validation
        field: String,
        /// Specific failure reason
        reason: String,
    },

    /// Generic error for library errors or unexpected failures
    Other(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidSignature { operation, reason } => {
                write!(f, "Invalid signature during {}: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::Other(msg) => {
                write!(f, "Crypto error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

impl From<k256::elliptic_curve::Error> for CryptoError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "unknown".to_string(),
            reason: format!("k256 error: {}", err),
        }
    }
}

impl From<chacha20poly1305::aead::Error> for CryptoError {
    fn from(err: chacha20poly1305::aead::Error) -> Self {
        CryptoError::DecryptionFailed {
            operation: "AEAD".to_string(),
            reason: format!("chacha20poly1305 error: {}", err),
        }
    }
}
