// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted arithmetic engine interface
//!
//! The ledger never sees plaintext balances. It asks the engine to combine
//! handles and receives new handles back. The engine cannot be branched on:
//! conditional logic is expressed by computing both sides and calling
//! [`FheEngine::select`] with an encrypted boolean.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::handle::{BitWidth, CiphertextHandle};

/// Encrypted operand submitted with a transaction (`externalEuintXX` + proof)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCiphertext {
    pub handle: CiphertextHandle,
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown ciphertext handle {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("operand width mismatch: {left} vs {right}")]
    WidthMismatch { left: BitWidth, right: BitWidth },

    #[error("handle {0} is not an encrypted boolean")]
    NotBoolean(CiphertextHandle),

    #[error("value does not fit in {width}")]
    ValueOutOfRange { width: BitWidth },

    #[error("invalid input proof: {0}")]
    ProofInvalid(String),

    #[error("encrypted input {0} was already consumed")]
    InputAlreadyConsumed(CiphertextHandle),

    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Homomorphic operations the ledger relies on
///
/// Implementations are synchronous: ledger calls execute one at a time.
pub trait FheEngine: Send + Sync {
    /// Encrypt a public constant (`FHE.asEuintXX`)
    fn trivial_encrypt(&self, value: u64, width: BitWidth) -> Result<CiphertextHandle, EngineError>;

    /// Validate an externally produced ciphertext for `(contract, user)` and
    /// return the handle usable by `contract`. Each input is accepted once;
    /// a rejected input, including one of the wrong `width`, stays unused.
    fn verify_input(
        &self,
        input: &ExternalCiphertext,
        contract: Address,
        user: Address,
        width: BitWidth,
    ) -> Result<CiphertextHandle, EngineError>;

    /// Wrapping addition at the operands' width
    fn add(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError>;

    /// Wrapping subtraction at the operands' width
    fn sub(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError>;

    /// Encrypted `a >= b`
    fn ge(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError>;

    /// Encrypted `condition ? if_true : if_false`
    fn select(
        &self,
        condition: CiphertextHandle,
        if_true: CiphertextHandle,
        if_false: CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError>;

    /// Gateway decryption of a handle the ACL has made public. The engine
    /// does not consult the ACL; callers check `is_public` first.
    fn public_decrypt(&self, handle: CiphertextHandle) -> Result<U256, EngineError>;
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}
