// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ciphertext handles
//!
//! A handle is the 32-byte on-chain reference to a value held by the FHE
//! coprocessor. Handles are immutable: every homomorphic operation yields a
//! fresh handle, and the all-zero handle denotes a balance slot that was
//! never written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque reference to an encrypted value
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// Handle of a slot that has never been written
    pub const ZERO: CiphertextHandle = CiphertextHandle([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// 0x-prefixed lowercase hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex with or without `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, HandleParseError> {
        let stripped = s.trim().trim_start_matches("0x").trim_start_matches("0X");
        let bytes = hex::decode(stripped).map_err(|e| HandleParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, HandleParseError> {
        if bytes.len() != 32 {
            return Err(HandleParseError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", self.to_hex())
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CiphertextHandle {
    type Err = HandleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for CiphertextHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<CiphertextHandle> for [u8; 32] {
    fn from(handle: CiphertextHandle) -> Self {
        handle.0
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleParseError {
    #[error("invalid handle hex: {0}")]
    InvalidHex(String),

    #[error("invalid handle length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Bit width of an encrypted integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    /// Encrypted boolean (comparison results)
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
}

impl BitWidth {
    pub fn bits(&self) -> usize {
        match self {
            BitWidth::Bool => 1,
            BitWidth::U8 => 8,
            BitWidth::U16 => 16,
            BitWidth::U32 => 32,
            BitWidth::U64 => 64,
            BitWidth::U128 => 128,
            BitWidth::U256 => 256,
        }
    }

    /// Largest value representable at this width
    pub fn max_value(&self) -> ethers::types::U256 {
        use ethers::types::U256;
        match self {
            BitWidth::U256 => U256::MAX,
            other => (U256::one() << other.bits()) - U256::one(),
        }
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitWidth::Bool => f.write_str("ebool"),
            other => write!(f, "euint{}", other.bits()),
        }
    }
}
