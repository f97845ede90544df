// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relayer response schema
//!
//! Relayers have answered in three shapes over time. They are modelled as
//! explicit schema versions, selected by top-level shape in priority order:
//!
//! 1. [`ResponseSchema::ClearValues`]: `{"clearValues": {handle: value}, "denied": [handle]}`
//! 2. [`ResponseSchema::Ordered`]: `[value, ...]` in request order
//! 3. [`ResponseSchema::Direct`]: `{handle: value}`
//!
//! A value is a JSON integer, a decimal or `0x` hex string, a boolean, or a
//! `{"sealed": "0x.."}` object sealed to the session's ephemeral key.
//! Anything else is rejected; nothing silently becomes zero.

use ethers::types::U256;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use super::errors::DecryptFailure;
use super::request::HandleContractPair;
use crate::crypto::{EphemeralKeypair, SealedValue};
use crate::fhe::CiphertextHandle;

/// Decrypted plaintext, kept at full width until the caller narrows it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearValue(pub U256);

impl ClearValue {
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Narrow to the ledger's native `euint32` width
    pub fn to_u32(&self) -> Result<u32, DecryptFailure> {
        if self.0 > U256::from(u32::MAX) {
            return Err(DecryptFailure::malformed(format!(
                "value {} does not fit in 32 bits",
                self.0
            )));
        }
        Ok(self.0.as_u32())
    }

    pub fn to_u64(&self) -> Result<u64, DecryptFailure> {
        if self.0 > U256::from(u64::MAX) {
            return Err(DecryptFailure::malformed(format!(
                "value {} does not fit in 64 bits",
                self.0
            )));
        }
        Ok(self.0.as_u64())
    }

    pub fn to_bool(&self) -> Result<bool, DecryptFailure> {
        if self.0.is_zero() {
            Ok(false)
        } else if self.0 == U256::one() {
            Ok(true)
        } else {
            Err(DecryptFailure::malformed(format!(
                "value {} is not a boolean",
                self.0
            )))
        }
    }
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawClearValue {
    Sealed { sealed: SealedValue },
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearValuesBody {
    clear_values: HashMap<String, RawClearValue>,
    #[serde(default)]
    denied: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ResponseSchema {
    ClearValues {
        clear_values: HashMap<String, RawClearValue>,
        denied: Vec<String>,
    },
    Ordered(Vec<RawClearValue>),
    Direct(HashMap<String, RawClearValue>),
}

impl ResponseSchema {
    /// Pick the schema version from the top-level shape, then decode strictly
    pub fn parse(raw: serde_json::Value) -> Result<Self, DecryptFailure> {
        let schema = if raw.is_array() {
            serde_json::from_value(raw).map(ResponseSchema::Ordered)
        } else if raw.get("clearValues").is_some() {
            serde_json::from_value::<ClearValuesBody>(raw).map(|body| ResponseSchema::ClearValues {
                clear_values: body.clear_values,
                denied: body.denied,
            })
        } else if raw.is_object() {
            serde_json::from_value(raw).map(ResponseSchema::Direct)
        } else {
            return Err(DecryptFailure::malformed(format!(
                "response matches no known schema version: {}",
                raw
            )));
        };
        schema.map_err(|e| DecryptFailure::malformed(format!("invalid response body: {}", e)))
    }

    pub fn version(&self) -> &'static str {
        match self {
            ResponseSchema::ClearValues { .. } => "clear-values",
            ResponseSchema::Ordered(_) => "ordered",
            ResponseSchema::Direct(_) => "direct",
        }
    }
}

/// Per-handle result of one relayer round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleOutcome {
    pub pair: HandleContractPair,
    pub result: Result<ClearValue, DecryptFailure>,
}

fn parse_number(n: &serde_json::Number) -> Result<U256, DecryptFailure> {
    if let Some(v) = n.as_u64() {
        return Ok(U256::from(v));
    }
    // negative, fractional, or beyond u64 (already lossy as f64)
    Err(DecryptFailure::malformed(format!(
        "{} is not an exact unsigned integer",
        n
    )))
}

fn parse_text(s: &str) -> Result<U256, DecryptFailure> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 64 {
            None
        } else {
            U256::from_str_radix(hex, 16).ok()
        }
    } else if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        U256::from_dec_str(s).ok()
    } else {
        None
    };
    parsed.ok_or_else(|| DecryptFailure::malformed(format!("'{}' is not a number", s)))
}

fn open_sealed(
    sealed: &SealedValue,
    handle: &CiphertextHandle,
    keypair: Option<&EphemeralKeypair>,
) -> Result<U256, DecryptFailure> {
    let keypair = keypair
        .ok_or_else(|| DecryptFailure::malformed("sealed value but no ephemeral key to open it"))?;
    let bytes = keypair
        .open(sealed, handle.as_bytes())
        .map_err(|e| DecryptFailure::malformed(format!("cannot open sealed value: {}", e)))?;
    if bytes.len() != 32 {
        return Err(DecryptFailure::malformed(format!(
            "sealed value is {} bytes, expected 32",
            bytes.len()
        )));
    }
    Ok(U256::from_big_endian(&bytes))
}

impl RawClearValue {
    fn resolve(
        &self,
        handle: &CiphertextHandle,
        keypair: Option<&EphemeralKeypair>,
    ) -> Result<ClearValue, DecryptFailure> {
        let value = match self {
            RawClearValue::Sealed { sealed } => open_sealed(sealed, handle, keypair)?,
            RawClearValue::Number(n) => parse_number(n)?,
            RawClearValue::Text(s) => parse_text(s)?,
            RawClearValue::Bool(b) => U256::from(*b as u8),
        };
        Ok(ClearValue(value))
    }
}

fn index_by_handle(
    map: HashMap<String, RawClearValue>,
) -> Result<HashMap<CiphertextHandle, RawClearValue>, DecryptFailure> {
    map.into_iter()
        .map(|(k, v)| {
            CiphertextHandle::from_hex(&k)
                .map(|h| (h, v))
                .map_err(|e| DecryptFailure::malformed(format!("key '{}': {}", k, e)))
        })
        .collect()
}

/// Turn a raw relayer answer into one outcome per requested pair, in order
///
/// Returns `Err` only when the answer as a whole is unusable.
pub fn normalize(
    raw: serde_json::Value,
    pairs: &[HandleContractPair],
    keypair: Option<&EphemeralKeypair>,
) -> Result<Vec<HandleOutcome>, DecryptFailure> {
    let schema = ResponseSchema::parse(raw)?;

    let outcomes = match schema {
        ResponseSchema::Ordered(values) => {
            if values.len() != pairs.len() {
                return Err(DecryptFailure::malformed(format!(
                    "expected {} values, relayer returned {}",
                    pairs.len(),
                    values.len()
                )));
            }
            pairs
                .iter()
                .zip(values.iter())
                .map(|(pair, value)| HandleOutcome {
                    pair: *pair,
                    result: value.resolve(&pair.handle, keypair),
                })
                .collect()
        }
        ResponseSchema::ClearValues {
            clear_values,
            denied,
        } => {
            let values = index_by_handle(clear_values)?;
            let denied = denied
                .iter()
                .map(|h| CiphertextHandle::from_hex(h))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DecryptFailure::malformed(format!("denied list: {}", e)))?;
            outcomes_from_map(pairs, &values, &denied, keypair)
        }
        ResponseSchema::Direct(map) => {
            let values = index_by_handle(map)?;
            outcomes_from_map(pairs, &values, &[], keypair)
        }
    };
    Ok(outcomes)
}

fn outcomes_from_map(
    pairs: &[HandleContractPair],
    values: &HashMap<CiphertextHandle, RawClearValue>,
    denied: &[CiphertextHandle],
    keypair: Option<&EphemeralKeypair>,
) -> Vec<HandleOutcome> {
    pairs
        .iter()
        .map(|pair| {
            let result = if denied.contains(&pair.handle) {
                Err(DecryptFailure::AuthorizationDenied(format!(
                    "no grant on {} for this requester",
                    pair.handle
                )))
            } else {
                match values.get(&pair.handle) {
                    Some(value) => value.resolve(&pair.handle, keypair),
                    None => Err(DecryptFailure::malformed(format!(
                        "no value returned for {}",
                        pair.handle
                    ))),
                }
            };
            HandleOutcome {
                pair: *pair,
                result,
            }
        })
        .collect()
}
