// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client Encryption Builder
//!
//! Turns plaintext amounts into `(handles, inputProof)` bound to a
//! `(contract, user)` pair before they are submitted with a transaction:
//!
//! ```ignore
//! let input = context
//!     .create_encrypted_input(ledger_address, alice)
//!     .add32(50)?
//!     .encrypt()
//!     .await?;
//! ledger.transfer(alice, bob, 50, &input.external(0)?)?;
//! ```
//!
//! Engines have answered with two JSON shapes over time; both are accepted
//! and normalised into [`EncryptedInput`]. Anything else is rejected.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::context::FheContext;
use super::engine::{EngineError, ExternalCiphertext};
use super::handle::{BitWidth, CiphertextHandle};

/// One plaintext value queued for encryption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainInput {
    pub value: U256,
    pub width: BitWidth,
}

impl PlainInput {
    pub fn new(value: U256, width: BitWidth) -> Self {
        Self { value, width }
    }
}

/// Client-side access to the engine's input encryption
#[async_trait]
pub trait InputEncryptor: Send + Sync {
    /// Encrypt `values` for use by `contract` when submitted by `user`.
    /// Returns the engine's raw JSON answer.
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[PlainInput],
    ) -> Result<serde_json::Value, EngineError>;
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("FHE context is not initialized")]
    NotInitialized,

    #[error("FHE context was disposed")]
    Disposed,

    #[error("value {value} does not fit in {width}")]
    ValueOutOfRange { value: U256, width: BitWidth },

    #[error("no values were added to the encrypted input")]
    Empty,

    #[error("engine returned an unrecognised payload: {0}")]
    MalformedPayload(String),

    #[error("input index {index} out of range ({len} handles)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Encrypted values plus the proof that binds them to `(contract, user)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<CiphertextHandle>,
    pub input_proof: Vec<u8>,
    pub contract: Address,
    pub user: Address,
}

impl EncryptedInput {
    /// Transaction operand for the value at `index`
    pub fn external(&self, index: usize) -> Result<ExternalCiphertext, InputError> {
        let handle = self
            .handles
            .get(index)
            .copied()
            .ok_or(InputError::IndexOutOfRange {
                index,
                len: self.handles.len(),
            })?;
        Ok(ExternalCiphertext {
            handle,
            proof: self.input_proof.clone(),
        })
    }

    pub fn input_proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.input_proof))
    }
}

/// Handle encodings seen in engine answers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHandle {
    Hex(String),
    Bytes(Vec<u8>),
}

impl RawHandle {
    fn into_handle(self) -> Result<CiphertextHandle, InputError> {
        match self {
            RawHandle::Hex(s) => CiphertextHandle::from_hex(&s),
            RawHandle::Bytes(b) => CiphertextHandle::from_slice(&b),
        }
        .map_err(|e| InputError::MalformedPayload(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProof {
    Hex(String),
    Bytes(Vec<u8>),
}

impl RawProof {
    fn into_bytes(self) -> Result<Vec<u8>, InputError> {
        match self {
            RawProof::Hex(s) => hex::decode(s.trim_start_matches("0x"))
                .map_err(|e| InputError::MalformedPayload(format!("proof hex: {}", e))),
            RawProof::Bytes(b) => Ok(b),
        }
    }
}

/// The two answer shapes engines emit
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEncryptedPayload {
    Structured {
        handles: Vec<RawHandle>,
        #[serde(rename = "inputProof")]
        input_proof: RawProof,
    },
    Flat {
        handle: RawHandle,
        proof: RawProof,
    },
}

/// Normalise an engine answer into `(handles, proof)`
pub fn normalize_payload(
    payload: serde_json::Value,
    expected_handles: usize,
) -> Result<(Vec<CiphertextHandle>, Vec<u8>), InputError> {
    let raw: RawEncryptedPayload = serde_json::from_value(payload)
        .map_err(|_| InputError::MalformedPayload("expected {handles, inputProof} or {handle, proof}".to_string()))?;

    let (handles, proof) = match raw {
        RawEncryptedPayload::Structured {
            handles,
            input_proof,
        } => (
            handles
                .into_iter()
                .map(RawHandle::into_handle)
                .collect::<Result<Vec<_>, _>>()?,
            input_proof.into_bytes()?,
        ),
        RawEncryptedPayload::Flat { handle, proof } => {
            (vec![handle.into_handle()?], proof.into_bytes()?)
        }
    };

    if handles.len() != expected_handles {
        return Err(InputError::MalformedPayload(format!(
            "expected {} handle(s), engine returned {}",
            expected_handles,
            handles.len()
        )));
    }
    if proof.is_empty() {
        return Err(InputError::MalformedPayload("empty input proof".to_string()));
    }
    Ok((handles, proof))
}

/// Accumulates plaintext values, then encrypts them in one engine call
pub struct EncryptedInputBuilder<'a> {
    context: &'a FheContext,
    contract: Address,
    user: Address,
    values: Vec<PlainInput>,
}

impl<'a> EncryptedInputBuilder<'a> {
    pub(crate) fn new(context: &'a FheContext, contract: Address, user: Address) -> Self {
        Self {
            context,
            contract,
            user,
            values: Vec::new(),
        }
    }

    pub fn add(mut self, value: U256, width: BitWidth) -> Result<Self, InputError> {
        if value > width.max_value() {
            return Err(InputError::ValueOutOfRange { value, width });
        }
        self.values.push(PlainInput::new(value, width));
        Ok(self)
    }

    pub fn add_bool(self, value: bool) -> Result<Self, InputError> {
        self.add(U256::from(value as u8), BitWidth::Bool)
    }

    pub fn add8(self, value: u8) -> Result<Self, InputError> {
        self.add(U256::from(value), BitWidth::U8)
    }

    pub fn add16(self, value: u16) -> Result<Self, InputError> {
        self.add(U256::from(value), BitWidth::U16)
    }

    pub fn add32(self, value: u32) -> Result<Self, InputError> {
        self.add(U256::from(value), BitWidth::U32)
    }

    pub fn add64(self, value: u64) -> Result<Self, InputError> {
        self.add(U256::from(value), BitWidth::U64)
    }

    pub fn add128(self, value: u128) -> Result<Self, InputError> {
        self.add(U256::from(value), BitWidth::U128)
    }

    pub fn add256(self, value: U256) -> Result<Self, InputError> {
        self.add(value, BitWidth::U256)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub async fn encrypt(self) -> Result<EncryptedInput, InputError> {
        if self.values.is_empty() {
            return Err(InputError::Empty);
        }
        let encryptor = self.context.encryptor().await?;
        let payload = encryptor
            .encrypt(self.contract, self.user, &self.values)
            .await?;
        let (handles, input_proof) = normalize_payload(payload, self.values.len())?;

        debug!(
            "encrypted {} value(s) for contract {:?} / user {:?}",
            handles.len(),
            self.contract,
            self.user
        );

        Ok(EncryptedInput {
            handles,
            input_proof,
            contract: self.contract,
            user: self.user,
        })
    }
}
