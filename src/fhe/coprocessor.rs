// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process FHE coprocessor
//!
//! Stands in for the external coprocessor and KMS when running the ledger
//! locally (CLI simulation, tests, benchmarks). Values live behind handles in
//! memory; arithmetic wraps at the operand width exactly like the real
//! engine. Input proofs are keccak commitments over
//! `(contract, user, chain, handles, values)` and are accepted once per handle.
//!
//! Only [`crate::decryption::InProcessRelayer`] may read plaintexts back out.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::engine::{EngineError, ExternalCiphertext, FheEngine};
use super::handle::{BitWidth, CiphertextHandle};
use super::input::{InputEncryptor, PlainInput};
use crate::crypto::keccak256;

const PROOF_VERSION: u8 = 1;
const HANDLE_VERSION: u8 = 0;

/// JSON shape the coprocessor uses when answering input encryption requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{"handles": [...], "inputProof": "0x.."}`
    Structured,
    /// `{"handle": [u8; 32], "proof": "0x.."}` (single value only)
    Flat,
}

#[derive(Debug, Clone, Copy)]
struct StoredValue {
    value: U256,
    width: BitWidth,
}

#[derive(Debug, Clone)]
struct InputRecord {
    contract: Address,
    user: Address,
    handles: Vec<CiphertextHandle>,
    digest: [u8; 32],
}

#[derive(Default)]
struct CoprocessorState {
    values: HashMap<CiphertextHandle, StoredValue>,
    inputs: HashMap<Vec<u8>, InputRecord>,
    consumed: HashSet<CiphertextHandle>,
    counter: u64,
}

pub struct LocalCoprocessor {
    chain_id: u64,
    payload_shape: PayloadShape,
    state: Mutex<CoprocessorState>,
}

impl LocalCoprocessor {
    pub fn new(chain_id: u64) -> Self {
        Self::with_payload_shape(chain_id, PayloadShape::Structured)
    }

    pub fn with_payload_shape(chain_id: u64, payload_shape: PayloadShape) -> Self {
        Self {
            chain_id,
            payload_shape,
            state: Mutex::new(CoprocessorState::default()),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Number of ciphertexts currently held
    pub fn ciphertext_count(&self) -> usize {
        self.lock().map(|s| s.values.len()).unwrap_or(0)
    }

    /// Read a plaintext back out (KMS role)
    pub(crate) fn reveal(&self, handle: CiphertextHandle) -> Result<(U256, BitWidth), EngineError> {
        let state = self.lock()?;
        state
            .values
            .get(&handle)
            .map(|v| (v.value, v.width))
            .ok_or(EngineError::UnknownHandle(handle))
    }

    fn lock(&self) -> Result<MutexGuard<'_, CoprocessorState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Unavailable("coprocessor state lock poisoned".to_string()))
    }

    fn next_handle(
        &self,
        state: &mut CoprocessorState,
        op: &str,
        operands: &[CiphertextHandle],
        width: BitWidth,
    ) -> CiphertextHandle {
        state.counter += 1;
        let mut preimage = Vec::with_capacity(8 + op.len() + 8 + operands.len() * 32);
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(op.as_bytes());
        preimage.extend_from_slice(&state.counter.to_be_bytes());
        for operand in operands {
            preimage.extend_from_slice(operand.as_bytes());
        }
        let mut bytes = keccak256(&preimage);
        bytes[30] = width_code(width);
        bytes[31] = HANDLE_VERSION;
        CiphertextHandle::from_bytes(bytes)
    }

    fn store(
        &self,
        state: &mut CoprocessorState,
        op: &str,
        operands: &[CiphertextHandle],
        value: U256,
        width: BitWidth,
    ) -> CiphertextHandle {
        let handle = self.next_handle(state, op, operands, width);
        state.values.insert(handle, StoredValue { value, width });
        debug!("coprocessor {} -> {} ({})", op, handle, width);
        handle
    }

    fn load(state: &CoprocessorState, handle: CiphertextHandle) -> Result<StoredValue, EngineError> {
        state
            .values
            .get(&handle)
            .copied()
            .ok_or(EngineError::UnknownHandle(handle))
    }

    fn load_pair(
        state: &CoprocessorState,
        a: CiphertextHandle,
        b: CiphertextHandle,
    ) -> Result<(StoredValue, StoredValue), EngineError> {
        let left = Self::load(state, a)?;
        let right = Self::load(state, b)?;
        if left.width != right.width {
            return Err(EngineError::WidthMismatch {
                left: left.width,
                right: right.width,
            });
        }
        if left.width == BitWidth::Bool {
            return Err(EngineError::WidthMismatch {
                left: left.width,
                right: BitWidth::U8,
            });
        }
        Ok((left, right))
    }

    fn proof_digest(
        &self,
        contract: Address,
        user: Address,
        handles: &[CiphertextHandle],
        values: &[PlainInput],
    ) -> [u8; 32] {
        let mut preimage = Vec::new();
        preimage.extend_from_slice(contract.as_bytes());
        preimage.extend_from_slice(user.as_bytes());
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        for handle in handles {
            preimage.extend_from_slice(handle.as_bytes());
        }
        for input in values {
            let mut word = [0u8; 32];
            input.value.to_big_endian(&mut word);
            preimage.extend_from_slice(&word);
            preimage.push(width_code(input.width));
        }
        keccak256(&preimage)
    }
}

fn width_code(width: BitWidth) -> u8 {
    match width {
        BitWidth::Bool => 0,
        BitWidth::U8 => 2,
        BitWidth::U16 => 3,
        BitWidth::U32 => 4,
        BitWidth::U64 => 5,
        BitWidth::U128 => 6,
        BitWidth::U256 => 8,
    }
}

fn wrap(value: U256, width: BitWidth) -> U256 {
    match width {
        BitWidth::U256 => value,
        other => value & other.max_value(),
    }
}

impl FheEngine for LocalCoprocessor {
    fn trivial_encrypt(&self, value: u64, width: BitWidth) -> Result<CiphertextHandle, EngineError> {
        let value = U256::from(value);
        if value > width.max_value() {
            return Err(EngineError::ValueOutOfRange { width });
        }
        let mut state = self.lock()?;
        Ok(self.store(&mut state, "trivial", &[], value, width))
    }

    fn verify_input(
        &self,
        input: &ExternalCiphertext,
        contract: Address,
        user: Address,
        width: BitWidth,
    ) -> Result<CiphertextHandle, EngineError> {
        let mut state = self.lock()?;
        let record = state
            .inputs
            .get(&input.proof)
            .cloned()
            .ok_or_else(|| EngineError::ProofInvalid("proof not recognised by input verifier".to_string()))?;

        if record.contract != contract {
            return Err(EngineError::ProofInvalid(
                "proof is bound to a different contract".to_string(),
            ));
        }
        if record.user != user {
            return Err(EngineError::ProofInvalid(
                "proof is bound to a different user".to_string(),
            ));
        }
        if !record.handles.contains(&input.handle) {
            return Err(EngineError::ProofInvalid(
                "handle is not covered by this proof".to_string(),
            ));
        }
        if input.proof.len() != 33 || input.proof[1..] != record.digest {
            return Err(EngineError::ProofInvalid("proof digest mismatch".to_string()));
        }
        let stored = Self::load(&state, input.handle)?;
        if stored.width != width {
            return Err(EngineError::WidthMismatch {
                left: width,
                right: stored.width,
            });
        }
        if !state.consumed.insert(input.handle) {
            return Err(EngineError::InputAlreadyConsumed(input.handle));
        }

        debug!("accepted encrypted input {} for contract {:?}", input.handle, contract);
        Ok(input.handle)
    }

    fn add(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError> {
        let mut state = self.lock()?;
        let (left, right) = Self::load_pair(&state, a, b)?;
        let sum = wrap(left.value.overflowing_add(right.value).0, left.width);
        Ok(self.store(&mut state, "add", &[a, b], sum, left.width))
    }

    fn sub(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError> {
        let mut state = self.lock()?;
        let (left, right) = Self::load_pair(&state, a, b)?;
        let diff = wrap(left.value.overflowing_sub(right.value).0, left.width);
        Ok(self.store(&mut state, "sub", &[a, b], diff, left.width))
    }

    fn ge(&self, a: CiphertextHandle, b: CiphertextHandle) -> Result<CiphertextHandle, EngineError> {
        let mut state = self.lock()?;
        let (left, right) = Self::load_pair(&state, a, b)?;
        let flag = if left.value >= right.value { U256::one() } else { U256::zero() };
        Ok(self.store(&mut state, "ge", &[a, b], flag, BitWidth::Bool))
    }

    fn select(
        &self,
        condition: CiphertextHandle,
        if_true: CiphertextHandle,
        if_false: CiphertextHandle,
    ) -> Result<CiphertextHandle, EngineError> {
        let mut state = self.lock()?;
        let cond = Self::load(&state, condition)?;
        if cond.width != BitWidth::Bool {
            return Err(EngineError::NotBoolean(condition));
        }
        let t = Self::load(&state, if_true)?;
        let f = Self::load(&state, if_false)?;
        if t.width != f.width {
            return Err(EngineError::WidthMismatch {
                left: t.width,
                right: f.width,
            });
        }
        let chosen = if cond.value.is_zero() { f.value } else { t.value };
        Ok(self.store(
            &mut state,
            "select",
            &[condition, if_true, if_false],
            chosen,
            t.width,
        ))
    }

    fn public_decrypt(&self, handle: CiphertextHandle) -> Result<U256, EngineError> {
        let (value, width) = self.reveal(handle)?;
        debug!("public decryption of {} ({})", handle, width);
        Ok(value)
    }
}

#[async_trait]
impl InputEncryptor for LocalCoprocessor {
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[PlainInput],
    ) -> Result<serde_json::Value, EngineError> {
        for input in values {
            if input.value > input.width.max_value() {
                return Err(EngineError::ValueOutOfRange { width: input.width });
            }
        }

        let mut state = self.lock()?;
        let handles: Vec<CiphertextHandle> = values
            .iter()
            .map(|input| self.store(&mut state, "input", &[], input.value, input.width))
            .collect();

        let digest = self.proof_digest(contract, user, &handles, values);
        let mut proof = Vec::with_capacity(33);
        proof.push(PROOF_VERSION);
        proof.extend_from_slice(&digest);

        debug!("registered input proof for {} value(s)", handles.len());

        state.inputs.insert(
            proof.clone(),
            InputRecord {
                contract,
                user,
                handles: handles.clone(),
                digest,
            },
        );

        let proof_hex = format!("0x{}", hex::encode(&proof));
        let payload = match (self.payload_shape, handles.as_slice()) {
            (PayloadShape::Flat, [single]) => json!({
                "handle": single.as_bytes().to_vec(),
                "proof": proof_hex,
            }),
            _ => json!({
                "handles": handles.iter().map(|h| h.to_hex()).collect::<Vec<_>>(),
                "inputProof": proof_hex,
            }),
        };
        Ok(payload)
    }
}
