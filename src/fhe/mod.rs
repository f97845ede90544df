// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted arithmetic boundary
//!
//! - **Handles**: 32-byte references to ciphertexts held by the coprocessor
//! - **Engine**: add / sub / ge / select over handles, input verification
//! - **Context**: explicitly initialised client-side engine session
//! - **Input builder**: plaintext → `(handles, inputProof)` bound to contract and user
//! - **Local coprocessor**: in-process engine used for simulation and tests

pub mod context;
pub mod coprocessor;
pub mod engine;
pub mod handle;
pub mod input;

pub use context::FheContext;
pub use coprocessor::{LocalCoprocessor, PayloadShape};
pub use engine::{EngineError, ExternalCiphertext, FheEngine};
pub use handle::{BitWidth, CiphertextHandle, HandleParseError};
pub use input::{
    normalize_payload, EncryptedInput, EncryptedInputBuilder, InputEncryptor, InputError,
    PlainInput,
};
