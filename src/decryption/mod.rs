// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User decryption
//!
//! - **Session**: per-request state machine holding the ephemeral keypair
//! - **Request / Response**: relayer wire format and schema normalisation
//! - **Relayer**: HTTP transport, plus an in-process relayer for simulation
//! - **Client**: cache, request coalescing and the zero-handle shortcut

pub mod client;
pub mod errors;
pub mod local_relayer;
pub mod relayer;
pub mod request;
pub mod response;
pub mod session;

pub use client::DecryptionClient;
pub use errors::{DecryptFailure, SessionError};
pub use local_relayer::{InProcessRelayer, ResponseMode};
pub use relayer::{HttpRelayerClient, RelayerClient};
pub use request::{HandleContractPair, RequestValidity, UserDecryptRequest};
pub use response::{normalize, ClearValue, HandleOutcome, RawClearValue, ResponseSchema};
pub use session::{DecryptionSession, SessionParams, SessionState};
