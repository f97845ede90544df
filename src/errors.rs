// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crate-level error taxonomy
//!
//! Area errors (`LedgerError`, `InputError`, `DecryptFailure`, ...) convert
//! into [`RollError`], which is what callers outside the crate match on.
//! Only relayer unavailability is worth retrying, and only on explicit user
//! action.

use thiserror::Error;

use crate::acl::AclError;
use crate::crypto::{CryptoError, WalletError};
use crate::decryption::errors::{DecryptFailure, SessionError};
use crate::fhe::{EngineError, InputError};
use crate::ledger::LedgerError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollError {
    /// Local pre-flight failure (bad address, zero amount, overflow)
    #[error("validation failed: {0}")]
    Validation(String),

    /// On-chain constraint failed; carries the reason string unmodified
    #[error("execution reverted: {0}")]
    ContractRevert(String),

    #[error("invalid encrypted input: {0}")]
    ProofInvalid(String),

    #[error("relayer unavailable: {0}")]
    RelayerUnavailable(String),

    #[error("not authorized to decrypt: {0}")]
    AuthorizationDenied(String),

    #[error("user cancelled the signature request")]
    UserCancelled,

    #[error("unsupported network: expected chain {expected}, got {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("malformed relayer response: {0}")]
    MalformedResponse(String),

    #[error("FHE context is not initialized")]
    NotInitialized,

    #[error("encrypted arithmetic engine error: {0}")]
    Engine(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Host-chain RPC failure outside the contract itself
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl RollError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RollError::RelayerUnavailable(_))
    }
}

impl From<LedgerError> for RollError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted { reason } => RollError::ContractRevert(reason),
            LedgerError::ProofInvalid { reason } => RollError::ProofInvalid(reason),
            LedgerError::Engine(e) => RollError::Engine(e.to_string()),
            LedgerError::Acl(e) => RollError::Engine(e.to_string()),
        }
    }
}

impl From<EngineError> for RollError {
    fn from(err: EngineError) -> Self {
        LedgerError::from(err).into()
    }
}

impl From<AclError> for RollError {
    fn from(err: AclError) -> Self {
        RollError::Engine(err.to_string())
    }
}

impl From<InputError> for RollError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::NotInitialized | InputError::Disposed => RollError::NotInitialized,
            InputError::ValueOutOfRange { .. }
            | InputError::Empty
            | InputError::IndexOutOfRange { .. } => RollError::Validation(err.to_string()),
            InputError::MalformedPayload(msg) => RollError::Engine(msg),
            InputError::Engine(e) => e.into(),
        }
    }
}

impl From<DecryptFailure> for RollError {
    fn from(err: DecryptFailure) -> Self {
        match err {
            DecryptFailure::NetworkUnavailable(msg) => RollError::RelayerUnavailable(msg),
            DecryptFailure::AuthorizationDenied(msg) => RollError::AuthorizationDenied(msg),
            DecryptFailure::UserCancelled => RollError::UserCancelled,
            DecryptFailure::MalformedResponse(msg) => RollError::MalformedResponse(msg),
        }
    }
}

impl From<SessionError> for RollError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Failed(failure) => failure.into(),
            SessionError::Validation(msg) => RollError::Validation(msg),
            SessionError::InvalidTransition { .. } => RollError::Validation(err.to_string()),
        }
    }
}

impl From<WalletError> for RollError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => RollError::UserCancelled,
            other => RollError::Validation(other.to_string()),
        }
    }
}

impl From<CryptoError> for RollError {
    fn from(err: CryptoError) -> Self {
        RollError::Validation(err.to_string())
    }
}
