// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger revert taxonomy

use thiserror::Error;

use crate::acl::AclError;
use crate::fhe::EngineError;

/// Revert reason strings, surfaced unmodified to callers
pub mod reason {
    pub const AMOUNT_EXCEEDS_MAX_MINT: &str = "Amount exceeds max mint";
    pub const AMOUNT_MUST_BE_POSITIVE: &str = "Amount must be greater than 0";
    pub const MUST_SEND_ETH: &str = "Must send ETH";
    pub const AMOUNT_TOO_LARGE: &str = "amount too large";
    pub const INSUFFICIENT_CONTRACT_ETH: &str = "insufficient contract ETH balance";
    pub const INVALID_RECIPIENT: &str = "Invalid recipient";
    pub const CANNOT_TRANSFER_TO_SELF: &str = "Cannot transfer to self";
    pub const ONLY_OWNER: &str = "Only owner";
    pub const NOT_BALANCE_OWNER_OR_ADMIN: &str = "Only balance owner or admin";
    pub const NO_BALANCE: &str = "No balance to make public";
    pub const UNKNOWN_SWAP_OUT: &str = "Unknown swap-out request";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    #[error("invalid encrypted input: {reason}")]
    ProofInvalid { reason: String },

    #[error("encrypted arithmetic failed: {0}")]
    Engine(EngineError),

    #[error(transparent)]
    Acl(#[from] AclError),
}

impl LedgerError {
    pub fn revert(reason: &str) -> Self {
        LedgerError::Reverted {
            reason: reason.to_string(),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            LedgerError::Reverted { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<EngineError> for LedgerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ProofInvalid(reason) => LedgerError::ProofInvalid { reason },
            EngineError::InputAlreadyConsumed(handle) => LedgerError::ProofInvalid {
                reason: format!("encrypted input {} was already consumed", handle),
            },
            other => LedgerError::Engine(other),
        }
    }
}
