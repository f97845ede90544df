// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decryption failure classes

use thiserror::Error;

use crate::crypto::WalletError;

/// Why a handle (or a whole session) did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptFailure {
    /// Relayer unreachable, timed out or returned 5xx. Retryable.
    #[error("relayer unavailable: {0}")]
    NetworkUnavailable(String),

    /// The requester (or the contract) holds no grant for the handle, or the
    /// authorisation itself was rejected. Needs a new grant, not a retry.
    #[error("not authorized to decrypt: {0}")]
    AuthorizationDenied(String),

    #[error("user cancelled the signature request")]
    UserCancelled,

    #[error("malformed relayer response: {0}")]
    MalformedResponse(String),
}

impl DecryptFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecryptFailure::NetworkUnavailable(_))
    }

    /// Stable label for logs and metrics
    pub fn class(&self) -> &'static str {
        match self {
            DecryptFailure::NetworkUnavailable(_) => "network_unavailable",
            DecryptFailure::AuthorizationDenied(_) => "authorization_denied",
            DecryptFailure::UserCancelled => "user_cancelled",
            DecryptFailure::MalformedResponse(_) => "malformed_response",
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        DecryptFailure::MalformedResponse(msg.into())
    }
}

impl From<WalletError> for DecryptFailure {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => DecryptFailure::UserCancelled,
            WalletError::Unavailable(msg) => DecryptFailure::NetworkUnavailable(msg),
            WalletError::SigningFailed(msg) => DecryptFailure::AuthorizationDenied(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Failed(#[from] DecryptFailure),

    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("invalid decryption request: {0}")]
    Validation(String),
}
