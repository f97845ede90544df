// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User-decrypt request sent to the relayer

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fhe::CiphertextHandle;

/// One ciphertext and the contract whose ACL grant covers it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    pub handle: CiphertextHandle,
    pub contract_address: Address,
}

impl HandleContractPair {
    pub fn new(handle: CiphertextHandle, contract_address: Address) -> Self {
        Self {
            handle,
            contract_address,
        }
    }
}

/// Signed validity window, as decimal strings on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestValidity {
    pub start_timestamp: String,
    pub duration_days: String,
}

/// Everything the relayer needs to authorise and answer a user decrypt
///
/// The ephemeral private key travels with the request object so the relayer
/// client can open sealed answers, but it is never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDecryptRequest {
    pub handle_contract_pairs: Vec<HandleContractPair>,
    pub request_validity: RequestValidity,
    pub contracts_chain_id: u64,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    /// Hex without the `0x` prefix
    pub signature: String,
    /// Ephemeral public key, hex without `0x`
    pub public_key: String,
    pub extra_data: String,
    #[serde(skip_serializing, default)]
    pub private_key: Option<String>,
}

impl UserDecryptRequest {
    pub fn handles(&self) -> Vec<CiphertextHandle> {
        self.handle_contract_pairs.iter().map(|p| p.handle).collect()
    }

    pub fn start_timestamp(&self) -> Option<u64> {
        self.request_validity.start_timestamp.parse().ok()
    }

    pub fn duration_days(&self) -> Option<u64> {
        self.request_validity.duration_days.parse().ok()
    }
}

impl fmt::Debug for UserDecryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDecryptRequest")
            .field("handle_contract_pairs", &self.handle_contract_pairs)
            .field("request_validity", &self.request_validity)
            .field("contracts_chain_id", &self.contracts_chain_id)
            .field("contract_addresses", &self.contract_addresses)
            .field("user_address", &self.user_address)
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}
