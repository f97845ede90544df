// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EIP-712 typed data for user decryption
//!
//! The user's wallet signs a `UserDecryptRequestVerification` authorising the
//! relayer to reveal ciphertexts of the listed contracts to the holder of
//! the ephemeral public key, for `durationDays` starting at `startTimestamp`.
//!
//! The domain is the gateway's decryption verifier, not the host chain:
//! `chainId` is the gateway chain id and `verifyingContract` the verifier.

use ethers::abi::{encode, Token};
use ethers::types::{Address, U256};
use serde_json::{json, Value};

use super::keccak256;

pub const DOMAIN_NAME: &str = "Decryption";
pub const DOMAIN_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "UserDecryptRequestVerification";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const USER_DECRYPT_TYPE: &str = "UserDecryptRequestVerification(bytes publicKey,address[] contractAddresses,uint256 startTimestamp,uint256 durationDays,bytes extraData)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl DecryptionDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        keccak256(&encode(&[
            Token::FixedBytes(keccak256(DOMAIN_TYPE.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(DOMAIN_NAME.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(DOMAIN_VERSION.as_bytes()).to_vec()),
            Token::Uint(U256::from(self.chain_id)),
            Token::Address(self.verifying_contract),
        ]))
    }
}

/// The message a wallet signs to authorise one user-decrypt request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecryptTypedData {
    pub domain: DecryptionDomain,
    pub public_key: Vec<u8>,
    pub contract_addresses: Vec<Address>,
    pub start_timestamp: u64,
    pub duration_days: u64,
    pub extra_data: Vec<u8>,
}

impl UserDecryptTypedData {
    pub fn struct_hash(&self) -> [u8; 32] {
        // address[] hashes the concatenation of the 32-byte padded entries
        let addresses: Vec<Token> = self
            .contract_addresses
            .iter()
            .map(|a| Token::Address(*a))
            .collect();
        let addresses_hash = keccak256(&encode(&addresses));

        keccak256(&encode(&[
            Token::FixedBytes(keccak256(USER_DECRYPT_TYPE.as_bytes()).to_vec()),
            Token::FixedBytes(keccak256(&self.public_key).to_vec()),
            Token::FixedBytes(addresses_hash.to_vec()),
            Token::Uint(U256::from(self.start_timestamp)),
            Token::Uint(U256::from(self.duration_days)),
            Token::FixedBytes(keccak256(&self.extra_data).to_vec()),
        ]))
    }

    /// `keccak256(0x1901 ‖ domainSeparator ‖ structHash)`
    pub fn digest(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(&self.domain.separator());
        preimage.extend_from_slice(&self.struct_hash());
        keccak256(&preimage)
    }

    /// Typed data as an `eth_signTypedData_v4` JSON document
    pub fn to_json(&self) -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                PRIMARY_TYPE: [
                    { "name": "publicKey", "type": "bytes" },
                    { "name": "contractAddresses", "type": "address[]" },
                    { "name": "startTimestamp", "type": "uint256" },
                    { "name": "durationDays", "type": "uint256" },
                    { "name": "extraData", "type": "bytes" }
                ]
            },
            "primaryType": PRIMARY_TYPE,
            "domain": {
                "name": DOMAIN_NAME,
                "version": DOMAIN_VERSION,
                "chainId": self.domain.chain_id,
                "verifyingContract": format!("{:?}", self.domain.verifying_contract),
            },
            "message": {
                "publicKey": format!("0x{}", hex::encode(&self.public_key)),
                "contractAddresses": self
                    .contract_addresses
                    .iter()
                    .map(|a| format!("{:?}", a))
                    .collect::<Vec<_>>(),
                "startTimestamp": self.start_timestamp.to_string(),
                "durationDays": self.duration_days.to_string(),
                "extraData": format!("0x{}", hex::encode(&self.extra_data)),
            }
        })
    }
}
