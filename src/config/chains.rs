// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::RollError;

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const SEPOLIA_GATEWAY_CHAIN_ID: u64 = 55815;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub relayer_url: String,
    pub native_token: TokenInfo,
    pub fhevm: FhevmAddresses,
    /// Chain id of the EIP-712 decryption domain (the gateway chain)
    pub gateway_chain_id: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

/// Host-chain fhEVM system contracts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FhevmAddresses {
    pub acl: Address,
    pub kms_verifier: Address,
    pub input_verifier: Address,
    /// `verifyingContract` of the user-decryption EIP-712 domain
    pub decryption_verifier: Address,
    pub input_verification_verifier: Address,
}

impl ChainConfig {
    pub fn sepolia() -> Self {
        ChainConfig {
            chain_id: SEPOLIA_CHAIN_ID,
            name: "Sepolia".to_string(),
            rpc_url: std::env::var("SEPOLIA_RPC_URL")
                .unwrap_or_else(|_| "https://eth-sepolia.public.blastapi.io".to_string()),
            relayer_url: std::env::var("SEPOLIA_RELAYER_URL")
                .unwrap_or_else(|_| "https://relayer.testnet.zama.cloud".to_string()),
            native_token: TokenInfo {
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            fhevm: FhevmAddresses {
                acl: Address::from_str("0x687820221192C5B662b25367F70076A37bc79b6c")
                    .expect("Invalid ACL address"),
                kms_verifier: Address::from_str("0x1364cBBf2cDF5032C47d8226a6f6FBD2AFCDacAC")
                    .expect("Invalid KMS verifier address"),
                input_verifier: Address::from_str("0xbc91f3daD1A5F19F8390c400196e58073B6a0BC4")
                    .expect("Invalid input verifier address"),
                decryption_verifier: Address::from_str(
                    "0xb6E160B1ff80D67Bfe90A85eE06Ce0A2613607D1",
                )
                .expect("Invalid decryption verifier address"),
                input_verification_verifier: Address::from_str(
                    "0x7048C39f048125eDa9d678AEbaDfB22F7900a29F",
                )
                .expect("Invalid input verification address"),
            },
            gateway_chain_id: SEPOLIA_GATEWAY_CHAIN_ID,
        }
    }
}

/// Networks where the FHE coprocessor and relayer are reachable
pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
    default_chain: u64,
}

impl ChainRegistry {
    pub fn new() -> Self {
        let mut chains = HashMap::new();
        chains.insert(SEPOLIA_CHAIN_ID, ChainConfig::sepolia());

        ChainRegistry {
            chains,
            default_chain: SEPOLIA_CHAIN_ID,
        }
    }

    pub fn get_chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn default_chain(&self) -> u64 {
        self.default_chain
    }

    pub fn list_supported_chains(&self) -> Vec<u64> {
        self.chains.keys().cloned().collect()
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Fail fast on any chain without an FHE coprocessor
    pub fn ensure_supported(&self, chain_id: u64) -> Result<&ChainConfig, RollError> {
        self.chains.get(&chain_id).ok_or(RollError::NetworkMismatch {
            expected: self.default_chain,
            actual: chain_id,
        })
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
