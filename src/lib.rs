// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod acl;
pub mod cache;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod crypto;
pub mod decryption;
pub mod errors;
pub mod fhe;
pub mod ledger;
pub mod monitoring;
pub mod version;

// Re-export main types
pub use acl::{AccessControlList, AclError, GrantBatch};
pub use cache::{CacheStats, DecryptedValueCache};
pub use config::{ChainConfig, ChainRegistry, ClientConfig};
pub use contracts::RollContractClient;
pub use decryption::{
    DecryptFailure, DecryptionClient, DecryptionSession, HandleContractPair, HttpRelayerClient,
    InProcessRelayer, RelayerClient,
};
pub use errors::RollError;
pub use fhe::{CiphertextHandle, FheContext, FheEngine, LocalCoprocessor};
pub use ledger::{EncryptedLedger, LedgerConfig, LedgerEvent, UnderflowPolicy};
pub use monitoring::RollMetrics;
