// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod client;
pub mod types;

pub use client::{decode_contract_error, RollContractClient};
pub use types::{EncryptedRollLedger, EncryptedRollLedgerEvents, LoggedEvent};
