// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted ROLL ledger
//!
//! - **State**: mint / swap / transfer state machine over encrypted balances
//! - **Quote**: fixed-rate ETH ↔ ROLL conversions
//! - **Events**: the only history record, plus history reconstruction
//! - **Validation**: client pre-flight checks mirroring the ledger's reverts

pub mod errors;
pub mod events;
pub mod quote;
pub mod state;
pub mod validation;

pub use errors::{reason, LedgerError};
pub use events::{history_for, HistoryEntry, LedgerEvent};
pub use quote::{one_ether, SwapQuote, MAX_ROLL, RATE};
pub use state::{
    EncryptedLedger, LedgerConfig, PendingSwapOut, SwapReceipt, TransferReceipt, UnderflowPolicy,
    MAX_MINT,
};
