// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger events
//!
//! The ledger keeps no per-user lists. Events are the only record of what
//! happened, so any history view is rebuilt from them.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum LedgerEvent {
    TokensMinted {
        user: Address,
        amount: U256,
    },
    TokensSwapped {
        user: Address,
        eth_amount: U256,
        roll_amount: u32,
        eth_to_roll: bool,
    },
    TokensTransferred {
        from: Address,
        to: Address,
        amount: u32,
    },
    TreasuryFunded {
        funder: Address,
        amount: U256,
    },
    BalanceMadePublic {
        owner: Address,
        by: Address,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::TokensMinted { .. } => "TokensMinted",
            LedgerEvent::TokensSwapped { .. } => "TokensSwapped",
            LedgerEvent::TokensTransferred { .. } => "TokensTransferred",
            LedgerEvent::TreasuryFunded { .. } => "TreasuryFunded",
            LedgerEvent::BalanceMadePublic { .. } => "BalanceMadePublic",
        }
    }

    pub fn involves(&self, address: Address) -> bool {
        match self {
            LedgerEvent::TokensMinted { user, .. } | LedgerEvent::TokensSwapped { user, .. } => {
                *user == address
            }
            LedgerEvent::TokensTransferred { from, to, .. } => *from == address || *to == address,
            LedgerEvent::TreasuryFunded { funder, .. } => *funder == address,
            LedgerEvent::BalanceMadePublic { owner, by } => *owner == address || *by == address,
        }
    }
}

/// One line of a per-address activity history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Position in the ledger's event log
    pub sequence: usize,
    pub kind: &'static str,
    /// Plaintext amount as announced in the event, if any
    pub amount: Option<U256>,
    /// Other party of a transfer
    pub counterparty: Option<Address>,
    /// `true` for value flowing to `address` in ROLL terms
    pub incoming: bool,
}

/// Rebuild the activity of `address` from the event log alone
pub fn history_for(events: &[LedgerEvent], address: Address) -> Vec<HistoryEntry> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.involves(address))
        .map(|(sequence, event)| {
            let (amount, counterparty, incoming) = match event {
                LedgerEvent::TokensMinted { amount, .. } => (Some(*amount), None, true),
                LedgerEvent::TokensSwapped {
                    roll_amount,
                    eth_to_roll,
                    ..
                } => (Some(U256::from(*roll_amount)), None, *eth_to_roll),
                LedgerEvent::TokensTransferred { from, to, amount } => {
                    if *from == address {
                        (Some(U256::from(*amount)), Some(*to), false)
                    } else {
                        (Some(U256::from(*amount)), Some(*from), true)
                    }
                }
                LedgerEvent::TreasuryFunded { amount, .. } => (Some(*amount), None, false),
                LedgerEvent::BalanceMadePublic { .. } => (None, None, false),
            };
            HistoryEntry {
                sequence,
                kind: event.name(),
                amount,
                counterparty,
                incoming,
            }
        })
        .collect()
}
