// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Swap quotes
//!
//! Pure ETH ↔ ROLL conversions at the fixed rate. Nothing is stored.

use ethers::types::U256;
use serde::{Deserialize, Serialize};

use super::errors::{reason, LedgerError};

/// ROLL units per 1 ETH
pub const RATE: u64 = 1000;

/// Largest representable ROLL balance unit (`euint32`)
pub const MAX_ROLL: u64 = u32::MAX as u64;

pub fn one_ether() -> U256 {
    U256::exp10(18)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub eth_amount: U256,
    pub roll_amount: u32,
    pub eth_to_roll: bool,
}

impl SwapQuote {
    /// `floor(wei * RATE / 1 ether)`, rejected when it does not fit in 32 bits
    pub fn eth_to_roll(wei: U256) -> Result<Self, LedgerError> {
        let roll = wei
            .checked_mul(U256::from(RATE))
            .ok_or_else(|| LedgerError::revert(reason::AMOUNT_TOO_LARGE))?
            / one_ether();
        if roll > U256::from(MAX_ROLL) {
            return Err(LedgerError::revert(reason::AMOUNT_TOO_LARGE));
        }
        Ok(Self {
            eth_amount: wei,
            roll_amount: roll.as_u32(),
            eth_to_roll: true,
        })
    }

    /// `roll * 1 ether / RATE`
    pub fn roll_to_eth(roll: u32) -> Self {
        let wei = U256::from(roll) * one_ether() / U256::from(RATE);
        Self {
            eth_amount: wei,
            roll_amount: roll,
            eth_to_roll: false,
        }
    }

    /// Most ROLL a reserve of `wei` can buy back
    pub fn max_payable_roll(reserve_wei: U256) -> u64 {
        let roll = reserve_wei.saturating_mul(U256::from(RATE)) / one_ether();
        if roll > U256::from(MAX_ROLL) {
            MAX_ROLL
        } else {
            roll.as_u64()
        }
    }
}
