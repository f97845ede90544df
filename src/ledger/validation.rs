// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client-side pre-flight checks
//!
//! Run before encrypting inputs or prompting the wallet, so a request the
//! ledger would revert never costs a signature or gas.

use ethers::types::{Address, U256};

use super::quote::{SwapQuote, MAX_ROLL};
use super::state::MAX_MINT;
use crate::errors::RollError;

fn invalid(msg: impl Into<String>) -> RollError {
    RollError::Validation(msg.into())
}

pub fn validate_mint(amount: U256) -> Result<(), RollError> {
    if amount.is_zero() {
        return Err(invalid("mint amount must be greater than 0"));
    }
    if amount > U256::from(MAX_MINT) {
        return Err(invalid(format!("mint amount exceeds per-call cap of {}", MAX_MINT)));
    }
    Ok(())
}

/// Parse and bound-check a plaintext ROLL amount
pub fn validate_roll_amount(amount: u64) -> Result<u32, RollError> {
    if amount == 0 {
        return Err(invalid("amount must be greater than 0"));
    }
    if amount > MAX_ROLL {
        return Err(invalid(format!("amount {} exceeds {}", amount, MAX_ROLL)));
    }
    Ok(amount as u32)
}

pub fn validate_swap_in(wei: U256) -> Result<SwapQuote, RollError> {
    if wei.is_zero() {
        return Err(invalid("must send ETH"));
    }
    SwapQuote::eth_to_roll(wei).map_err(|_| invalid("resulting ROLL amount exceeds 2^32 - 1"))
}

pub fn validate_swap_out(amount: u64, reserve_wei: U256) -> Result<SwapQuote, RollError> {
    let amount = validate_roll_amount(amount)?;
    let quote = SwapQuote::roll_to_eth(amount);
    if quote.eth_amount > reserve_wei {
        return Err(invalid(format!(
            "treasury can pay at most {} ROLL",
            SwapQuote::max_payable_roll(reserve_wei)
        )));
    }
    Ok(quote)
}

pub fn validate_transfer(from: Address, to: Address, amount: u64) -> Result<u32, RollError> {
    if to.is_zero() {
        return Err(invalid("invalid recipient"));
    }
    if to == from {
        return Err(invalid("cannot transfer to self"));
    }
    validate_roll_amount(amount)
}
