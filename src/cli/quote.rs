// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::U256;
use ethers::utils::{format_ether, parse_ether};

use crate::ledger::validation::{validate_roll_amount, validate_swap_in, validate_swap_out};
use crate::ledger::{SwapQuote, RATE};

/// Arguments for the quote command
#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// ETH to swap in, e.g. 0.1
    #[arg(long, conflicts_with = "roll")]
    pub eth: Option<String>,

    /// ROLL to swap out
    #[arg(long, conflicts_with = "eth")]
    pub roll: Option<u64>,

    /// Ledger ETH reserve (in ETH) to check a swap-out against
    #[arg(long, requires = "roll")]
    pub reserve: Option<String>,
}

fn parse_eth_amount(raw: &str) -> Result<U256> {
    parse_ether(raw).map_err(|e| anyhow!("invalid ETH amount '{}': {}", raw, e))
}

/// Quote shown for the given arguments
pub fn quote(args: &QuoteArgs) -> Result<SwapQuote> {
    match (&args.eth, args.roll) {
        (Some(eth), None) => Ok(validate_swap_in(parse_eth_amount(eth)?)?),
        (None, Some(roll)) => match &args.reserve {
            Some(reserve) => Ok(validate_swap_out(roll, parse_eth_amount(reserve)?)?),
            None => Ok(SwapQuote::roll_to_eth(validate_roll_amount(roll)?)),
        },
        _ => Err(anyhow!("Must specify either --eth or --roll")),
    }
}

pub fn run(args: QuoteArgs) -> Result<()> {
    let quote = quote(&args)?;
    println!("\n💱 Swap quote (1 ETH = {} ROLL)", RATE);
    if quote.eth_to_roll {
        println!("  Pay:     {} ETH", format_ether(quote.eth_amount));
        println!("  Receive: {} ROLL", quote.roll_amount);
    } else {
        println!("  Pay:     {} ROLL", quote.roll_amount);
        println!("  Receive: {} ETH", format_ether(quote.eth_amount));
    }
    Ok(())
}
