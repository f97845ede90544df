// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod balance;
pub mod quote;
pub mod simulate;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Encrypted ROLL ledger CLI
#[derive(Parser, Debug)]
#[command(name = "roll-cli")]
#[command(version)]
#[command(about = "Quote swaps, run the ledger locally, read encrypted balances", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Quote an ETH <-> ROLL swap at the fixed rate
    Quote(quote::QuoteArgs),

    /// Run mint / swap / transfer / decrypt against an in-process ledger
    Simulate(simulate::SimulateArgs),

    /// Read and decrypt an on-chain balance through the relayer
    Balance(balance::BalanceArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Quote(args) => quote::run(args),
        Commands::Simulate(args) => simulate::run(args).await,
        Commands::Balance(args) => balance::run(args).await,
    }
}
