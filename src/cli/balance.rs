// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::Address;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{ChainRegistry, ClientConfig};
use crate::contracts::RollContractClient;
use crate::crypto::{LocalWalletSigner, WalletSigner};
use crate::decryption::{DecryptionClient, HttpRelayerClient};

/// Arguments for the balance command
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Address whose balance handle to read (defaults to the signer)
    #[arg(long)]
    pub address: Option<String>,

    /// TOML file with a [client] table; environment variables otherwise
    #[arg(long)]
    pub config: Option<String>,

    /// Only print the ciphertext handle, do not decrypt
    #[arg(long)]
    pub handle_only: bool,

    /// Also list this address's ledger activity from the given block
    #[arg(long)]
    pub history_from: Option<u64>,
}

pub async fn run(args: BalanceArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClientConfig::from_toml_file(path)?,
        None => ClientConfig::from_env()?,
    };
    config.validate()?;

    let registry = ChainRegistry::new();
    let contract = RollContractClient::connect(&config, &registry).await?;

    let wallet = match &config.private_key {
        Some(key) => Some(Arc::new(LocalWalletSigner::from_private_key_hex(
            key,
            config.chain_id,
        )?)),
        None => None,
    };

    let owner = match (&args.address, &wallet) {
        (Some(raw), _) => {
            Address::from_str(raw).map_err(|e| anyhow!("invalid address '{}': {}", raw, e))?
        }
        (None, Some(wallet)) => wallet.address(),
        (None, None) => return Err(anyhow!("Use --address or set PRIVATE_KEY")),
    };

    let handle = contract.get_balance(owner).await?;
    println!("\n🔐 Balance handle of {:?}", owner);
    println!("  {}", handle);

    if !args.handle_only {
        let wallet = wallet.ok_or_else(|| anyhow!("PRIVATE_KEY is required to decrypt"))?;
        if wallet.address() != owner {
            println!("⚠️  Decrypting as {:?}; the ledger only grants the owner", wallet.address());
        }
        let relayer = Arc::new(HttpRelayerClient::new(
            &config.relayer_url,
            Duration::from_secs(config.relayer_timeout_secs),
        )?);
        let decryptor = DecryptionClient::for_chain(contract.chain(), &config, relayer, wallet);

        info!("decrypting balance handle {} via {}", handle, config.relayer_url);
        match decryptor
            .decrypt_balance(owner, handle, contract.contract_address())
            .await
        {
            Ok(value) => println!("💰 Balance: {} ROLL", value),
            Err(e) if e.is_retryable() => {
                println!("❌ Relayer unavailable: {}", e);
                println!("   💡 Run the command again to retry");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(from_block) = args.history_from {
        let history = contract.history(owner, from_block).await?;
        println!("\n📜 {} ledger event(s) since block {}", history.len(), from_block);
        for entry in history {
            let direction = if entry.incoming { "in " } else { "out" };
            let amount = entry
                .amount
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string());
            match entry.counterparty {
                Some(other) => println!("  #{} {} {} {} ({:?})", entry.sequence, entry.kind, direction, amount, other),
                None => println!("  #{} {} {} {}", entry.sequence, entry.kind, direction, amount),
            }
        }
    }

    Ok(())
}
