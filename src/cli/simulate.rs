// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use ethers::types::{Address, U256};
use ethers::utils::parse_ether;
use std::sync::Arc;
use tracing::info;

use crate::acl::AccessControlList;
use crate::config::ChainConfig;
use crate::crypto::{DecryptionDomain, LocalWalletSigner, WalletSigner};
use crate::decryption::{DecryptionClient, InProcessRelayer};
use crate::errors::RollError;
use crate::fhe::{ExternalCiphertext, FheContext, LocalCoprocessor};
use crate::ledger::{EncryptedLedger, LedgerConfig, UnderflowPolicy};
use crate::monitoring::RollMetrics;

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Subtract without the encrypted balance check (wraps on underflow)
    #[arg(long)]
    pub unchecked: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

/// Decrypted balances and outcomes of one scenario run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub after_mint: u64,
    pub after_swap_in: u64,
    pub alice_after_transfer: u64,
    pub bob_after_transfer: u64,
    /// Revert reason of the oversized swap-out
    pub swap_out_revert: Option<String>,
    pub events: usize,
}

struct Participant {
    address: Address,
    decryptor: DecryptionClient,
}

async fn encrypt_u32(
    context: &FheContext,
    ledger: Address,
    user: Address,
    amount: u32,
) -> Result<ExternalCiphertext, RollError> {
    let input = context
        .create_encrypted_input(ledger, user)
        .add32(amount)?
        .encrypt()
        .await?;
    Ok(input.external(0)?)
}

async fn balance_of(ledger: &EncryptedLedger, who: &Participant) -> Result<u64, RollError> {
    let handle = ledger.get_balance(who.address);
    let value = who
        .decryptor
        .decrypt_balance(who.address, handle, ledger.address())
        .await?;
    Ok(value as u64)
}

/// Mint 1000, swap in 0.1 ETH, transfer 50 to Bob, then try to swap out
/// 2000 ROLL against a 1 ETH reserve
pub async fn run_scenario(
    policy: UnderflowPolicy,
    metrics: Option<Arc<RollMetrics>>,
) -> Result<SimulationReport> {
    let chain = ChainConfig::sepolia();
    let engine = Arc::new(LocalCoprocessor::new(chain.chain_id));
    let acl = Arc::new(AccessControlList::new());

    let admin = Address::random();
    let mut ledger = EncryptedLedger::new(
        LedgerConfig::new(Address::random(), admin).with_underflow_policy(policy),
        engine.clone(),
        acl.clone(),
    );
    if let Some(metrics) = &metrics {
        ledger = ledger.with_metrics(metrics.clone());
    }

    let context = FheContext::new(chain.clone());
    context.init(engine.clone()).await?;

    let domain = DecryptionDomain::new(chain.gateway_chain_id, chain.fhevm.decryption_verifier);
    let relayer = Arc::new(InProcessRelayer::new(engine.clone(), acl.clone(), domain.clone()));
    let participant = |metrics: &Option<Arc<RollMetrics>>| {
        let wallet = Arc::new(LocalWalletSigner::random(chain.chain_id));
        let address = wallet.address();
        let mut decryptor =
            DecryptionClient::new(relayer.clone(), wallet, domain.clone(), chain.chain_id);
        if let Some(metrics) = metrics {
            decryptor = decryptor.with_metrics(metrics.clone());
        }
        Participant { address, decryptor }
    };
    let alice = participant(&metrics);
    let bob = participant(&metrics);

    ledger.add_treasury_eth(admin, parse_ether("0.9")?)?;

    ledger.mint(alice.address, U256::from(1000u64))?;
    let after_mint = balance_of(&ledger, &alice).await?;
    println!("🪙 Alice minted 1000 ROLL        -> balance {}", after_mint);

    ledger.swap_in(alice.address, parse_ether("0.1")?)?;
    let after_swap_in = balance_of(&ledger, &alice).await?;
    println!("💱 Alice swapped 0.1 ETH          -> balance {}", after_swap_in);

    let fifty = encrypt_u32(&context, ledger.address(), alice.address, 50).await?;
    ledger.transfer(alice.address, bob.address, 50, &fifty)?;
    let alice_after_transfer = balance_of(&ledger, &alice).await?;
    let bob_after_transfer = balance_of(&ledger, &bob).await?;
    println!(
        "📤 Alice sent 50 ROLL to Bob       -> Alice {}, Bob {}",
        alice_after_transfer, bob_after_transfer
    );

    let too_much = encrypt_u32(&context, ledger.address(), alice.address, 2000).await?;
    let swap_out_revert = match ledger.swap_out(alice.address, 2000, &too_much) {
        Ok(_) => None,
        Err(err) => Some(
            err.reason()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("swap-out failed without a revert: {}", err))?,
        ),
    };
    match &swap_out_revert {
        Some(reason) => println!("⛔ Alice swap-out of 2000 ROLL    -> reverted: {}", reason),
        None => println!("⚠️  Alice swap-out of 2000 ROLL    -> unexpectedly succeeded"),
    }

    context.dispose().await;
    info!("simulation finished with {} events", ledger.events().len());

    Ok(SimulationReport {
        after_mint,
        after_swap_in,
        alice_after_transfer,
        bob_after_transfer,
        swap_out_revert,
        events: ledger.events().len(),
    })
}

pub async fn run(args: SimulateArgs) -> Result<()> {
    let policy = if args.unchecked {
        UnderflowPolicy::Unchecked
    } else {
        UnderflowPolicy::Guarded
    };
    let metrics = if args.metrics {
        Some(Arc::new(RollMetrics::new()?))
    } else {
        None
    };

    println!("\n🧪 Running ROLL ledger scenario (underflow policy {:?})\n", policy);
    let report = run_scenario(policy, metrics.clone()).await?;
    println!("\n✅ {} ledger events emitted", report.events);

    if let Some(metrics) = metrics {
        println!("\n{}", metrics.export()?);
    }
    Ok(())
}
