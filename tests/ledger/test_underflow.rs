// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Guarded versus unchecked encrypted debits

use super::fixture::{ether, Deployment};
use ethers::types::U256;
use fhe_roll_ledger::ledger::{LedgerEvent, UnderflowPolicy};

fn swapped_out(d: &Deployment) -> usize {
    d.ledger
        .events()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::TokensSwapped { eth_to_roll: false, .. }))
        .count()
}

#[tokio::test]
async fn test_guarded_swap_out_keeps_balance_and_reserve() {
    let mut d = Deployment::with_policy(UnderflowPolicy::Guarded).await;
    let alice = d.user();
    d.fund_treasury(ether("1"));
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();

    let input = d.encrypt(alice.address, 11).await;
    let receipt = d.ledger.swap_out(alice.address, 11, &input).unwrap();
    assert_eq!(d.balance(&alice).await.unwrap(), 10);
    assert_eq!(d.ledger.escrowed_eth(), ether("0.011"));

    let id = receipt.pending.unwrap();
    let flag = d.ledger.pending_swap_out(id).unwrap().sufficient;
    assert!(d.acl.is_public(flag));

    assert_eq!(d.ledger.settle_swap_out(id).unwrap(), U256::zero());
    assert_eq!(d.ledger.eth_reserve(), ether("1"));
    assert!(d.ledger.escrowed_eth().is_zero());
    assert!(d.ledger.pending_swap_out(id).is_none());
    assert_eq!(swapped_out(&d), 0);
}

#[tokio::test]
async fn test_empty_balance_cannot_withdraw_reserve() {
    let mut d = Deployment::new().await;
    let mallory = d.user();
    d.fund_treasury(ether("1"));

    let input = d.encrypt(mallory.address, 1000).await;
    let receipt = d.ledger.swap_out(mallory.address, 1000, &input).unwrap();
    let paid = d.ledger.settle_swap_out(receipt.pending.unwrap()).unwrap();

    assert!(paid.is_zero());
    assert_eq!(d.ledger.eth_reserve(), ether("1"));
    assert_eq!(d.balance(&mallory).await.unwrap(), 0);
    assert_eq!(swapped_out(&d), 0);
}

#[tokio::test]
async fn test_guarded_swap_out_with_enough_balance_pays_on_settle() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    d.fund_treasury(ether("1"));
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();

    let input = d.encrypt(alice.address, 10).await;
    let receipt = d.ledger.swap_out(alice.address, 10, &input).unwrap();
    // nothing leaves the ledger before settlement
    assert_eq!(d.ledger.eth_reserve(), ether("1"));
    assert_eq!(swapped_out(&d), 0);

    assert_eq!(d.ledger.settle_swap_out(receipt.pending.unwrap()).unwrap(), ether("0.01"));
    assert_eq!(d.ledger.eth_reserve(), ether("0.99"));
    assert_eq!(d.balance(&alice).await.unwrap(), 0);
    assert_eq!(swapped_out(&d), 1);
}

#[tokio::test]
async fn test_unchecked_swap_out_wraps_and_pays_at_once() {
    let mut d = Deployment::with_policy(UnderflowPolicy::Unchecked).await;
    let alice = d.user();
    d.fund_treasury(ether("1"));
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();

    let input = d.encrypt(alice.address, 11).await;
    let receipt = d.ledger.swap_out(alice.address, 11, &input).unwrap();
    assert!(receipt.pending.is_none());
    assert_eq!(d.balance(&alice).await.unwrap(), u32::MAX as u64);
    assert_eq!(d.ledger.eth_reserve(), ether("0.989"));
    assert!(d.ledger.escrowed_eth().is_zero());
    assert_eq!(swapped_out(&d), 1);
}

#[tokio::test]
async fn test_guarded_transfer_moves_nothing_on_overdraft() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();

    let input = d.encrypt(alice.address, 11).await;
    d.ledger.transfer(alice.address, bob.address, 11, &input).unwrap();
    let alice_after = d.balance(&alice).await.unwrap();
    let bob_after = d.balance(&bob).await.unwrap();
    assert_eq!((alice_after, bob_after), (10, 0));
    assert_eq!(alice_after + bob_after, 10);
}

#[tokio::test]
async fn test_unchecked_transfer_credits_full_amount() {
    let mut d = Deployment::with_policy(UnderflowPolicy::Unchecked).await;
    let alice = d.user();
    let bob = d.user();
    d.ledger.mint(alice.address, U256::from(1u64)).unwrap();

    let input = d.encrypt(alice.address, 3).await;
    d.ledger.transfer(alice.address, bob.address, 3, &input).unwrap();
    assert_eq!(d.balance(&alice).await.unwrap(), u32::MAX as u64 - 1);
    assert_eq!(d.balance(&bob).await.unwrap(), 3);
}

#[tokio::test]
async fn test_guarded_is_default_policy() {
    assert_eq!(UnderflowPolicy::default(), UnderflowPolicy::Guarded);
}
