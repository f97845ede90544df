// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end ledger scenario and per-operation arithmetic

use super::fixture::{ether, Deployment};
use ethers::types::U256;
use fhe_roll_ledger::ledger::{reason, MAX_MINT};

#[tokio::test]
async fn test_mint_swap_transfer_swap_out_scenario() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    d.fund_treasury(ether("0.9"));

    d.ledger.mint(alice.address, U256::from(1000u64)).unwrap();
    assert_eq!(d.balance(&alice).await.unwrap(), 1000);

    d.ledger.swap_in(alice.address, ether("0.1")).unwrap();
    assert_eq!(d.balance(&alice).await.unwrap(), 1100);

    let fifty = d.encrypt(alice.address, 50).await;
    d.ledger.transfer(alice.address, bob.address, 50, &fifty).unwrap();
    assert_eq!(d.balance(&alice).await.unwrap(), 1050);
    assert_eq!(d.balance(&bob).await.unwrap(), 50);

    // reserve is now exactly 1 ETH: at most 1000 ROLL can be bought back
    assert_eq!(d.ledger.eth_reserve(), ether("1"));
    let too_much = d.encrypt(alice.address, 2000).await;
    let err = d.ledger.swap_out(alice.address, 2000, &too_much).unwrap_err();
    assert_eq!(err.reason(), Some(reason::INSUFFICIENT_CONTRACT_ETH));
    assert_eq!(d.balance(&alice).await.unwrap(), 1050);
}

#[tokio::test]
async fn test_mint_adds_to_prior_balance() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let mut expected = 0u64;
    for amount in [1u64, 499, MAX_MINT] {
        d.ledger.mint(alice.address, U256::from(amount)).unwrap();
        expected += amount;
        assert_eq!(d.balance(&alice).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_swap_in_floors_to_whole_roll() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    // 0.0015 ETH buys 1.5 ROLL, floored to 1
    let receipt = d.ledger.swap_in(alice.address, ether("0.0015")).unwrap();
    assert_eq!(receipt.quote.roll_amount, 1);
    assert_eq!(d.balance(&alice).await.unwrap(), 1);
}

#[tokio::test]
async fn test_swap_in_rejects_amount_beyond_u32() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    // 4_294_968 ETH -> 4_294_968_000 ROLL > 2^32 - 1
    let err = d
        .ledger
        .swap_in(alice.address, ether("4294968"))
        .unwrap_err();
    assert_eq!(err.reason(), Some(reason::AMOUNT_TOO_LARGE));
    assert!(d.ledger.get_balance(alice.address).is_zero());
    assert!(d.ledger.eth_reserve().is_zero());
}

#[tokio::test]
async fn test_swap_out_pays_exact_eth() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    d.fund_treasury(ether("1"));
    d.ledger.mint(alice.address, U256::from(1500u64)).unwrap();

    let amount = d.encrypt(alice.address, 1000).await;
    let receipt = d.ledger.swap_out(alice.address, 1000, &amount).unwrap();
    assert_eq!(receipt.quote.eth_amount, ether("1"));
    assert_eq!(d.balance(&alice).await.unwrap(), 500);
    assert_eq!(d.ledger.escrowed_eth(), ether("1"));

    // escrowed ETH cannot back a second swap-out
    let one_more = d.encrypt(alice.address, 1).await;
    let err = d.ledger.swap_out(alice.address, 1, &one_more).unwrap_err();
    assert_eq!(err.reason(), Some(reason::INSUFFICIENT_CONTRACT_ETH));

    let paid = d.ledger.settle_swap_out(receipt.pending.unwrap()).unwrap();
    assert_eq!(paid, ether("1"));
    assert!(d.ledger.eth_reserve().is_zero());
    assert!(d.ledger.escrowed_eth().is_zero());
}

#[tokio::test]
async fn test_settle_unknown_or_settled_swap_out_reverts() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    d.fund_treasury(ether("1"));
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();

    let err = d.ledger.settle_swap_out(42).unwrap_err();
    assert_eq!(err.reason(), Some(reason::UNKNOWN_SWAP_OUT));

    let amount = d.encrypt(alice.address, 10).await;
    let id = d.ledger.swap_out(alice.address, 10, &amount).unwrap().pending.unwrap();
    assert_eq!(d.ledger.settle_swap_out(id).unwrap(), ether("0.01"));
    let err = d.ledger.settle_swap_out(id).unwrap_err();
    assert_eq!(err.reason(), Some(reason::UNKNOWN_SWAP_OUT));
    assert_eq!(d.ledger.eth_reserve(), ether("0.99"));
}

#[tokio::test]
async fn test_transfer_preconditions() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    d.ledger.mint(alice.address, U256::from(10u64)).unwrap();
    let input = d.encrypt(alice.address, 5).await;

    let to_zero = d
        .ledger
        .transfer(alice.address, ethers::types::Address::zero(), 5, &input)
        .unwrap_err();
    assert_eq!(to_zero.reason(), Some(reason::INVALID_RECIPIENT));

    let to_self = d.ledger.transfer(alice.address, alice.address, 5, &input).unwrap_err();
    assert_eq!(to_self.reason(), Some(reason::CANNOT_TRANSFER_TO_SELF));

    let bob = d.user();
    let zero = d.ledger.transfer(alice.address, bob.address, 0, &input).unwrap_err();
    assert_eq!(zero.reason(), Some(reason::AMOUNT_MUST_BE_POSITIVE));

    // none of the rejected calls consumed the input
    d.ledger.transfer(alice.address, bob.address, 5, &input).unwrap();
    assert_eq!(d.balance(&bob).await.unwrap(), 5);
}
