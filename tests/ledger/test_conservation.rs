// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transfers move value between balances without creating or destroying it

use super::fixture::Deployment;
use ethers::types::U256;

#[tokio::test]
async fn test_transfers_conserve_total_supply() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    let carol = d.user();

    d.ledger.mint(alice.address, U256::from(700u64)).unwrap();
    d.ledger.mint(bob.address, U256::from(300u64)).unwrap();

    let moves = [
        (&alice, &bob, 120u32),
        (&bob, &carol, 400),
        (&carol, &alice, 5),
        (&alice, &carol, 575),
    ];
    for (from, to, amount) in moves {
        let input = d.encrypt(from.address, amount).await;
        d.ledger.transfer(from.address, to.address, amount, &input).unwrap();
    }

    let a = d.balance(&alice).await.unwrap();
    let b = d.balance(&bob).await.unwrap();
    let c = d.balance(&carol).await.unwrap();
    assert_eq!((a, b, c), (10, 20, 970));
    assert_eq!(a + b + c, 1000);
}

#[tokio::test]
async fn test_guarded_overdraft_moves_nothing() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    d.ledger.mint(alice.address, U256::from(30u64)).unwrap();
    d.ledger.mint(bob.address, U256::from(8u64)).unwrap();

    let input = d.encrypt(alice.address, 31).await;
    // the ledger cannot see the balance, so the call itself succeeds
    d.ledger.transfer(alice.address, bob.address, 31, &input).unwrap();

    assert_eq!(d.balance(&alice).await.unwrap(), 30);
    assert_eq!(d.balance(&bob).await.unwrap(), 8);
}
