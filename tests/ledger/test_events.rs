// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Event log and history reconstruction

use super::fixture::{ether, Deployment};
use ethers::types::U256;
use fhe_roll_ledger::ledger::LedgerEvent;

#[tokio::test]
async fn test_successful_operations_emit_one_event_each() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();

    d.ledger.mint(alice.address, U256::from(100u64)).unwrap();
    // reverted calls leave no trace
    assert!(d.ledger.mint(alice.address, U256::zero()).is_err());
    d.ledger.swap_in(alice.address, ether("0.002")).unwrap();
    let input = d.encrypt(alice.address, 20).await;
    d.ledger.transfer(alice.address, bob.address, 20, &input).unwrap();

    let names: Vec<&str> = d.ledger.events().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["TokensMinted", "TokensSwapped", "TokensTransferred"]);
    assert_eq!(
        d.ledger.events()[1],
        LedgerEvent::TokensSwapped {
            user: alice.address,
            eth_amount: ether("0.002"),
            roll_amount: 2,
            eth_to_roll: true,
        }
    );
}

#[tokio::test]
async fn test_history_is_rebuilt_from_events() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    d.ledger.mint(alice.address, U256::from(100u64)).unwrap();
    d.ledger.mint(bob.address, U256::from(5u64)).unwrap();
    let input = d.encrypt(alice.address, 25).await;
    d.ledger.transfer(alice.address, bob.address, 25, &input).unwrap();

    let history = d.ledger.history_for(bob.address);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sequence, 1);
    assert_eq!(history[0].kind, "TokensMinted");
    assert_eq!(history[1].kind, "TokensTransferred");
    assert_eq!(history[1].counterparty, Some(alice.address));
    assert!(history[1].incoming);
    assert_eq!(history[1].amount, Some(U256::from(25u64)));

    let alice_history = d.ledger.history_for(alice.address);
    assert!(!alice_history[1].incoming);
}

#[tokio::test]
async fn test_subscriber_sees_events_in_order() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let mut rx = d.ledger.subscribe();
    let admin = d.admin;

    d.ledger.add_treasury_eth(admin, ether("0.5")).unwrap();
    d.ledger.mint(alice.address, U256::from(1u64)).unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        LedgerEvent::TreasuryFunded {
            funder: admin,
            amount: ether("0.5"),
        }
    );
    assert_eq!(rx.recv().await.unwrap().name(), "TokensMinted");
}
