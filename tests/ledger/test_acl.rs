// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Who may decrypt a balance handle

use super::fixture::Deployment;
use ethers::types::U256;
use fhe_roll_ledger::decryption::HandleContractPair;
use fhe_roll_ledger::ledger::reason;
use fhe_roll_ledger::RollError;

#[tokio::test]
async fn test_each_new_balance_handle_is_granted_to_owner_and_ledger() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let bob = d.user();
    d.ledger.mint(alice.address, U256::from(40u64)).unwrap();
    let input = d.encrypt(alice.address, 15).await;
    let receipt = d.ledger.transfer(alice.address, bob.address, 15, &input).unwrap();

    for (handle, owner) in [
        (receipt.from_balance, alice.address),
        (receipt.to_balance, bob.address),
    ] {
        assert!(d.acl.is_allowed(handle, owner));
        assert!(d.acl.is_allowed(handle, d.ledger.address()));
    }
    assert!(!d.acl.is_allowed(receipt.to_balance, alice.address));
}

#[tokio::test]
async fn test_stranger_cannot_decrypt_balance() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let mallory = d.user();
    d.ledger.mint(alice.address, U256::from(99u64)).unwrap();

    let handle = d.ledger.get_balance(alice.address);
    let err = mallory
        .client
        .decrypt(HandleContractPair::new(handle, d.ledger.address()))
        .await
        .unwrap_err();
    assert!(matches!(err, RollError::AuthorizationDenied(_)));
    assert!(!err.is_retryable());
    assert_eq!(d.balance(&alice).await.unwrap(), 99);
}

#[tokio::test]
async fn test_public_balance_is_decryptable_by_anyone() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    let mallory = d.user();
    d.ledger.mint(alice.address, U256::from(12u64)).unwrap();

    let err = d
        .ledger
        .make_balance_public(mallory.address, alice.address)
        .unwrap_err();
    assert_eq!(err.reason(), Some(reason::NOT_BALANCE_OWNER_OR_ADMIN));

    let handle = d.ledger.make_balance_public(alice.address, alice.address).unwrap();
    let value = mallory
        .client
        .decrypt(HandleContractPair::new(handle, d.ledger.address()))
        .await
        .unwrap();
    assert_eq!(value.as_u256(), U256::from(12u64));

    // a later balance handle is private again
    d.ledger.mint(alice.address, U256::from(1u64)).unwrap();
    let next = d.ledger.get_balance(alice.address);
    assert!(!d.acl.is_public(next));
}

#[tokio::test]
async fn test_admin_may_publish_any_balance() {
    let mut d = Deployment::new().await;
    let alice = d.user();
    d.ledger.mint(alice.address, U256::from(3u64)).unwrap();
    let admin = d.admin;
    let handle = d.ledger.make_balance_public(admin, alice.address).unwrap();
    assert!(d.acl.is_public(handle));
}
