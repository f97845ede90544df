// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Concurrent requests for one handle share a single relayer round trip

use super::fixture::{CountingRelayer, Env, FlakyRelayer};
use ethers::types::U256;
use fhe_roll_ledger::decryption::{HandleContractPair, ResponseMode};
use fhe_roll_ledger::RollMetrics;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_concurrent_decrypts_are_coalesced() {
    let env = Env::new();
    let handle = env.granted(555);
    let relayer = Arc::new(CountingRelayer::with_delay(
        env.relayer(ResponseMode::Sealed),
        Duration::from_millis(50),
    ));
    let metrics = Arc::new(RollMetrics::new().unwrap());
    let client = env.client(relayer.clone()).with_metrics(metrics.clone());
    let pair = HandleContractPair::new(handle, env.contract);

    let results = join_all((0..8).map(|_| client.decrypt(pair))).await;
    assert_eq!(relayer.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap().as_u256(), U256::from(555u64));
    }
    assert_eq!(metrics.coalesced.get(), 7);
}

#[tokio::test]
async fn test_distinct_handles_are_not_coalesced() {
    let env = Env::new();
    let a = env.granted(1);
    let b = env.granted(2);
    let relayer = Arc::new(CountingRelayer::with_delay(
        env.relayer(ResponseMode::Clear),
        Duration::from_millis(20),
    ));
    let client = env.client(relayer.clone());

    let results = join_all([
        client.decrypt(HandleContractPair::new(a, env.contract)),
        client.decrypt(HandleContractPair::new(b, env.contract)),
    ])
    .await;
    assert_eq!(relayer.calls(), 2);
    assert_eq!(results[0].as_ref().unwrap().as_u256(), U256::one());
    assert_eq!(results[1].as_ref().unwrap().as_u256(), U256::from(2u64));
}

#[tokio::test]
async fn test_coalesced_callers_share_a_failure() {
    let env = Env::new();
    let handle = env.ungranted(3);
    let relayer = Arc::new(CountingRelayer::with_delay(
        env.relayer(ResponseMode::Sealed),
        Duration::from_millis(20),
    ));
    let client = env.client(relayer.clone());
    let pair = HandleContractPair::new(handle, env.contract);

    let results = join_all((0..3).map(|_| client.decrypt(pair))).await;
    assert_eq!(relayer.calls(), 1);
    assert!(results.iter().all(|r| r.is_err()));

    // the failed round trip is not reused
    env.acl.allow(handle, env.user()).unwrap();
    assert!(client.decrypt(pair).await.is_ok());
    assert_eq!(relayer.calls(), 2);
}

#[tokio::test]
async fn test_abandoned_request_does_not_pin_its_result() {
    let env = Env::new();
    let handle = env.granted(77);
    let relayer = Arc::new(FlakyRelayer::new(
        env.relayer(ResponseMode::Sealed),
        1,
        Duration::from_millis(50),
    ));
    let client = env.client(relayer.clone());
    let pair = HandleContractPair::new(handle, env.contract);

    // first caller gives up while its round trip is still failing
    let abandoned = tokio::time::timeout(Duration::from_millis(5), client.decrypt(pair)).await;
    assert!(abandoned.is_err());
    assert_eq!(relayer.calls(), 1);

    // a caller arriving meanwhile picks up that round trip
    let err = client.decrypt(pair).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(relayer.calls(), 1);

    // asking again reaches the relayer
    assert_eq!(client.decrypt(pair).await.unwrap().as_u256(), U256::from(77u64));
    assert_eq!(relayer.calls(), 2);
    assert_eq!(client.cache().get(&handle), Some(U256::from(77u64)));
}
