// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Driving a session by hand against the in-process relayer

use super::fixture::Env;
use chrono::Utc;
use fhe_roll_ledger::decryption::{
    DecryptionSession, HandleContractPair, RelayerClient, ResponseMode, SessionParams,
    SessionState,
};
use fhe_roll_ledger::crypto::WalletSigner;

fn params(env: &Env, pairs: Vec<HandleContractPair>) -> SessionParams {
    SessionParams {
        user: env.user(),
        pairs,
        domain: env.domain.clone(),
        contracts_chain_id: env.chain.chain_id,
        duration_days: 10,
    }
}

#[tokio::test]
async fn test_session_walks_every_state() {
    let env = Env::new();
    let handle = env.granted(77);
    let relayer = env.relayer(ResponseMode::Sealed);

    let mut session =
        DecryptionSession::new(params(&env, vec![HandleContractPair::new(handle, env.contract)]))
            .unwrap();
    assert_eq!(session.state(), &SessionState::Idle);

    session.generate_keypair().unwrap();
    assert_eq!(session.state(), &SessionState::KeypairGenerated);
    assert!(session.has_keypair());

    let now = Utc::now().timestamp() as u64;
    session.sign(env.wallet.as_ref(), now).await.unwrap();
    assert_eq!(session.state(), &SessionState::PayloadSigned);
    let typed = session.typed_data().unwrap();
    assert_eq!(typed.domain.chain_id, 55815);
    assert_eq!(typed.extra_data, vec![0x00]);

    let request = session.build_request().unwrap();
    assert_eq!(session.state(), &SessionState::AwaitingRelayer);
    assert_eq!(request.request_validity.duration_days, "10");
    assert_eq!(request.contracts_chain_id, 11155111);

    let raw = relayer.user_decrypt(&request).await.unwrap();
    let outcomes = session.resolve(raw).unwrap().to_vec();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].result.as_ref().unwrap().to_u32().unwrap(), 77);
    assert_eq!(session.state(), &SessionState::Resolved);
    // ephemeral key does not outlive the session
    assert!(!session.has_keypair());
}

#[tokio::test]
async fn test_out_of_order_transition_is_rejected() {
    let env = Env::new();
    let handle = env.granted(1);
    let mut session =
        DecryptionSession::new(params(&env, vec![HandleContractPair::new(handle, env.contract)]))
            .unwrap();
    assert!(session.build_request().is_err());
    assert!(session.sign(env.wallet.as_ref(), 0).await.is_err());
    assert_eq!(session.state(), &SessionState::Idle);
}

#[tokio::test]
async fn test_request_json_never_carries_private_key() {
    let env = Env::new();
    let handle = env.granted(5);
    let mut session =
        DecryptionSession::new(params(&env, vec![HandleContractPair::new(handle, env.contract)]))
            .unwrap();
    session.generate_keypair().unwrap();
    session.sign(env.wallet.as_ref(), 1_700_000_000).await.unwrap();
    let request = session.build_request().unwrap();
    assert!(request.private_key.is_some());

    let json = serde_json::to_value(&request).unwrap();
    assert!(json.get("privateKey").is_none());
    assert_eq!(json["requestValidity"]["startTimestamp"], "1700000000");
    assert_eq!(json["extraData"], "0x00");
    assert_eq!(json["userAddress"], serde_json::to_value(env.wallet.address()).unwrap());
    assert!(json["handleContractPairs"][0]["contractAddress"].is_string());
}

#[tokio::test]
async fn test_repeated_contract_is_signed_once() {
    let env = Env::new();
    let a = env.granted(1);
    let b = env.granted(2);
    let session = DecryptionSession::new(params(
        &env,
        vec![
            HandleContractPair::new(a, env.contract),
            HandleContractPair::new(b, env.contract),
        ],
    ))
    .unwrap();
    assert_eq!(session.contract_addresses(), &[env.contract]);
}

#[test]
fn test_empty_request_is_invalid() {
    let env = Env::new();
    assert!(DecryptionSession::new(params(&env, Vec::new())).is_err());
}
