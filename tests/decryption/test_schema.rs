// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Every relayer response shape normalises to the same outcomes

use ethers::types::{Address, U256};
use fhe_roll_ledger::decryption::{
    normalize, DecryptFailure, HandleContractPair, ResponseSchema,
};
use fhe_roll_ledger::fhe::CiphertextHandle;
use serde_json::json;

fn pairs() -> Vec<HandleContractPair> {
    let contract = Address::from_low_u64_be(0xc0);
    vec![
        HandleContractPair::new(CiphertextHandle::from_bytes([0x11; 32]), contract),
        HandleContractPair::new(CiphertextHandle::from_bytes([0x22; 32]), contract),
    ]
}

fn values(outcomes: &[fhe_roll_ledger::decryption::HandleOutcome]) -> Vec<Option<U256>> {
    outcomes
        .iter()
        .map(|o| o.result.as_ref().ok().map(|v| v.as_u256()))
        .collect()
}

#[test]
fn test_three_schema_versions_agree() {
    let pairs = pairs();
    let h0 = pairs[0].handle.to_hex();
    let h1 = pairs[1].handle.to_hex();

    let with_denied = json!({ "clearValues": { h0.clone(): "0x2a", h1.clone(): 7 }, "denied": [] });
    let ordered = json!(["42", "0x07"]);
    let direct = json!({ h1: "7", h0: 42 });

    let expected = vec![Some(U256::from(42u64)), Some(U256::from(7u64))];
    for raw in [with_denied, ordered, direct] {
        let outcomes = normalize(raw, &pairs, None).unwrap();
        assert_eq!(values(&outcomes), expected);
        assert_eq!(outcomes[0].pair, pairs[0]);
    }
}

#[test]
fn test_schema_detection() {
    assert_eq!(ResponseSchema::parse(json!([])).unwrap().version(), "ordered");
    assert_eq!(
        ResponseSchema::parse(json!({ "clearValues": {} })).unwrap().version(),
        "clear-values"
    );
    assert_eq!(ResponseSchema::parse(json!({})).unwrap().version(), "direct");
    assert!(matches!(
        ResponseSchema::parse(json!("nope")),
        Err(DecryptFailure::MalformedResponse(_))
    ));
}

#[test]
fn test_denied_handle_fails_alone() {
    let pairs = pairs();
    let raw = json!({
        "clearValues": { pairs[0].handle.to_hex(): "9" },
        "denied": [pairs[1].handle.to_hex()],
    });
    let outcomes = normalize(raw, &pairs, None).unwrap();
    assert_eq!(outcomes[0].result.as_ref().unwrap().as_u256(), U256::from(9u64));
    assert!(matches!(
        outcomes[1].result,
        Err(DecryptFailure::AuthorizationDenied(_))
    ));
}

#[test]
fn test_missing_handle_is_malformed_not_denied() {
    let pairs = pairs();
    let raw = json!({ pairs[0].handle.to_hex(): "1" });
    let outcomes = normalize(raw, &pairs, None).unwrap();
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(
        outcomes[1].result,
        Err(DecryptFailure::MalformedResponse(_))
    ));
}

#[test]
fn test_ordered_length_mismatch_fails_whole_answer() {
    let err = normalize(json!(["1"]), &pairs(), None).unwrap_err();
    assert!(matches!(err, DecryptFailure::MalformedResponse(_)));
}

#[test]
fn test_rejects_non_integer_values() {
    let pairs = pairs();
    for bad in [json!(["-1", "2"]), json!([1.5, 2]), json!(["0x", "2"])] {
        let outcomes = normalize(bad, &pairs, None).unwrap();
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
    }
}

#[test]
fn test_sealed_value_without_key_is_malformed() {
    let pairs = pairs();
    let raw = json!([{ "sealed": "0x00" }, "2"]);
    let outcomes = normalize(raw, &pairs, None).unwrap();
    assert!(matches!(
        outcomes[0].result,
        Err(DecryptFailure::MalformedResponse(_))
    ));
}
