// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! EIP-712 user-decrypt authorisation against the ethers implementation

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::{Eip712, TypedData};
use ethers::types::{Address, Signature, H256};
use fhe_roll_ledger::crypto::{
    recover_signer, DecryptionDomain, LocalWalletSigner, UserDecryptTypedData, WalletSigner,
};
use fhe_roll_ledger::ChainConfig;

const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

fn typed_data() -> UserDecryptTypedData {
    let chain = ChainConfig::sepolia();
    UserDecryptTypedData {
        domain: DecryptionDomain::new(chain.gateway_chain_id, chain.fhevm.decryption_verifier),
        public_key: vec![0x03; 33],
        contract_addresses: vec![Address::from_low_u64_be(0x1ed9e5)],
        start_timestamp: 1_730_000_000,
        duration_days: 10,
        extra_data: vec![0x00],
    }
}

#[test]
fn test_sepolia_domain_values() {
    let domain = typed_data().domain;
    assert_eq!(domain.chain_id, 55815);
    assert_eq!(
        domain.verifying_contract,
        "0xb6E160B1ff80D67Bfe90A85eE06Ce0A2613607D1"
            .parse::<Address>()
            .unwrap()
    );
}

#[test]
fn test_digest_matches_ethers() {
    let ours = typed_data();
    let reference: TypedData = serde_json::from_value(ours.to_json()).unwrap();
    assert_eq!(ours.digest(), reference.encode_eip712().unwrap());
    assert_eq!(ours.domain.separator(), reference.domain_separator().unwrap());
}

#[tokio::test]
async fn test_wallet_address_matches_ethers_wallet() {
    let ours = LocalWalletSigner::from_private_key_hex(KEY, 11155111).unwrap();
    let theirs: LocalWallet = KEY.parse().unwrap();
    assert_eq!(ours.address(), theirs.address());
}

#[tokio::test]
async fn test_signature_recovers_with_both_implementations() {
    let wallet = LocalWalletSigner::from_private_key_hex(KEY, 11155111).unwrap();
    let typed = typed_data();
    let signature = wallet.sign_typed_data(&typed).await.unwrap();
    let digest = typed.digest();

    assert_eq!(
        recover_signer(signature.as_bytes(), &digest).unwrap(),
        wallet.address()
    );
    let ethers_sig = Signature::try_from(&signature.as_bytes()[..]).unwrap();
    assert_eq!(ethers_sig.recover(H256::from(digest)).unwrap(), wallet.address());
}

#[tokio::test]
async fn test_ethers_signature_recovers_to_its_wallet() {
    let theirs: LocalWallet = KEY.parse().unwrap();
    let typed = typed_data();
    let reference: TypedData = serde_json::from_value(typed.to_json()).unwrap();
    let signature = theirs.sign_typed_data(&reference).await.unwrap();
    assert_eq!(
        recover_signer(&signature.to_vec(), &typed.digest()).unwrap(),
        theirs.address()
    );
}

#[tokio::test]
async fn test_altered_window_recovers_someone_else() {
    let wallet = LocalWalletSigner::random(11155111);
    let typed = typed_data();
    let signature = wallet.sign_typed_data(&typed).await.unwrap();

    let mut stretched = typed.clone();
    stretched.duration_days = 365;
    let recovered = recover_signer(signature.as_bytes(), &stretched.digest()).unwrap();
    assert_ne!(recovered, wallet.address());
}
