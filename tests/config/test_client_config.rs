// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loading client configuration from TOML files

use ethers::types::Address;
use fhe_roll_ledger::config::ChainRegistry;
use fhe_roll_ledger::{ClientConfig, DecryptionClient, InProcessRelayer, LocalCoprocessor, RollError};
use fhe_roll_ledger::crypto::{DecryptionDomain, LocalWalletSigner};
use fhe_roll_ledger::AccessControlList;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_toml_file_with_defaults() {
    let file = write_config(
        r#"
[client]
contract_address = "0x00000000000000000000000000000000001ed9e5"
rpc_url = "https://ethereum-sepolia-rpc.publicnode.com"
relayer_url = "https://relayer.testnet.zama.cloud"
chain_id = 11155111
"#,
    );
    let config = ClientConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.contract_address, Some(Address::from_low_u64_be(0x1ed9e5)));
    assert_eq!(config.decrypt_validity_days, 10);
    assert_eq!(config.relayer_timeout_secs, 30);
    assert_eq!(config.decrypt_cache_max_entries, 1024);
    assert!(config.private_key.is_none());
}

#[test]
fn test_toml_overrides_and_private_key_not_written_back() {
    let file = write_config(
        r#"
[client]
rpc_url = "http://127.0.0.1:8545"
relayer_url = "http://127.0.0.1:3000"
chain_id = 11155111
private_key = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
decrypt_validity_days = 2
relayer_timeout_secs = 5
"#,
    );
    let config = ClientConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.decrypt_validity_days, 2);
    assert_eq!(config.relayer_timeout_secs, 5);
    assert!(config.private_key.is_some());

    let json = serde_json::to_value(&config).unwrap();
    assert!(json.get("private_key").is_none());
}

#[test]
fn test_invalid_files_are_config_errors() {
    let bad_scheme = write_config(
        r#"
[client]
rpc_url = "ftp://example.org"
relayer_url = "http://127.0.0.1:3000"
chain_id = 11155111
"#,
    );
    let zero_window = write_config(
        r#"
[client]
rpc_url = "http://127.0.0.1:8545"
relayer_url = "http://127.0.0.1:3000"
chain_id = 11155111
decrypt_validity_days = 0
"#,
    );
    let not_toml = write_config("client = [");

    for file in [&bad_scheme, &zero_window, &not_toml] {
        let err = ClientConfig::from_toml_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RollError::Config(_)));
    }
    assert!(matches!(
        ClientConfig::from_toml_file("/nonexistent/roll.toml"),
        Err(RollError::Config(_))
    ));
}

#[test]
fn test_registry_rejects_other_networks() {
    let registry = ChainRegistry::new();
    assert!(registry.ensure_supported(11155111).is_ok());
    assert_eq!(
        registry.ensure_supported(1).unwrap_err(),
        RollError::NetworkMismatch {
            expected: 11155111,
            actual: 1
        }
    );
}

#[tokio::test]
async fn test_client_built_from_config_uses_its_settings() {
    let registry = ChainRegistry::new();
    let chain = registry.ensure_supported(11155111).unwrap().clone();
    let config = ClientConfig {
        decrypt_cache_max_entries: 1,
        ..ClientConfig::default()
    };
    let engine = Arc::new(LocalCoprocessor::new(chain.chain_id));
    let domain = DecryptionDomain::new(chain.gateway_chain_id, chain.fhevm.decryption_verifier);
    let relayer = Arc::new(InProcessRelayer::new(
        engine,
        Arc::new(AccessControlList::new()),
        domain,
    ));
    let wallet = Arc::new(LocalWalletSigner::random(chain.chain_id));
    let client = DecryptionClient::for_chain(&chain, &config, relayer, wallet);
    assert_eq!(client.cache().stats().max, 1);
}
