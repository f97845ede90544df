// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Failure classes surfaced by the decryption client

use super::fixture::{CountingRelayer, Env, FailingRelayer};
use async_trait::async_trait;
use ethers::types::Address;
use fhe_roll_ledger::crypto::{
    Eip712Signature, LocalWalletSigner, UserDecryptTypedData, WalletError, WalletSigner,
};
use fhe_roll_ledger::decryption::{
    DecryptFailure, DecryptionClient, HandleContractPair, ResponseMode,
};
use fhe_roll_ledger::fhe::{BitWidth, FheEngine};
use fhe_roll_ledger::RollError;
use std::sync::Arc;
use std::time::Duration;

/// Wallet connected to the wrong network, or one whose user declines
struct ScriptedWallet {
    inner: LocalWalletSigner,
    chain_id: u64,
    reject: bool,
}

#[async_trait]
impl WalletSigner for ScriptedWallet {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id)
    }

    async fn sign_typed_data(
        &self,
        typed_data: &UserDecryptTypedData,
    ) -> Result<Eip712Signature, WalletError> {
        if self.reject {
            return Err(WalletError::Rejected);
        }
        self.inner.sign_typed_data(typed_data).await
    }
}

#[tokio::test]
async fn test_unreachable_relayer_is_retryable() {
    let env = Env::new();
    let handle = env.granted(1);
    let client = env.client(Arc::new(FailingRelayer(DecryptFailure::NetworkUnavailable(
        "connection refused".to_string(),
    ))));
    let err = client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .unwrap_err();
    assert!(matches!(err, RollError::RelayerUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_slow_relayer_times_out() {
    let env = Env::new();
    let handle = env.granted(1);
    let relayer = Arc::new(CountingRelayer::with_delay(
        env.relayer(ResponseMode::Sealed),
        Duration::from_millis(500),
    ));
    let client = env
        .client(relayer.clone())
        .with_timeout(Duration::from_millis(20));
    let err = client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(relayer.calls(), 1);
}

#[tokio::test]
async fn test_wallet_on_other_network_fails_before_signing() {
    let env = Env::new();
    let handle = env.granted(1);
    let relayer = Arc::new(CountingRelayer::new(env.relayer(ResponseMode::Sealed)));
    let wallet = Arc::new(ScriptedWallet {
        inner: LocalWalletSigner::random(1),
        chain_id: 1,
        reject: false,
    });
    let client = DecryptionClient::new(relayer.clone(), wallet, env.domain.clone(), env.chain.chain_id);

    let err = client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RollError::NetworkMismatch {
            expected: 11155111,
            actual: 1
        }
    );
    assert_eq!(relayer.calls(), 0);
}

#[tokio::test]
async fn test_declined_signature_is_user_cancelled() {
    let env = Env::new();
    let handle = env.granted(1);
    let relayer = Arc::new(CountingRelayer::new(env.relayer(ResponseMode::Sealed)));
    let wallet = Arc::new(ScriptedWallet {
        inner: LocalWalletSigner::random(env.chain.chain_id),
        chain_id: env.chain.chain_id,
        reject: true,
    });
    let client = DecryptionClient::new(relayer.clone(), wallet, env.domain.clone(), env.chain.chain_id);

    let err = client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .unwrap_err();
    assert_eq!(err, RollError::UserCancelled);
    assert!(!err.is_retryable());
    assert_eq!(relayer.calls(), 0);
}

#[tokio::test]
async fn test_expired_authorisation_is_denied() {
    let env = Env::new();
    let handle = env.granted(1);
    // relayer clock 11 days ahead of the signed window start
    let later = chrono::Utc::now().timestamp() as u64 + 11 * 86_400;
    let relayer = Arc::new(env.relayer(ResponseMode::Sealed).at_time(later));
    let client = env.client(relayer);
    let err = client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .unwrap_err();
    assert!(matches!(err, RollError::AuthorizationDenied(_)));

    let within = chrono::Utc::now().timestamp() as u64 + 9 * 86_400;
    let client = env.client(Arc::new(env.relayer(ResponseMode::Sealed).at_time(within)));
    assert!(client
        .decrypt(HandleContractPair::new(handle, env.contract))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_user_and_contract_grants_are_both_required() {
    let env = Env::new();
    let client = env.client(Arc::new(env.relayer(ResponseMode::Sealed)));

    let contract_only = env.ungranted(1);
    let user_only = env.engine.trivial_encrypt(2, BitWidth::U32).unwrap();
    env.acl.allow(user_only, env.user()).unwrap();

    for handle in [contract_only, user_only] {
        let err = client
            .decrypt(HandleContractPair::new(handle, env.contract))
            .await
            .unwrap_err();
        assert!(matches!(err, RollError::AuthorizationDenied(_)));
    }
}
