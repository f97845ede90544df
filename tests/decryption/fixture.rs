// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Coprocessor, ACL and relayer wiring for decryption tests
#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::Address;
use fhe_roll_ledger::acl::GrantBatch;
use fhe_roll_ledger::crypto::{DecryptionDomain, LocalWalletSigner, WalletSigner};
use fhe_roll_ledger::decryption::{
    DecryptFailure, DecryptionClient, InProcessRelayer, RelayerClient, ResponseMode,
    UserDecryptRequest,
};
use fhe_roll_ledger::fhe::{BitWidth, CiphertextHandle, FheEngine, LocalCoprocessor};
use fhe_roll_ledger::{AccessControlList, ChainConfig};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wraps a relayer, counting round trips and optionally delaying them
pub struct CountingRelayer<R> {
    inner: R,
    calls: AtomicUsize,
    delay: Duration,
}

impl<R: RelayerClient> CountingRelayer<R> {
    pub fn new(inner: R) -> Self {
        Self::with_delay(inner, Duration::ZERO)
    }

    pub fn with_delay(inner: R, delay: Duration) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: RelayerClient> RelayerClient for CountingRelayer<R> {
    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<Value, DecryptFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.user_decrypt(request).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Relayer that always fails the same way
pub struct FailingRelayer(pub DecryptFailure);

#[async_trait]
impl RelayerClient for FailingRelayer {
    async fn user_decrypt(&self, _request: &UserDecryptRequest) -> Result<Value, DecryptFailure> {
        Err(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Fails its first `failures` round trips as unreachable, then delegates
pub struct FlakyRelayer<R> {
    inner: R,
    failures: usize,
    calls: AtomicUsize,
    delay: Duration,
}

impl<R: RelayerClient> FlakyRelayer<R> {
    pub fn new(inner: R, failures: usize, delay: Duration) -> Self {
        Self {
            inner,
            failures,
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: RelayerClient> RelayerClient for FlakyRelayer<R> {
    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<Value, DecryptFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.failures {
            return Err(DecryptFailure::NetworkUnavailable("blip".to_string()));
        }
        self.inner.user_decrypt(request).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

pub struct Env {
    pub chain: ChainConfig,
    pub engine: Arc<LocalCoprocessor>,
    pub acl: Arc<AccessControlList>,
    pub domain: DecryptionDomain,
    pub contract: Address,
    pub wallet: Arc<LocalWalletSigner>,
}

impl Env {
    pub fn new() -> Self {
        let chain = ChainConfig::sepolia();
        let engine = Arc::new(LocalCoprocessor::new(chain.chain_id));
        let domain = DecryptionDomain::new(chain.gateway_chain_id, chain.fhevm.decryption_verifier);
        Self {
            wallet: Arc::new(LocalWalletSigner::random(chain.chain_id)),
            chain,
            engine,
            acl: Arc::new(AccessControlList::new()),
            domain,
            contract: Address::random(),
        }
    }

    pub fn user(&self) -> Address {
        self.wallet.address()
    }

    pub fn relayer(&self, mode: ResponseMode) -> InProcessRelayer {
        InProcessRelayer::new(self.engine.clone(), self.acl.clone(), self.domain.clone())
            .with_mode(mode)
    }

    pub fn client(&self, relayer: Arc<dyn RelayerClient>) -> DecryptionClient {
        DecryptionClient::new(relayer, self.wallet.clone(), self.domain.clone(), self.chain.chain_id)
    }

    /// Fresh u32 ciphertext granted to the test user through `contract`
    pub fn granted(&self, value: u64) -> CiphertextHandle {
        let handle = self.ungranted(value);
        self.acl
            .apply(GrantBatch::new().balance_handle(handle, self.contract, self.user()))
            .unwrap();
        handle
    }

    /// Fresh u32 ciphertext only the contract may use
    pub fn ungranted(&self, value: u64) -> CiphertextHandle {
        let handle = self.engine.trivial_encrypt(value, BitWidth::U32).unwrap();
        self.acl.allow_this(handle, self.contract).unwrap();
        handle
    }
}
