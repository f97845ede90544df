// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User decryption client
//!
//! Drives a [`DecryptionSession`] per request against a [`RelayerClient`]
//! and a [`WalletSigner`], with three shortcuts in front of it:
//!
//! - the zero handle decrypts to 0 without any network call
//! - plaintexts are cached per handle (see [`DecryptedValueCache`])
//! - concurrent requests for the same handle share one round trip
//!
//! Nothing here retries on its own. A `RelayerUnavailable` error is
//! retryable, but only when the caller asks again.

use chrono::Utc;
use ethers::types::{Address, U256};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::errors::DecryptFailure;
use super::relayer::RelayerClient;
use super::request::HandleContractPair;
use super::response::{ClearValue, HandleOutcome};
use super::session::{DecryptionSession, SessionParams};
use crate::cache::DecryptedValueCache;
use crate::config::{ChainConfig, ClientConfig};
use crate::crypto::{DecryptionDomain, WalletSigner};
use crate::errors::RollError;
use crate::fhe::CiphertextHandle;
use crate::monitoring::RollMetrics;

type SharedDecrypt = Shared<BoxFuture<'static, Result<ClearValue, RollError>>>;
type InFlight = Arc<Mutex<HashMap<CiphertextHandle, SharedDecrypt>>>;

/// Everything one session needs; cloned into coalesced futures
#[derive(Clone)]
struct SessionRunner {
    relayer: Arc<dyn RelayerClient>,
    wallet: Arc<dyn WalletSigner>,
    domain: DecryptionDomain,
    contracts_chain_id: u64,
    validity_days: u64,
    timeout: Duration,
    metrics: Option<Arc<RollMetrics>>,
}

impl SessionRunner {
    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_decrypt_outcome(outcome);
        }
    }

    /// Wallet network must match the chain the ciphertexts live on
    async fn preflight(&self) -> Result<(), RollError> {
        let actual = self
            .wallet
            .chain_id()
            .await
            .map_err(|e| RollError::from(DecryptFailure::from(e)))?;
        if actual != self.contracts_chain_id {
            warn!(
                "wallet is on chain {}, ciphertexts live on {}",
                actual, self.contracts_chain_id
            );
            return Err(RollError::NetworkMismatch {
                expected: self.contracts_chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// One full session: keypair, signature, relayer round trip, normalise
    async fn run(&self, pairs: Vec<HandleContractPair>) -> Result<Vec<HandleOutcome>, RollError> {
        self.preflight().await?;

        let mut session = DecryptionSession::new(SessionParams {
            user: self.wallet.address(),
            pairs,
            domain: self.domain.clone(),
            contracts_chain_id: self.contracts_chain_id,
            duration_days: self.validity_days,
        })?;

        let result = self.drive(&mut session).await;
        match &result {
            Ok(outcomes) => {
                for outcome in outcomes {
                    match &outcome.result {
                        Ok(_) => self.record_outcome("ok"),
                        Err(failure) => self.record_outcome(failure.class()),
                    }
                }
            }
            Err(err) => {
                warn!("decrypt session {} failed: {}", session.id(), err);
                self.record_outcome(match err {
                    RollError::UserCancelled => "user_cancelled",
                    RollError::RelayerUnavailable(_) => "network_unavailable",
                    RollError::AuthorizationDenied(_) => "authorization_denied",
                    _ => "malformed_response",
                });
            }
        }
        result
    }

    async fn drive(&self, session: &mut DecryptionSession) -> Result<Vec<HandleOutcome>, RollError> {
        session.generate_keypair()?;
        let start_timestamp = Utc::now().timestamp().max(0) as u64;
        session.sign(self.wallet.as_ref(), start_timestamp).await?;
        let request = session.build_request()?;

        let started = Instant::now();
        let answer = tokio::time::timeout(self.timeout, self.relayer.user_decrypt(&request)).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_relayer_call(started.elapsed());
        }

        let raw = match answer {
            Ok(Ok(raw)) => raw,
            Ok(Err(failure)) => return Err(session.fail(failure).into()),
            Err(_) => {
                return Err(session
                    .fail(DecryptFailure::NetworkUnavailable(format!(
                        "relayer did not answer within {}s",
                        self.timeout.as_secs()
                    )))
                    .into())
            }
        };
        debug!(
            "relayer {} answered session {} in {:?}",
            self.relayer.name(),
            session.id(),
            started.elapsed()
        );

        Ok(session.resolve(raw)?.to_vec())
    }

    async fn run_single(self, pair: HandleContractPair) -> Result<ClearValue, RollError> {
        let mut outcomes = self.run(vec![pair]).await?;
        match outcomes.pop() {
            Some(outcome) => outcome.result.map_err(RollError::from),
            None => Err(RollError::MalformedResponse(format!(
                "no outcome for {}",
                pair.handle
            ))),
        }
    }
}

pub struct DecryptionClient {
    runner: SessionRunner,
    cache: Arc<DecryptedValueCache>,
    in_flight: InFlight,
}

impl DecryptionClient {
    /// # Arguments
    /// * `domain` - EIP-712 decryption domain (gateway chain + verifier)
    /// * `contracts_chain_id` - host chain the ciphertexts live on
    pub fn new(
        relayer: Arc<dyn RelayerClient>,
        wallet: Arc<dyn WalletSigner>,
        domain: DecryptionDomain,
        contracts_chain_id: u64,
    ) -> Self {
        let defaults = ClientConfig::default();
        Self {
            runner: SessionRunner {
                relayer,
                wallet,
                domain,
                contracts_chain_id,
                validity_days: defaults.decrypt_validity_days,
                timeout: Duration::from_secs(defaults.relayer_timeout_secs),
                metrics: None,
            },
            cache: Arc::new(DecryptedValueCache::new(defaults.decrypt_cache_max_entries)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Client for `chain`, with validity, timeout and cache size from `config`
    pub fn for_chain(
        chain: &ChainConfig,
        config: &ClientConfig,
        relayer: Arc<dyn RelayerClient>,
        wallet: Arc<dyn WalletSigner>,
    ) -> Self {
        let domain = DecryptionDomain::new(chain.gateway_chain_id, chain.fhevm.decryption_verifier);
        Self::new(relayer, wallet, domain, chain.chain_id)
            .with_validity_days(config.decrypt_validity_days)
            .with_timeout(Duration::from_secs(config.relayer_timeout_secs))
            .with_cache(Arc::new(DecryptedValueCache::new(
                config.decrypt_cache_max_entries,
            )))
    }

    pub fn with_validity_days(mut self, days: u64) -> Self {
        self.runner.validity_days = days;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: Arc<DecryptedValueCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RollMetrics>) -> Self {
        self.runner.metrics = Some(metrics);
        self
    }

    pub fn cache(&self) -> &Arc<DecryptedValueCache> {
        &self.cache
    }

    pub fn user(&self) -> Address {
        self.runner.wallet.address()
    }

    /// Cached value for a handle, counting hit/miss in metrics
    fn cached(&self, handle: &CiphertextHandle) -> Option<ClearValue> {
        let value = self.cache.get(handle).map(ClearValue);
        if let Some(metrics) = &self.runner.metrics {
            match value {
                Some(_) => metrics.record_cache_hit(),
                None => metrics.record_cache_miss(),
            }
        }
        value
    }

    /// Decrypt one handle
    pub async fn decrypt(&self, pair: HandleContractPair) -> Result<ClearValue, RollError> {
        if pair.handle.is_zero() {
            return Ok(ClearValue(U256::zero()));
        }
        if let Some(value) = self.cached(&pair.handle) {
            debug!("decrypt cache hit for {}", pair.handle);
            return Ok(value);
        }

        let shared = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| RollError::Engine("in-flight table lock poisoned".to_string()))?;
            match in_flight.get(&pair.handle) {
                Some(existing) => {
                    debug!("joining in-flight decrypt of {}", pair.handle);
                    if let Some(metrics) = &self.runner.metrics {
                        metrics.record_coalesced();
                    }
                    existing.clone()
                }
                None => {
                    let fut = self.round_trip(pair).boxed().shared();
                    in_flight.insert(pair.handle, fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// Round trip shared by coalesced callers. It caches its value and
    /// removes its own in-flight entry, whichever caller polls it to the end.
    fn round_trip(
        &self,
        pair: HandleContractPair,
    ) -> impl std::future::Future<Output = Result<ClearValue, RollError>> + Send + 'static {
        let runner = self.runner.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();
        async move {
            let result = runner.run_single(pair).await;
            if let Ok(value) = &result {
                cache.insert(pair.handle, value.as_u256());
            }
            if let Ok(mut table) = in_flight.lock() {
                table.remove(&pair.handle);
            }
            result
        }
    }

    /// Decrypt several handles with a single signature and round trip
    ///
    /// Per-handle failures (e.g. a missing grant) come back inside the
    /// outcomes; `Err` means the session as a whole failed.
    pub async fn decrypt_batch(
        &self,
        pairs: &[HandleContractPair],
    ) -> Result<Vec<HandleOutcome>, RollError> {
        let mut resolved: HashMap<CiphertextHandle, ClearValue> = HashMap::new();
        let mut pending: Vec<HandleContractPair> = Vec::new();

        for pair in pairs {
            if pair.handle.is_zero() {
                resolved.insert(pair.handle, ClearValue(U256::zero()));
            } else if let Some(value) = self.cached(&pair.handle) {
                resolved.insert(pair.handle, value);
            } else if !pending.contains(pair) {
                pending.push(*pair);
            }
        }

        let mut fetched: HashMap<HandleContractPair, HandleOutcome> = HashMap::new();
        if !pending.is_empty() {
            info!("decrypting {} handle(s) in one session", pending.len());
            for outcome in self.runner.run(pending).await? {
                if let Ok(value) = &outcome.result {
                    self.cache.insert(outcome.pair.handle, value.as_u256());
                }
                fetched.insert(outcome.pair, outcome);
            }
        }

        Ok(pairs
            .iter()
            .map(|pair| match resolved.get(&pair.handle) {
                Some(value) => HandleOutcome {
                    pair: *pair,
                    result: Ok(*value),
                },
                None => fetched.get(pair).cloned().unwrap_or_else(|| HandleOutcome {
                    pair: *pair,
                    result: Err(DecryptFailure::malformed(format!(
                        "no outcome for {}",
                        pair.handle
                    ))),
                }),
            })
            .collect())
    }

    /// Decrypt `owner`'s `euint32` balance held at `handle`
    ///
    /// Records `handle` as the owner's current balance handle first, so a
    /// value cached for a superseded handle is never returned. A value wider
    /// than 32 bits is a `MalformedResponse`.
    pub async fn decrypt_balance(
        &self,
        owner: Address,
        handle: CiphertextHandle,
        contract: Address,
    ) -> Result<u32, RollError> {
        if self.cache.observe_handle(owner, handle) {
            debug!("balance of {:?} moved to {}", owner, handle);
        }
        let value = self
            .decrypt(HandleContractPair::new(handle, contract))
            .await?;
        Ok(value.to_u32()?)
    }
}
