// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process relayer
//!
//! Plays relayer and KMS against a [`LocalCoprocessor`]: it recovers the
//! signer of the EIP-712 authorisation, enforces the validity window and the
//! ACL rule, and answers with cleartexts sealed to the session's ephemeral
//! key. Used by the CLI simulator, integration tests and benchmarks.

use async_trait::async_trait;
use chrono::Utc;
use ethers::types::U256;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::DecryptFailure;
use super::relayer::RelayerClient;
use super::request::UserDecryptRequest;
use crate::acl::AccessControlList;
use crate::crypto::{recover_signer, seal_value, DecryptionDomain, UserDecryptTypedData};
use crate::fhe::{CiphertextHandle, LocalCoprocessor};

const SECONDS_PER_DAY: u64 = 86_400;

/// Which answer shape to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// `{"clearValues": {handle: {"sealed": ..}}, "denied": [..]}`
    Sealed,
    /// `{"clearValues": {handle: "0x.."}, "denied": [..]}`
    Clear,
    /// `[value, ...]` in request order; any denial fails the whole request
    Ordered,
}

pub struct InProcessRelayer {
    engine: Arc<LocalCoprocessor>,
    acl: Arc<AccessControlList>,
    domain: DecryptionDomain,
    mode: ResponseMode,
    fixed_now: Option<u64>,
}

impl InProcessRelayer {
    pub fn new(
        engine: Arc<LocalCoprocessor>,
        acl: Arc<AccessControlList>,
        domain: DecryptionDomain,
    ) -> Self {
        Self {
            engine,
            acl,
            domain,
            mode: ResponseMode::Sealed,
            fixed_now: None,
        }
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pin the relayer clock (unix seconds)
    pub fn at_time(mut self, now: u64) -> Self {
        self.fixed_now = Some(now);
        self
    }

    fn now(&self) -> u64 {
        self.fixed_now
            .unwrap_or_else(|| Utc::now().timestamp().max(0) as u64)
    }

    /// Recover the signer and check it is the declared user
    fn authenticate(&self, request: &UserDecryptRequest) -> Result<(), DecryptFailure> {
        let denied = |msg: String| DecryptFailure::AuthorizationDenied(msg);

        let start_timestamp = request
            .start_timestamp()
            .ok_or_else(|| denied("startTimestamp is not a decimal integer".to_string()))?;
        let duration_days = request
            .duration_days()
            .ok_or_else(|| denied("durationDays is not a decimal integer".to_string()))?;
        let public_key = hex::decode(request.public_key.trim_start_matches("0x"))
            .map_err(|e| denied(format!("publicKey: {}", e)))?;
        let extra_data = hex::decode(request.extra_data.trim_start_matches("0x"))
            .map_err(|e| denied(format!("extraData: {}", e)))?;
        let signature = hex::decode(request.signature.trim_start_matches("0x"))
            .map_err(|e| denied(format!("signature: {}", e)))?;

        let typed_data = UserDecryptTypedData {
            domain: self.domain.clone(),
            public_key,
            contract_addresses: request.contract_addresses.clone(),
            start_timestamp,
            duration_days,
            extra_data,
        };
        let signer = recover_signer(&signature, &typed_data.digest())
            .map_err(|e| denied(format!("signature: {}", e)))?;
        if signer != request.user_address {
            return Err(denied(format!(
                "signature recovers to {:?}, not {:?}",
                signer, request.user_address
            )));
        }

        let now = self.now();
        let end = start_timestamp.saturating_add(duration_days.saturating_mul(SECONDS_PER_DAY));
        if now < start_timestamp || now >= end {
            return Err(denied(format!(
                "request valid from {} to {}, now {}",
                start_timestamp, end, now
            )));
        }
        Ok(())
    }

    fn seal(&self, handle: CiphertextHandle, value: U256, public_key: &[u8]) -> Result<Value, DecryptFailure> {
        match self.mode {
            ResponseMode::Sealed => {
                let mut plaintext = [0u8; 32];
                value.to_big_endian(&mut plaintext);
                let sealed = seal_value(&plaintext, handle.as_bytes(), public_key)
                    .map_err(|e| DecryptFailure::AuthorizationDenied(format!("publicKey: {}", e)))?;
                Ok(json!({ "sealed": sealed }))
            }
            ResponseMode::Clear | ResponseMode::Ordered => Ok(json!(format!("{:#x}", value))),
        }
    }
}

#[async_trait]
impl RelayerClient for InProcessRelayer {
    async fn user_decrypt(
        &self,
        request: &UserDecryptRequest,
    ) -> Result<Value, DecryptFailure> {
        if request.contracts_chain_id != self.engine.chain_id() {
            return Err(DecryptFailure::AuthorizationDenied(format!(
                "ciphertexts live on chain {}, request names {}",
                self.engine.chain_id(),
                request.contracts_chain_id
            )));
        }
        self.authenticate(request)?;

        if let Some(pair) = request
            .handle_contract_pairs
            .iter()
            .find(|p| !request.contract_addresses.contains(&p.contract_address))
        {
            return Err(DecryptFailure::AuthorizationDenied(format!(
                "contract {:?} was not part of the signed authorisation",
                pair.contract_address
            )));
        }

        let public_key = hex::decode(request.public_key.trim_start_matches("0x"))
            .map_err(|e| DecryptFailure::AuthorizationDenied(format!("publicKey: {}", e)))?;

        let mut clear_values = Map::new();
        let mut ordered = Vec::with_capacity(request.handle_contract_pairs.len());
        let mut denied = Vec::new();

        for pair in &request.handle_contract_pairs {
            if !self
                .acl
                .can_user_decrypt(pair.handle, request.user_address, pair.contract_address)
            {
                warn!(
                    "user {:?} holds no grant on {} via {:?}",
                    request.user_address, pair.handle, pair.contract_address
                );
                denied.push(pair.handle.to_hex());
                continue;
            }
            let (value, _width) = self
                .engine
                .reveal(pair.handle)
                .map_err(|e| DecryptFailure::malformed(e.to_string()))?;
            let answer = self.seal(pair.handle, value, &public_key)?;
            ordered.push(answer.clone());
            clear_values.insert(pair.handle.to_hex(), answer);
        }

        info!(
            "relayer answered {} handle(s) for {:?}, {} denied",
            clear_values.len(),
            request.user_address,
            denied.len()
        );

        match self.mode {
            ResponseMode::Ordered => {
                if !denied.is_empty() {
                    return Err(DecryptFailure::AuthorizationDenied(format!(
                        "no grant on {}",
                        denied.join(", ")
                    )));
                }
                debug!("answering with ordered array");
                Ok(Value::Array(ordered))
            }
            ResponseMode::Sealed | ResponseMode::Clear => Ok(json!({
                "clearValues": clear_values,
                "denied": denied,
            })),
        }
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}
