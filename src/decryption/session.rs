// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User decryption session
//!
//! One session per user decrypt action:
//!
//! ```text
//! Idle → KeypairGenerated → PayloadSigned → AwaitingRelayer → Resolved
//!                                  ↘              ↘
//!                                   Failed         Failed
//! ```
//!
//! A session is never persisted. Once it reaches a terminal state the
//! ephemeral keypair is dropped.

use chrono::{DateTime, Utc};
use ethers::types::Address;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{DecryptFailure, SessionError};
use super::request::{HandleContractPair, RequestValidity, UserDecryptRequest};
use super::response::{normalize, HandleOutcome};
use crate::crypto::{
    DecryptionDomain, Eip712Signature, EphemeralKeypair, UserDecryptTypedData, WalletSigner,
};

const EXTRA_DATA: [u8; 1] = [0x00];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    KeypairGenerated,
    PayloadSigned,
    AwaitingRelayer,
    Resolved,
    Failed(DecryptFailure),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::KeypairGenerated => "keypair_generated",
            SessionState::PayloadSigned => "payload_signed",
            SessionState::AwaitingRelayer => "awaiting_relayer",
            SessionState::Resolved => "resolved",
            SessionState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Resolved | SessionState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub user: Address,
    pub pairs: Vec<HandleContractPair>,
    pub domain: DecryptionDomain,
    /// Host chain the ciphertexts live on
    pub contracts_chain_id: u64,
    pub duration_days: u64,
}

#[derive(Debug)]
pub struct DecryptionSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: SessionState,
    params: SessionParams,
    contract_addresses: Vec<Address>,
    keypair: Option<EphemeralKeypair>,
    typed_data: Option<UserDecryptTypedData>,
    signature: Option<Eip712Signature>,
    outcomes: Vec<HandleOutcome>,
}

impl DecryptionSession {
    pub fn new(params: SessionParams) -> Result<Self, SessionError> {
        if params.pairs.is_empty() {
            return Err(SessionError::Validation("no handles to decrypt".to_string()));
        }
        if params.duration_days == 0 {
            return Err(SessionError::Validation(
                "validity window must be at least one day".to_string(),
            ));
        }
        if let Some(pair) = params.pairs.iter().find(|p| p.contract_address.is_zero()) {
            return Err(SessionError::Validation(format!(
                "handle {} has no contract address",
                pair.handle
            )));
        }

        let mut contract_addresses: Vec<Address> = Vec::new();
        for pair in &params.pairs {
            if !contract_addresses.contains(&pair.contract_address) {
                contract_addresses.push(pair.contract_address);
            }
        }

        let id = Uuid::new_v4();
        debug!("decrypt session {} created for {} handle(s)", id, params.pairs.len());
        Ok(Self {
            id,
            created_at: Utc::now(),
            state: SessionState::Idle,
            params,
            contract_addresses,
            keypair: None,
            typed_data: None,
            signature: None,
            outcomes: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn pairs(&self) -> &[HandleContractPair] {
        &self.params.pairs
    }

    pub fn contract_addresses(&self) -> &[Address] {
        &self.contract_addresses
    }

    pub fn typed_data(&self) -> Option<&UserDecryptTypedData> {
        self.typed_data.as_ref()
    }

    pub fn has_keypair(&self) -> bool {
        self.keypair.is_some()
    }

    /// Per-handle results, in request order, once resolved
    pub fn outcomes(&self) -> &[HandleOutcome] {
        &self.outcomes
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidTransition {
                state: self.state.name(),
                action,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!("decrypt session {}: {} -> {}", self.id, self.state.name(), next.name());
        if next.is_terminal() {
            self.keypair = None;
        }
        self.state = next;
    }

    /// Terminal failure; returns the error to propagate
    pub fn fail(&mut self, failure: DecryptFailure) -> SessionError {
        if !self.state.is_terminal() {
            warn!("decrypt session {} failed: {}", self.id, failure.class());
            self.transition(SessionState::Failed(failure.clone()));
        }
        SessionError::Failed(failure)
    }

    /// Idle → KeypairGenerated
    pub fn generate_keypair(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Idle, "generate a keypair")?;
        self.keypair = Some(EphemeralKeypair::generate());
        self.transition(SessionState::KeypairGenerated);
        Ok(())
    }

    /// KeypairGenerated → PayloadSigned (or Failed on wallet rejection)
    pub async fn sign(
        &mut self,
        wallet: &dyn WalletSigner,
        start_timestamp: u64,
    ) -> Result<(), SessionError> {
        self.expect_state(SessionState::KeypairGenerated, "sign")?;
        let public_key = match self.keypair.as_ref().map(|kp| kp.public_key_bytes()) {
            Some(bytes) => bytes,
            None => return Err(self.fail(DecryptFailure::malformed("ephemeral keypair missing"))),
        };

        let typed_data = UserDecryptTypedData {
            domain: self.params.domain.clone(),
            public_key,
            contract_addresses: self.contract_addresses.clone(),
            start_timestamp,
            duration_days: self.params.duration_days,
            extra_data: EXTRA_DATA.to_vec(),
        };

        match wallet.sign_typed_data(&typed_data).await {
            Ok(signature) => {
                self.typed_data = Some(typed_data);
                self.signature = Some(signature);
                self.transition(SessionState::PayloadSigned);
                Ok(())
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// PayloadSigned → AwaitingRelayer
    pub fn build_request(&mut self) -> Result<UserDecryptRequest, SessionError> {
        self.expect_state(SessionState::PayloadSigned, "submit to the relayer")?;
        let (Some(keypair), Some(typed_data), Some(signature)) =
            (&self.keypair, &self.typed_data, &self.signature)
        else {
            return Err(self.fail(DecryptFailure::malformed("signed session is incomplete")));
        };

        let request = UserDecryptRequest {
            handle_contract_pairs: self.params.pairs.clone(),
            request_validity: RequestValidity {
                start_timestamp: typed_data.start_timestamp.to_string(),
                duration_days: typed_data.duration_days.to_string(),
            },
            contracts_chain_id: self.params.contracts_chain_id,
            contract_addresses: self.contract_addresses.clone(),
            user_address: self.params.user,
            signature: signature.to_hex_unprefixed(),
            public_key: keypair.public_key_hex(),
            extra_data: format!("0x{}", hex::encode(&typed_data.extra_data)),
            private_key: Some(keypair.private_key_hex()),
        };
        self.transition(SessionState::AwaitingRelayer);
        Ok(request)
    }

    /// AwaitingRelayer → Resolved, or Failed when the answer is unusable
    pub fn resolve(&mut self, raw: serde_json::Value) -> Result<&[HandleOutcome], SessionError> {
        self.expect_state(SessionState::AwaitingRelayer, "resolve")?;
        match normalize(raw, &self.params.pairs, self.keypair.as_ref()) {
            Ok(outcomes) => {
                let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
                info!(
                    "🔓 decrypt session {} resolved {} handle(s), {} failed",
                    self.id,
                    outcomes.len() - failed,
                    failed
                );
                self.outcomes = outcomes;
                self.transition(SessionState::Resolved);
                Ok(&self.outcomes)
            }
            Err(failure) => Err(self.fail(failure)),
        }
    }
}
