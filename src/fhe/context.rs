// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Explicit FHE client context
//!
//! Owns the connection to the engine's input encryption for one chain.
//! Callers create it, `init` it, pass it by reference to builders, and
//! `dispose` it when the session ends. Independent contexts can coexist.

use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::input::{EncryptedInputBuilder, InputEncryptor, InputError};
use crate::config::chains::{ChainConfig, ChainRegistry};
use crate::errors::RollError;

enum ContextState {
    Uninitialized,
    Ready(Arc<dyn InputEncryptor>),
    Disposed,
}

impl ContextState {
    fn name(&self) -> &'static str {
        match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Ready(_) => "ready",
            ContextState::Disposed => "disposed",
        }
    }
}

pub struct FheContext {
    chain: ChainConfig,
    state: RwLock<ContextState>,
}

impl FheContext {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            state: RwLock::new(ContextState::Uninitialized),
        }
    }

    /// Build a context for `chain_id`, failing fast on unsupported networks
    pub fn for_chain_id(registry: &ChainRegistry, chain_id: u64) -> Result<Self, RollError> {
        let chain = registry.ensure_supported(chain_id)?.clone();
        Ok(Self::new(chain))
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub async fn init(&self, encryptor: Arc<dyn InputEncryptor>) -> Result<(), InputError> {
        let mut state = self.state.write().await;
        match *state {
            ContextState::Disposed => return Err(InputError::Disposed),
            ContextState::Ready(_) => {
                warn!("FHE context for chain {} re-initialized", self.chain.chain_id);
            }
            ContextState::Uninitialized => {}
        }
        *state = ContextState::Ready(encryptor);
        info!("🔐 FHE context ready for {} ({})", self.chain.name, self.chain.chain_id);
        Ok(())
    }

    pub async fn dispose(&self) {
        let mut state = self.state.write().await;
        if matches!(*state, ContextState::Ready(_)) {
            info!("🗑️  FHE context for chain {} disposed", self.chain.chain_id);
        }
        *state = ContextState::Disposed;
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, ContextState::Ready(_))
    }

    pub async fn state_name(&self) -> &'static str {
        self.state.read().await.name()
    }

    pub(crate) async fn encryptor(&self) -> Result<Arc<dyn InputEncryptor>, InputError> {
        match &*self.state.read().await {
            ContextState::Ready(encryptor) => Ok(encryptor.clone()),
            ContextState::Disposed => Err(InputError::Disposed),
            ContextState::Uninitialized => Err(InputError::NotInitialized),
        }
    }

    /// Start an encrypted input bound to `(contract, user)`
    pub fn create_encrypted_input(&self, contract: Address, user: Address) -> EncryptedInputBuilder<'_> {
        EncryptedInputBuilder::new(self, contract, user)
    }
}
