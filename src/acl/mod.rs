// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Permission / ACL manager
//!
//! Explicit grant table keyed by ciphertext handle. Every ledger mutation
//! produces new handles and grants them to `{ledger, owner}` through one
//! [`GrantBatch`], applied all-or-nothing. Grants on superseded handles are
//! left in place: the handle is orphaned, not revoked.
//!
//! Public decryptability is a one-way escalation. Once a handle is public it
//! cannot be made private again.

use ethers::types::Address;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, info};

use crate::fhe::CiphertextHandle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    #[error("cannot grant on the uninitialized (zero) handle")]
    ZeroHandle,

    #[error("cannot grant to the zero address")]
    ZeroPrincipal,

    #[error("ACL state unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct AclState {
    grants: HashMap<CiphertextHandle, HashSet<Address>>,
    public: HashSet<CiphertextHandle>,
}

/// Pending grants committed together by [`AccessControlList::apply`]
#[derive(Debug, Default, Clone)]
pub struct GrantBatch {
    grants: Vec<(CiphertextHandle, Address)>,
}

impl GrantBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, handle: CiphertextHandle, principal: Address) -> Self {
        self.grants.push((handle, principal));
        self
    }

    /// `allowThis` + `allow(owner)` on a freshly produced balance handle
    pub fn balance_handle(self, handle: CiphertextHandle, ledger: Address, owner: Address) -> Self {
        self.allow(handle, ledger).allow(handle, owner)
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct AccessControlList {
    state: RwLock<AclState>,
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, AclState>, AclError> {
        self.state
            .read()
            .map_err(|_| AclError::Unavailable("ACL lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, AclState>, AclError> {
        self.state
            .write()
            .map_err(|_| AclError::Unavailable("ACL lock poisoned".to_string()))
    }

    /// Grant a single principal
    pub fn allow(&self, handle: CiphertextHandle, principal: Address) -> Result<(), AclError> {
        self.apply(GrantBatch::new().allow(handle, principal))
    }

    /// Grant the contract that owns the handle
    pub fn allow_this(&self, handle: CiphertextHandle, contract: Address) -> Result<(), AclError> {
        self.allow(handle, contract)
    }

    /// Commit every grant in `batch`, or none of them
    pub fn apply(&self, batch: GrantBatch) -> Result<(), AclError> {
        for (handle, principal) in &batch.grants {
            if handle.is_zero() {
                return Err(AclError::ZeroHandle);
            }
            if principal.is_zero() {
                return Err(AclError::ZeroPrincipal);
            }
        }

        let mut state = self.write()?;
        for (handle, principal) in &batch.grants {
            state.grants.entry(*handle).or_default().insert(*principal);
        }
        debug!("applied ACL batch of {} grant(s)", batch.len());
        Ok(())
    }

    pub fn is_allowed(&self, handle: CiphertextHandle, principal: Address) -> bool {
        self.read()
            .map(|s| {
                s.grants
                    .get(&handle)
                    .map(|set| set.contains(&principal))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Irrevocably allow anyone to decrypt `handle`
    pub fn make_public(&self, handle: CiphertextHandle) -> Result<(), AclError> {
        if handle.is_zero() {
            return Err(AclError::ZeroHandle);
        }
        let mut state = self.write()?;
        if state.public.insert(handle) {
            info!("🔓 handle {} is now publicly decryptable", handle);
        }
        Ok(())
    }

    pub fn is_public(&self, handle: CiphertextHandle) -> bool {
        self.read()
            .map(|s| s.public.contains(&handle))
            .unwrap_or(false)
    }

    /// User-decrypt rule: public, or both the user and the contract hold a grant
    pub fn can_user_decrypt(
        &self,
        handle: CiphertextHandle,
        user: Address,
        contract: Address,
    ) -> bool {
        self.is_public(handle) || (self.is_allowed(handle, user) && self.is_allowed(handle, contract))
    }

    pub fn principals(&self, handle: CiphertextHandle) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .read()
            .map(|s| {
                s.grants
                    .get(&handle)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        out.sort();
        out
    }
}
