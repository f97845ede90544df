// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypted value cache
//!
//! Keyed by ciphertext handle, never by address. Every ledger mutation yields
//! a new handle, so a cached plaintext can only ever describe the handle it
//! was decrypted from. The cache also tracks each owner's *current* handle:
//! when that changes, the value of the superseded handle is dropped instead
//! of being shown as the current balance.

use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tracing::debug;

use crate::fhe::CiphertextHandle;

struct CachedEntry {
    value: U256,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheState {
    values: HashMap<CiphertextHandle, CachedEntry>,
    current: HashMap<Address, CiphertextHandle>,
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries in cache
    pub total: usize,
    /// Maximum cache capacity
    pub max: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because their owner moved to a new handle
    pub invalidations: u64,
}

pub struct DecryptedValueCache {
    state: RwLock<CacheState>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl DecryptedValueCache {
    /// Create a new cache holding at most `max_entries` plaintexts
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Cached plaintext of `handle`, if any
    pub fn get(&self, handle: &CiphertextHandle) -> Option<U256> {
        let value = self
            .state
            .read()
            .ok()
            .and_then(|s| s.values.get(handle).map(|e| e.value));
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    pub fn insert(&self, handle: CiphertextHandle, value: U256) {
        let mut state = match self.state.write() {
            Ok(s) => s,
            Err(_) => return,
        };

        if !state.values.contains_key(&handle) && state.values.len() >= self.max_entries {
            Self::evict_oldest(&mut state.values);
        }
        state.values.insert(
            handle,
            CachedEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Record that `owner`'s balance now lives at `handle`
    ///
    /// Returns `true` when a stale value was dropped.
    pub fn observe_handle(&self, owner: Address, handle: CiphertextHandle) -> bool {
        let mut state = match self.state.write() {
            Ok(s) => s,
            Err(_) => return false,
        };
        let previous = state.current.insert(owner, handle);
        match previous {
            Some(old) if old != handle => {
                let dropped = state.values.remove(&old).is_some();
                if dropped {
                    self.invalidations.fetch_add(1, Ordering::Relaxed);
                    debug!("balance handle of {:?} changed {} -> {}, dropped cached value", owner, old, handle);
                }
                dropped
            }
            _ => false,
        }
    }

    pub fn current_handle(&self, owner: &Address) -> Option<CiphertextHandle> {
        self.state.read().ok()?.current.get(owner).copied()
    }

    /// Cached plaintext of `owner`'s current handle only
    pub fn current_value(&self, owner: &Address) -> Option<U256> {
        let handle = self.current_handle(owner)?;
        self.get(&handle)
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.values.clear();
            state.current.clear();
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let total = self.state.read().map(|s| s.values.len()).unwrap_or(0);
        CacheStats {
            total,
            max: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Evict the oldest entry from the cache
    fn evict_oldest(values: &mut HashMap<CiphertextHandle, CachedEntry>) {
        if let Some(oldest) = values
            .iter()
            .min_by_key(|(_, v)| v.inserted_at)
            .map(|(k, _)| *k)
        {
            values.remove(&oldest);
            debug!("decrypt cache full, evicted {}", oldest);
        }
    }
}
