// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger and decryption metrics
//!
//! Prometheus-compatible counters for ledger operations and the
//! user-decryption client.

use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// RollMetrics tracks:
/// - `roll_ledger_operations_total{operation, outcome}` - Ledger calls by result
/// - `roll_decrypt_requests_total{outcome}` - Per-handle decryption outcomes
/// - `roll_relayer_round_trips_total` - Requests actually sent to the relayer
/// - `roll_relayer_duration_seconds` - Relayer round-trip time
/// - `roll_decrypt_cache_hits_total` / `roll_decrypt_cache_misses_total`
/// - `roll_decrypt_coalesced_total` - Decrypts served by an in-flight request
#[derive(Clone)]
pub struct RollMetrics {
    registry: Registry,
    pub ledger_operations: IntCounterVec,
    pub decrypt_requests: IntCounterVec,
    pub relayer_round_trips: IntCounter,
    pub relayer_duration: Histogram,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub coalesced: IntCounter,
}

impl RollMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let ledger_operations = IntCounterVec::new(
            Opts::new("roll_ledger_operations_total", "Ledger operations by outcome"),
            &["operation", "outcome"],
        )?;
        let decrypt_requests = IntCounterVec::new(
            Opts::new("roll_decrypt_requests_total", "Per-handle decryption outcomes"),
            &["outcome"],
        )?;
        let relayer_round_trips = IntCounter::new(
            "roll_relayer_round_trips_total",
            "Requests sent to the decryption relayer",
        )?;
        let relayer_duration = Histogram::with_opts(
            HistogramOpts::new(
                "roll_relayer_duration_seconds",
                "Decryption relayer round-trip time in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        )?;
        let cache_hits = IntCounter::new("roll_decrypt_cache_hits_total", "Decrypted value cache hits")?;
        let cache_misses =
            IntCounter::new("roll_decrypt_cache_misses_total", "Decrypted value cache misses")?;
        let coalesced = IntCounter::new(
            "roll_decrypt_coalesced_total",
            "Decrypts served by an already in-flight request",
        )?;

        registry.register(Box::new(ledger_operations.clone()))?;
        registry.register(Box::new(decrypt_requests.clone()))?;
        registry.register(Box::new(relayer_round_trips.clone()))?;
        registry.register(Box::new(relayer_duration.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(coalesced.clone()))?;

        Ok(Self {
            registry,
            ledger_operations,
            decrypt_requests,
            relayer_round_trips,
            relayer_duration,
            cache_hits,
            cache_misses,
            coalesced,
        })
    }

    pub fn record_ledger_operation(&self, operation: &str, success: bool) {
        let outcome = if success { "ok" } else { "reverted" };
        self.ledger_operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_decrypt_outcome(&self, outcome: &str) {
        self.decrypt_requests.with_label_values(&[outcome]).inc();
    }

    pub fn record_relayer_call(&self, duration: Duration) {
        self.relayer_round_trips.inc();
        self.relayer_duration.observe(duration.as_secs_f64());
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn record_coalesced(&self) {
        self.coalesced.inc();
    }

    /// Prometheus text exposition format
    pub fn export(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
