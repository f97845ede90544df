// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client configuration
//!
//! Loaded from the environment (with `.env` support) or from the `[client]`
//! table of a TOML file. Unset optional values fall back to defaults.

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

use super::chains::{ChainConfig, SEPOLIA_CHAIN_ID};
use crate::errors::RollError;

pub const DEFAULT_VALIDITY_DAYS: u64 = 10;
pub const DEFAULT_RELAYER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub contract_address: Option<Address>,
    pub rpc_url: String,
    pub relayer_url: String,
    pub chain_id: u64,
    /// Never serialized back out
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    #[serde(default = "default_validity_days")]
    pub decrypt_validity_days: u64,
    #[serde(default = "default_relayer_timeout_secs")]
    pub relayer_timeout_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub decrypt_cache_max_entries: usize,
}

fn default_validity_days() -> u64 {
    DEFAULT_VALIDITY_DAYS
}

fn default_relayer_timeout_secs() -> u64 {
    DEFAULT_RELAYER_TIMEOUT_SECS
}

fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

impl Default for ClientConfig {
    fn default() -> Self {
        let chain = ChainConfig::sepolia();
        Self {
            contract_address: None,
            rpc_url: chain.rpc_url,
            relayer_url: chain.relayer_url,
            chain_id: SEPOLIA_CHAIN_ID,
            private_key: None,
            decrypt_validity_days: DEFAULT_VALIDITY_DAYS,
            relayer_timeout_secs: DEFAULT_RELAYER_TIMEOUT_SECS,
            decrypt_cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    client: ClientConfig,
}

fn config_err(msg: impl Into<String>) -> RollError {
    RollError::Config(msg.into())
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, RollError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| config_err(format!("{}: {}", name, e)))
}

impl ClientConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, RollError> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (the environment, a map in tests)
    pub fn from_vars<F>(get: F) -> Result<Self, RollError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = get("ROLL_CONTRACT_ADDRESS") {
            config.contract_address = Some(parse_var("ROLL_CONTRACT_ADDRESS", &raw)?);
        }
        if let Some(raw) = get("RPC_URL") {
            config.rpc_url = raw;
        }
        if let Some(raw) = get("RELAYER_URL") {
            config.relayer_url = raw;
        }
        if let Some(raw) = get("CHAIN_ID") {
            config.chain_id = parse_var("CHAIN_ID", &raw)?;
        }
        config.private_key = get("PRIVATE_KEY");
        if let Some(raw) = get("DECRYPT_VALIDITY_DAYS") {
            config.decrypt_validity_days = parse_var("DECRYPT_VALIDITY_DAYS", &raw)?;
        }
        if let Some(raw) = get("RELAYER_TIMEOUT_SECS") {
            config.relayer_timeout_secs = parse_var("RELAYER_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("DECRYPT_CACHE_MAX_ENTRIES") {
            config.decrypt_cache_max_entries = parse_var("DECRYPT_CACHE_MAX_ENTRIES", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the `[client]` table of a TOML file
    pub fn from_toml_file(path: &str) -> Result<Self, RollError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_err(format!("reading {}: {}", path, e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RollError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| config_err(format!("invalid TOML: {}", e)))?;
        file.client.validate()?;
        Ok(file.client)
    }

    pub fn validate(&self) -> Result<(), RollError> {
        for (name, value) in [("rpc_url", &self.rpc_url), ("relayer_url", &self.relayer_url)] {
            let url = Url::parse(value).map_err(|e| config_err(format!("{}: {}", name, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(config_err(format!("{} must be http(s), got {}", name, url.scheme())));
            }
        }
        if self.decrypt_validity_days == 0 {
            return Err(config_err("decrypt_validity_days must be at least 1"));
        }
        if self.relayer_timeout_secs == 0 {
            return Err(config_err("relayer_timeout_secs must be at least 1"));
        }
        if self.decrypt_cache_max_entries == 0 {
            return Err(config_err("decrypt_cache_max_entries must be at least 1"));
        }
        Ok(())
    }

    pub fn require_contract_address(&self) -> Result<Address, RollError> {
        self.contract_address
            .ok_or_else(|| config_err("ROLL_CONTRACT_ADDRESS is not set"))
    }
}
