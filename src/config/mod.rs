// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod chains;
pub mod client;

pub use chains::{ChainConfig, ChainRegistry, FhevmAddresses, SEPOLIA_CHAIN_ID};
pub use client::ClientConfig;
