// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{handle_from_word, EncryptedRollLedger, LoggedEvent};
use crate::config::{ChainConfig, ChainRegistry, ClientConfig};
use crate::errors::RollError;
use crate::fhe::{CiphertextHandle, ExternalCiphertext};
use crate::ledger::validation::{validate_mint, validate_swap_in, validate_swap_out, validate_transfer};
use crate::ledger::{history_for, HistoryEntry, LedgerEvent};

type SignerClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// Turn a contract call failure into a `RollError`, passing the on-chain
/// revert reason through unmodified
pub fn decode_contract_error<M: Middleware>(err: ContractError<M>) -> RollError {
    if let Some(reason) = err.decode_revert::<String>() {
        return RollError::ContractRevert(reason);
    }
    if err.is_revert() {
        return RollError::ContractRevert("execution reverted".to_string());
    }
    RollError::Rpc(err.to_string())
}

fn rpc_err(err: impl std::fmt::Display) -> RollError {
    RollError::Rpc(err.to_string())
}

/// On-chain EncryptedRollLedger client
pub struct RollContractClient {
    provider: Arc<Provider<Http>>,
    signer: Option<Arc<SignerClient>>,
    contract_address: Address,
    chain: ChainConfig,
}

impl RollContractClient {
    /// Connect to the ledger described by `config`
    ///
    /// Fails with `NetworkMismatch` before any call is made if the configured
    /// chain is unsupported or the RPC endpoint serves a different chain.
    pub async fn connect(config: &ClientConfig, registry: &ChainRegistry) -> Result<Self, RollError> {
        let chain = registry.ensure_supported(config.chain_id)?.clone();
        let contract_address = config.require_contract_address()?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| RollError::Config(format!("invalid rpc url '{}': {}", config.rpc_url, e)))?;
        let actual = provider.get_chainid().await.map_err(rpc_err)?.as_u64();
        if actual != chain.chain_id {
            warn!("RPC {} serves chain {}, expected {}", config.rpc_url, actual, chain.chain_id);
            return Err(RollError::NetworkMismatch {
                expected: chain.chain_id,
                actual,
            });
        }
        let provider = Arc::new(provider);

        let signer = match &config.private_key {
            Some(key) => {
                let wallet = key
                    .parse::<LocalWallet>()
                    .map_err(|e| RollError::Config(format!("invalid private key: {}", e)))?
                    .with_chain_id(chain.chain_id);
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => None,
        };

        info!(
            "Connected to EncryptedRollLedger {:?} on {} ({})",
            contract_address, chain.name, chain.chain_id
        );
        Ok(Self {
            provider,
            signer,
            contract_address,
            chain,
        })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Address of the configured signer, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    fn reader(&self) -> EncryptedRollLedger<Provider<Http>> {
        EncryptedRollLedger::new(self.contract_address, self.provider.clone())
    }

    fn writer(&self) -> Result<EncryptedRollLedger<SignerClient>, RollError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| RollError::Config("PRIVATE_KEY is required to send transactions".to_string()))?;
        Ok(EncryptedRollLedger::new(self.contract_address, signer))
    }

    fn require_signer(&self) -> Result<Address, RollError> {
        self.signer_address()
            .ok_or_else(|| RollError::Config("PRIVATE_KEY is required to send transactions".to_string()))
    }

    /// Current balance handle of `owner`; the zero handle if never written
    pub async fn get_balance(&self, owner: Address) -> Result<CiphertextHandle, RollError> {
        let word = self
            .reader()
            .get_balance(owner)
            .call()
            .await
            .map_err(decode_contract_error)?;
        Ok(handle_from_word(word))
    }

    /// ETH held by the ledger contract
    pub async fn eth_reserve(&self) -> Result<U256, RollError> {
        self.provider
            .get_balance(self.contract_address, None)
            .await
            .map_err(rpc_err)
    }

    async fn submit(&self, operation: &str, call: ContractCall<SignerClient, ()>) -> Result<H256, RollError> {
        let pending = call.send().await.map_err(|e| {
            let err = decode_contract_error(e);
            warn!("{} rejected: {}", operation, err);
            err
        })?;
        let tx_hash = pending.tx_hash();
        debug!("{} submitted: {:?}", operation, tx_hash);

        let receipt = pending
            .await
            .map_err(rpc_err)?
            .ok_or_else(|| RollError::Rpc(format!("transaction {:?} was dropped", tx_hash)))?;
        if receipt.status == Some(U64::zero()) {
            return Err(RollError::ContractRevert(format!(
                "{} reverted in transaction {:?}",
                operation, tx_hash
            )));
        }
        info!("✅ {} confirmed in block {:?}", operation, receipt.block_number);
        Ok(receipt.transaction_hash)
    }

    pub async fn mint_tokens(&self, amount: U256) -> Result<H256, RollError> {
        validate_mint(amount)?;
        let contract = self.writer()?;
        self.submit("mintTokens", contract.mint_tokens(amount)).await
    }

    pub async fn swap_eth_for_roll(&self, wei: U256) -> Result<H256, RollError> {
        let quote = validate_swap_in(wei)?;
        debug!("swapping {} wei for {} ROLL", wei, quote.roll_amount);
        let contract = self.writer()?;
        self.submit("swapETHForROLL", contract.swap_eth_for_roll().value(wei))
            .await
    }

    /// Burn `amount` ROLL for ETH; `input` must encrypt the same amount
    pub async fn swap_roll_for_eth(
        &self,
        amount: u32,
        input: &ExternalCiphertext,
    ) -> Result<H256, RollError> {
        let reserve = self.eth_reserve().await?;
        validate_swap_out(amount as u64, reserve)?;
        let contract = self.writer()?;
        let call = contract.swap_roll_for_eth(
            amount,
            *input.handle.as_bytes(),
            Bytes::from(input.proof.clone()),
        );
        self.submit("swapROLLForETH", call).await
    }

    pub async fn transfer_roll(
        &self,
        to: Address,
        amount: u32,
        input: &ExternalCiphertext,
    ) -> Result<H256, RollError> {
        let from = self.require_signer()?;
        let amount = validate_transfer(from, to, amount as u64)?;
        let contract = self.writer()?;
        let call = contract.transfer_roll(
            to,
            amount,
            *input.handle.as_bytes(),
            Bytes::from(input.proof.clone()),
        );
        self.submit("transferROLL", call).await
    }

    /// Admin only
    pub async fn add_treasury_eth(&self, wei: U256) -> Result<H256, RollError> {
        if wei.is_zero() {
            return Err(RollError::Validation("must send ETH".to_string()));
        }
        let contract = self.writer()?;
        self.submit("addTreasuryETH", contract.add_treasury_eth().value(wei))
            .await
    }

    pub async fn make_balance_public(&self, owner: Address) -> Result<H256, RollError> {
        let contract = self.writer()?;
        self.submit("makeBalancePublic", contract.make_balance_public(owner))
            .await
    }

    /// All ledger events since `from_block`, in log order
    pub async fn events(&self, from_block: u64) -> Result<Vec<LoggedEvent>, RollError> {
        let logs = self
            .reader()
            .events()
            .from_block(from_block)
            .query_with_meta()
            .await
            .map_err(decode_contract_error)?;

        Ok(logs
            .into_iter()
            .map(|(event, meta)| LoggedEvent {
                block_number: meta.block_number.as_u64(),
                transaction_hash: meta.transaction_hash,
                event: LedgerEvent::from(event),
            })
            .collect())
    }

    /// Activity of `address` rebuilt from on-chain events
    pub async fn history(&self, address: Address, from_block: u64) -> Result<Vec<HistoryEntry>, RollError> {
        let events: Vec<LedgerEvent> = self
            .events(from_block)
            .await?
            .into_iter()
            .map(|logged| logged.event)
            .collect();
        Ok(history_for(&events, address))
    }
}
