// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted ROLL ledger
//!
//! Serial state machine over encrypted balances. Each call either completes
//! fully or leaves state untouched. Bound checks run on the plaintext amount
//! supplied alongside the ciphertext; the homomorphic add/sub always uses the
//! encrypted operand.
//!
//! After every balance mutation the new handle is granted to the ledger and
//! to the owner in a single ACL batch.
//!
//! A guarded swap-out cannot know in the same call whether the encrypted
//! debit went through, so its ETH is escrowed and the encrypted
//! `balance >= amount` flag is made public. `settle_swap_out` decrypts the
//! flag through the gateway and either pays the escrow or returns it to the
//! reserve.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::errors::{reason, LedgerError};
use super::events::{history_for, HistoryEntry, LedgerEvent};
use super::quote::SwapQuote;
use crate::acl::{AccessControlList, GrantBatch};
use crate::fhe::{BitWidth, CiphertextHandle, ExternalCiphertext, FheEngine};
use crate::monitoring::RollMetrics;

/// Per-call faucet cap for `mint`
pub const MAX_MINT: u64 = 1_000_000;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How encrypted debits behave when the balance is smaller than the amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// `select(balance >= amount, amount, 0)` is debited; an insufficient
    /// balance leaves both sides unchanged and a swap-out pays nothing
    #[default]
    Guarded,
    /// Unconditional subtraction; an insufficient balance wraps modulo 2^32
    /// and a swap-out pays immediately
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub address: Address,
    pub admin: Address,
    pub max_mint: u64,
    pub underflow_policy: UnderflowPolicy,
}

impl LedgerConfig {
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin,
            max_mint: MAX_MINT,
            underflow_policy: UnderflowPolicy::default(),
        }
    }

    pub fn with_underflow_policy(mut self, policy: UnderflowPolicy) -> Self {
        self.underflow_policy = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub quote: SwapQuote,
    /// Caller's balance handle after the swap
    pub balance: CiphertextHandle,
    /// Swap-out whose ETH is escrowed until `settle_swap_out`
    pub pending: Option<u64>,
}

/// Guarded swap-out waiting for its sufficiency flag to be decrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSwapOut {
    pub id: u64,
    pub user: Address,
    pub roll_amount: u32,
    pub eth_amount: U256,
    /// Public encrypted `balance >= roll_amount`
    pub sufficient: CiphertextHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_balance: CiphertextHandle,
    pub to_balance: CiphertextHandle,
    pub amount: u32,
}

/// Encrypted amount actually taken from a balance
struct Debit {
    amount: CiphertextHandle,
    /// `balance >= amount`; `None` when the subtraction was unconditional
    sufficient: Option<CiphertextHandle>,
}

pub struct EncryptedLedger {
    config: LedgerConfig,
    engine: Arc<dyn FheEngine>,
    acl: Arc<AccessControlList>,
    balances: HashMap<Address, CiphertextHandle>,
    eth_reserve: U256,
    escrowed_eth: U256,
    pending_swap_outs: HashMap<u64, PendingSwapOut>,
    next_swap_out_id: u64,
    events: Vec<LedgerEvent>,
    event_tx: broadcast::Sender<LedgerEvent>,
    metrics: Option<Arc<RollMetrics>>,
}

impl EncryptedLedger {
    pub fn new(config: LedgerConfig, engine: Arc<dyn FheEngine>, acl: Arc<AccessControlList>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            "📒 ROLL ledger at {:?} (admin {:?}, underflow {:?})",
            config.address, config.admin, config.underflow_policy
        );
        Self {
            config,
            engine,
            acl,
            balances: HashMap::new(),
            eth_reserve: U256::zero(),
            escrowed_eth: U256::zero(),
            pending_swap_outs: HashMap::new(),
            next_swap_out_id: 0,
            events: Vec::new(),
            event_tx,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RollMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn acl(&self) -> &Arc<AccessControlList> {
        &self.acl
    }

    /// ETH held by the ledger, escrow included
    pub fn eth_reserve(&self) -> U256 {
        self.eth_reserve
    }

    /// ETH held for unsettled swap-outs
    pub fn escrowed_eth(&self) -> U256 {
        self.escrowed_eth
    }

    pub fn pending_swap_out(&self, id: u64) -> Option<&PendingSwapOut> {
        self.pending_swap_outs.get(&id)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    pub fn history_for(&self, address: Address) -> Vec<HistoryEntry> {
        history_for(&self.events, address)
    }

    /// Current balance handle; the zero handle for untouched addresses
    pub fn get_balance(&self, owner: Address) -> CiphertextHandle {
        self.balances
            .get(&owner)
            .copied()
            .unwrap_or(CiphertextHandle::ZERO)
    }

    /// `mintTokens(uint256)`
    pub fn mint(&mut self, caller: Address, amount: U256) -> Result<CiphertextHandle, LedgerError> {
        let result = self.try_mint(caller, amount);
        self.record("mint", &result);
        result
    }

    fn try_mint(&mut self, caller: Address, amount: U256) -> Result<CiphertextHandle, LedgerError> {
        if amount > U256::from(self.config.max_mint) {
            return Err(LedgerError::revert(reason::AMOUNT_EXCEEDS_MAX_MINT));
        }
        if amount.is_zero() {
            return Err(LedgerError::revert(reason::AMOUNT_MUST_BE_POSITIVE));
        }

        let encrypted = self.engine.trivial_encrypt(amount.as_u64(), BitWidth::U32)?;
        let balance = self.credit(caller, encrypted)?;
        self.commit(GrantBatch::new(), &[(caller, balance)])?;

        info!("🪙 minted {} ROLL for {:?}", amount, caller);
        self.emit(LedgerEvent::TokensMinted {
            user: caller,
            amount,
        });
        Ok(balance)
    }

    /// `swapETHForROLL() payable`
    pub fn swap_in(&mut self, caller: Address, eth_value: U256) -> Result<SwapReceipt, LedgerError> {
        let result = self.try_swap_in(caller, eth_value);
        self.record("swap_in", &result);
        result
    }

    fn try_swap_in(&mut self, caller: Address, eth_value: U256) -> Result<SwapReceipt, LedgerError> {
        if eth_value.is_zero() {
            return Err(LedgerError::revert(reason::MUST_SEND_ETH));
        }
        let quote = SwapQuote::eth_to_roll(eth_value)?;
        if quote.roll_amount == 0 {
            warn!("swap of {} wei from {:?} buys 0 ROLL", eth_value, caller);
        }

        let encrypted = self
            .engine
            .trivial_encrypt(quote.roll_amount as u64, BitWidth::U32)?;
        let balance = self.credit(caller, encrypted)?;
        self.commit(GrantBatch::new(), &[(caller, balance)])?;
        self.eth_reserve = self.eth_reserve.saturating_add(eth_value);

        info!(
            "💱 {:?} swapped {} wei for {} ROLL",
            caller, eth_value, quote.roll_amount
        );
        self.emit(LedgerEvent::TokensSwapped {
            user: caller,
            eth_amount: eth_value,
            roll_amount: quote.roll_amount,
            eth_to_roll: true,
        });
        Ok(SwapReceipt {
            quote,
            balance,
            pending: None,
        })
    }

    /// `swapROLLForETH(uint32, externalEuint32, bytes)`
    ///
    /// Under `Unchecked` the quote's `eth_amount` is paid to `caller` at once.
    /// Under `Guarded` it is escrowed and the receipt carries the id to pass
    /// to `settle_swap_out`.
    pub fn swap_out(
        &mut self,
        caller: Address,
        roll_amount: u32,
        encrypted_amount: &ExternalCiphertext,
    ) -> Result<SwapReceipt, LedgerError> {
        let result = self.try_swap_out(caller, roll_amount, encrypted_amount);
        self.record("swap_out", &result);
        result
    }

    fn try_swap_out(
        &mut self,
        caller: Address,
        roll_amount: u32,
        encrypted_amount: &ExternalCiphertext,
    ) -> Result<SwapReceipt, LedgerError> {
        if roll_amount == 0 {
            return Err(LedgerError::revert(reason::AMOUNT_MUST_BE_POSITIVE));
        }
        let quote = SwapQuote::roll_to_eth(roll_amount);
        if self.available_eth() < quote.eth_amount {
            return Err(LedgerError::revert(reason::INSUFFICIENT_CONTRACT_ETH));
        }

        let amount = self.engine.verify_input(
            encrypted_amount,
            self.config.address,
            caller,
            BitWidth::U32,
        )?;
        let current = self.current_or_zero(caller)?;
        let (balance, debit) = self.debit(current, amount)?;
        self.commit(GrantBatch::new(), &[(caller, balance)])?;

        let Some(sufficient) = debit.sufficient else {
            self.eth_reserve -= quote.eth_amount;
            self.emit_swap_out(caller, roll_amount, quote.eth_amount);
            return Ok(SwapReceipt {
                quote,
                balance,
                pending: None,
            });
        };

        self.acl.make_public(sufficient)?;
        let id = self.next_swap_out_id;
        self.next_swap_out_id += 1;
        self.escrowed_eth = self.escrowed_eth.saturating_add(quote.eth_amount);
        self.pending_swap_outs.insert(
            id,
            PendingSwapOut {
                id,
                user: caller,
                roll_amount,
                eth_amount: quote.eth_amount,
                sufficient,
            },
        );
        debug!(
            "swap-out #{} of {} ROLL escrows {} wei until {} is decrypted",
            id, roll_amount, quote.eth_amount, sufficient
        );
        Ok(SwapReceipt {
            quote,
            balance,
            pending: Some(id),
        })
    }

    /// Gateway callback for a guarded swap-out
    ///
    /// Decrypts the public sufficiency flag. Pays the escrowed ETH when the
    /// debit went through, otherwise returns it to the reserve. Returns the
    /// wei paid.
    pub fn settle_swap_out(&mut self, id: u64) -> Result<U256, LedgerError> {
        let result = self.try_settle_swap_out(id);
        self.record("settle_swap_out", &result);
        result
    }

    fn try_settle_swap_out(&mut self, id: u64) -> Result<U256, LedgerError> {
        let pending = self
            .pending_swap_outs
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::revert(reason::UNKNOWN_SWAP_OUT))?;
        if !self.acl.is_public(pending.sufficient) {
            return Err(LedgerError::revert(reason::UNKNOWN_SWAP_OUT));
        }
        let sufficient = !self.engine.public_decrypt(pending.sufficient)?.is_zero();

        self.pending_swap_outs.remove(&id);
        self.escrowed_eth = self.escrowed_eth.saturating_sub(pending.eth_amount);
        if !sufficient {
            warn!(
                "swap-out #{} by {:?} had insufficient balance; {} wei stays in reserve",
                id, pending.user, pending.eth_amount
            );
            return Ok(U256::zero());
        }

        self.eth_reserve -= pending.eth_amount;
        self.emit_swap_out(pending.user, pending.roll_amount, pending.eth_amount);
        Ok(pending.eth_amount)
    }

    fn emit_swap_out(&mut self, user: Address, roll_amount: u32, eth_amount: U256) {
        info!("💱 {:?} swapped {} ROLL for {} wei", user, roll_amount, eth_amount);
        self.emit(LedgerEvent::TokensSwapped {
            user,
            eth_amount,
            roll_amount,
            eth_to_roll: false,
        });
    }

    fn available_eth(&self) -> U256 {
        self.eth_reserve.saturating_sub(self.escrowed_eth)
    }

    /// `transferROLL(address, uint32, externalEuint32, bytes)`
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: u32,
        encrypted_amount: &ExternalCiphertext,
    ) -> Result<TransferReceipt, LedgerError> {
        let result = self.try_transfer(caller, to, amount, encrypted_amount);
        self.record("transfer", &result);
        result
    }

    fn try_transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: u32,
        encrypted_amount: &ExternalCiphertext,
    ) -> Result<TransferReceipt, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::revert(reason::INVALID_RECIPIENT));
        }
        if to == caller {
            return Err(LedgerError::revert(reason::CANNOT_TRANSFER_TO_SELF));
        }
        if amount == 0 {
            return Err(LedgerError::revert(reason::AMOUNT_MUST_BE_POSITIVE));
        }

        let encrypted = self.engine.verify_input(
            encrypted_amount,
            self.config.address,
            caller,
            BitWidth::U32,
        )?;
        let sender_current = self.current_or_zero(caller)?;
        let (from_balance, debit) = self.debit(sender_current, encrypted)?;
        let to_balance = self.credit(to, debit.amount)?;
        self.commit(GrantBatch::new(), &[(caller, from_balance), (to, to_balance)])?;

        info!("📤 {:?} transferred {} ROLL to {:?}", caller, amount, to);
        self.emit(LedgerEvent::TokensTransferred {
            from: caller,
            to,
            amount,
        });
        Ok(TransferReceipt {
            from_balance,
            to_balance,
            amount,
        })
    }

    /// `addTreasuryETH() payable`, admin only
    pub fn add_treasury_eth(&mut self, caller: Address, value: U256) -> Result<U256, LedgerError> {
        let result = self.try_add_treasury_eth(caller, value);
        self.record("add_treasury_eth", &result);
        result
    }

    fn try_add_treasury_eth(&mut self, caller: Address, value: U256) -> Result<U256, LedgerError> {
        if caller != self.config.admin {
            return Err(LedgerError::revert(reason::ONLY_OWNER));
        }
        if value.is_zero() {
            return Err(LedgerError::revert(reason::MUST_SEND_ETH));
        }
        self.eth_reserve = self.eth_reserve.saturating_add(value);
        info!("🏦 treasury funded with {} wei (reserve {})", value, self.eth_reserve);
        self.emit(LedgerEvent::TreasuryFunded {
            funder: caller,
            amount: value,
        });
        Ok(self.eth_reserve)
    }

    /// Irrevocably allow anyone to decrypt `owner`'s current balance handle
    pub fn make_balance_public(
        &mut self,
        caller: Address,
        owner: Address,
    ) -> Result<CiphertextHandle, LedgerError> {
        let result = self.try_make_balance_public(caller, owner);
        self.record("make_balance_public", &result);
        result
    }

    fn try_make_balance_public(
        &mut self,
        caller: Address,
        owner: Address,
    ) -> Result<CiphertextHandle, LedgerError> {
        if caller != owner && caller != self.config.admin {
            return Err(LedgerError::revert(reason::NOT_BALANCE_OWNER_OR_ADMIN));
        }
        let handle = self.get_balance(owner);
        if handle.is_zero() {
            return Err(LedgerError::revert(reason::NO_BALANCE));
        }
        self.acl.make_public(handle)?;
        self.emit(LedgerEvent::BalanceMadePublic { owner, by: caller });
        Ok(handle)
    }

    fn current_or_zero(&self, owner: Address) -> Result<CiphertextHandle, LedgerError> {
        match self.balances.get(&owner) {
            Some(handle) => Ok(*handle),
            None => Ok(self.engine.trivial_encrypt(0, BitWidth::U32)?),
        }
    }

    /// `balance[owner] + amount`, not yet committed
    fn credit(&self, owner: Address, amount: CiphertextHandle) -> Result<CiphertextHandle, LedgerError> {
        let current = self.current_or_zero(owner)?;
        Ok(self.engine.add(current, amount)?)
    }

    /// Returns the new balance, not yet committed, and what was debited
    fn debit(
        &self,
        balance: CiphertextHandle,
        amount: CiphertextHandle,
    ) -> Result<(CiphertextHandle, Debit), LedgerError> {
        let debit = match self.config.underflow_policy {
            UnderflowPolicy::Unchecked => Debit {
                amount,
                sufficient: None,
            },
            UnderflowPolicy::Guarded => {
                let sufficient = self.engine.ge(balance, amount)?;
                let zero = self.engine.trivial_encrypt(0, BitWidth::U32)?;
                Debit {
                    amount: self.engine.select(sufficient, amount, zero)?,
                    sufficient: Some(sufficient),
                }
            }
        };
        Ok((self.engine.sub(balance, debit.amount)?, debit))
    }

    /// Grant, then publish, the new balance handles
    fn commit(
        &mut self,
        batch: GrantBatch,
        updates: &[(Address, CiphertextHandle)],
    ) -> Result<(), LedgerError> {
        let ledger = self.config.address;
        let batch = updates
            .iter()
            .fold(batch, |b, (owner, handle)| b.balance_handle(*handle, ledger, *owner));
        self.acl.apply(batch)?;
        for (owner, handle) in updates {
            debug!("balance of {:?} -> {}", owner, handle);
            self.balances.insert(*owner, *handle);
        }
        Ok(())
    }

    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event.clone());
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn record<T>(&self, operation: &str, result: &Result<T, LedgerError>) {
        if let Err(err) = result {
            warn!("{} reverted: {}", operation, err);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_ledger_operation(operation, result.is_ok());
        }
    }
}
