// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use ethers::prelude::*;

use crate::fhe::CiphertextHandle;
use crate::ledger::LedgerEvent;

// externalEuint32 and euint32 are bytes32 handles on the wire
abigen!(
    EncryptedRollLedger,
    r#"[
        {
            "inputs": [{"internalType": "uint256", "name": "amount", "type": "uint256"}],
            "name": "mintTokens",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "swapETHForROLL",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "uint32", "name": "rollAmount", "type": "uint32"},
                {"internalType": "externalEuint32", "name": "encryptedAmount", "type": "bytes32"},
                {"internalType": "bytes", "name": "inputProof", "type": "bytes"}
            ],
            "name": "swapROLLForETH",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                {"internalType": "address", "name": "to", "type": "address"},
                {"internalType": "uint32", "name": "amount", "type": "uint32"},
                {"internalType": "externalEuint32", "name": "encryptedAmount", "type": "bytes32"},
                {"internalType": "bytes", "name": "inputProof", "type": "bytes"}
            ],
            "name": "transferROLL",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "address", "name": "user", "type": "address"}],
            "name": "getBalance",
            "outputs": [{"internalType": "euint32", "name": "", "type": "bytes32"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "addTreasuryETH",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        },
        {
            "inputs": [{"internalType": "address", "name": "owner", "type": "address"}],
            "name": "makeBalancePublic",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "address", "name": "user", "type": "address"},
                {"indexed": false, "internalType": "uint256", "name": "amount", "type": "uint256"}
            ],
            "name": "TokensMinted",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "address", "name": "user", "type": "address"},
                {"indexed": false, "internalType": "uint256", "name": "ethAmount", "type": "uint256"},
                {"indexed": false, "internalType": "uint32", "name": "rollAmount", "type": "uint32"},
                {"indexed": false, "internalType": "bool", "name": "ethToRoll", "type": "bool"}
            ],
            "name": "TokensSwapped",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "address", "name": "from", "type": "address"},
                {"indexed": true, "internalType": "address", "name": "to", "type": "address"},
                {"indexed": false, "internalType": "uint32", "name": "amount", "type": "uint32"}
            ],
            "name": "TokensTransferred",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "address", "name": "funder", "type": "address"},
                {"indexed": false, "internalType": "uint256", "name": "amount", "type": "uint256"}
            ],
            "name": "TreasuryFunded",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                {"indexed": true, "internalType": "address", "name": "owner", "type": "address"},
                {"indexed": true, "internalType": "address", "name": "by", "type": "address"}
            ],
            "name": "BalanceMadePublic",
            "type": "event"
        }
    ]"#
);

impl From<EncryptedRollLedgerEvents> for LedgerEvent {
    fn from(event: EncryptedRollLedgerEvents) -> Self {
        match event {
            EncryptedRollLedgerEvents::TokensMintedFilter(e) => LedgerEvent::TokensMinted {
                user: e.user,
                amount: e.amount,
            },
            EncryptedRollLedgerEvents::TokensSwappedFilter(e) => LedgerEvent::TokensSwapped {
                user: e.user,
                eth_amount: e.eth_amount,
                roll_amount: e.roll_amount,
                eth_to_roll: e.eth_to_roll,
            },
            EncryptedRollLedgerEvents::TokensTransferredFilter(e) => {
                LedgerEvent::TokensTransferred {
                    from: e.from,
                    to: e.to,
                    amount: e.amount,
                }
            }
            EncryptedRollLedgerEvents::TreasuryFundedFilter(e) => LedgerEvent::TreasuryFunded {
                funder: e.funder,
                amount: e.amount,
            },
            EncryptedRollLedgerEvents::BalanceMadePublicFilter(e) => {
                LedgerEvent::BalanceMadePublic {
                    owner: e.owner,
                    by: e.by,
                }
            }
        }
    }
}

/// Ledger event with the block it was mined in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedEvent {
    pub block_number: u64,
    pub transaction_hash: H256,
    pub event: LedgerEvent,
}

pub fn handle_from_word(word: [u8; 32]) -> CiphertextHandle {
    CiphertextHandle::from_bytes(word)
}
