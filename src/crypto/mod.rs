// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decryption-side cryptography
//!
//! - **EIP-712**: typed data the user's wallet signs to authorise a decryption
//! - **Signature**: ECDSA recovery of the authorising wallet
//! - **Keypair**: per-session ephemeral secp256k1 keypair
//! - **ECDH / Encryption / Sealing**: how the relayer returns cleartexts
//!   readable only by the ephemeral key holder
//! - **Wallet**: the signing seam (local key, browser wallet, hardware wallet)
//!
//! ## Protocol Flow
//!
//! 1. Client generates an ephemeral keypair
//! 2. Wallet signs `UserDecryptRequestVerification` over the public key,
//!    contract list and validity window
//! 3. Relayer recovers the signer, checks the window and ACL
//! 4. Relayer seals each cleartext to the ephemeral public key (ECDH +
//!    HKDF-SHA256 + XChaCha20-Poly1305, handle as AAD)
//! 5. Client opens the sealed values with the ephemeral private key

pub mod ecdh;
pub mod eip712;
pub mod encryption;
pub mod error;
pub mod keypair;
pub mod sealing;
pub mod signature;
pub mod wallet;

pub use ecdh::derive_shared_key;
pub use eip712::{DecryptionDomain, UserDecryptTypedData};
pub use encryption::{decrypt_with_aead, encrypt_with_aead};
pub use error::CryptoError;
pub use keypair::EphemeralKeypair;
pub use sealing::{open_value, seal_value, SealedValue};
pub use signature::{address_from_verifying_key, recover_signer, Eip712Signature};
pub use wallet::{LocalWalletSigner, WalletError, WalletSigner};

use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 (Ethereum flavour)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}
