// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Pushtx Signer
//!
//! Private keys, lockable wallets and a transaction signer for pushtx.

pub mod key;
mod signer;
mod void;
mod wallet;

pub use signer::{recover_signers, sign_transaction, KeyStore, SignerError};
pub use void::Void;
pub use wallet::{Wallet, WalletManager, WalletStatus};
