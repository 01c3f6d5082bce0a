// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use pushtx_provider::crypto::{Digest, KeyError, PublicKey, Signature};
use pushtx_provider::tx::{SignedTransaction, Transaction};
use pushtx_provider::types::ChainId;

/// Errors raised by key stores and wallets.
#[derive(Debug, Error)]
pub enum SignerError {
    /// No unlocked wallet holds the private key for this public key.
    #[error("no unlocked key for {0}")]
    KeyNotFound(PublicKey),
    #[error("wallet '{0}' not found")]
    WalletNotFound(String),
    #[error("wallet '{0}' already exists")]
    WalletExists(String),
    #[error("wallet '{0}' is locked")]
    WalletLocked(String),
    #[error("invalid password for wallet '{0}'")]
    InvalidPassword(String),
    #[error("key {0} already imported")]
    KeyExists(PublicKey),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Trait that must be implemented by anything that holds signing keys.
///
/// Implementations answer from their current state on every call. Keys that
/// were unlocked for one transaction are not remembered for the next.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Public keys whose private halves can be used right now.
    async fn unlocked_public_keys(&self) -> BTreeSet<PublicKey>;

    /// Signs `digest` with the private key matching `key`.
    async fn sign_digest(&self, key: &PublicKey, digest: &Digest) -> Result<Signature, SignerError>;
}

#[async_trait]
impl<K: KeyStore + ?Sized> KeyStore for std::sync::Arc<K> {
    async fn unlocked_public_keys(&self) -> BTreeSet<PublicKey> {
        (**self).unlocked_public_keys().await
    }

    async fn sign_digest(&self, key: &PublicKey, digest: &Digest) -> Result<Signature, SignerError> {
        (**self).sign_digest(key, digest).await
    }
}

/// Signs `transaction` for `chain_id` with every key in `required_keys`.
///
/// Signatures are placed in the same order as `required_keys`. If any key is
/// missing the whole operation fails and no signatures are returned.
pub async fn sign_transaction<K>(
    store: &K,
    transaction: Transaction,
    required_keys: &[PublicKey],
    chain_id: &ChainId,
) -> Result<SignedTransaction, SignerError>
where
    K: KeyStore + ?Sized,
{
    let digest = transaction.signing_digest(chain_id);
    let mut signatures = Vec::with_capacity(required_keys.len());
    for key in required_keys {
        signatures.push(store.sign_digest(key, &digest).await?);
    }
    debug!(count = signatures.len(), %digest, "signed transaction");
    Ok(SignedTransaction {
        transaction,
        signatures,
        context_free_data: Vec::new(),
    })
}

/// Recovers the public keys behind each signature of a signed transaction.
pub fn recover_signers(
    signed: &SignedTransaction,
    chain_id: &ChainId,
) -> Result<Vec<PublicKey>, SignerError> {
    let digest = signed.signing_digest(chain_id);
    signed
        .signatures
        .iter()
        .map(|sig| sig.recover(&digest).map_err(SignerError::from))
        .collect()
}
