// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest as _, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use pushtx_provider::crypto::{Digest, PublicKey, Signature};

use crate::key::PrivateKey;
use crate::signer::{KeyStore, SignerError};

fn hash_password(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// A named, password-protected set of private keys.
///
/// A locked wallet does not expose its keys, neither for listing nor for signing.
#[derive(Clone)]
pub struct Wallet {
    name: String,
    password_hash: [u8; 32],
    locked: bool,
    keys: BTreeMap<PublicKey, PrivateKey>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.name)
            .field("locked", &self.locked)
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl Wallet {
    /// Returns a new, unlocked [`Wallet`] protected by `password`.
    pub fn new(name: impl Into<String>, password: &str) -> Self {
        Self {
            name: name.into(),
            password_hash: hash_password(password),
            locked: false,
            keys: BTreeMap::new(),
        }
    }

    /// Returns an unlocked [`Wallet`] holding the given keys.
    pub fn with_keys(
        name: impl Into<String>,
        password: &str,
        keys: impl IntoIterator<Item = PrivateKey>,
    ) -> Self {
        let mut wallet = Self::new(name, password);
        wallet
            .keys
            .extend(keys.into_iter().map(|sk| (sk.public_key(), sk)));
        wallet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self, password: &str) -> Result<(), SignerError> {
        if hash_password(password) != self.password_hash {
            return Err(SignerError::InvalidPassword(self.name.clone()));
        }
        self.locked = false;
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), SignerError> {
        if self.locked {
            return Err(SignerError::WalletLocked(self.name.clone()));
        }
        Ok(())
    }

    /// Adds a key and returns its public half.
    pub fn import_key(&mut self, key: PrivateKey) -> Result<PublicKey, SignerError> {
        self.ensure_unlocked()?;
        let public = key.public_key();
        if self.keys.contains_key(&public) {
            return Err(SignerError::KeyExists(public));
        }
        self.keys.insert(public, key);
        Ok(public)
    }

    /// Removes a key. Requires the wallet password even when unlocked.
    pub fn remove_key(&mut self, password: &str, key: &PublicKey) -> Result<(), SignerError> {
        self.ensure_unlocked()?;
        if hash_password(password) != self.password_hash {
            return Err(SignerError::InvalidPassword(self.name.clone()));
        }
        self.keys
            .remove(key)
            .map(|_| ())
            .ok_or(SignerError::KeyNotFound(*key))
    }

    pub fn list_public_keys(&self) -> Result<Vec<PublicKey>, SignerError> {
        self.ensure_unlocked()?;
        Ok(self.keys.keys().copied().collect())
    }

    /// Returns the private key for `key` if the wallet is unlocked and holds it.
    pub fn private_key(&self, key: &PublicKey) -> Option<&PrivateKey> {
        if self.locked {
            return None;
        }
        self.keys.get(key)
    }
}

/// Summary of a managed wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletStatus {
    pub name: String,
    pub unlocked: bool,
}

/// A shared collection of wallets that acts as a [`KeyStore`].
///
/// Clones share the same wallets. Every [`KeyStore`] call reads the current
/// lock state.
#[derive(Clone, Debug, Default)]
pub struct WalletManager {
    wallets: Arc<RwLock<BTreeMap<String, Wallet>>>,
}

impl WalletManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new unlocked wallet.
    pub async fn create(&self, name: &str, password: &str) -> Result<(), SignerError> {
        self.insert(Wallet::new(name, password)).await
    }

    /// Adds an existing wallet.
    pub async fn insert(&self, wallet: Wallet) -> Result<(), SignerError> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(wallet.name()) {
            return Err(SignerError::WalletExists(wallet.name().to_owned()));
        }
        debug!(wallet = wallet.name(), "added wallet");
        wallets.insert(wallet.name().to_owned(), wallet);
        Ok(())
    }

    pub async fn import_key(&self, name: &str, key: PrivateKey) -> Result<PublicKey, SignerError> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(name)
            .ok_or_else(|| SignerError::WalletNotFound(name.to_owned()))?;
        wallet.import_key(key)
    }

    pub async fn lock(&self, name: &str) -> Result<(), SignerError> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(name)
            .ok_or_else(|| SignerError::WalletNotFound(name.to_owned()))?;
        wallet.lock();
        Ok(())
    }

    pub async fn lock_all(&self) {
        let mut wallets = self.wallets.write().await;
        for wallet in wallets.values_mut() {
            wallet.lock();
        }
    }

    pub async fn unlock(&self, name: &str, password: &str) -> Result<(), SignerError> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets
            .get_mut(name)
            .ok_or_else(|| SignerError::WalletNotFound(name.to_owned()))?;
        wallet.unlock(password)
    }

    pub async fn list_wallets(&self) -> Vec<WalletStatus> {
        self.wallets
            .read()
            .await
            .values()
            .map(|w| WalletStatus {
                name: w.name().to_owned(),
                unlocked: !w.is_locked(),
            })
            .collect()
    }
}

#[async_trait]
impl KeyStore for WalletManager {
    async fn unlocked_public_keys(&self) -> BTreeSet<PublicKey> {
        self.wallets
            .read()
            .await
            .values()
            .filter(|w| !w.is_locked())
            .flat_map(|w| w.keys.keys().copied())
            .collect()
    }

    async fn sign_digest(&self, key: &PublicKey, digest: &Digest) -> Result<Signature, SignerError> {
        let wallets = self.wallets.read().await;
        let sk = wallets
            .values()
            .find_map(|w| w.private_key(key))
            .ok_or(SignerError::KeyNotFound(*key))?;
        sk.sign_digest(digest)
    }
}
