// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeSet;

use async_trait::async_trait;
use pushtx_provider::crypto::{Digest, PublicKey, Signature};

use crate::signer::{KeyStore, SignerError};

/// [`KeyStore`] implementation that holds no keys and is not capable of signing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Void;

#[async_trait]
impl KeyStore for Void {
    async fn unlocked_public_keys(&self) -> BTreeSet<PublicKey> {
        BTreeSet::new()
    }

    async fn sign_digest(&self, key: &PublicKey, _digest: &Digest) -> Result<Signature, SignerError> {
        Err(SignerError::KeyNotFound(*key))
    }
}
