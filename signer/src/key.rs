// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};
use std::str::FromStr;

use k256::ecdsa::signature::hazmat::RandomizedPrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use pushtx_provider::crypto::{
    decode_base58_check, decode_k1, encode_k1, Digest, KeyError, PublicKey, Signature,
};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use sha2::{Digest as _, Sha256};

use crate::SignerError;

pub const PRIVATE_KEY_PREFIX: &str = "PVT_K1_";

/// Version byte of legacy WIF private keys.
const WIF_VERSION: u8 = 0x80;

/// A secp256k1 private key, displayed as `PVT_K1_<base58>`.
///
/// Parsing also accepts the legacy WIF form (`5...`).
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Generates a new key from the OS random source.
    pub fn random() -> Self {
        Self(SigningKey::random(&mut OsRng))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.0.verifying_key())
    }

    /// Signs a prehashed digest with a canonical recoverable signature.
    ///
    /// Nonces are derived per RFC 6979. When a signature is not canonical the
    /// nonce is re-derived with a counter as extra input, so the same key and
    /// digest always produce the same signature.
    pub fn sign_digest(&self, digest: &Digest) -> Result<Signature, SignerError> {
        let prehash = digest.as_bytes();
        let (signature, recovery_id) = self
            .0
            .sign_prehash_recoverable(prehash)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        let mut sig = Signature::new(&signature, recovery_id);

        let mut attempt = 0u64;
        while !sig.is_canonical() {
            attempt += 1;
            let mut rng = StdRng::seed_from_u64(attempt);
            let signature: EcdsaSignature = self
                .0
                .sign_prehash_with_rng(&mut rng, prehash)
                .map_err(|e| SignerError::Signing(e.to_string()))?;
            let signature = signature.normalize_s().unwrap_or(signature);
            let recovery_id = self.recovery_id(prehash, &signature)?;
            sig = Signature::new(&signature, recovery_id);
        }
        Ok(sig)
    }

    fn recovery_id(
        &self,
        prehash: &[u8],
        signature: &EcdsaSignature,
    ) -> Result<RecoveryId, SignerError> {
        let expected = self.0.verifying_key();
        (0..4)
            .filter_map(RecoveryId::from_byte)
            .find(|id| {
                VerifyingKey::recover_from_prehash(prehash, signature, *id)
                    .is_ok_and(|vk| &vk == expected)
            })
            .ok_or_else(|| SignerError::Signing("no recovery id matches the key".into()))
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = if s.starts_with(PRIVATE_KEY_PREFIX) {
            decode_k1(s, PRIVATE_KEY_PREFIX, 32)?
        } else {
            decode_wif(s)?
        };
        Self::from_bytes(&bytes)
    }
}

impl Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_k1(PRIVATE_KEY_PREFIX, &self.to_bytes()))
    }
}

/// Decodes `base58(0x80 ‖ key ‖ sha256d(0x80 ‖ key)[..4])`.
fn decode_wif(s: &str) -> Result<Vec<u8>, KeyError> {
    let (mut payload, checksum) = decode_base58_check(s, 33)?;
    let hash = Sha256::digest(Sha256::digest(&payload));
    if hash[..4] != checksum {
        return Err(KeyError::InvalidChecksum);
    }
    if payload[0] != WIF_VERSION {
        return Err(KeyError::InvalidKey(format!(
            "unexpected WIF version byte {:#04x}",
            payload[0]
        )));
    }
    payload.remove(0);
    Ok(payload)
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

/// Parse a private key from string.
pub fn parse_private_key(s: &str) -> anyhow::Result<PrivateKey> {
    Ok(PrivateKey::from_str(s)?)
}

/// Returns a new random private key.
pub fn random_private_key() -> PrivateKey {
    PrivateKey::random()
}
