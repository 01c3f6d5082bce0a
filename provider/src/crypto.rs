// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Wire representations of secp256k1 public keys and recoverable signatures.

use std::fmt::{self, Display};
use std::str::FromStr;

use k256::ecdsa::{
    signature::hazmat::PrehashVerifier, RecoveryId, Signature as EcdsaSignature, VerifyingKey,
};
use ripemd::Ripemd160;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use crate::encoding::{Encoder, Pack};
use crate::types::{Bytes, ChainId, Checksum256};

pub const PUBLIC_KEY_PREFIX: &str = "PUB_K1_";
pub const SIGNATURE_PREFIX: &str = "SIG_K1_";
/// Prefix of public keys in the legacy format some nodes still return.
pub const LEGACY_PUBLIC_KEY_PREFIX: &str = "EOS";

/// Suffix hashed into the checksum of `*_K1_` strings.
const K1_CHECKSUM_SUFFIX: &[u8] = b"K1";
const CHECKSUM_LEN: usize = 4;

/// Recovery byte offset used for compressed-key signatures.
const RECOVERY_OFFSET: u8 = 27 + 4;

/// A 32-byte message digest that signatures are computed over.
pub type Digest = Checksum256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected prefix '{expected}' in '{value}'")]
    InvalidPrefix {
        expected: &'static str,
        value: String,
    },
    #[error("invalid base58: {0}")]
    InvalidBase58(String),
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("checksum mismatch")]
    InvalidChecksum,
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

fn ripemd160_checksum(parts: &[&[u8]]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Ripemd160::new();
    for part in parts {
        hasher.update(part);
    }
    let hash = hasher.finalize();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}

/// Base58-decodes `s` and splits off the trailing checksum.
///
/// `expected` is the payload length, without the checksum.
pub fn decode_base58_check(
    s: &str,
    expected: usize,
) -> Result<(Vec<u8>, [u8; CHECKSUM_LEN]), KeyError> {
    let mut bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
    if bytes.len() != expected + CHECKSUM_LEN {
        return Err(KeyError::InvalidLength {
            expected: expected + CHECKSUM_LEN,
            actual: bytes.len(),
        });
    }
    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&bytes[expected..]);
    bytes.truncate(expected);
    Ok((bytes, checksum))
}

/// Encodes `bytes` as `<prefix><base58(bytes ‖ ripemd160(bytes ‖ "K1")[..4])>`.
pub fn encode_k1(prefix: &str, bytes: &[u8]) -> String {
    let checksum = ripemd160_checksum(&[bytes, K1_CHECKSUM_SUFFIX]);
    let mut data = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    data.extend_from_slice(bytes);
    data.extend_from_slice(&checksum);
    format!("{prefix}{}", bs58::encode(data).into_string())
}

/// Inverse of [`encode_k1`]: strips `prefix`, decodes exactly `expected`
/// bytes and verifies the checksum.
pub fn decode_k1(s: &str, prefix: &'static str, expected: usize) -> Result<Vec<u8>, KeyError> {
    let body = s.strip_prefix(prefix).ok_or_else(|| KeyError::InvalidPrefix {
        expected: prefix,
        value: s.to_owned(),
    })?;
    let (bytes, checksum) = decode_base58_check(body, expected)?;
    if ripemd160_checksum(&[&bytes, K1_CHECKSUM_SUFFIX]) != checksum {
        return Err(KeyError::InvalidChecksum);
    }
    Ok(bytes)
}

fn decode_legacy_public_key(s: &str) -> Result<Vec<u8>, KeyError> {
    let body = s
        .strip_prefix(LEGACY_PUBLIC_KEY_PREFIX)
        .ok_or_else(|| KeyError::InvalidPrefix {
            expected: PUBLIC_KEY_PREFIX,
            value: s.to_owned(),
        })?;
    let (bytes, checksum) = decode_base58_check(body, 33)?;
    if ripemd160_checksum(&[&bytes]) != checksum {
        return Err(KeyError::InvalidChecksum);
    }
    Ok(bytes)
}

/// Compressed secp256k1 public key, displayed as `PUB_K1_<base58>`.
///
/// Parsing also accepts the legacy `EOS<base58>` form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey([u8; 33]);

impl PublicKey {
    /// Validates that the bytes are a point on the curve.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let vk = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        Ok(Self::from(&vk))
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_sec1_bytes(&self.0).map_err(|e| KeyError::InvalidKey(e.to_string()))
    }
}

impl From<&VerifyingKey> for PublicKey {
    fn from(vk: &VerifyingKey) -> Self {
        let point = vk.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        Self(out)
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = if s.starts_with(PUBLIC_KEY_PREFIX) {
            decode_k1(s, PUBLIC_KEY_PREFIX, 33)?
        } else {
            decode_legacy_public_key(s)?
        };
        Self::from_sec1_bytes(&bytes)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_k1(PUBLIC_KEY_PREFIX, &self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_str(&s).map_err(D::Error::custom)
    }
}

/// Recoverable ECDSA signature (`recovery ‖ r ‖ s`), displayed as `SIG_K1_<base58>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 65]);

impl Signature {
    pub fn new(signature: &EcdsaSignature, recovery_id: RecoveryId) -> Self {
        let mut out = [0u8; 65];
        out[0] = RECOVERY_OFFSET + recovery_id.to_byte();
        out[1..].copy_from_slice(&signature.to_bytes());
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Whether `r` and `s` both encode without a sign bit or padding byte.
    /// Nodes reject signatures that are not canonical in this sense.
    pub fn is_canonical(&self) -> bool {
        let d = &self.0;
        d[1] & 0x80 == 0
            && !(d[1] == 0 && d[2] & 0x80 == 0)
            && d[33] & 0x80 == 0
            && !(d[33] == 0 && d[34] & 0x80 == 0)
    }

    fn parts(&self) -> Result<(EcdsaSignature, RecoveryId), KeyError> {
        let sig = EcdsaSignature::from_slice(&self.0[1..])
            .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
        let recid = self
            .0[0]
            .checked_sub(RECOVERY_OFFSET)
            .and_then(RecoveryId::from_byte)
            .ok_or_else(|| KeyError::InvalidSignature(format!("bad recovery byte {}", self.0[0])))?;
        Ok((sig, recid))
    }

    /// Checks the signature against `key` for the given digest.
    pub fn verify(&self, key: &PublicKey, digest: &Digest) -> bool {
        let Ok((sig, _)) = self.parts() else {
            return false;
        };
        let Ok(vk) = key.verifying_key() else {
            return false;
        };
        vk.verify_prehash(digest.as_bytes(), &sig).is_ok()
    }

    /// Recovers the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &Digest) -> Result<PublicKey, KeyError> {
        let (sig, recid) = self.parts()?;
        let vk = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recid)
            .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from(&vk))
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_k1(s, SIGNATURE_PREFIX, 65)?;
        let mut out = [0u8; 65];
        out.copy_from_slice(&bytes);
        let sig = Self(out);
        sig.parts()?;
        Ok(sig)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_k1(SIGNATURE_PREFIX, &self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_str(&s).map_err(D::Error::custom)
    }
}

/// Digest a transaction is signed over: `sha256(chain_id ‖ packed_trx ‖ cfd_digest)`.
///
/// `cfd_digest` is the sha256 of the packed context-free data, or 32 zero
/// bytes when there is none.
pub fn signing_digest(
    chain_id: &ChainId,
    packed_trx: &[u8],
    context_free_data: &[Bytes],
) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(packed_trx);
    if context_free_data.is_empty() {
        hasher.update([0u8; 32]);
    } else {
        let mut enc = Encoder::new();
        enc.write_varuint32(context_free_data.len() as u32);
        for data in context_free_data {
            data.pack(&mut enc);
        }
        hasher.update(Sha256::digest(enc.finish()));
    }
    Checksum256(hasher.finalize().into())
}
