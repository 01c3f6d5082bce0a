// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::Display;
use std::io::{Read, Write};
use std::str::FromStr;

use anyhow::anyhow;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Signature;
use crate::encoding::{DecodeError, Unpack};
use crate::tx::{SignedTransaction, Transaction};
use crate::types::{Bytes, Checksum256};

/// Compression applied to `packed_trx` before broadcast.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// The serialized transaction is sent as-is.
    #[default]
    None,
    /// zlib (RFC 1950) at the default compression level.
    Zlib,
}

impl FromStr for CompressionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "none" => Self::None,
            "zlib" => Self::Zlib,
            _ => return Err(anyhow!("invalid compression mode '{s}'")),
        })
    }
}

impl Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Zlib => f.write_str("zlib"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("error decoding packed transaction: {0}")]
    Decode(#[from] DecodeError),
}

fn compress(data: &[u8], mode: CompressionMode) -> Result<Vec<u8>, PackError> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).map_err(PackError::Compress)?;
            encoder.finish().map_err(PackError::Compress)
        }
    }
}

fn decompress(data: &[u8], mode: CompressionMode) -> Result<Vec<u8>, PackError> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::Zlib => {
            let mut out = Vec::new();
            ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(PackError::Decompress)?;
            Ok(out)
        }
    }
}

/// The broadcast form of a signed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedTransaction {
    pub signatures: Vec<Signature>,
    pub compression: CompressionMode,
    pub packed_context_free_data: Bytes,
    pub packed_trx: Bytes,
}

impl PackedTransaction {
    /// Serializes and optionally compresses a signed transaction.
    ///
    /// The output is a pure function of the input and mode.
    pub fn pack(signed: &SignedTransaction, compression: CompressionMode) -> Result<Self, PackError> {
        let packed_trx = compress(&signed.transaction.to_bytes(), compression)?;
        // Empty context-free data packs to an empty byte string rather than an empty vector.
        let packed_context_free_data = if signed.context_free_data.is_empty() {
            Vec::new()
        } else {
            compress(
                &crate::encoding::Pack::to_packed(&signed.context_free_data),
                compression,
            )?
        };
        Ok(Self {
            signatures: signed.signatures.clone(),
            compression,
            packed_context_free_data: Bytes(packed_context_free_data),
            packed_trx: Bytes(packed_trx),
        })
    }

    /// Returns the uncompressed transaction bytes.
    pub fn unpacked_trx(&self) -> Result<Vec<u8>, PackError> {
        decompress(&self.packed_trx, self.compression)
    }

    /// Decodes the packed transaction body.
    pub fn transaction(&self) -> Result<Transaction, PackError> {
        Ok(Transaction::from_packed(&self.unpacked_trx()?)?)
    }

    /// Reverses [`PackedTransaction::pack`].
    pub fn unpack(&self) -> Result<SignedTransaction, PackError> {
        let context_free_data = if self.packed_context_free_data.is_empty() {
            Vec::new()
        } else {
            Vec::<Bytes>::from_packed(&decompress(
                &self.packed_context_free_data,
                self.compression,
            )?)?
        };
        Ok(SignedTransaction {
            transaction: self.transaction()?,
            signatures: self.signatures.clone(),
            context_free_data,
        })
    }

    /// Transaction id, computed over the uncompressed body.
    pub fn id(&self) -> Result<Checksum256, PackError> {
        Ok(Checksum256::hash(&self.unpacked_trx()?))
    }
}
