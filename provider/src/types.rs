// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDateTime};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::encoding::{DecodeError, Decoder, Encoder, Pack, Unpack};

/// Variable-length byte string, hex encoded in JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        Ok(Self(hex::decode(s).context("error parsing bytes as hex")?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Bytes::from_hex(&s).map_err(|e| D::Error::custom(format!("{e:#}")))
    }
}

impl Pack for Bytes {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_varuint32(self.0.len() as u32);
        enc.write_raw(&self.0);
    }
}

impl Unpack for Bytes {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let len = dec.read_varuint32()? as usize;
        Ok(Bytes(dec.read_raw(len)?.to_vec()))
    }
}

/// A 256-bit hash, e.g. a block or transaction id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum256(pub [u8; 32]);

impl Checksum256 {
    /// SHA-256 of the given bytes.
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Block number embedded in the first four bytes of a block id (big-endian).
    pub fn block_num(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Reference block prefix: bytes 8..12 of a block id read little-endian.
    pub fn ref_block_prefix(&self) -> u32 {
        u32::from_le_bytes([self.0[8], self.0[9], self.0[10], self.0[11]])
    }
}

impl FromStr for Checksum256 {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).context("error parsing checksum as hex")?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow!("checksum must be 32 bytes, got {}", v.len()))?;
        Ok(Self(arr))
    }
}

impl Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Checksum256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Checksum256::from_str(&s).map_err(|e| D::Error::custom(format!("{e:#}")))
    }
}

/// Identifier of a chain; mixed into every signing digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub Checksum256);

impl ChainId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl FromStr for ChainId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Checksum256::from_str(s)?))
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Seconds since the Unix epoch, rendered as `YYYY-MM-DDTHH:MM:SS` in JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimePointSec(pub u32);

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl TimePointSec {
    /// Truncates sub-second precision; fails outside the u32 range.
    pub fn from_datetime(dt: &NaiveDateTime) -> anyhow::Result<Self> {
        let secs = dt.and_utc().timestamp();
        let secs = u32::try_from(secs).map_err(|_| anyhow!("time {dt} is out of range"))?;
        Ok(Self(secs))
    }

    pub fn checked_add_secs(&self, secs: u32) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    pub fn to_datetime(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.0 as i64, 0)
            .unwrap_or_default()
            .naive_utc()
    }
}

impl FromStr for TimePointSec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_datetime(&timestamp::parse(s)?)
    }
}

impl Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format(TIME_FORMAT))
    }
}

impl Serialize for TimePointSec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimePointSec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimePointSec::from_str(&s).map_err(|e| D::Error::custom(format!("{e:#}")))
    }
}

impl Pack for TimePointSec {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u32(self.0)
    }
}

impl Unpack for TimePointSec {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Self(dec.read_u32()?))
    }
}

/// Serde helpers for block timestamps like `2018-06-01T12:00:00.500`.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(s: &str) -> anyhow::Result<NaiveDateTime> {
        Ok(NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), FORMAT)?)
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(|e| D::Error::custom(format!("invalid timestamp '{s}': {e}")))
    }
}
