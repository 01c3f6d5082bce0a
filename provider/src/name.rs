// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::encoding::{DecodeError, Decoder, Encoder, Pack, Unpack};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_LEN: usize = 13;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name '{0}' is longer than 13 characters")]
    TooLong(String),
    #[error("name '{0}' contains invalid character '{1}'")]
    InvalidChar(String, char),
    #[error("13th character of name '{0}' must be one of '.12345abcdefghij'")]
    InvalidLastChar(String),
    #[error("name '{0}' is not in normalized form")]
    NotNormalized(String),
}

/// Account, action and permission name, packed into 64 bits using a base-32 alphabet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(u64);

impl Name {
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(s.to_owned()));
        }
        let mut value = 0u64;
        for (i, c) in s.chars().enumerate() {
            let symbol = u8::try_from(c)
                .ok()
                .and_then(char_to_symbol)
                .ok_or_else(|| NameError::InvalidChar(s.to_owned(), c))?;
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(NameError::InvalidLastChar(s.to_owned()));
                }
                value |= symbol;
            }
        }
        let name = Name(value);
        // Trailing dots are dropped by the encoding; reject inputs that would not round-trip.
        if name.to_string() != s {
            return Err(NameError::NotNormalized(s.to_owned()));
        }
        Ok(name)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = [b'.'; MAX_NAME_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LEN {
            let mask = if i == 0 { 0x0f } else { 0x1f };
            out[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let len = out.iter().rposition(|c| *c != b'.').map_or(0, |p| p + 1);
        // Every byte comes from CHARMAP, which is ASCII.
        f.write_str(std::str::from_utf8(&out[..len]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Name::from_str(&s).map_err(D::Error::custom)
    }
}

impl Pack for Name {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u64(self.0)
    }
}

impl Unpack for Name {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Name(dec.read_u64()?))
    }
}
