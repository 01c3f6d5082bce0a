// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::Display;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::crypto::{signing_digest, Digest, Signature};
use crate::encoding::{DecodeError, Decoder, Encoder, Pack, Unpack};
use crate::name::Name;
use crate::types::{Bytes, ChainId, Checksum256, TimePointSec};

/// An `actor@permission` pair authorizing an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }
}

impl FromStr for PermissionLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (actor, permission) = s
            .split_once('@')
            .ok_or_else(|| anyhow!("expected ACTOR@PERMISSION but `@` not found in `{}`", s))?;
        Ok(Self {
            actor: actor.parse()?,
            permission: permission.parse()?,
        })
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

impl Pack for PermissionLevel {
    fn pack(&self, enc: &mut Encoder) {
        self.actor.pack(enc);
        self.permission.pack(enc);
    }
}

impl Unpack for PermissionLevel {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            actor: Name::unpack(dec)?,
            permission: Name::unpack(dec)?,
        })
    }
}

/// A single contract invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: Bytes,
}

impl Pack for Action {
    fn pack(&self, enc: &mut Encoder) {
        self.account.pack(enc);
        self.name.pack(enc);
        self.authorization.pack(enc);
        self.data.pack(enc);
    }
}

impl Unpack for Action {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            account: Name::unpack(dec)?,
            name: Name::unpack(dec)?,
            authorization: Vec::unpack(dec)?,
            data: Bytes::unpack(dec)?,
        })
    }
}

/// An unsigned transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Time after which the transaction is rejected.
    pub expiration: TimePointSec,
    /// Low 16 bits of the reference block number.
    pub ref_block_num: u16,
    /// Prefix of the reference block id.
    pub ref_block_prefix: u32,
    /// Upper bound on network usage in 8-byte words; zero means no limit.
    #[serde(default)]
    pub max_net_usage_words: u32,
    /// Upper bound on CPU time in milliseconds; zero means no limit.
    #[serde(default)]
    pub max_cpu_usage_ms: u8,
    #[serde(default)]
    pub delay_sec: u32,
    #[serde(default)]
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub transaction_extensions: Vec<(u16, Bytes)>,
}

impl Transaction {
    /// Canonical binary form, as packed into `packed_trx`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_packed()
    }

    /// Transaction id: SHA-256 of the binary form.
    pub fn id(&self) -> Checksum256 {
        Checksum256::hash(&self.to_bytes())
    }

    /// Digest to sign for the given chain, with no context-free data.
    pub fn signing_digest(&self, chain_id: &ChainId) -> Digest {
        signing_digest(chain_id, &self.to_bytes(), &[])
    }
}

impl Pack for Transaction {
    fn pack(&self, enc: &mut Encoder) {
        self.expiration.pack(enc);
        self.ref_block_num.pack(enc);
        self.ref_block_prefix.pack(enc);
        enc.write_varuint32(self.max_net_usage_words);
        self.max_cpu_usage_ms.pack(enc);
        enc.write_varuint32(self.delay_sec);
        self.context_free_actions.pack(enc);
        self.actions.pack(enc);
        self.transaction_extensions.pack(enc);
    }
}

impl Unpack for Transaction {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            expiration: TimePointSec::unpack(dec)?,
            ref_block_num: u16::unpack(dec)?,
            ref_block_prefix: u32::unpack(dec)?,
            max_net_usage_words: dec.read_varuint32()?,
            max_cpu_usage_ms: u8::unpack(dec)?,
            delay_sec: dec.read_varuint32()?,
            context_free_actions: Vec::unpack(dec)?,
            actions: Vec::unpack(dec)?,
            transaction_extensions: Vec::unpack(dec)?,
        })
    }
}

/// A transaction with one signature per required key, in signing order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub context_free_data: Vec<Bytes>,
}

impl SignedTransaction {
    pub fn id(&self) -> Checksum256 {
        self.transaction.id()
    }

    /// Digest the signatures are over, including any context-free data.
    pub fn signing_digest(&self, chain_id: &ChainId) -> Digest {
        signing_digest(chain_id, &self.transaction.to_bytes(), &self.context_free_data)
    }
}
