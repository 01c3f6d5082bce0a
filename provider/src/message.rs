// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Request and response bodies of the chain API endpoints.

use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::name::Name;
use crate::tx::Transaction;
use crate::types::{timestamp, Bytes, ChainId, Checksum256};

/// Chain API endpoints used by the push pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AbiJsonToBin,
    GetInfo,
    GetRequiredKeys,
    PushTransaction,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AbiJsonToBin => "abi_json_to_bin",
            Self::GetInfo => "get_info",
            Self::GetRequiredKeys => "get_required_keys",
            Self::PushTransaction => "push_transaction",
        }
    }

    /// Path relative to the node's base URL.
    pub fn path(&self) -> String {
        format!("v1/chain/{}", self.name())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Body of `abi_json_to_bin`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbiJsonToBinParams {
    pub code: Name,
    pub action: Name,
    pub args: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiJsonToBinResponse {
    pub binargs: Bytes,
}

/// Response of `get_info`. Only the fields the pipeline needs are required.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub server_version: String,
    pub chain_id: ChainId,
    pub head_block_num: u32,
    #[serde(default)]
    pub last_irreversible_block_num: u32,
    #[serde(default)]
    pub last_irreversible_block_id: Option<Checksum256>,
    pub head_block_id: Checksum256,
    #[serde(with = "timestamp")]
    pub head_block_time: NaiveDateTime,
    #[serde(default)]
    pub head_block_producer: Option<Name>,
    #[serde(default)]
    pub server_version_string: Option<String>,
}

/// Body of `get_required_keys`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredKeysParams {
    pub available_keys: Vec<PublicKey>,
    pub transaction: Transaction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredKeysResponse {
    pub required_keys: Vec<PublicKey>,
}

/// Acceptance response of `push_transaction`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushTransactionResponse {
    pub transaction_id: Checksum256,
    /// Execution trace, kept opaque.
    #[serde(default)]
    pub processed: serde_json::Value,
}
