// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pushtx_provider::crypto::{Digest, PublicKey, Signature};
use pushtx_provider::message::Endpoint;
use pushtx_provider::packed::PackedTransaction;
use pushtx_provider::types::ChainId;
use pushtx_provider::{ChainProvider, RpcError};
use pushtx_signer::key::PrivateKey;
use pushtx_signer::{KeyStore, SignerError};

pub const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";
pub const OTHER_CHAIN_ID: &str =
    "e70aaab8997e1dfce58fbfac80cbbb8fecec7b99cf982a9444273cbc64c41473";
pub const HEAD_BLOCK_TIME: &str = "2024-05-01T12:00:00.000";

pub fn chain_id() -> ChainId {
    ChainId::from_str(CHAIN_ID).unwrap()
}

pub fn alice_key() -> PrivateKey {
    PrivateKey::from_bytes(&[0x11; 32]).unwrap()
}

pub fn bob_key() -> PrivateKey {
    PrivateKey::from_bytes(&[0x22; 32]).unwrap()
}

/// Block id whose first four bytes carry `num`.
pub fn block_id(num: u32) -> String {
    format!(
        "{num:08x}a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c"
    )
}

pub fn transfer_args(memo: &str) -> String {
    json!({
        "from": "alice",
        "to": "bob",
        "quantity": "1.0000 TOK",
        "memo": memo,
    })
    .to_string()
}

/// In-process stand-in for a node's chain API.
///
/// `abi_json_to_bin` answers with the hex of a non-empty `memo` argument, or
/// `binargs` otherwise. A `delay_ms` argument holds that response back.
/// `get_required_keys` echoes the available keys unless `required_keys` is set.
/// The `malformed` endpoint answers with a body of the wrong shape.
pub struct MockNode {
    pub binargs: String,
    pub head_block_num: u32,
    pub required_keys: Option<Vec<PublicKey>>,
    pub reject: Option<(Endpoint, Value)>,
    pub transport_failure: Option<Endpoint>,
    pub malformed: Option<Endpoint>,
    pub stall: Option<Endpoint>,
    pub calls: Mutex<Vec<Endpoint>>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self {
            binargs: "AABBCC".into(),
            head_block_num: 100,
            required_keys: None,
            reject: None,
            transport_failure: None,
            malformed: None,
            stall: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockNode {
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, endpoint: Endpoint, body: &Value) -> Value {
        match endpoint {
            Endpoint::AbiJsonToBin => {
                let memo = body["args"]["memo"].as_str().unwrap_or_default();
                if memo.is_empty() {
                    json!({ "binargs": self.binargs })
                } else {
                    json!({ "binargs": hex::encode(memo) })
                }
            }
            Endpoint::GetInfo => json!({
                "server_version": "0f6695cb",
                "chain_id": CHAIN_ID,
                "head_block_num": self.head_block_num,
                "last_irreversible_block_num": self.head_block_num - 1,
                "head_block_id": block_id(self.head_block_num),
                "head_block_time": HEAD_BLOCK_TIME,
                "head_block_producer": "eosio",
            }),
            Endpoint::GetRequiredKeys => match &self.required_keys {
                Some(keys) => json!({ "required_keys": keys }),
                None => json!({ "required_keys": body["available_keys"] }),
            },
            Endpoint::PushTransaction => {
                let packed: PackedTransaction = serde_json::from_value(body.clone()).unwrap();
                json!({
                    "transaction_id": packed.id().unwrap(),
                    "processed": { "receipt": { "status": "executed" } },
                })
            }
        }
    }
}

#[async_trait]
impl ChainProvider for MockNode {
    async fn call(&self, endpoint: Endpoint, body: Value) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(endpoint);

        if let Some(delay) = body["args"]["delay_ms"].as_u64() {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.stall == Some(endpoint) {
            std::future::pending::<()>().await;
        }
        if self.transport_failure == Some(endpoint) {
            return Err(RpcError::Transport {
                endpoint,
                message: "connection refused".into(),
            });
        }
        if let Some((rejected, raw)) = &self.reject {
            if *rejected == endpoint {
                return Err(RpcError::Remote {
                    endpoint,
                    status: 500,
                    raw: raw.clone(),
                });
            }
        }
        if self.malformed == Some(endpoint) {
            return Ok(json!({ "unexpected": true }));
        }
        Ok(self.respond(endpoint, &body))
    }
}

/// Wraps a [`KeyStore`] and counts signing requests.
pub struct CountingKeyStore<K> {
    pub inner: K,
    signed: AtomicUsize,
}

impl<K> CountingKeyStore<K> {
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            signed: AtomicUsize::new(0),
        }
    }

    pub fn signed(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<K: KeyStore> KeyStore for CountingKeyStore<K> {
    async fn unlocked_public_keys(&self) -> BTreeSet<PublicKey> {
        self.inner.unlocked_public_keys().await
    }

    async fn sign_digest(&self, key: &PublicKey, digest: &Digest) -> Result<Signature, SignerError> {
        self.signed.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_digest(key, digest).await
    }
}
