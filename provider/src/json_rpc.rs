// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::message::Endpoint;
use crate::provider::{ChainProvider, RpcError};

pub use reqwest::Url;

/// HTTP [`ChainProvider`] talking to a node's `/v1/chain` API.
///
/// Clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct JsonRpcProvider {
    inner: reqwest::Client,
    url: Url,
}

impl JsonRpcProvider {
    /// Create a provider for the node at `url`, with an optional per-request timeout.
    pub fn new_http(url: Url, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder.build().context("error building http client")?;
        // Ensure `join` appends endpoint paths instead of replacing the last segment.
        let url = if url.path().ends_with('/') {
            url
        } else {
            let mut url = url;
            let path = format!("{}/", url.path());
            url.set_path(&path);
            url
        };
        Ok(Self { inner, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    async fn call(&self, endpoint: Endpoint, body: Value) -> Result<Value, RpcError> {
        let transport = |e: &dyn std::fmt::Display| RpcError::Transport {
            endpoint,
            message: e.to_string(),
        };

        let url = self.url.join(&endpoint.path()).map_err(|e| transport(&e))?;
        debug!(%url, "calling {}", endpoint);

        let mut request = self.inner.post(url);
        if !body.is_null() {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| transport(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| transport(&e))?;
        let raw = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        debug!(status = status.as_u16(), "{} responded", endpoint);

        if !status.is_success() {
            return Err(RpcError::Remote {
                endpoint,
                status: status.as_u16(),
                raw,
            });
        }
        Ok(raw)
    }
}
