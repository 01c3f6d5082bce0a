// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::message::{
    AbiJsonToBinParams, AbiJsonToBinResponse, ChainInfo, Endpoint, PushTransactionResponse,
    RequiredKeysParams, RequiredKeysResponse,
};
use crate::packed::PackedTransaction;
use crate::response::{decode_as, RemoteError, RpcResult};

/// Errors raised by a [`ChainProvider`] call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a response (connection, timeout, body read).
    #[error("transport error calling {endpoint}: {message}")]
    Transport { endpoint: Endpoint, message: String },
    /// The node answered with an error status.
    #[error("{endpoint} rejected with status {status}: {}", summarize(.raw))]
    Remote {
        endpoint: Endpoint,
        status: u16,
        raw: Value,
    },
    /// The node answered but the body did not have the expected shape.
    #[error("{endpoint}: {message}")]
    Decode {
        endpoint: Endpoint,
        message: String,
        raw: Value,
    },
    #[error("error encoding {endpoint} request: {source}")]
    Encode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

fn summarize(raw: &Value) -> String {
    RemoteError::from_raw(raw)
        .map(|e| e.summary())
        .unwrap_or_else(|| raw.to_string())
}

impl RpcError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Remote { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::Encode { endpoint, .. } => *endpoint,
        }
    }

    /// Raw response document, if the node produced one.
    pub fn raw_response(&self) -> Option<&Value> {
        match self {
            Self::Remote { raw, .. } | Self::Decode { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

fn encode<T: serde::Serialize>(endpoint: Endpoint, params: &T) -> Result<Value, RpcError> {
    serde_json::to_value(params).map_err(|source| RpcError::Encode { endpoint, source })
}

/// Provider for the chain API.
///
/// Implementors supply [`ChainProvider::call`]; the typed methods are derived from it.
/// Each call resolves with the response to its own request only, so one provider
/// can be shared by concurrent pipeline runs.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Posts `body` to `endpoint` and returns the raw response document.
    ///
    /// A `Value::Null` body means the endpoint takes no parameters.
    async fn call(&self, endpoint: Endpoint, body: Value) -> Result<Value, RpcError>;

    /// Converts JSON action arguments into their binary ABI encoding.
    async fn abi_json_to_bin(
        &self,
        params: &AbiJsonToBinParams,
    ) -> RpcResult<AbiJsonToBinResponse> {
        let endpoint = Endpoint::AbiJsonToBin;
        let raw = self.call(endpoint, encode(endpoint, params)?).await?;
        decode_as(endpoint, raw)
    }

    /// Returns chain head information.
    async fn get_info(&self) -> RpcResult<ChainInfo> {
        let endpoint = Endpoint::GetInfo;
        let raw = self.call(endpoint, Value::Null).await?;
        decode_as(endpoint, raw)
    }

    /// Returns the subset of available keys needed to authorize the transaction.
    async fn get_required_keys(
        &self,
        params: &RequiredKeysParams,
    ) -> RpcResult<RequiredKeysResponse> {
        let endpoint = Endpoint::GetRequiredKeys;
        let raw = self.call(endpoint, encode(endpoint, params)?).await?;
        decode_as(endpoint, raw)
    }

    /// Broadcasts a packed transaction.
    async fn push_transaction(
        &self,
        packed: &PackedTransaction,
    ) -> RpcResult<PushTransactionResponse> {
        let endpoint = Endpoint::PushTransaction;
        let raw = self.call(endpoint, encode(endpoint, packed)?).await?;
        decode_as(endpoint, raw)
    }
}

#[async_trait]
impl<P: ChainProvider + ?Sized> ChainProvider for std::sync::Arc<P> {
    async fn call(&self, endpoint: Endpoint, body: Value) -> Result<Value, RpcError> {
        (**self).call(endpoint, body).await
    }
}
