// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::message::Endpoint;
use crate::provider::RpcError;

/// A decoded response together with the raw document it came from.
#[derive(Clone, Debug)]
pub struct RpcResponse<T> {
    pub raw: Value,
    pub value: T,
}

pub type RpcResult<T> = Result<RpcResponse<T>, RpcError>;

/// Decode a raw response document as `T`, keeping the document for diagnostics.
pub fn decode_as<T>(endpoint: Endpoint, raw: Value) -> RpcResult<T>
where
    T: DeserializeOwned,
{
    match T::deserialize(&raw) {
        Ok(value) => Ok(RpcResponse { raw, value }),
        Err(e) => Err(RpcError::Decode {
            endpoint,
            message: format!("error parsing response as {}: {e}", std::any::type_name::<T>()),
            raw,
        }),
    }
}

/// Structured error body returned by the node on rejection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error: Option<RemoteErrorDetail>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub what: String,
    #[serde(default)]
    pub details: Vec<RemoteErrorMessage>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub method: String,
}

impl RemoteError {
    /// Best-effort parse of a rejection body.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        RemoteError::deserialize(raw).ok()
    }

    /// One-line summary, e.g. `missing_auth_exception: missing required authority`.
    pub fn summary(&self) -> String {
        match &self.error {
            Some(detail) => {
                let what = if detail.what.is_empty() {
                    &self.message
                } else {
                    &detail.what
                };
                match detail.details.first() {
                    Some(first) if !first.message.is_empty() => {
                        format!("{}: {} ({})", detail.name, what, first.message)
                    }
                    _ => format!("{}: {}", detail.name, what),
                }
            }
            None => self.message.clone(),
        }
    }
}
