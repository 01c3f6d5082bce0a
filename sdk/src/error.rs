// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use pushtx_provider::crypto::PublicKey;
use pushtx_provider::packed::PackError;
use pushtx_provider::types::ChainId;
use pushtx_provider::RpcError;
use pushtx_signer::SignerError;

use crate::builder::BuildError;
use crate::state::Stage;

/// Stable classification of a [`PipelineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    EncodingFailed,
    ChainInfoUnavailable,
    ChainMismatch,
    MalformedInput,
    EmptyKeySet,
    KeyResolutionFailed,
    NoKeysRequired,
    KeyNotFound,
    Signer,
    BroadcastRejected,
    Transport,
    Timeout,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::EncodingFailed => "encoding_failed",
            ErrorKind::ChainInfoUnavailable => "chain_info_unavailable",
            ErrorKind::ChainMismatch => "chain_mismatch",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::EmptyKeySet => "empty_key_set",
            ErrorKind::KeyResolutionFailed => "key_resolution_failed",
            ErrorKind::NoKeysRequired => "no_keys_required",
            ErrorKind::KeyNotFound => "key_not_found",
            ErrorKind::Signer => "signer",
            ErrorKind::BroadcastRejected => "broadcast_rejected",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input rejected before any remote call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("abi_json_to_bin failed: {0}")]
    EncodingFailed(#[source] RpcError),
    #[error("get_info failed: {0}")]
    ChainInfoUnavailable(#[source] RpcError),
    /// The node serves a different chain than the one configured.
    #[error("node reports chain {actual}, expected {expected}")]
    ChainMismatch {
        expected: ChainId,
        actual: ChainId,
        raw: Value,
    },
    #[error("malformed input: {0}")]
    MalformedInput(#[from] BuildError),
    #[error("error packing transaction: {0}")]
    Pack(#[from] PackError),
    /// No wallet was unlocked when keys were resolved.
    #[error("no unlocked wallet keys available")]
    EmptyKeySet,
    #[error("get_required_keys failed: {0}")]
    KeyResolutionFailed(#[source] RpcError),
    /// The node named no keys; nothing was signed.
    #[error("node reported no required keys")]
    NoKeysRequired { raw: Value },
    #[error("required key {0} is not held by any unlocked wallet")]
    KeyNotFound(PublicKey),
    #[error("signer error: {0}")]
    Signer(#[source] SignerError),
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(#[source] RpcError),
    #[error("transport error at stage {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: RpcError,
    },
    #[error("stage {stage} did not complete within {}", humantime::format_duration(*.after))]
    Timeout { stage: Stage, after: Duration },
}

impl From<SignerError> for PipelineError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::KeyNotFound(key) => PipelineError::KeyNotFound(key),
            err => PipelineError::Signer(err),
        }
    }
}

/// Attributes the failure to the stage that owns the failed endpoint.
impl From<RpcError> for PipelineError {
    fn from(err: RpcError) -> Self {
        let stage = Stage::from(err.endpoint());
        PipelineError::from_rpc(stage, err)
    }
}

impl PipelineError {
    /// Classifies a provider failure at `stage`. Connectivity failures are
    /// reported as [`ErrorKind::Transport`] whatever the stage.
    pub fn from_rpc(stage: Stage, err: RpcError) -> Self {
        if err.is_transport() {
            return PipelineError::Transport { stage, source: err };
        }
        match stage {
            Stage::AbiJsonToBin => PipelineError::EncodingFailed(err),
            Stage::GetInfo => PipelineError::ChainInfoUnavailable(err),
            Stage::GetRequiredKeys => PipelineError::KeyResolutionFailed(err),
            Stage::PushTransaction => PipelineError::BroadcastRejected(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PipelineError::EncodingFailed(_) => ErrorKind::EncodingFailed,
            PipelineError::ChainInfoUnavailable(_) => ErrorKind::ChainInfoUnavailable,
            PipelineError::ChainMismatch { .. } => ErrorKind::ChainMismatch,
            PipelineError::MalformedInput(_) | PipelineError::Pack(_) => ErrorKind::MalformedInput,
            PipelineError::EmptyKeySet => ErrorKind::EmptyKeySet,
            PipelineError::KeyResolutionFailed(_) => ErrorKind::KeyResolutionFailed,
            PipelineError::NoKeysRequired { .. } => ErrorKind::NoKeysRequired,
            PipelineError::KeyNotFound(_) => ErrorKind::KeyNotFound,
            PipelineError::Signer(_) => ErrorKind::Signer,
            PipelineError::BroadcastRejected(_) => ErrorKind::BroadcastRejected,
            PipelineError::Transport { .. } => ErrorKind::Transport,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Stage at which the run stopped.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidArgument(_) | PipelineError::EncodingFailed(_) => {
                Stage::AbiJsonToBin
            }
            PipelineError::ChainInfoUnavailable(_) | PipelineError::ChainMismatch { .. } => {
                Stage::GetInfo
            }
            PipelineError::MalformedInput(_)
            | PipelineError::EmptyKeySet
            | PipelineError::KeyResolutionFailed(_)
            | PipelineError::NoKeysRequired { .. } => Stage::GetRequiredKeys,
            PipelineError::Pack(_)
            | PipelineError::KeyNotFound(_)
            | PipelineError::Signer(_)
            | PipelineError::BroadcastRejected(_) => Stage::PushTransaction,
            PipelineError::Transport { stage, .. } | PipelineError::Timeout { stage, .. } => *stage,
        }
    }

    /// Raw remote response behind the failure, if the node produced one.
    pub fn raw_response(&self) -> Option<&Value> {
        match self {
            PipelineError::EncodingFailed(err)
            | PipelineError::ChainInfoUnavailable(err)
            | PipelineError::KeyResolutionFailed(err)
            | PipelineError::BroadcastRejected(err)
            | PipelineError::Transport { source: err, .. } => err.raw_response(),
            PipelineError::NoKeysRequired { raw } | PipelineError::ChainMismatch { raw, .. } => {
                Some(raw)
            }
            _ => None,
        }
    }
}
