// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Pushtx SDK
//!
//! Pushes a single contract action to an EOSIO-style chain: the JSON arguments
//! are encoded by the node, the transaction is bound to the chain head, signed
//! with exactly the keys the node requires and broadcast.

use std::time::Duration;

use pushtx_provider::name::Name;
use pushtx_provider::packed::CompressionMode;
use pushtx_provider::tx::PermissionLevel;
use pushtx_provider::types::ChainId;

pub mod builder;
pub mod error;
pub mod network;
pub mod observer;
pub mod pipeline;
pub mod state;

pub use error::{ErrorKind, PipelineError};
pub use pipeline::{ActionArgs, Pipeline, PushReceipt};

/// `eosio`
const EOSIO: Name = Name::from_u64(0x5530ea0000000000);
/// `active`
const ACTIVE: Name = Name::from_u64(0x3232eda800000000);

/// Options common to pushes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushOptions {
    /// Authorization attached to the action.
    pub authorization: PermissionLevel,
    /// How long after the head block the transaction stays valid.
    pub expiration_window: Duration,
    /// Compression of the broadcast payload.
    pub compression: CompressionMode,
    /// Chain the node must report; any chain when unset.
    pub chain_id: Option<ChainId>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            authorization: PermissionLevel::new(EOSIO, ACTIVE),
            expiration_window: builder::DEFAULT_EXPIRATION_WINDOW,
            compression: CompressionMode::None,
            chain_id: None,
        }
    }
}
