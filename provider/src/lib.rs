// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Pushtx Provider
//!
//! Chain API types, transaction encoding and an HTTP provider for pushtx.

pub mod crypto;
pub mod encoding;
pub mod json_rpc;
pub mod message;
pub mod name;
pub mod packed;
mod provider;
pub mod response;
pub mod tx;
pub mod types;
pub mod util;

pub use provider::*;
