// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::str::FromStr;

use anyhow::{anyhow, bail};
use serde_json::Value;

use crate::crypto::PublicKey;
use crate::name::Name;
use crate::packed::CompressionMode;
use crate::tx::PermissionLevel;
use crate::types::ChainId;

/// Parse an account or action name from string.
pub fn parse_name(s: &str) -> anyhow::Result<Name> {
    Ok(Name::from_str(s)?)
}

/// Parse an `actor@permission` pair. A bare actor gets the `active` permission.
pub fn parse_permission_level(s: &str) -> anyhow::Result<PermissionLevel> {
    if s.contains('@') {
        PermissionLevel::from_str(s)
    } else {
        Ok(PermissionLevel::new(parse_name(s)?, Name::from_str("active")?))
    }
}

/// Parse a compression mode from string.
pub fn parse_compression(s: &str) -> anyhow::Result<CompressionMode> {
    CompressionMode::from_str(&s.to_lowercase())
}

/// Parse a public key from string.
pub fn parse_public_key(s: &str) -> anyhow::Result<PublicKey> {
    Ok(PublicKey::from_str(s)?)
}

/// Parse a chain id from its hex form.
pub fn parse_chain_id(s: &str) -> anyhow::Result<ChainId> {
    ChainId::from_str(s)
}

/// Parse action arguments, which must be a non-empty JSON object.
pub fn parse_json_object(s: &str) -> anyhow::Result<Value> {
    if s.trim().is_empty() {
        bail!("empty action args");
    }
    let value: Value = serde_json::from_str(s).map_err(|e| anyhow!("wrong json format: {e}"))?;
    if !value.is_object() {
        bail!("action args must be a JSON object");
    }
    Ok(value)
}
