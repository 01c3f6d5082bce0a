// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;

use pushtx_provider::message::ChainInfo;
use pushtx_provider::name::Name;
use pushtx_provider::tx::{Action, PermissionLevel, Transaction};
use pushtx_provider::types::{Bytes, ChainId, Checksum256, TimePointSec};

/// Default time a transaction stays valid after the head block.
pub const DEFAULT_EXPIRATION_WINDOW: Duration = Duration::from_secs(30);

/// Errors raised when a transaction cannot be assembled from its inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("encoded action {0}::{1} has no binary arguments")]
    EmptyArgs(Name, Name),
    #[error("chain head is not available")]
    MissingHead,
    #[error("expiration overflows: head time {head} plus {window:?}")]
    Expiration {
        head: NaiveDateTime,
        window: Duration,
    },
}

/// An action whose arguments are already in binary ABI form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedAction {
    pub account: Name,
    pub name: Name,
    pub data: Bytes,
}

/// Head block metadata a transaction is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainHead {
    pub head_block_id: Checksum256,
    pub head_block_time: NaiveDateTime,
    pub chain_id: ChainId,
}

impl From<&ChainInfo> for ChainHead {
    fn from(info: &ChainInfo) -> Self {
        Self {
            head_block_id: info.head_block_id,
            head_block_time: info.head_block_time,
            chain_id: info.chain_id,
        }
    }
}

/// Assembles unsigned single-action transactions.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    expiration_window: Duration,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self {
            expiration_window: DEFAULT_EXPIRATION_WINDOW,
        }
    }
}

impl TransactionBuilder {
    pub fn new(expiration_window: Duration) -> Self {
        Self { expiration_window }
    }

    pub fn expiration_window(&self) -> Duration {
        self.expiration_window
    }

    /// Builds a transaction carrying `action`, authorized by `authorization`,
    /// that references the head block and expires one window after it.
    pub fn build(
        &self,
        action: EncodedAction,
        head: Option<&ChainHead>,
        authorization: &PermissionLevel,
    ) -> Result<Transaction, BuildError> {
        if action.data.is_empty() {
            return Err(BuildError::EmptyArgs(action.account, action.name));
        }
        let head = head.ok_or(BuildError::MissingHead)?;

        let expiration_err = || BuildError::Expiration {
            head: head.head_block_time,
            window: self.expiration_window,
        };
        let window = u32::try_from(self.expiration_window.as_secs()).map_err(|_| expiration_err())?;
        let expiration = TimePointSec::from_datetime(&head.head_block_time)
            .ok()
            .and_then(|t| t.checked_add_secs(window))
            .ok_or_else(expiration_err)?;

        Ok(Transaction {
            expiration,
            ref_block_num: (head.head_block_id.block_num() & 0xffff) as u16,
            ref_block_prefix: head.head_block_id.ref_block_prefix(),
            actions: vec![Action {
                account: action.account,
                name: action.name,
                authorization: vec![*authorization],
                data: action.data,
            }],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use pushtx_provider::types::timestamp;

    fn head() -> ChainHead {
        ChainHead {
            head_block_id: Checksum256::from_str(
                "00010064a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c",
            )
            .unwrap(),
            head_block_time: timestamp::parse("2024-05-01T12:00:00.500").unwrap(),
            chain_id: ChainId::default(),
        }
    }

    fn action() -> EncodedAction {
        EncodedAction {
            account: "token".parse().unwrap(),
            name: "transfer".parse().unwrap(),
            data: Bytes(vec![0xaa, 0xbb, 0xcc]),
        }
    }

    #[test]
    fn test_build_binds_reference_block() {
        let auth = PermissionLevel::from_str("alice@active").unwrap();
        let trx = TransactionBuilder::default()
            .build(action(), Some(&head()), &auth)
            .unwrap();

        // Block 0x00010064: only the low 16 bits are kept.
        assert_eq!(trx.ref_block_num, 0x0064);
        assert_eq!(trx.ref_block_prefix, 0x1807f6e5);
        assert_eq!(trx.expiration.to_string(), "2024-05-01T12:00:30");
        assert_eq!(trx.actions.len(), 1);
        assert_eq!(trx.actions[0].authorization, vec![auth]);
        assert_eq!(trx.actions[0].data.0, vec![0xaa, 0xbb, 0xcc]);
        assert!(trx.context_free_actions.is_empty());
    }

    #[test]
    fn test_build_is_pure() {
        let auth = PermissionLevel::from_str("alice@active").unwrap();
        let builder = TransactionBuilder::new(Duration::from_secs(120));
        let a = builder.build(action(), Some(&head()), &auth).unwrap();
        let b = builder.build(action(), Some(&head()), &auth).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.expiration.to_string(), "2024-05-01T12:02:00");
    }

    #[test]
    fn test_build_rejects_malformed_input() {
        let auth = PermissionLevel::from_str("alice@active").unwrap();
        let builder = TransactionBuilder::default();

        let mut empty = action();
        empty.data = Bytes::default();
        assert!(matches!(
            builder.build(empty, Some(&head()), &auth),
            Err(BuildError::EmptyArgs(_, _))
        ));
        assert_eq!(
            builder.build(action(), None, &auth),
            Err(BuildError::MissingHead)
        );
    }
}
