// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use pushtx_provider::message::{AbiJsonToBinParams, Endpoint, RequiredKeysParams};
use pushtx_provider::name::Name;
use pushtx_provider::packed::PackedTransaction;
use pushtx_provider::types::Checksum256;
use pushtx_provider::util::parse_json_object;
use pushtx_provider::{ChainProvider, RpcError};
use pushtx_signer::{sign_transaction, KeyStore};

use crate::builder::{ChainHead, EncodedAction, TransactionBuilder};
use crate::error::PipelineError;
use crate::observer::{PipelineObserver, RunId, TracingObserver};
use crate::state::{PipelineState, Stage};
use crate::PushOptions;

/// Caller input for one push: contract, action and JSON arguments as typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionArgs {
    pub contract: String,
    pub action: String,
    pub json_args: String,
}

impl ActionArgs {
    pub fn new(
        contract: impl Into<String>,
        action: impl Into<String>,
        json_args: impl Into<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            action: action.into(),
            json_args: json_args.into(),
        }
    }

    fn validate(&self) -> Result<AbiJsonToBinParams, PipelineError> {
        let invalid = |e: &dyn std::fmt::Display| PipelineError::InvalidArgument(e.to_string());
        let code: Name = self.contract.parse().map_err(|e| invalid(&e))?;
        let action: Name = self.action.parse().map_err(|e| invalid(&e))?;
        let args = parse_json_object(&self.json_args).map_err(|e| invalid(&e))?;
        Ok(AbiJsonToBinParams { code, action, args })
    }
}

/// Result of an accepted push.
#[derive(Clone, Debug, Serialize)]
pub struct PushReceipt {
    pub run: RunId,
    pub transaction_id: Checksum256,
    /// The payload that was broadcast.
    pub packed: PackedTransaction,
    /// Execution trace reported by the node.
    pub processed: Value,
    /// Raw `push_transaction` response.
    #[serde(skip)]
    pub raw: Value,
}

struct RunContext {
    id: RunId,
    state: PipelineState,
}

/// Drives the push stages in order for each run.
///
/// A pipeline can serve concurrent runs. Each run awaits its own calls on the
/// shared provider, so a response is only ever seen by the run that issued
/// the request, and nothing is left registered once the run's future
/// completes or is dropped.
pub struct Pipeline<P: ?Sized, K: ?Sized, O = TracingObserver> {
    provider: Arc<P>,
    keys: Arc<K>,
    observer: O,
    options: PushOptions,
}

impl<P, K> Pipeline<P, K, TracingObserver>
where
    P: ChainProvider + ?Sized,
    K: KeyStore + ?Sized,
{
    /// Returns a pipeline that logs progress with `tracing`.
    pub fn new(provider: Arc<P>, keys: Arc<K>) -> Self {
        Self::with_observer(provider, keys, TracingObserver)
    }
}

impl<P, K, O> Pipeline<P, K, O>
where
    P: ChainProvider + ?Sized,
    K: KeyStore + ?Sized,
    O: PipelineObserver,
{
    pub fn with_observer(provider: Arc<P>, keys: Arc<K>, observer: O) -> Self {
        Self {
            provider,
            keys,
            observer,
            options: PushOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PushOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PushOptions {
        &self.options
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Pushes one action. A stalled call parks the run in its current state
    /// until the provider gives up.
    pub async fn run(&self, args: ActionArgs) -> Result<PushReceipt, PipelineError> {
        let mut ctx = RunContext {
            id: RunId::next(),
            state: PipelineState::Idle,
        };
        let outcome = self.drive(&mut ctx, &args).await;
        self.finish(&mut ctx, outcome)
    }

    /// Like [`Pipeline::run`], but fails with [`PipelineError::Timeout`] if the
    /// run has not finished after `timeout`.
    ///
    /// Expiry stops waiting; a transaction already handed to the node may
    /// still be included.
    pub async fn run_with_timeout(
        &self,
        args: ActionArgs,
        timeout: Duration,
    ) -> Result<PushReceipt, PipelineError> {
        let mut ctx = RunContext {
            id: RunId::next(),
            state: PipelineState::Idle,
        };
        let timed = tokio::time::timeout(timeout, self.drive(&mut ctx, &args)).await;
        let outcome = match timed {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineError::Timeout {
                stage: ctx.state.stage().unwrap_or(Stage::AbiJsonToBin),
                after: timeout,
            }),
        };
        self.finish(&mut ctx, outcome)
    }

    fn transition(&self, ctx: &mut RunContext, to: PipelineState) {
        let from = ctx.state;
        debug_assert!(
            from.can_transition_to(to),
            "illegal pipeline transition {from} -> {to}"
        );
        ctx.state = to;
        self.observer.on_transition(ctx.id, from, to);
    }

    fn finish(
        &self,
        ctx: &mut RunContext,
        outcome: Result<PushReceipt, PipelineError>,
    ) -> Result<PushReceipt, PipelineError> {
        match outcome {
            Ok(receipt) => {
                self.transition(ctx, PipelineState::Succeeded);
                self.observer.on_success(ctx.id, &receipt.raw);
                Ok(receipt)
            }
            Err(err) => {
                if ctx.state != PipelineState::Idle {
                    self.transition(ctx, PipelineState::Failed);
                }
                self.observer
                    .on_failure(ctx.id, err.stage(), err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        args: &ActionArgs,
    ) -> Result<PushReceipt, PipelineError> {
        let params = args.validate()?;
        let (code, action) = (params.code, params.action);

        let node = ObservedProvider {
            provider: &*self.provider,
            observer: &self.observer,
            run: ctx.id,
        };

        self.transition(ctx, PipelineState::Encoding);
        let encoded = node.abi_json_to_bin(&params).await?;
        let encoded = EncodedAction {
            account: code,
            name: action,
            data: encoded.value.binargs,
        };

        self.transition(ctx, PipelineState::AwaitingChainInfo);
        let info = node.get_info().await?;
        if let Some(expected) = self.options.chain_id {
            if info.value.chain_id != expected {
                return Err(PipelineError::ChainMismatch {
                    expected,
                    actual: info.value.chain_id,
                    raw: info.raw,
                });
            }
        }
        let head = ChainHead::from(&info.value);

        self.transition(ctx, PipelineState::Building);
        let builder = TransactionBuilder::new(self.options.expiration_window);
        let transaction = builder.build(encoded, Some(&head), &self.options.authorization)?;

        self.transition(ctx, PipelineState::ResolvingKeys);
        // Wallets may have been locked or unlocked since the last run.
        let available = self.keys.unlocked_public_keys().await;
        if available.is_empty() {
            return Err(PipelineError::EmptyKeySet);
        }
        let required = node
            .get_required_keys(&RequiredKeysParams {
                available_keys: available.into_iter().collect(),
                transaction: transaction.clone(),
            })
            .await?;
        if required.value.required_keys.is_empty() {
            return Err(PipelineError::NoKeysRequired { raw: required.raw });
        }

        self.transition(ctx, PipelineState::Signing);
        let signed = sign_transaction(
            &*self.keys,
            transaction,
            &required.value.required_keys,
            &head.chain_id,
        )
        .await?;

        self.transition(ctx, PipelineState::Packing);
        let packed = PackedTransaction::pack(&signed, self.options.compression)?;

        self.transition(ctx, PipelineState::Broadcasting);
        let pushed = node.push_transaction(&packed).await?;

        Ok(PushReceipt {
            run: ctx.id,
            transaction_id: pushed.value.transaction_id,
            packed,
            processed: pushed.value.processed,
            raw: pushed.raw,
        })
    }
}

/// Provider view of one run that reports each exchange to the observer.
///
/// The raw response is reported even when the node rejected the request or
/// the body could not be decoded.
struct ObservedProvider<'a, P: ?Sized, O> {
    provider: &'a P,
    observer: &'a O,
    run: RunId,
}

#[async_trait]
impl<'a, P, O> ChainProvider for ObservedProvider<'a, P, O>
where
    P: ChainProvider + ?Sized,
    O: PipelineObserver,
{
    async fn call(&self, endpoint: Endpoint, body: Value) -> Result<Value, RpcError> {
        let stage = Stage::from(endpoint);
        debug!(run = %self.run, %stage, "sending request");
        self.observer.on_request(self.run, stage, &body);

        let result = self.provider.call(endpoint, body).await;
        let raw = match &result {
            Ok(raw) => Some(raw),
            Err(err) => err.raw_response(),
        };
        if let Some(raw) = raw {
            self.observer.on_response(self.run, stage, raw);
        }
        result
    }
}
