// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::state::{PipelineState, Stage};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one pipeline run; every observer event carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Receives progress of pipeline runs.
///
/// Request and response payloads are the exact documents exchanged with the
/// node. Events of one run are delivered in order; events of concurrent runs
/// may interleave and are told apart by [`RunId`].
pub trait PipelineObserver: Send + Sync {
    fn on_transition(&self, _run: RunId, _from: PipelineState, _to: PipelineState) {}

    fn on_request(&self, run: RunId, stage: Stage, payload: &Value);

    fn on_response(&self, run: RunId, stage: Stage, payload: &Value);

    fn on_failure(&self, run: RunId, stage: Stage, kind: ErrorKind, detail: &str);

    fn on_success(&self, run: RunId, payload: &Value);
}

impl<O: PipelineObserver + ?Sized> PipelineObserver for Arc<O> {
    fn on_transition(&self, run: RunId, from: PipelineState, to: PipelineState) {
        (**self).on_transition(run, from, to)
    }

    fn on_request(&self, run: RunId, stage: Stage, payload: &Value) {
        (**self).on_request(run, stage, payload)
    }

    fn on_response(&self, run: RunId, stage: Stage, payload: &Value) {
        (**self).on_response(run, stage, payload)
    }

    fn on_failure(&self, run: RunId, stage: Stage, kind: ErrorKind, detail: &str) {
        (**self).on_failure(run, stage, kind, detail)
    }

    fn on_success(&self, run: RunId, payload: &Value) {
        (**self).on_success(run, payload)
    }
}

/// Delivers every event to both observers, first `A` then `B`.
impl<A: PipelineObserver, B: PipelineObserver> PipelineObserver for (A, B) {
    fn on_transition(&self, run: RunId, from: PipelineState, to: PipelineState) {
        self.0.on_transition(run, from, to);
        self.1.on_transition(run, from, to);
    }

    fn on_request(&self, run: RunId, stage: Stage, payload: &Value) {
        self.0.on_request(run, stage, payload);
        self.1.on_request(run, stage, payload);
    }

    fn on_response(&self, run: RunId, stage: Stage, payload: &Value) {
        self.0.on_response(run, stage, payload);
        self.1.on_response(run, stage, payload);
    }

    fn on_failure(&self, run: RunId, stage: Stage, kind: ErrorKind, detail: &str) {
        self.0.on_failure(run, stage, kind, detail);
        self.1.on_failure(run, stage, kind, detail);
    }

    fn on_success(&self, run: RunId, payload: &Value) {
        self.0.on_success(run, payload);
        self.1.on_success(run, payload);
    }
}

/// Logs pipeline progress with `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_transition(&self, run: RunId, from: PipelineState, to: PipelineState) {
        debug!(%run, %from, %to, "pipeline transition");
    }

    fn on_request(&self, run: RunId, stage: Stage, payload: &Value) {
        debug!(%run, %stage, %payload, "request");
    }

    fn on_response(&self, run: RunId, stage: Stage, payload: &Value) {
        debug!(%run, %stage, %payload, "response");
    }

    fn on_failure(&self, run: RunId, stage: Stage, kind: ErrorKind, detail: &str) {
        warn!(%run, %stage, %kind, "pipeline failed: {detail}");
    }

    fn on_success(&self, run: RunId, payload: &Value) {
        let id = payload.get("transaction_id").and_then(Value::as_str);
        info!(%run, transaction_id = id, "transaction pushed");
    }
}

/// A recorded observer event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Transition {
        run: RunId,
        from: PipelineState,
        to: PipelineState,
    },
    Request {
        run: RunId,
        stage: Stage,
        payload: Value,
    },
    Response {
        run: RunId,
        stage: Stage,
        payload: Value,
    },
    Failure {
        run: RunId,
        stage: Stage,
        kind: ErrorKind,
        detail: String,
    },
    Success {
        run: RunId,
        payload: Value,
    },
}

impl PipelineEvent {
    pub fn run(&self) -> RunId {
        match self {
            PipelineEvent::Transition { run, .. }
            | PipelineEvent::Request { run, .. }
            | PipelineEvent::Response { run, .. }
            | PipelineEvent::Failure { run, .. }
            | PipelineEvent::Success { run, .. } => *run,
        }
    }
}

/// Collects events in memory. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events of a single run, in delivery order.
    pub fn events_for(&self, run: RunId) -> Vec<PipelineEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.run() == run)
            .collect()
    }

    /// States visited by a run, starting with `Idle`.
    pub fn states_for(&self, run: RunId) -> Vec<PipelineState> {
        let mut states = vec![PipelineState::Idle];
        states.extend(self.events_for(run).into_iter().filter_map(|e| match e {
            PipelineEvent::Transition { to, .. } => Some(to),
            _ => None,
        }));
        states
    }

    /// Stages of a run for which a request was issued.
    pub fn requested_stages(&self, run: RunId) -> Vec<Stage> {
        self.events_for(run)
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Request { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_transition(&self, run: RunId, from: PipelineState, to: PipelineState) {
        self.push(PipelineEvent::Transition { run, from, to });
    }

    fn on_request(&self, run: RunId, stage: Stage, payload: &Value) {
        self.push(PipelineEvent::Request {
            run,
            stage,
            payload: payload.clone(),
        });
    }

    fn on_response(&self, run: RunId, stage: Stage, payload: &Value) {
        self.push(PipelineEvent::Response {
            run,
            stage,
            payload: payload.clone(),
        });
    }

    fn on_failure(&self, run: RunId, stage: Stage, kind: ErrorKind, detail: &str) {
        self.push(PipelineEvent::Failure {
            run,
            stage,
            kind,
            detail: detail.to_owned(),
        });
    }

    fn on_success(&self, run: RunId, payload: &Value) {
        self.push(PipelineEvent::Success {
            run,
            payload: payload.clone(),
        });
    }
}
