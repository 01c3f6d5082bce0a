// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt::{self, Display};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use pushtx_provider::message::Endpoint;

/// The four remote-call stages of a push, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    AbiJsonToBin,
    GetInfo,
    GetRequiredKeys,
    PushTransaction,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::AbiJsonToBin,
        Stage::GetInfo,
        Stage::GetRequiredKeys,
        Stage::PushTransaction,
    ];

    pub fn index(&self) -> usize {
        match self {
            Stage::AbiJsonToBin => 0,
            Stage::GetInfo => 1,
            Stage::GetRequiredKeys => 2,
            Stage::PushTransaction => 3,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Stage::AbiJsonToBin => Endpoint::AbiJsonToBin,
            Stage::GetInfo => Endpoint::GetInfo,
            Stage::GetRequiredKeys => Endpoint::GetRequiredKeys,
            Stage::PushTransaction => Endpoint::PushTransaction,
        }
    }

    pub fn name(&self) -> &'static str {
        self.endpoint().name()
    }
}

impl From<Endpoint> for Stage {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::AbiJsonToBin => Stage::AbiJsonToBin,
            Endpoint::GetInfo => Stage::GetInfo,
            Endpoint::GetRequiredKeys => Stage::GetRequiredKeys,
            Endpoint::PushTransaction => Stage::PushTransaction,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index(), self.name())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Stage", 2)?;
        s.serialize_field("index", &self.index())?;
        s.serialize_field("name", self.name())?;
        s.end()
    }
}

/// States of a single pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Encoding,
    AwaitingChainInfo,
    Building,
    ResolvingKeys,
    Signing,
    Packing,
    Broadcasting,
    Succeeded,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal pipeline transition {from} -> {to}")]
pub struct TransitionError {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl PipelineState {
    /// The state reached when the current one completes successfully.
    pub fn next(&self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            Idle => Some(Encoding),
            Encoding => Some(AwaitingChainInfo),
            AwaitingChainInfo => Some(Building),
            Building => Some(ResolvingKeys),
            ResolvingKeys => Some(Signing),
            Signing => Some(Packing),
            Packing => Some(Broadcasting),
            Broadcasting => Some(Succeeded),
            Succeeded | Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }

    /// Remote-call stage this state belongs to.
    ///
    /// Local steps are attributed to the call whose request they prepare:
    /// building feeds `get_required_keys`, signing and packing feed
    /// `push_transaction`.
    pub fn stage(&self) -> Option<Stage> {
        use PipelineState::*;
        match self {
            Encoding => Some(Stage::AbiJsonToBin),
            AwaitingChainInfo => Some(Stage::GetInfo),
            Building | ResolvingKeys => Some(Stage::GetRequiredKeys),
            Signing | Packing | Broadcasting => Some(Stage::PushTransaction),
            Idle | Succeeded | Failed => None,
        }
    }

    /// Runs fail from any in-flight state. An idle run never fails: input
    /// errors are reported without leaving `Idle`.
    pub fn can_transition_to(&self, to: PipelineState) -> bool {
        match to {
            PipelineState::Failed => !self.is_terminal() && *self != PipelineState::Idle,
            to => self.next() == Some(to),
        }
    }

    pub fn advance(&mut self, to: PipelineState) -> Result<(), TransitionError> {
        if !self.can_transition_to(to) {
            return Err(TransitionError { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Encoding => "encoding",
            PipelineState::AwaitingChainInfo => "awaiting_chain_info",
            PipelineState::Building => "building",
            PipelineState::ResolvingKeys => "resolving_keys",
            PipelineState::Signing => "signing",
            PipelineState::Packing => "packing",
            PipelineState::Broadcasting => "broadcasting",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}
