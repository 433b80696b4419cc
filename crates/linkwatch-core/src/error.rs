// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types.
//!
//! None of these escape the monitor: each one collapses to a channel status
//! and a human-readable cause in the published snapshot.

use std::time::Duration;

use thiserror::Error;

use crate::status::ProbeOutcome;

/// Reasons a channel is not (fully) healthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("{0}")]
    Network(String),

    /// Reachable, but answered with a non-success status.
    #[error("{0}")]
    Http(u16),

    #[error("no push channel handle available")]
    ChannelAbsent,

    #[error("push channel is not connected")]
    ChannelDisconnected,
}

impl ChannelError {
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        ChannelError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Probe outcome for the pull-side variants.
    ///
    /// Push-side variants have no probe outcome and return `None`.
    #[must_use]
    pub fn probe_outcome(&self) -> Option<ProbeOutcome> {
        match self {
            ChannelError::Timeout { .. } => Some(ProbeOutcome::Timeout),
            ChannelError::Network(_) => Some(ProbeOutcome::NetworkError),
            ChannelError::Http(_) => Some(ProbeOutcome::HttpError),
            ChannelError::ChannelAbsent | ChannelError::ChannelDisconnected => None,
        }
    }
}

/// Failure reported by a [`RequestClient`](crate::probe::RequestClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        ChannelError::Network(err.to_string())
    }
}
