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

//! Health data model shared by the observer, the prober and the aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reachability of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelStatus {
    /// No result yet (initial state).
    #[default]
    Checking,
    Connected,
    Disconnected,
}

impl ChannelStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelStatus::Checking => "checking",
            ChannelStatus::Connected => "connected",
            ChannelStatus::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a connected push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDetail {
    /// Session identifier assigned by the remote end
    pub session_id: String,

    /// Underlying transport (e.g. "websocket", "polling", "tcp")
    pub transport_name: String,
}

/// Classification of a completed pull probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProbeOutcome {
    /// Response with a success status code
    Ok,
    /// Response with a non-success status code
    HttpError,
    /// No response within the probe timeout
    Timeout,
    /// Transport failure (DNS, refused, reset)
    NetworkError,
}

impl ProbeOutcome {
    /// Any response proves the service is reachable, whatever its status code.
    #[must_use]
    pub fn is_reachable(self) -> bool {
        matches!(self, ProbeOutcome::Ok | ProbeOutcome::HttpError)
    }

    /// Channel status implied by this outcome.
    #[must_use]
    pub fn channel_status(self) -> ChannelStatus {
        if self.is_reachable() {
            ChannelStatus::Connected
        } else {
            ChannelStatus::Disconnected
        }
    }
}

/// Result of the most recent pull probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullDetail {
    pub outcome: ProbeOutcome,

    /// Round-trip time, only set for [`ProbeOutcome::Ok`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    /// Status code for HTTP errors, cause for the failure outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PullDetail {
    #[must_use]
    pub fn ok(response_time_ms: u64) -> Self {
        Self {
            outcome: ProbeOutcome::Ok,
            response_time_ms: Some(response_time_ms),
            message: None,
        }
    }

    #[must_use]
    pub fn failure(outcome: ProbeOutcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            response_time_ms: None,
            message: Some(message.into()),
        }
    }
}

/// Combined classification of both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallHealth {
    AllConnected,
    Checking,
    Degraded,
}

impl OverallHealth {
    /// Combine the two channel statuses.
    ///
    /// A channel that is still `Checking` keeps the overall result at
    /// `Checking` unless the other one has already failed: a hard failure is
    /// never masked by a channel that is still initializing.
    #[must_use]
    pub fn combine(push: ChannelStatus, pull: ChannelStatus) -> Self {
        use ChannelStatus::{Checking, Connected, Disconnected};

        match (push, pull) {
            (Connected, Connected) => OverallHealth::AllConnected,
            (Checking, Disconnected) | (Disconnected, Checking) => OverallHealth::Degraded,
            (Checking, _) | (_, Checking) => OverallHealth::Checking,
            _ => OverallHealth::Degraded,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OverallHealth::AllConnected => "allConnected",
            OverallHealth::Checking => "checking",
            OverallHealth::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for OverallHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of both channels, published as a whole on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub push: ChannelStatus,
    pub pull: ChannelStatus,
    pub push_detail: Option<PushDetail>,
    pub pull_detail: Option<PullDetail>,
    pub overall: OverallHealth,
    pub updated_at: DateTime<Utc>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthSnapshot {
    /// Initial snapshot: both channels `Checking`, no details.
    #[must_use]
    pub fn new() -> Self {
        Self {
            push: ChannelStatus::Checking,
            pull: ChannelStatus::Checking,
            push_detail: None,
            pull_detail: None,
            overall: OverallHealth::Checking,
            updated_at: Utc::now(),
        }
    }

    /// Copy of this snapshot with a new push value and a recomputed `overall`.
    ///
    /// The detail is dropped unless the status is `Connected`.
    #[must_use]
    pub fn with_push(&self, status: ChannelStatus, detail: Option<PushDetail>) -> Self {
        let push_detail = if status == ChannelStatus::Connected {
            detail
        } else {
            None
        };
        // A connected push channel without identity is reported as disconnected.
        let push = if status == ChannelStatus::Connected && push_detail.is_none() {
            ChannelStatus::Disconnected
        } else {
            status
        };

        Self {
            push,
            pull: self.pull,
            push_detail,
            pull_detail: self.pull_detail.clone(),
            overall: OverallHealth::combine(push, self.pull),
            updated_at: Utc::now(),
        }
    }

    /// Copy of this snapshot with a new probe result and a recomputed `overall`.
    #[must_use]
    pub fn with_pull(&self, detail: PullDetail) -> Self {
        let pull = detail.outcome.channel_status();

        Self {
            push: self.push,
            pull,
            push_detail: self.push_detail.clone(),
            pull_detail: Some(detail),
            overall: OverallHealth::combine(self.push, pull),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChannelStatus::{Checking, Connected, Disconnected};

    #[test]
    fn test_overall_truth_table() {
        assert_eq!(OverallHealth::combine(Connected, Connected), OverallHealth::AllConnected);
        assert_eq!(OverallHealth::combine(Checking, Connected), OverallHealth::Checking);
        assert_eq!(OverallHealth::combine(Connected, Checking), OverallHealth::Checking);
        assert_eq!(OverallHealth::combine(Checking, Checking), OverallHealth::Checking);
        assert_eq!(OverallHealth::combine(Checking, Disconnected), OverallHealth::Degraded);
        assert_eq!(OverallHealth::combine(Disconnected, Checking), OverallHealth::Degraded);
        assert_eq!(OverallHealth::combine(Disconnected, Disconnected), OverallHealth::Degraded);
        assert_eq!(OverallHealth::combine(Connected, Disconnected), OverallHealth::Degraded);
        assert_eq!(OverallHealth::combine(Disconnected, Connected), OverallHealth::Degraded);
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = HealthSnapshot::new();
        assert_eq!(snapshot.push, Checking);
        assert_eq!(snapshot.pull, Checking);
        assert!(snapshot.push_detail.is_none());
        assert!(snapshot.pull_detail.is_none());
        assert_eq!(snapshot.overall, OverallHealth::Checking);
    }

    #[test]
    fn test_push_detail_dropped_unless_connected() {
        let detail = PushDetail {
            session_id: "abc123de".to_string(),
            transport_name: "websocket".to_string(),
        };

        let connected = HealthSnapshot::new().with_push(Connected, Some(detail.clone()));
        assert_eq!(connected.push_detail.as_ref(), Some(&detail));

        let disconnected = connected.with_push(Disconnected, Some(detail));
        assert_eq!(disconnected.push, Disconnected);
        assert!(disconnected.push_detail.is_none());

        let anonymous = HealthSnapshot::new().with_push(Connected, None);
        assert_eq!(anonymous.push, Disconnected);
    }

    #[test]
    fn test_http_error_counts_as_reachable() {
        let snapshot = HealthSnapshot::new().with_pull(PullDetail::failure(ProbeOutcome::HttpError, "404"));
        assert_eq!(snapshot.pull, Connected);
        assert_eq!(snapshot.push, Checking);
        assert_eq!(snapshot.overall, OverallHealth::Checking);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = HealthSnapshot::new()
            .with_pull(PullDetail::failure(ProbeOutcome::NetworkError, "connection refused"));
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["push"], "checking");
        assert_eq!(value["pull"], "disconnected");
        assert_eq!(value["overall"], "degraded");
        assert_eq!(value["pullDetail"]["outcome"], "networkError");
        assert_eq!(value["pullDetail"]["message"], "connection refused");
        assert!(value["pullDetail"].get("responseTimeMs").is_none());
        assert!(value["pushDetail"].is_null());
    }
}
