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

//! Terminal output for health snapshots.

use chrono::Local;
use linkwatch_core::{HealthSnapshot, ProbeOutcome};

/// One human-readable line per snapshot
pub fn status_line(snapshot: &HealthSnapshot) -> String {
    let timestamp = snapshot.updated_at.with_timezone(&Local).format("%H:%M:%S");

    let push = match &snapshot.push_detail {
        Some(detail) => format!("{} ({} via {})", snapshot.push, detail.session_id, detail.transport_name),
        None => snapshot.push.to_string(),
    };

    let pull = match &snapshot.pull_detail {
        Some(detail) => match (detail.outcome, detail.response_time_ms, &detail.message) {
            (ProbeOutcome::Ok, Some(ms), _) => format!("{} ({} ms)", snapshot.pull, ms),
            (ProbeOutcome::HttpError, _, Some(code)) => format!("{} (HTTP {})", snapshot.pull, code),
            (_, _, Some(message)) => format!("{} ({})", snapshot.pull, message),
            _ => snapshot.pull.to_string(),
        },
        None => snapshot.pull.to_string(),
    };

    format!("[{}] {:<13} push: {}  pull: {}", timestamp, snapshot.overall, push, pull)
}

/// Snapshot as a single JSON line
pub fn json_line(snapshot: &HealthSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}
