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

//! Latest-value aggregation of both channels.
//!
//! Writers race: lifecycle handlers, poll ticks and probe tasks all land
//! here. Every write is checked against a counter at write time so that
//! stale data never replaces fresher data:
//!
//! - push events bump a sequence; a polled sample taken before the latest
//!   event is dropped
//! - each probe gets a generation; a result older than the last applied one
//!   is dropped
//! - after [`HealthAggregator::dispose`] every write is dropped

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::sync::watch;

use crate::push::PushSample;
use crate::status::{ChannelStatus, HealthSnapshot, PullDetail, PushDetail};

/// Handed out when a probe starts, presented again with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProbeTicket {
    generation: u64,
}

impl ProbeTicket {
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct WriteGuards {
    push_sequence: u64,
    issued_probes: u64,
    applied_probe: u64,
    disposed: bool,
}

/// Holds the most recent status and detail for each channel and publishes a
/// fresh [`HealthSnapshot`] on every change.
#[derive(Debug)]
pub struct HealthAggregator {
    guards: Mutex<WriteGuards>,
    snapshot_tx: watch::Sender<HealthSnapshot>,
}

impl Default for HealthAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthAggregator {
    #[must_use]
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(HealthSnapshot::new());
        Self {
            guards: Mutex::new(WriteGuards::default()),
            snapshot_tx,
        }
    }

    // Guards are plain counters, always consistent even after a panic.
    fn lock(&self) -> MutexGuard<'_, WriteGuards> {
        self.guards.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified whenever the snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Apply a push lifecycle event. Events always win over polled samples.
    pub fn apply_push_event(&self, status: ChannelStatus, detail: Option<PushDetail>) -> bool {
        let mut guards = self.lock();
        if guards.disposed {
            return false;
        }
        guards.push_sequence += 1;
        self.publish(|current| current.with_push(status, detail));
        true
    }

    /// Sequence number of the latest push event; read it before sampling.
    #[must_use]
    pub fn push_sequence(&self) -> u64 {
        self.lock().push_sequence
    }

    /// Apply a polled push sample unless an event arrived after
    /// `seen_sequence` was read.
    pub fn apply_push_sample(&self, sample: PushSample, seen_sequence: u64) -> bool {
        let guards = self.lock();
        if guards.disposed {
            return false;
        }
        if guards.push_sequence != seen_sequence {
            debug!("Dropping push sample superseded by a lifecycle event");
            return false;
        }
        self.publish(|current| current.with_push(sample.status, sample.detail));
        true
    }

    /// Register a probe about to start.
    pub fn begin_probe(&self) -> ProbeTicket {
        let mut guards = self.lock();
        guards.issued_probes += 1;
        ProbeTicket {
            generation: guards.issued_probes,
        }
    }

    /// Apply a probe result unless a newer probe already landed or the
    /// aggregator was disposed.
    pub fn apply_probe(&self, ticket: ProbeTicket, detail: PullDetail) -> bool {
        let mut guards = self.lock();
        if guards.disposed || ticket.generation <= guards.applied_probe {
            return false;
        }
        guards.applied_probe = ticket.generation;
        self.publish(|current| current.with_pull(detail));
        true
    }

    /// Freeze the snapshot; every later write becomes a no-op.
    pub fn dispose(&self) {
        self.lock().disposed = true;
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    // Callers hold the guard lock, so publications are totally ordered.
    fn publish(&self, next: impl FnOnce(&HealthSnapshot) -> HealthSnapshot) {
        self.snapshot_tx.send_if_modified(|current| {
            let updated = next(current);
            let changed = !same_state(current, &updated);
            *current = updated;
            changed
        });
    }
}

/// Equality ignoring the timestamp; receivers are only woken for real changes.
fn same_state(a: &HealthSnapshot, b: &HealthSnapshot) -> bool {
    a.push == b.push
        && a.pull == b.pull
        && a.push_detail == b.push_detail
        && a.pull_detail == b.pull_detail
        && a.overall == b.overall
}
