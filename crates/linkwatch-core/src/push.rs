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

//! Push (duplex) channel observation.
//!
//! The duplex channel itself is owned elsewhere; the observer only reads its
//! state and registers lifecycle handlers on it. Handler registration is
//! symmetric: [`PushChannelObserver::subscribe`] returns a [`Subscription`]
//! that removes exactly the handlers it added when released or dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::{debug, info, warn};

use crate::error::ChannelError;
use crate::health::HealthAggregator;
use crate::status::{ChannelStatus, PushDetail};

/// Lifecycle events a duplex channel reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEventKind {
    Connect,
    Disconnect,
    ConnectError,
}

/// A lifecycle event with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connect,
    Disconnect { reason: String },
    ConnectError { message: String },
}

impl ChannelEvent {
    #[must_use]
    pub fn kind(&self) -> ChannelEventKind {
        match self {
            ChannelEvent::Connect => ChannelEventKind::Connect,
            ChannelEvent::Disconnect { .. } => ChannelEventKind::Disconnect,
            ChannelEvent::ConnectError { .. } => ChannelEventKind::ConnectError,
        }
    }
}

/// Callback invoked for a subscribed event.
pub type EventHandler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Identifies one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// The duplex channel client, as the monitor sees it.
pub trait DuplexChannel: Send + Sync {
    /// Whether the channel currently reports itself connected.
    fn is_connected(&self) -> bool;

    /// Session identifier, `None` while disconnected.
    fn session_id(&self) -> Option<String>;

    /// Name of the active transport, `None` while disconnected.
    fn transport_name(&self) -> Option<String>;

    fn subscribe(&self, kind: ChannelEventKind, handler: EventHandler) -> HandlerId;

    /// Remove one handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: HandlerId) -> bool;
}

/// Listener table for [`DuplexChannel`] implementations.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(HandlerId, ChannelEventKind, EventHandler)>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: ChannelEventKind, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, handler));
        id
    }

    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(handler_id, _, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Call every handler subscribed to the event's kind.
    ///
    /// Handlers run outside the table lock so they may (un)subscribe.
    /// Returns the number of handlers called.
    pub fn emit(&self, event: &ChannelEvent) -> usize {
        let kind = event.kind();
        let matching: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a synchronous push channel read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSample {
    pub status: ChannelStatus,
    pub detail: Option<PushDetail>,
    /// Why the channel is not connected
    pub cause: Option<ChannelError>,
}

impl PushSample {
    fn connected(detail: PushDetail) -> Self {
        Self {
            status: ChannelStatus::Connected,
            detail: Some(detail),
            cause: None,
        }
    }

    fn disconnected(cause: ChannelError) -> Self {
        Self {
            status: ChannelStatus::Disconnected,
            detail: None,
            cause: Some(cause),
        }
    }
}

fn identity(channel: &dyn DuplexChannel) -> Option<PushDetail> {
    let session_id = channel.session_id()?;
    let transport_name = channel
        .transport_name()
        .unwrap_or_else(|| "unknown".to_string());
    Some(PushDetail {
        session_id,
        transport_name,
    })
}

/// Tracks the status of an externally owned duplex channel.
#[derive(Clone, Default)]
pub struct PushChannelObserver {
    channel: Option<Arc<dyn DuplexChannel>>,
}

impl std::fmt::Debug for PushChannelObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannelObserver")
            .field("has_channel", &self.channel.is_some())
            .finish()
    }
}

impl PushChannelObserver {
    /// `channel` may be `None` when no connection has been established yet.
    #[must_use]
    pub fn new(channel: Option<Arc<dyn DuplexChannel>>) -> Self {
        Self { channel }
    }

    #[must_use]
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Read the channel's current state.
    #[must_use]
    pub fn sample(&self) -> PushSample {
        let Some(channel) = self.channel.as_deref() else {
            return PushSample::disconnected(ChannelError::ChannelAbsent);
        };

        if !channel.is_connected() {
            return PushSample::disconnected(ChannelError::ChannelDisconnected);
        }

        match identity(channel) {
            Some(detail) => PushSample::connected(detail),
            None => PushSample::disconnected(ChannelError::ChannelDisconnected),
        }
    }

    /// Register connect, disconnect and connect-error handlers that write
    /// straight into `aggregator`.
    ///
    /// Returns `None` when there is no channel to subscribe to.
    pub fn subscribe(&self, aggregator: &Arc<HealthAggregator>) -> Option<Subscription> {
        let channel = self.channel.as_ref()?;
        let weak_channel: Weak<dyn DuplexChannel> = Arc::downgrade(channel);

        let on_connect: EventHandler = {
            let aggregator = Arc::clone(aggregator);
            Arc::new(move |_event: &ChannelEvent| {
                let detail = weak_channel
                    .upgrade()
                    .and_then(|channel| identity(channel.as_ref()));
                if let Some(detail) = &detail {
                    info!(
                        "Push channel connected (session {}, transport {})",
                        detail.session_id, detail.transport_name
                    );
                }
                aggregator.apply_push_event(ChannelStatus::Connected, detail);
            })
        };

        let on_disconnect: EventHandler = {
            let aggregator = Arc::clone(aggregator);
            Arc::new(move |event: &ChannelEvent| {
                if let ChannelEvent::Disconnect { reason } = event {
                    warn!("Push channel disconnected: {}", reason);
                }
                aggregator.apply_push_event(ChannelStatus::Disconnected, None);
            })
        };

        let on_connect_error: EventHandler = {
            let aggregator = Arc::clone(aggregator);
            Arc::new(move |event: &ChannelEvent| {
                if let ChannelEvent::ConnectError { message } = event {
                    warn!("Push channel connect error: {}", message);
                }
                aggregator.apply_push_event(ChannelStatus::Disconnected, None);
            })
        };

        let ids = vec![
            channel.subscribe(ChannelEventKind::Connect, on_connect),
            channel.subscribe(ChannelEventKind::Disconnect, on_disconnect),
            channel.subscribe(ChannelEventKind::ConnectError, on_connect_error),
        ];
        debug!("Subscribed {} push channel handlers", ids.len());

        Some(Subscription {
            channel: Arc::clone(channel),
            ids,
        })
    }
}

/// Owned registration of the observer's handlers on a channel.
///
/// Releasing (or dropping) it unsubscribes exactly the handlers it holds,
/// once.
#[must_use = "dropping a Subscription immediately removes its handlers"]
pub struct Subscription {
    channel: Arc<dyn DuplexChannel>,
    ids: Vec<HandlerId>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    #[must_use]
    pub fn handler_ids(&self) -> &[HandlerId] {
        &self.ids
    }

    pub fn release(mut self) {
        self.unsubscribe_all();
    }

    fn unsubscribe_all(&mut self) {
        for id in self.ids.drain(..) {
            if !self.channel.unsubscribe(id) {
                debug!("Push channel handler {:?} was already removed", id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
