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

//! In-memory collaborators for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::probe::{ProbeResponse, RequestClient};
use crate::push::{ChannelEvent, ChannelEventKind, DuplexChannel, EventHandler, HandlerId, HandlerRegistry};

/// Scripted behaviour of [`FakeClient`].
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Delayed(Duration, u16),
    Fail(String),
    Hang,
}

#[derive(Debug)]
pub struct FakeClient {
    reply: Mutex<Reply>,
    urls: Mutex<Vec<String>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeClient {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            urls: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn last_token(&self) -> Option<CancellationToken> {
        self.tokens.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RequestClient for FakeClient {
    async fn get(&self, url: &str, cancel: CancellationToken) -> Result<ProbeResponse, TransportError> {
        self.urls.lock().unwrap().push(url.to_string());
        self.tokens.lock().unwrap().push(cancel.clone());
        let reply = self.reply.lock().unwrap().clone();

        match reply {
            Reply::Status(status) => Ok(ProbeResponse::from_status(status)),
            Reply::Delayed(delay, status) => {
                tokio::time::sleep(delay).await;
                Ok(ProbeResponse::from_status(status))
            }
            Reply::Fail(message) => Err(TransportError::Network(message)),
            Reply::Hang => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Identity {
    connected: bool,
    session_id: Option<String>,
    transport_name: Option<String>,
}

/// Duplex channel driven by the test.
#[derive(Debug, Default)]
pub struct FakeChannel {
    identity: Mutex<Identity>,
    registry: HandlerRegistry,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Change state without emitting an event.
    pub fn set_connected(&self, session_id: &str, transport_name: &str) {
        *self.identity.lock().unwrap() = Identity {
            connected: true,
            session_id: Some(session_id.to_string()),
            transport_name: Some(transport_name.to_string()),
        };
    }

    pub fn connect(&self, session_id: &str, transport_name: &str) -> usize {
        self.set_connected(session_id, transport_name);
        self.registry.emit(&ChannelEvent::Connect)
    }

    pub fn disconnect(&self, reason: &str) -> usize {
        *self.identity.lock().unwrap() = Identity::default();
        self.registry.emit(&ChannelEvent::Disconnect {
            reason: reason.to_string(),
        })
    }

    pub fn connect_error(&self, message: &str) -> usize {
        *self.identity.lock().unwrap() = Identity::default();
        self.registry.emit(&ChannelEvent::ConnectError {
            message: message.to_string(),
        })
    }
}

impl DuplexChannel for FakeChannel {
    fn is_connected(&self) -> bool {
        self.identity.lock().unwrap().connected
    }

    fn session_id(&self) -> Option<String> {
        self.identity.lock().unwrap().session_id.clone()
    }

    fn transport_name(&self) -> Option<String> {
        self.identity.lock().unwrap().transport_name.clone()
    }

    fn subscribe(&self, kind: ChannelEventKind, handler: EventHandler) -> HandlerId {
        self.registry.subscribe(kind, handler)
    }

    fn unsubscribe(&self, id: HandlerId) -> bool {
        self.registry.unsubscribe(id)
    }
}

