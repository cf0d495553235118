use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::events::InboundEvent;
use super::history::MessageLog;
use super::registry::{ConnectionHandle, ConnectionRegistry, Delivery};
use crate::error::WebSocketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// Lifecycle of one user's connection, independent of the transport driving it.
///
/// The transport calls [`Session::open`] once the handshake succeeded, feeds every
/// text frame to [`Session::handle_frame`] and calls [`Session::close`] when the
/// connection ends. The registry entry is removed exactly once.
#[derive(Debug)]
pub struct Session {
    username: String,
    connection_id: Option<Uuid>,
    state: SessionState,
    registry: Arc<ConnectionRegistry>,
    messages: Arc<MessageLog>,
}

impl Session {
    pub fn new(
        username: String,
        registry: Arc<ConnectionRegistry>,
        messages: Arc<MessageLog>,
    ) -> Self {
        Self {
            username,
            connection_id: None,
            state: SessionState::Connecting,
            registry,
            messages,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn open(&mut self, handle: ConnectionHandle) {
        if self.state != SessionState::Connecting {
            debug!("Ignoring repeated open for {} in state {:?}", self.username, self.state);
            return;
        }
        self.connection_id = Some(handle.id());
        self.registry.connect(&self.username, handle);
        self.state = SessionState::Active;
    }

    /// Decodes one frame and routes it to its receiver.
    ///
    /// A decode error is returned to the transport, which ends the session.
    pub fn handle_frame(&mut self, frame: &str) -> Result<Delivery, WebSocketError> {
        if self.state != SessionState::Active {
            return Err(WebSocketError::SessionClosed);
        }

        let event = InboundEvent::decode(frame)?;
        let text = event.outbound_text();
        let delivery = self.registry.send_to(event.receiver(), &text);

        let kind = match event {
            InboundEvent::Chat(_) => "message",
            InboundEvent::Typing(_) => "typing event",
        };
        debug!(
            "Routed {} from {} to {}: {:?}",
            kind,
            event.sender(),
            event.receiver(),
            delivery
        );

        if let InboundEvent::Chat(message) = event {
            self.messages.append(message);
        }
        Ok(delivery)
    }

    /// Returns `false` when the session had already been closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        if let Some(connection_id) = self.connection_id.take() {
            self.registry.release(&self.username, connection_id);
        }
        info!("Session for {} closed (was {:?})", self.username, previous);
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
