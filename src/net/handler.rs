//! Per-connection message dispatch and lifecycle
//!
//! A `ConnectionHandler` owns the `Connecting -> Joined -> Closed` state of one
//! socket. It turns decoded client messages into world operations and produces
//! the reply (if any) for the originating client. Teardown runs once, either
//! through [`ConnectionHandler::close`] or on drop.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::game::movement::MoveOutcome;
use crate::game::state::{ConnectionId, Username};
use crate::game::world::SharedWorld;
use crate::metrics::Metrics;
use crate::net::connection::{ConnectionState, SharedConnections};
use crate::net::protocol::{decode, ClientMessage, ServerMessage};

pub struct ConnectionHandler {
    id: ConnectionId,
    address: IpAddr,
    state: ConnectionState,
    username: Option<Username>,
    world: SharedWorld,
    connections: SharedConnections,
    metrics: Arc<Metrics>,
}

impl ConnectionHandler {
    pub fn new(
        id: ConnectionId,
        address: IpAddr,
        world: SharedWorld,
        connections: SharedConnections,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            id,
            address,
            state: ConnectionState::Connecting,
            username: None,
            world,
            connections,
            metrics,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Handle one inbound text frame, returning the reply for this client.
    ///
    /// Malformed frames are dropped without a reply.
    pub fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        if self.state == ConnectionState::Closed {
            return None;
        }

        Metrics::incr(&self.metrics.messages_received);
        Metrics::add(&self.metrics.bytes_received, text.len() as u64);

        let message: ClientMessage = match decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping malformed frame on conn {}: {}", self.id, e);
                Metrics::incr(&self.metrics.messages_dropped);
                return None;
            }
        };

        self.handle_message(message)
    }

    pub fn handle_message(&mut self, message: ClientMessage) -> Option<ServerMessage> {
        match message {
            ClientMessage::Join { username, color } => self.handle_join(username, color),
            ClientMessage::Move { .. } => {
                self.handle_move(&message);
                None
            }
        }
    }

    fn handle_join(&mut self, username: String, color: String) -> Option<ServerMessage> {
        match self.state {
            ConnectionState::Connecting => {}
            ConnectionState::Joined => {
                debug!(
                    "Ignoring join as '{}' on conn {}: already joined as '{}'",
                    username,
                    self.id,
                    self.username.as_deref().unwrap_or_default()
                );
                return None;
            }
            ConnectionState::Closed => return None,
        }

        let result = self.world.lock().join(&username, &color, self.address, self.id);
        match result {
            Ok(_) => {
                self.connections.lock().associate(self.id, &username);
                self.username = Some(username);
                self.state = ConnectionState::Joined;
                Metrics::incr(&self.metrics.joins_accepted);
                None
            }
            Err(e) => {
                warn!("Join as '{}' from {} rejected: {}", username, self.address, e);
                Metrics::incr(&self.metrics.joins_rejected);
                Some(ServerMessage::error(e.to_string()))
            }
        }
    }

    fn handle_move(&mut self, message: &ClientMessage) {
        let Some(username) = self.username.as_deref() else {
            debug!("Ignoring move on conn {} before join", self.id);
            return;
        };
        let Some(intent) = message.move_intent() else {
            debug!("Ignoring move with unknown direction on conn {}", self.id);
            return;
        };

        let outcome = self.world.lock().apply_move(username, &intent);
        match outcome {
            MoveOutcome::Moved { .. } => Metrics::incr(&self.metrics.moves_applied),
            MoveOutcome::Blocked { .. } => Metrics::incr(&self.metrics.moves_blocked),
            MoveOutcome::UnknownSession | MoveOutcome::Ignored => {}
        }
    }

    /// Release this connection's session, sprite and admission slot.
    ///
    /// Returns false if the handler was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;

        if let Some(username) = self.username.take() {
            self.world.lock().leave(&username, self.id);
        }
        if self.connections.lock().remove(self.id).is_some() {
            Metrics::decr(&self.metrics.connections_active);
        }

        info!("Connection {} from {} closed", self.id, self.address);
        true
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.close();
    }
}
