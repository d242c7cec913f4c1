use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::game::state::{ConnectionId, Username};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake done, no session yet
    Connecting,
    /// Owns a session
    Joined,
    /// Torn down; nothing further is processed
    Closed,
}

/// Outcome of queueing a frame for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Queued,
    /// Client is behind; this frame is dropped for it alone
    Full,
    /// Writer is gone; the connection is being torn down
    Closed,
}

/// Open client connection, as seen by the broadcaster
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub remote_addr: SocketAddr,
    pub username: Option<Username>,
    pub created_at: Instant,
    pub bytes_sent: u64,
    pub messages_sent: u64,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    pub fn new(id: ConnectionId, remote_addr: SocketAddr, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            remote_addr,
            username: None,
            created_at: Instant::now(),
            bytes_sent: 0,
            messages_sent: 0,
            outbound,
        }
    }

    /// Queue a text frame without waiting
    pub fn try_send_text(&mut self, text: &str) -> SendStatus {
        match self.outbound.try_send(Message::Text(text.to_string())) {
            Ok(()) => {
                self.bytes_sent += text.len() as u64;
                self.messages_sent += 1;
                SendStatus::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => SendStatus::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => SendStatus::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// Table of open connections, shared by the accept loop and the broadcaster
pub type SharedConnections = Arc<Mutex<ConnectionManager>>;

/// Connection manager
pub struct ConnectionManager {
    connections: HashMap<ConnectionId, Connection>,
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_connections,
        }
    }

    pub fn into_shared(self) -> SharedConnections {
        Arc::new(Mutex::new(self))
    }

    /// Register a connection under a fresh random id, or `None` at capacity
    pub fn create(
        &mut self,
        remote_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> Option<ConnectionId> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = loop {
            let candidate = rand::random::<u64>();
            if !self.connections.contains_key(&candidate) {
                break candidate;
            }
        };

        self.connections
            .insert(id, Connection::new(id, remote_addr, outbound));
        Some(id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Record which username this connection joined as
    pub fn associate(&mut self, id: ConnectionId, username: &str) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.username = Some(username.to_string());
        }
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Queue `text` to every open connection.
    ///
    /// Connections whose writer has gone away are dropped from the table and
    /// returned so the caller can log them.
    pub fn broadcast_text(&mut self, text: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for conn in self.connections.values_mut() {
            match conn.try_send_text(text) {
                SendStatus::Queued => report.queued += 1,
                SendStatus::Full => report.skipped += 1,
                SendStatus::Closed => report.closed.push(conn.id),
            }
        }

        for id in &report.closed {
            self.connections.remove(id);
        }
        report
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(crate::game::constants::admission::MAX_CONNECTIONS)
    }
}

/// Per-tick delivery summary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub queued: usize,
    pub skipped: usize,
    pub closed: Vec<ConnectionId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080)
    }

    #[test]
    fn test_manager_create() {
        let mut manager = ConnectionManager::new(10);
        let (tx, _rx) = mpsc::channel(4);

        let id1 = manager.create(test_addr(), tx.clone()).unwrap();
        let id2 = manager.create(test_addr(), tx).unwrap();

        assert_ne!(id1, id2);
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn test_manager_capacity() {
        let mut manager = ConnectionManager::new(1);
        let (tx, _rx) = mpsc::channel(4);

        assert!(manager.create(test_addr(), tx.clone()).is_some());
        assert!(manager.create(test_addr(), tx).is_none());
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_manager_remove() {
        let mut manager = ConnectionManager::new(10);
        let (tx, _rx) = mpsc::channel(4);
        let id = manager.create(test_addr(), tx).unwrap();

        assert!(manager.remove(id).is_some());
        assert!(manager.remove(id).is_none());
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_associate_username() {
        let mut manager = ConnectionManager::new(10);
        let (tx, _rx) = mpsc::channel(4);
        let id = manager.create(test_addr(), tx).unwrap();

        manager.associate(id, "alice");
        assert_eq!(manager.get(id).unwrap().username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_broadcast_reaches_every_connection() {
        let mut manager = ConnectionManager::new(10);
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        manager.create(test_addr(), tx1).unwrap();
        manager.create(test_addr(), tx2).unwrap();

        let report = manager.broadcast_text("hello");
        assert_eq!(report.queued, 2);

        assert_eq!(rx1.try_recv().unwrap(), Message::Text("hello".into()));
        assert_eq!(rx2.try_recv().unwrap(), Message::Text("hello".into()));
    }

    #[test]
    fn test_full_queue_skips_only_that_client() {
        let mut manager = ConnectionManager::new(10);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(4);
        let slow = manager.create(test_addr(), slow_tx).unwrap();
        manager.create(test_addr(), fast_tx).unwrap();

        manager.broadcast_text("one");
        let report = manager.broadcast_text("two");

        assert_eq!(report.skipped, 1);
        assert_eq!(report.queued, 1);
        assert!(manager.get(slow).is_some());
        assert_eq!(fast_rx.try_recv().unwrap(), Message::Text("one".into()));
        assert_eq!(fast_rx.try_recv().unwrap(), Message::Text("two".into()));
    }

    #[test]
    fn test_closed_queue_removes_connection() {
        let mut manager = ConnectionManager::new(10);
        let (dead_tx, dead_rx) = mpsc::channel(4);
        let (live_tx, mut live_rx) = mpsc::channel(4);
        let dead = manager.create(test_addr(), dead_tx).unwrap();
        manager.create(test_addr(), live_tx).unwrap();
        drop(dead_rx);

        let report = manager.broadcast_text("tick");

        assert_eq!(report.closed, vec![dead]);
        assert!(manager.get(dead).is_none());
        assert_eq!(manager.count(), 1);
        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn test_connection_stats() {
        let (tx, _rx) = mpsc::channel(4);
        let mut conn = Connection::new(1, test_addr(), tx);

        conn.try_send_text("abc");
        conn.try_send_text("de");

        assert_eq!(conn.bytes_sent, 5);
        assert_eq!(conn.messages_sent, 2);
        assert!(conn.is_open());
    }
}
