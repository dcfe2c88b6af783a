//! WebSocket session manager.
//!
//! Tracks connected client sessions. Terminating one session never affects the others.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    /// Client name supplied at connect time
    pub client: String,
    /// When the session was opened
    pub connected_at: DateTime<Utc>,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket sessions.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connections: DashMap<String, Connection>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID, which doubles as the engine session ID.
    pub fn register(&self, client: String, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        let connection = Connection {
            id: conn_id.clone(),
            client: client.clone(),
            connected_at: Utc::now(),
            sender,
        };

        self.connections.insert(conn_id.clone(), connection);

        tracing::info!(conn_id = %conn_id, client = %client, "WebSocket session registered");

        conn_id
    }

    /// Unregister a connection, dropping its sender.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            let open_for = Utc::now() - conn.connected_at;
            tracing::info!(
                conn_id = %conn.id,
                client = %conn.client,
                seconds = open_for.num_seconds(),
                "WebSocket session unregistered"
            );
        }
    }

    /// Send a message to a specific connection.
    ///
    /// Returns false if the connection is gone or its receiver closed.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        if let Some(conn) = self.connections.get(conn_id) {
            conn.sender.send(message).is_ok()
        } else {
            false
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn_id = manager.register("client-1".to_string(), tx);
        assert_eq!(manager.connection_count(), 1);

        manager.unregister(&conn_id);
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn test_send_to_targets_one_session() {
        let manager = ConnectionManager::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let conn1 = manager.register("client-1".to_string(), tx1);
        let _conn2 = manager.register("client-2".to_string(), tx2);

        assert!(manager.send_to(
            &conn1,
            ServerMessage::Killed {
                outcome: fwupdate_engine::Outcome::FatalClientError,
                reason: "version buffer is null".into()
            }
        ));

        assert!(matches!(rx1.try_recv().unwrap(), ServerMessage::Killed { .. }));
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_unregister_closes_channel() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let conn_id = manager.register("client-1".to_string(), tx);
        manager.send_to(&conn_id, ServerMessage::Pong);
        manager.unregister(&conn_id);

        // Queued messages still drain, then the channel reports closed.
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Pong));
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(!manager.send_to(&conn_id, ServerMessage::Pong));
    }
}
