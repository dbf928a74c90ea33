//! Connection registry: user id → live connections.
//!
//! Each authenticated WebSocket connection registers an outbound sender
//! here under its user id, forming a per-user room. Delivery is
//! fire-and-forget: a closed receiver just means the connection is mid
//! teardown, and the disconnect cleanup will drop it from the map.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
pub struct ConnectionRegistry {
    // user id → (connection id → outbound frame sender)
    rooms: Mutex<HashMap<String, HashMap<u64, UnboundedSender<String>>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under `user_id`. Returns the connection id to
    /// pass back to `remove` on disconnect.
    pub fn add(&self, user_id: &str, tx: UnboundedSender<String>) -> u64 {
        let conn_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        rooms
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id, tx);
        conn_id
    }

    /// Deregister a connection. Empty rooms are dropped so the map does not
    /// accumulate users who have fully disconnected.
    pub fn remove(&self, user_id: &str, conn_id: u64) {
        let mut rooms = self.rooms.lock().expect("registry lock poisoned");
        if let Some(room) = rooms.get_mut(user_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(user_id);
            }
        }
    }

    /// Send an event to every live connection, regardless of task
    /// visibility — clients are trusted to ignore events for tasks they
    /// cannot see.
    pub fn broadcast_all(&self, event: &str, params: Value) {
        let frame = notification(event, params);
        let senders: Vec<UnboundedSender<String>> = {
            let rooms = self.rooms.lock().expect("registry lock poisoned");
            rooms
                .values()
                .flat_map(|room| room.values().cloned())
                .collect()
        };
        for tx in senders {
            // Ignore errors — a dropped receiver is a connection mid-teardown
            let _ = tx.send(frame.clone());
        }
    }

    /// Send an event to all connections of one user. No-op when the user has
    /// no live connections.
    pub fn notify_user(&self, user_id: &str, event: &str, params: Value) {
        let frame = notification(event, params);
        let senders: Vec<UnboundedSender<String>> = {
            let rooms = self.rooms.lock().expect("registry lock poisoned");
            match rooms.get(user_id) {
                Some(room) => room.values().cloned().collect(),
                None => return,
            }
        };
        for tx in senders {
            let _ = tx.send(frame.clone());
        }
    }

    pub fn connection_count(&self) -> usize {
        let rooms = self.rooms.lock().expect("registry lock poisoned");
        rooms.values().map(HashMap::len).sum()
    }
}

/// JSON-RPC 2.0 notification frame carrying an event.
fn notification(method: &str, params: Value) -> String {
    let frame = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    });
    frame.to_string()
}
