//! Per-room event fan-out.
//!
//! Each connection registers an unbounded outbox sender per room it joins;
//! publishing clones the event into every live outbox. The router knows
//! nothing about access rules; callers validate before subscribing.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::events::ServerEvent;

/// Identifies one websocket connection for the lifetime of its socket.
pub type ConnectionId = Uuid;

pub struct RoomRouter {
    rooms: Mutex<HashMap<Uuid, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        RoomRouter {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a connection to a room's subscriber set. Subscribing twice is a
    /// no-op; the original outbox stays in place.
    pub fn subscribe(&self, room_id: Uuid, conn_id: ConnectionId, tx: UnboundedSender<ServerEvent>) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room_id)
            .or_default()
            .entry(conn_id)
            .or_insert(tx);
    }

    /// Removes a connection from a room, dropping the room's map once empty.
    pub fn unsubscribe(&self, room_id: Uuid, conn_id: ConnectionId) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(&room_id) {
            room.remove(&conn_id);
            if room.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Delivers an event to every connection in the room. Sends to outboxes
    /// whose reader already hung up are ignored; the disconnect path owns
    /// the cleanup.
    pub fn publish(&self, room_id: Uuid, event: &ServerEvent) {
        let rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get(&room_id) {
            for tx in room.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Like [`publish`](Self::publish) but skips one connection, used for
    /// typing relay so the typist never hears their own indicator.
    pub fn publish_except(&self, room_id: Uuid, event: &ServerEvent, except: ConnectionId) {
        let rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get(&room_id) {
            for (conn_id, tx) in room {
                if *conn_id != except {
                    let _ = tx.send(event.clone());
                }
            }
        }
    }

    /// Number of connections currently subscribed to the room.
    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        let rooms = self.rooms.lock().unwrap();
        rooms.get(&room_id).map(|room| room.len()).unwrap_or(0)
    }
}

impl Default for RoomRouter {
    fn default() -> Self {
        Self::new()
    }
}
