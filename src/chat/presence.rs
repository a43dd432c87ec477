//! Reference-counted room presence.
//!
//! Presence reflects live connections only, not the static membership roster:
//! a user shows up on first `join` from any of their connections and
//! disappears when the last one leaves. Every mutation returns a full
//! membership snapshot for the room so callers can broadcast complete state
//! instead of diffs.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use super::events::Member;

struct PresenceEntry {
    name: String,
    count: u32,
}

/// room id -> user id -> (display name, connection count).
///
/// A std mutex guards the table; no await ever happens under the lock, so
/// mutations serialize without blocking the runtime.
pub struct PresenceRegistry {
    rooms: Mutex<HashMap<Uuid, HashMap<Uuid, PresenceEntry>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        PresenceRegistry {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one more connection for (room, user), creating the entry on
    /// first join, and returns the room's updated membership snapshot.
    pub fn join(&self, room_id: Uuid, user_id: Uuid, name: &str) -> Vec<Member> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.entry(room_id).or_default();
        room.entry(user_id)
            .and_modify(|entry| entry.count += 1)
            .or_insert_with(|| PresenceEntry {
                name: name.to_owned(),
                count: 1,
            });
        snapshot(room)
    }

    /// Counts one connection out of (room, user). The user's entry goes away
    /// at zero, and the room's sub-map goes away once nobody is left. A leave
    /// for an untracked pair is a no-op.
    pub fn leave(&self, room_id: Uuid, user_id: Uuid) -> Vec<Member> {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(&room_id) else {
            return Vec::new();
        };

        if let Some(entry) = room.get_mut(&user_id) {
            entry.count -= 1;
            if entry.count == 0 {
                room.remove(&user_id);
            }
        }

        let members = snapshot(room);
        if room.is_empty() {
            rooms.remove(&room_id);
        }
        members
    }

    /// Current snapshot without mutating anything.
    pub fn members(&self, room_id: Uuid) -> Vec<Member> {
        let rooms = self.rooms.lock().unwrap();
        rooms.get(&room_id).map(snapshot).unwrap_or_default()
    }

    /// Connection count for one (room, user) pair; 0 when absent.
    pub fn connection_count(&self, room_id: Uuid, user_id: Uuid) -> u32 {
        let rooms = self.rooms.lock().unwrap();
        rooms
            .get(&room_id)
            .and_then(|room| room.get(&user_id))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Whether any user is tracked in the room at all.
    pub fn room_tracked(&self, room_id: Uuid) -> bool {
        self.rooms.lock().unwrap().contains_key(&room_id)
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(room: &HashMap<Uuid, PresenceEntry>) -> Vec<Member> {
    let mut members: Vec<Member> = room
        .iter()
        .map(|(id, entry)| Member {
            id: *id,
            name: entry.name.clone(),
        })
        .collect();
    members.sort_by_key(|m| m.id);
    members
}
