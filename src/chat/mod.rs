//! The realtime room-coordination engine: wire events, reference-counted
//! presence, per-room fan-out, and the websocket gateway tying them together.

pub mod events;
pub mod presence;
pub mod router;
pub mod ws;

use std::sync::Arc;

use presence::PresenceRegistry;
use router::RoomRouter;

/// The two in-process registries every connection shares. Cheap to clone;
/// both halves are `Arc`s around their own lock.
#[derive(Clone)]
pub struct ChatState {
    pub presence: Arc<PresenceRegistry>,
    pub router: Arc<RoomRouter>,
}

impl ChatState {
    pub fn new() -> Self {
        ChatState {
            presence: Arc::new(PresenceRegistry::new()),
            router: Arc::new(RoomRouter::new()),
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}
