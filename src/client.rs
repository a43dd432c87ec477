//! Client-side reconciliation of optimistic sends.
//!
//! The UI renders a message the moment the user hits send, keyed by a
//! locally generated temp id, then reconciles when the server's
//! `message_created` echo or a failed ack arrives. This module is the pure
//! state machine behind that: no sockets, no clocks, fully unit-testable.
//! Receivers of `typing` events auto-clear their indicator after ~1.5s of
//! silence; the server never times anything out.

use uuid::Uuid;

use crate::db::Message;

/// An optimistically rendered message awaiting confirmation. `created_at`
/// is the sender's local clock until the server replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub temp_id: String,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: i64,
}

/// The outstanding optimistic sends of one session, at most one per temp id.
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: Vec<PendingMessage>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracks a new optimistic send. Reusing a temp id replaces the old
    /// entry, keeping the one-per-id invariant.
    pub fn insert(&mut self, message: PendingMessage) {
        self.entries.retain(|m| m.temp_id != message.temp_id);
        self.entries.push(message);
    }

    /// Resolves a pending entry against its `message_created` echo. Returns
    /// the placeholder on the first matching call and `None` on any repeat,
    /// so a placeholder can never be replaced twice.
    pub fn confirm(&mut self, temp_id: &str) -> Option<PendingMessage> {
        let index = self.entries.iter().position(|m| m.temp_id == temp_id)?;
        Some(self.entries.remove(index))
    }

    /// Drops a pending entry after a failed ack so nothing stays stuck in
    /// pending state. Returns whether an entry was actually removed.
    pub fn fail(&mut self, temp_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|m| m.temp_id != temp_id);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage> {
        self.entries.iter()
    }
}

/// One row of the rendered timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    Confirmed(Message),
    Pending(PendingMessage),
}

impl TimelineEntry {
    pub fn created_at(&self) -> i64 {
        match self {
            TimelineEntry::Confirmed(m) => m.created_at,
            TimelineEntry::Pending(m) => m.created_at,
        }
    }
}

/// Merges confirmed history with the pending set into one display-ordered
/// sequence, ascending by timestamp. The sort is stable, so on a timestamp
/// tie confirmed messages keep their place ahead of pending ones.
pub fn merge_timeline(confirmed: &[Message], pending: &PendingSet) -> Vec<TimelineEntry> {
    let mut timeline: Vec<TimelineEntry> = confirmed
        .iter()
        .cloned()
        .map(TimelineEntry::Confirmed)
        .chain(pending.iter().cloned().map(TimelineEntry::Pending))
        .collect();
    timeline.sort_by_key(TimelineEntry::created_at);
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(temp_id: &str, created_at: i64) -> PendingMessage {
        PendingMessage {
            temp_id: temp_id.to_owned(),
            room_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            content: format!("pending {temp_id}"),
            created_at,
        }
    }

    fn confirmed(content: &str, created_at: i64) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            content: content.to_owned(),
            created_at,
        }
    }

    #[test]
    fn confirm_matches_exactly_once() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 100));

        assert!(set.confirm("t1").is_some());
        assert!(set.confirm("t1").is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn confirm_of_unknown_temp_id_is_none() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 100));

        assert!(set.confirm("t2").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn failed_ack_removes_the_placeholder() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 100));

        assert!(set.fail("t1"));
        assert!(!set.fail("t1"));
        assert!(set.is_empty());
    }

    #[test]
    fn reinserting_a_temp_id_keeps_one_entry() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 100));
        set.insert(pending("t1", 200));

        assert_eq!(set.len(), 1);
        assert_eq!(set.confirm("t1").unwrap().created_at, 200);
    }

    #[test]
    fn timeline_interleaves_by_timestamp() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 150));
        let history = [confirmed("first", 100), confirmed("second", 200)];

        let timeline = merge_timeline(&history, &set);

        let order: Vec<i64> = timeline.iter().map(TimelineEntry::created_at).collect();
        assert_eq!(order, vec![100, 150, 200]);
        assert!(matches!(timeline[1], TimelineEntry::Pending(_)));
    }

    #[test]
    fn timestamp_ties_keep_confirmed_first() {
        let mut set = PendingSet::new();
        set.insert(pending("t1", 100));
        let history = [confirmed("settled", 100)];

        let timeline = merge_timeline(&history, &set);

        assert!(matches!(timeline[0], TimelineEntry::Confirmed(_)));
        assert!(matches!(timeline[1], TimelineEntry::Pending(_)));
    }
}
