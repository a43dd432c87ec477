//! Schema bootstrap and persisted row types.
//!
//! Ids are uuid-v7 strings: time-ordered, so the lexicographic id order is a
//! stable tiebreaker when two messages land on the same millisecond.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        is_private INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS room_members (
        room_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        PRIMARY KEY (room_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_room_page
        ON messages (room_id, created_at DESC, id DESC)",
];

pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    Ok(())
}

/// A persisted message. Immutable once created; `created_at` is the
/// server-assigned epoch-millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: i64,
}

impl Message {
    /// Rebuilds a message from the TEXT columns sqlite hands back.
    pub(crate) fn from_columns(
        (id, room_id, sender_id, content, created_at): (String, String, String, String, i64),
    ) -> Result<Self, uuid::Error> {
        Ok(Message {
            id: Uuid::parse_str(&id)?,
            room_id: Uuid::parse_str(&room_id)?,
            sender_id: Uuid::parse_str(&sender_id)?,
            content,
            created_at,
        })
    }
}

/// Current wall clock in epoch milliseconds, the unit the wire protocol and
/// the pagination cursor both use.
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// One-connection in-memory pool; a second connection would see a
    /// different empty database.
    pub(crate) async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        init_schema(&pool).await.expect("schema");
        pool
    }

    pub(crate) async fn insert_user(pool: &SqlitePool, name: &str) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO users (id,name) VALUES (?,?)")
            .bind(id.to_string())
            .bind(name)
            .execute(pool)
            .await
            .expect("insert user");
        id
    }

    pub(crate) async fn insert_room(pool: &SqlitePool, name: &str, is_private: bool) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO rooms (id,name,is_private) VALUES (?,?,?)")
            .bind(id.to_string())
            .bind(name)
            .bind(is_private)
            .execute(pool)
            .await
            .expect("insert room");
        id
    }

    pub(crate) async fn insert_member(pool: &SqlitePool, room_id: Uuid, user_id: Uuid) {
        sqlx::query("INSERT INTO room_members (room_id,user_id) VALUES (?,?)")
            .bind(room_id.to_string())
            .bind(user_id.to_string())
            .execute(pool)
            .await
            .expect("insert member");
    }
}
