//! Cursor-paginated message history.
//!
//! Pages walk the total order (created_at DESC, id DESC); the cursor is a
//! composite `"{epoch_ms}_{message_id}"` token marking the exclusive lower
//! bound of the next page, so pages stay gap-free even when many messages
//! share a millisecond. A plain timestamp cursor cannot guarantee that.

use std::collections::{HashMap, HashSet};

use axum::{
    Json, debug_handler,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::Message,
    error::{ApiError, AppResult},
};

const PAGE_LIMIT_DEFAULT: u32 = 20;
const PAGE_LIMIT_MAX: u32 = 50;

/// Exclusive lower bound in the (created_at, id) total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub created_at: i64,
    pub id: Uuid,
}

impl Cursor {
    pub(crate) fn encode(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let (ms, id) = raw.split_once('_')?;
        Some(Cursor {
            created_at: ms.parse().ok()?,
            id: Uuid::parse_str(id).ok()?,
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct ListQuery {
    cursor: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagePage {
    items: Vec<Message>,
    next_cursor: Option<String>,
    sender_names: HashMap<Uuid, String>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_messages(
    Path(room_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<MessagePage>> {
    if super::fetch_room(&db_pool, room_id).await?.is_none() {
        return Err(ApiError::NotFound("room_not_found"));
    }

    let cursor = match query.cursor.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            Cursor::parse(raw).ok_or_else(|| ApiError::Validation("invalid_cursor".to_owned()))?,
        ),
    };
    let limit = query.limit.unwrap_or(PAGE_LIMIT_DEFAULT).clamp(1, PAGE_LIMIT_MAX);

    let items = fetch_page(&db_pool, room_id, cursor, limit).await?;

    // A full page means more may exist; a short page is definitely the end.
    let next_cursor = if items.len() == limit as usize {
        items.last().map(|m| {
            Cursor {
                created_at: m.created_at,
                id: m.id,
            }
            .encode()
        })
    } else {
        None
    };

    let sender_names = fetch_sender_names(&db_pool, &items).await?;

    Ok(Json(MessagePage {
        items,
        next_cursor,
        sender_names,
    }))
}

pub(crate) async fn fetch_page(
    db_pool: &SqlitePool,
    room_id: Uuid,
    cursor: Option<Cursor>,
    limit: u32,
) -> AppResult<Vec<Message>> {
    let rows: Vec<(String, String, String, String, i64)> = match cursor {
        Some(cursor) => {
            sqlx::query_as(
                "SELECT id,room_id,sender_id,content,created_at FROM messages
                 WHERE room_id=? AND (created_at<? OR (created_at=? AND id<?))
                 ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(room_id.to_string())
            .bind(cursor.created_at)
            .bind(cursor.created_at)
            .bind(cursor.id.to_string())
            .bind(i64::from(limit))
            .fetch_all(db_pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id,room_id,sender_id,content,created_at FROM messages
                 WHERE room_id=?
                 ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(room_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(db_pool)
            .await?
        }
    };

    rows.into_iter()
        .map(|row| Message::from_columns(row).map_err(ApiError::from))
        .collect()
}

/// One lookup for every distinct sender in the page, so clients never need a
/// per-message round trip for display names.
async fn fetch_sender_names(
    db_pool: &SqlitePool,
    items: &[Message],
) -> AppResult<HashMap<Uuid, String>> {
    let sender_ids: HashSet<Uuid> = items.iter().map(|m| m.sender_id).collect();
    if sender_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders = vec!["?"; sender_ids.len()].join(",");
    let sql = format!("SELECT id,name FROM users WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, (String, String)>(&sql);
    for id in &sender_ids {
        query = query.bind(id.to_string());
    }

    let rows = query.fetch_all(db_pool).await?;
    let mut names = HashMap::with_capacity(rows.len());
    for (id, name) in rows {
        names.insert(Uuid::parse_str(&id)?, name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testutil::{insert_room, insert_user, memory_pool};

    async fn insert_message(
        pool: &SqlitePool,
        room_id: Uuid,
        sender_id: Uuid,
        content: &str,
        created_at: i64,
    ) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO messages (id,room_id,sender_id,content,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(sender_id.to_string())
        .bind(content)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("insert message");
        id
    }

    fn page_cursor(page: &[Message]) -> Cursor {
        let last = page.last().expect("non-empty page");
        Cursor {
            created_at: last.created_at,
            id: last.id,
        }
    }

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            created_at: 1700000000123,
            id: Uuid::now_v7(),
        };
        assert_eq!(Cursor::parse(&cursor.encode()), Some(cursor));
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        for bad in ["", "123", "abc_def", "12x_0195d2f0", "_"] {
            assert_eq!(Cursor::parse(bad), None);
        }
    }

    #[tokio::test]
    async fn twenty_messages_paginate_as_two_pages_of_ten() {
        let pool = memory_pool().await;
        let sender = insert_user(&pool, "Alice").await;
        let room = insert_room(&pool, "general", false).await;
        for n in 0..20 {
            insert_message(&pool, room, sender, &format!("m{n}"), 1000 + n).await;
        }

        let first = fetch_page(&pool, room, None, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].content, "m19");

        let second = fetch_page(&pool, room, Some(page_cursor(&first)), 10)
            .await
            .unwrap();
        assert_eq!(second.len(), 10);
        assert_eq!(second[9].content, "m0");

        let third = fetch_page(&pool, room, Some(page_cursor(&second)), 10)
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn colliding_timestamps_enumerate_without_gaps_or_duplicates() {
        let pool = memory_pool().await;
        let sender = insert_user(&pool, "Alice").await;
        let room = insert_room(&pool, "general", false).await;
        // 15 messages all sharing one timestamp: every page boundary is a
        // collision, which is exactly where a timestamp-only cursor loses rows.
        let mut inserted = Vec::new();
        for n in 0..15 {
            inserted.push(insert_message(&pool, room, sender, &format!("m{n}"), 5000).await);
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = fetch_page(&pool, room, cursor, 4).await.unwrap();
            if page.is_empty() {
                break;
            }
            cursor = Some(page_cursor(&page));
            seen.extend(page.iter().map(|m| m.id));
            for window in page.windows(2) {
                assert!(window[0].id > window[1].id);
            }
        }

        inserted.sort();
        inserted.reverse();
        assert_eq!(seen, inserted);
    }

    #[tokio::test]
    async fn pages_are_scoped_to_the_room() {
        let pool = memory_pool().await;
        let sender = insert_user(&pool, "Alice").await;
        let room = insert_room(&pool, "general", false).await;
        let other = insert_room(&pool, "other", false).await;
        insert_message(&pool, room, sender, "mine", 1).await;
        insert_message(&pool, other, sender, "theirs", 2).await;

        let page = fetch_page(&pool, room, None, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "mine");
    }

    #[tokio::test]
    async fn sender_names_cover_each_distinct_sender() {
        let pool = memory_pool().await;
        let alice = insert_user(&pool, "Alice").await;
        let bob = insert_user(&pool, "Bob").await;
        let room = insert_room(&pool, "general", false).await;
        insert_message(&pool, room, alice, "a1", 1).await;
        insert_message(&pool, room, bob, "b1", 2).await;
        insert_message(&pool, room, alice, "a2", 3).await;

        let items = fetch_page(&pool, room, None, 10).await.unwrap();
        let names = fetch_sender_names(&pool, &items).await.unwrap();

        assert_eq!(names.len(), 2);
        assert_eq!(names[&alice], "Alice");
        assert_eq!(names[&bob], "Bob");
    }
}
