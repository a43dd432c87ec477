//! Room-scoped HTTP surface and the room access checks shared with the
//! websocket gateway. Rooms themselves are read-only here; creation and
//! listing belong to a separate service.

mod history;
mod msg;

use axum::{Router, routing::get};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::AppState;

pub use msg::{MAX_CONTENT_LEN, SendError, send_message};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{room_id}/messages",
        get(history::list_messages).post(msg::post_message),
    )
}

pub(crate) struct RoomInfo {
    pub is_private: bool,
}

pub(crate) async fn fetch_room(
    db_pool: &SqlitePool,
    room_id: Uuid,
) -> Result<Option<RoomInfo>, sqlx::Error> {
    let row: Option<(bool,)> = sqlx::query_as("SELECT is_private FROM rooms WHERE id=?")
        .bind(room_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    Ok(row.map(|(is_private,)| RoomInfo { is_private }))
}

pub(crate) async fn is_member(
    db_pool: &SqlitePool,
    room_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_as::<_, ()>("SELECT 1 FROM room_members WHERE room_id=? AND user_id=?")
        .bind(room_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(db_pool)
        .await?;

    Ok(row.is_some())
}
