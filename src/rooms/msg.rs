//! Message ingest: validate, persist, broadcast.
//!
//! One entry point serves both transports. The websocket `send_message`
//! event acks through the connection's outbox; the HTTP fallback returns the
//! created message with 201. Validation order is fixed (room existence,
//! then membership, then content) so identical bad input always fails the
//! same way.

use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    auth::{self, UserIdentity},
    chat::{ChatState, events::ServerEvent},
    db::{self, Message},
    error::{ApiError, AppResult},
};

pub const MAX_CONTENT_LEN: usize = 2000;

#[derive(Debug)]
pub enum SendError {
    RoomNotFound,
    AccessDenied,
    InvalidContent,
    Db(sqlx::Error),
}

impl SendError {
    /// Wire code for the websocket ack.
    pub fn ack_code(&self) -> &'static str {
        match self {
            SendError::RoomNotFound => "room_not_found",
            SendError::AccessDenied => "access_denied",
            SendError::InvalidContent => "invalid_content",
            SendError::Db(_) => "internal_error",
        }
    }
}

impl From<SendError> for ApiError {
    fn from(err: SendError) -> Self {
        match err {
            SendError::RoomNotFound => ApiError::NotFound("room_not_found"),
            SendError::AccessDenied => ApiError::AccessDenied,
            SendError::InvalidContent => ApiError::Validation("invalid_content".to_owned()),
            SendError::Db(cause) => ApiError::Internal(cause.into()),
        }
    }
}

/// Validates, persists and broadcasts one message. On success the
/// `message_created` event, carrying `client_temp_id` verbatim, has
/// already been published to the whole room, sender's connections included;
/// acking the sender is the caller's job.
pub async fn send_message(
    db_pool: &SqlitePool,
    chat: &ChatState,
    sender: &UserIdentity,
    room_id: Uuid,
    content: &str,
    client_temp_id: Option<String>,
) -> Result<Message, SendError> {
    let room = super::fetch_room(db_pool, room_id)
        .await
        .map_err(SendError::Db)?
        .ok_or(SendError::RoomNotFound)?;

    if room.is_private
        && !super::is_member(db_pool, room_id, sender.id)
            .await
            .map_err(SendError::Db)?
    {
        return Err(SendError::AccessDenied);
    }

    let content = content.trim();
    let length = content.chars().count();
    if length < 1 || length > MAX_CONTENT_LEN {
        return Err(SendError::InvalidContent);
    }

    let message = Message {
        id: Uuid::now_v7(),
        room_id,
        sender_id: sender.id,
        content: content.to_owned(),
        created_at: db::now_ms(),
    };

    sqlx::query("INSERT INTO messages (id,room_id,sender_id,content,created_at) VALUES (?,?,?,?,?)")
        .bind(message.id.to_string())
        .bind(message.room_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(db_pool)
        .await
        .map_err(SendError::Db)?;

    chat.router.publish(
        room_id,
        &ServerEvent::MessageCreated {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            created_at: message.created_at,
            client_temp_id,
        },
    );

    Ok(message)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostMessageRequest {
    content: String,
    #[serde(default)]
    client_temp_id: Option<String>,
}

/// Non-realtime send fallback: same validation and broadcast path, ack
/// replaced by the HTTP response.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    Path(room_id): Path<Uuid>,
    State(db_pool): State<SqlitePool>,
    State(chat): State<ChatState>,
    session: Session,
    Json(request): Json<PostMessageRequest>,
) -> AppResult<Response> {
    let Some(identity) = auth::resolve_identity(&session, &db_pool).await? else {
        return Err(ApiError::Unauthenticated);
    };

    let message = send_message(
        &db_pool,
        &chat,
        &identity,
        room_id,
        &request.content,
        request.client_temp_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(message)).into_response())
}
