//! The websocket gateway.
//!
//! One socket per client session. The session cookie on the upgrade request
//! is the credential: identity is resolved before the upgrade completes and
//! stays bound to the connection for its whole life. After the handshake the
//! socket splits into a writer task draining the connection's outbox and a
//! reader loop dispatching client events; teardown unwinds every joined room
//! exactly once.

use std::collections::HashSet;

use axum::{
    Router, debug_handler,
    extract::{State, WebSocketUpgrade, ws},
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{self, UserIdentity},
    error::{ApiError, AppResult},
    rooms,
};

use super::{
    ChatState,
    events::{ClientEvent, ServerEvent},
    router::ConnectionId,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(chat_ws))
}

#[debug_handler(state = crate::AppState)]
async fn chat_ws(
    State(db_pool): State<SqlitePool>,
    State(chat): State<ChatState>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(identity) = auth::resolve_identity(&session, &db_pool).await? else {
        return Err(ApiError::Unauthenticated);
    };

    Ok(ws.on_upgrade(async move |socket| {
        handle_socket(db_pool, chat, identity, socket).await;
    }))
}

async fn handle_socket(
    db_pool: SqlitePool,
    chat: ChatState,
    identity: UserIdentity,
    socket: ws::WebSocket,
) {
    let conn_id: ConnectionId = Uuid::now_v7();
    debug!(%conn_id, user = %identity.id, "connection established");

    let (tx, mut rx) = unbounded_channel::<ServerEvent>();
    let (mut sink, mut stream) = socket.split();

    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(ws::Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined: HashSet<Uuid> = HashSet::new();

    while let Some(Ok(frame)) = stream.next().await {
        let Ok(event) = serde_json::from_slice::<ClientEvent>(&frame.into_data()) else {
            continue;
        };

        match event {
            ClientEvent::JoinRoom { room_id } => {
                join_room(&db_pool, &chat, &identity, conn_id, &tx, &mut joined, &room_id).await;
            }
            ClientEvent::Typing { room_id } => {
                let Ok(room_id) = Uuid::parse_str(&room_id) else {
                    continue;
                };
                if joined.contains(&room_id) {
                    chat.router.publish_except(
                        room_id,
                        &ServerEvent::Typing {
                            room_id,
                            user: identity.name.clone(),
                            sender_id: identity.id,
                        },
                        conn_id,
                    );
                }
            }
            ClientEvent::SendMessage {
                room_id,
                content,
                client_temp_id,
            } => {
                let ack = match Uuid::parse_str(&room_id) {
                    Err(_) => ServerEvent::ack_err("invalid_room", client_temp_id),
                    Ok(room_id) => {
                        match rooms::send_message(
                            &db_pool,
                            &chat,
                            &identity,
                            room_id,
                            &content,
                            client_temp_id.clone(),
                        )
                        .await
                        {
                            Ok(message) => ServerEvent::ack_ok(message.id, client_temp_id),
                            Err(err) => {
                                if let rooms::SendError::Db(ref cause) = err {
                                    warn!(%conn_id, "message persistence failed: {cause}");
                                }
                                ServerEvent::ack_err(err.ack_code(), client_temp_id)
                            }
                        }
                    }
                };
                let _ = tx.send(ack);
            }
        }
    }

    release_rooms(&chat, &identity, conn_id, &mut joined);

    writer_task.abort();
    debug!(%conn_id, user = %identity.id, "connection closed");
}

/// Disconnect cleanup: every room the connection held is released exactly
/// once. Unsubscribe happens first so the dead connection never receives the
/// snapshot broadcast its own departure triggers.
fn release_rooms(
    chat: &ChatState,
    identity: &UserIdentity,
    conn_id: ConnectionId,
    joined: &mut HashSet<Uuid>,
) {
    for room_id in joined.drain() {
        chat.router.unsubscribe(room_id, conn_id);
        let members = chat.presence.leave(room_id, identity.id);
        chat.router
            .publish(room_id, &ServerEvent::RoomMembers { room_id, members });
    }
}

async fn join_room(
    db_pool: &SqlitePool,
    chat: &ChatState,
    identity: &UserIdentity,
    conn_id: ConnectionId,
    tx: &UnboundedSender<ServerEvent>,
    joined: &mut HashSet<Uuid>,
    room_id: &str,
) {
    let Ok(room_id) = Uuid::parse_str(room_id) else {
        let _ = tx.send(ServerEvent::error("Invalid room id"));
        return;
    };

    if joined.contains(&room_id) {
        return;
    }

    let room = match rooms::fetch_room(db_pool, room_id).await {
        Ok(room) => room,
        Err(err) => {
            warn!(%conn_id, "room lookup failed: {err}");
            let _ = tx.send(ServerEvent::error("Internal error"));
            return;
        }
    };
    let Some(room) = room else {
        let _ = tx.send(ServerEvent::error("Room not found"));
        return;
    };

    if room.is_private {
        match rooms::is_member(db_pool, room_id, identity.id).await {
            Ok(true) => {}
            Ok(false) => {
                let _ = tx.send(ServerEvent::error("Access denied"));
                return;
            }
            Err(err) => {
                warn!(%conn_id, "membership lookup failed: {err}");
                let _ = tx.send(ServerEvent::error("Internal error"));
                return;
            }
        }
    }

    // Subscribe before broadcasting so the joiner gets the snapshot too.
    chat.router.subscribe(room_id, conn_id, tx.clone());
    joined.insert(room_id);
    let members = chat.presence.join(room_id, identity.id, &identity.name);
    chat.router
        .publish(room_id, &ServerEvent::RoomMembers { room_id, members });
}
