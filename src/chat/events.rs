//! Wire protocol for the websocket gateway.
//!
//! Events are internally tagged JSON: a snake_case `type` discriminator with
//! camelCase payload fields, e.g.
//! `{"type":"send_message","roomId":"...","content":"hi","clientTempId":"t1"}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user in a room's live membership snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
}

/// Events a client may send. Room ids arrive as raw strings so a malformed
/// id can be answered with a protocol error instead of a dropped frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
    },
    Typing {
        room_id: String,
    },
    SendMessage {
        room_id: String,
        content: String,
        #[serde(default)]
        client_temp_id: Option<String>,
    },
}

/// Events the server pushes. `Ack` answers exactly one `send_message` on the
/// issuing connection, correlated by `clientTempId`; everything else is
/// room-scoped fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    MessageCreated {
        id: Uuid,
        room_id: Uuid,
        sender_id: Uuid,
        content: String,
        created_at: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_temp_id: Option<String>,
    },
    Typing {
        room_id: Uuid,
        user: String,
        sender_id: Uuid,
    },
    RoomMembers {
        room_id: Uuid,
        members: Vec<Member>,
    },
    Error {
        message: String,
    },
    Ack {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Uuid>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_temp_id: Option<String>,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn ack_ok(id: Uuid, client_temp_id: Option<String>) -> Self {
        ServerEvent::Ack {
            ok: true,
            id: Some(id),
            error: None,
            client_temp_id,
        }
    }

    pub fn ack_err(code: &str, client_temp_id: Option<String>) -> Self {
        ServerEvent::Ack {
            ok: false,
            id: None,
            error: Some(code.to_owned()),
            client_temp_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_parse_camel_case_payloads() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "send_message",
            "roomId": "0195d2f0-aaaa-7aaa-8aaa-aaaaaaaaaaaa",
            "content": "hello",
            "clientTempId": "tmp_1",
        }))
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::SendMessage {
                room_id: "0195d2f0-aaaa-7aaa-8aaa-aaaaaaaaaaaa".to_owned(),
                content: "hello".to_owned(),
                client_temp_id: Some("tmp_1".to_owned()),
            }
        );
    }

    #[test]
    fn temp_id_is_optional_on_send() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "send_message",
            "roomId": "x",
            "content": "hello",
        }))
        .unwrap();

        let ClientEvent::SendMessage { client_temp_id, .. } = event else {
            panic!("wrong variant");
        };
        assert_eq!(client_temp_id, None);
    }

    #[test]
    fn message_created_wire_shape() {
        let id = Uuid::now_v7();
        let room_id = Uuid::now_v7();
        let sender_id = Uuid::now_v7();
        let event = ServerEvent::MessageCreated {
            id,
            room_id,
            sender_id,
            content: "hi".to_owned(),
            created_at: 1700000000000,
            client_temp_id: Some("t1".to_owned()),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "message_created",
                "id": id,
                "roomId": room_id,
                "senderId": sender_id,
                "content": "hi",
                "createdAt": 1700000000000i64,
                "clientTempId": "t1",
            })
        );
    }

    #[test]
    fn ack_omits_absent_fields() {
        let value = serde_json::to_value(ServerEvent::ack_err("room_not_found", None)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "ack", "ok": false, "error": "room_not_found" })
        );
    }

    #[test]
    fn room_members_wire_shape() {
        let room_id = Uuid::now_v7();
        let user = Uuid::now_v7();
        let event = ServerEvent::RoomMembers {
            room_id,
            members: vec![Member {
                id: user,
                name: "Ada".to_owned(),
            }],
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "room_members",
                "roomId": room_id,
                "members": [{ "id": user, "name": "Ada" }],
            })
        );
    }
}
