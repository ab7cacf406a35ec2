//! 클라이언트-서버 메시지 프로토콜 정의

use crate::canvas::GridRows;
use serde::{Deserialize, Serialize};

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    // Connection
    Heartbeat,

    // Room Management
    JoinRoom { room_id: String, username: String },

    // Canvas
    PixelUpdate { x: i64, y: i64, color: String },
    SaveCanvas,
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Connection
    Connected { socket_id: String },
    HeartbeatAck,
    Error { code: String, message: String },

    // Room Events
    CanvasState { grid: GridRows },
    UsersUpdate { users: Vec<UserInfo> },

    // Canvas Events
    PixelChanged { x: i64, y: i64, color: String },
    SaveSuccess { message: String },
    SaveError { message: String },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// 방 참여자 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_client_events() {
        let join: ClientMessage = serde_json::from_value(json!({
            "type": "join-room",
            "payload": { "roomId": "r1", "username": "alice" }
        }))
        .unwrap();
        assert_eq!(
            join,
            ClientMessage::JoinRoom {
                room_id: "r1".into(),
                username: "alice".into()
            }
        );

        let edit: ClientMessage = serde_json::from_value(json!({
            "type": "pixel-update",
            "payload": { "x": 3, "y": 4, "color": "#FF0000" }
        }))
        .unwrap();
        assert_eq!(
            edit,
            ClientMessage::PixelUpdate {
                x: 3,
                y: 4,
                color: "#FF0000".into()
            }
        );

        let save: ClientMessage = serde_json::from_str(r#"{"type":"save-canvas"}"#).unwrap();
        assert_eq!(save, ClientMessage::SaveCanvas);
    }

    #[test]
    fn server_events_use_wire_names() {
        let value = serde_json::to_value(ServerMessage::PixelChanged {
            x: 3,
            y: 4,
            color: "#FF0000".into(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "type": "pixel-changed", "payload": { "x": 3, "y": 4, "color": "#FF0000" } })
        );

        let value = serde_json::to_value(ServerMessage::Connected {
            socket_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(value, json!({ "type": "connected", "payload": { "socketId": "abc" } }));

        let value = serde_json::to_value(ServerMessage::UsersUpdate {
            users: vec![UserInfo {
                id: "c1".into(),
                username: "alice".into(),
            }],
        })
        .unwrap();
        assert_eq!(value["type"], "users-update");
        assert_eq!(value["payload"]["users"][0]["username"], "alice");
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"draw-circle"}"#).is_err());
    }
}
