// SPDX-License-Identifier: Apache-2.0

//! WebSocket relay frames: `{"event": "...", "data": {...}}`.

use chrono::{DateTime, Utc};
use hope_core::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    JoinRoom(JoinRoomData),
    SendMessage(SendMessageData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomData {
    pub room: String,
}

/// `senderId` / `senderType` sent by older clients are ignored; the sender is
/// always the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    pub room: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    Joined(JoinedData),
    ReceiveMessage(ReceivedMessageData),
    Error(FrameErrorData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedData {
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessageData {
    pub room: String,
    pub message: String,
    pub sender_id: String,
    pub sender_type: Role,
    pub timestamp: DateTime<Utc>,
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameErrorData {
    pub error: String,
}

impl ServerFrame {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(FrameErrorData {
            error: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frames_decode_from_event_envelopes() {
        let join: ClientFrame =
            serde_json::from_value(json!({"event": "join_room", "data": {"room": "room_123456"}}))
                .expect("join");
        assert_eq!(
            join,
            ClientFrame::JoinRoom(JoinRoomData {
                room: "room_123456".to_string()
            })
        );

        let send: ClientFrame = serde_json::from_value(json!({
            "event": "send_message",
            "data": {"room": "room_123456", "message": "hi", "senderId": "admin_1", "senderType": "admin"}
        }))
        .expect("send");
        assert_eq!(
            send,
            ClientFrame::SendMessage(SendMessageData {
                room: "room_123456".to_string(),
                message: "hi".to_string(),
            })
        );
    }

    #[test]
    fn error_frame_shape() {
        let value = serde_json::to_value(ServerFrame::error("nope")).expect("encode");
        assert_eq!(value, json!({"event": "error", "data": {"error": "nope"}}));
    }
}
