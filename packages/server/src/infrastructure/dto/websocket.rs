//! WebSocket message DTOs.
//!
//! Every frame is a JSON text frame with a `type` tag and camelCase fields.
//! Outbound frames additionally carry `timestamp` (Unix milliseconds).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ErrorCode, PresenceState, Role};

// ========================================
// Client → Server
// ========================================

/// Commands sent by a connected client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommandDto {
    JoinRoom {
        room_id: String,
        #[serde(default)]
        access_token: Option<String>,
    },
    LeaveRoom {
        room_id: String,
    },
    SendRoomMessage {
        room_id: String,
        body: String,
        #[serde(default)]
        message_type: Option<String>,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    SendPrivateMessage {
        target_principal_id: String,
        body: String,
        #[serde(default)]
        message_type: Option<String>,
    },
    TypingStart {
        room_id: String,
    },
    TypingStop {
        room_id: String,
    },
    GetOnlineUsers,
    GetUserStatus {
        principal_id: String,
    },
}

// ========================================
// Server → Client
// ========================================

/// An outbound event frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEventDto {
    #[serde(flatten)]
    pub payload: EventPayloadDto,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventPayloadDto {
    Connected {
        connection_id: String,
        principal: PrincipalDto,
        restored_rooms: Vec<String>,
    },
    JoinedRoom {
        room_id: String,
        members: Vec<String>,
    },
    JoinRoomError {
        room_id: String,
        code: ErrorCode,
        message: String,
    },
    LeftRoom {
        room_id: String,
    },
    NewMessage {
        message: MessageDto,
    },
    PrivateMessage {
        message: MessageDto,
    },
    MessageHistory {
        room_id: String,
        messages: Vec<MessageDto>,
    },
    UserJoinedRoom {
        room_id: String,
        principal_id: String,
    },
    UserLeftRoom {
        room_id: String,
        principal_id: String,
    },
    UserTyping {
        room_id: String,
        principal_id: String,
        is_typing: bool,
    },
    UserOffline {
        principal_id: String,
        last_seen_at: i64,
    },
    UserStatusChanged {
        principal_id: String,
        status: PresenceState,
    },
    Notification {
        notification: NotificationDto,
    },
    OnlineUsers {
        users: Vec<OnlineUserDto>,
    },
    UserStatus {
        principal_id: String,
        status: PresenceState,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen_at: Option<i64>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalDto {
    pub principal_id: String,
    pub role: Role,
    pub locale: String,
    pub connected_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_principal_id: Option<String>,
    pub sender_id: String,
    pub body: String,
    pub message_type: String,
    pub created_at: i64,
    pub edited: bool,
    pub reactions: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub kind: String,
    pub text: String,
    pub message: MessageDto,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUserDto {
    pub principal_id: String,
    pub role: Role,
    pub connected_at: i64,
}
