//! 接続に向けて送出するイベント
//!
//! ユースケースはこの型でイベントを組み立て、接続ごとのチャンネルに流す。
//! JSON への変換は Infrastructure 層の DTO（`infrastructure::dto::websocket`）が担う。

use serde::Serialize;

use super::{
    entity::{Message, Notification, Principal},
    value_object::{ConnectionId, PresenceState, PrincipalId, Role, RoomId, Timestamp},
};

/// 送出イベント（ペイロード + 発生時刻）
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl ServerEvent {
    pub fn new(timestamp: Timestamp, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }
}

/// オンラインユーザー一覧の 1 要素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub connected_at: Timestamp,
}

impl From<&Principal> for OnlineUser {
    fn from(principal: &Principal) -> Self {
        Self {
            principal_id: principal.id.clone(),
            role: principal.role,
            connected_at: principal.connected_at,
        }
    }
}

/// クライアントに返すエラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthRequired,
    NotInRoom,
    RoomAccessDenied,
    EmptyMessage,
    InvalidCommand,
}

impl ErrorCode {
    /// エラーメッセージの翻訳キー
    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::AuthRequired => "error.auth_required",
            Self::NotInRoom => "error.not_in_room",
            Self::RoomAccessDenied => "error.room_access_denied",
            Self::EmptyMessage => "error.empty_message",
            Self::InvalidCommand => "error.invalid_command",
        }
    }
}

/// イベントの中身
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Connected {
        connection_id: ConnectionId,
        principal: Principal,
        restored_rooms: Vec<RoomId>,
    },
    JoinedRoom {
        room_id: RoomId,
        members: Vec<PrincipalId>,
    },
    JoinRoomError {
        room_id: RoomId,
        code: ErrorCode,
        message: String,
    },
    LeftRoom {
        room_id: RoomId,
    },
    NewMessage {
        message: Message,
    },
    PrivateMessage {
        message: Message,
    },
    MessageHistory {
        room_id: RoomId,
        messages: Vec<Message>,
    },
    UserJoinedRoom {
        room_id: RoomId,
        principal_id: PrincipalId,
    },
    UserLeftRoom {
        room_id: RoomId,
        principal_id: PrincipalId,
    },
    UserTyping {
        room_id: RoomId,
        principal_id: PrincipalId,
        is_typing: bool,
    },
    UserOffline {
        principal_id: PrincipalId,
        last_seen_at: Timestamp,
    },
    UserStatusChanged {
        principal_id: PrincipalId,
        state: PresenceState,
    },
    Notification {
        notification: Notification,
        text: String,
    },
    OnlineUsers {
        users: Vec<OnlineUser>,
    },
    UserStatus {
        principal_id: PrincipalId,
        state: PresenceState,
        last_seen_at: Option<Timestamp>,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}
