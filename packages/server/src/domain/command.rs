//! 接続から受け取るコマンド
//!
//! トランスポートの文字列イベント名はここで列挙型に落とし込まれ、
//! ディスパッチ側で網羅的に `match` される。

use super::value_object::{MessageKind, PrincipalId, RoomId};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    JoinRoom {
        room_id: RoomId,
        access_token: Option<String>,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    /// 本文の検証はルーター側で行う（メンバーシップ検査が先）
    SendRoomMessage {
        room_id: RoomId,
        body: String,
        kind: MessageKind,
        metadata: Option<serde_json::Value>,
    },
    SendPrivateMessage {
        target_id: PrincipalId,
        body: String,
        kind: MessageKind,
    },
    Typing {
        room_id: RoomId,
        is_typing: bool,
    },
    GetOnlineUsers,
    GetUserStatus {
        principal_id: PrincipalId,
    },
}

impl Command {
    /// ログ用の短い名前
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "joinRoom",
            Self::LeaveRoom { .. } => "leaveRoom",
            Self::SendRoomMessage { .. } => "sendRoomMessage",
            Self::SendPrivateMessage { .. } => "sendPrivateMessage",
            Self::Typing {
                is_typing: true, ..
            } => "typingStart",
            Self::Typing {
                is_typing: false, ..
            } => "typingStop",
            Self::GetOnlineUsers => "getOnlineUsers",
            Self::GetUserStatus { .. } => "getUserStatus",
        }
    }
}
