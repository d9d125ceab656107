//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{DenyReason, ErrorCode, RoomId};

/// コマンド処理のエラー
///
/// どれも発信元の接続にだけ返され、ブロードキャストはされない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("connection is not registered")]
    AuthRequired,

    #[error("not a member of room '{room_id}'")]
    NotInRoom { room_id: RoomId },

    #[error("access to room '{room_id}' denied: {reason}")]
    RoomAccessDenied { room_id: RoomId, reason: DenyReason },

    #[error("message body must not be empty")]
    EmptyMessage,

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl CommandError {
    /// クライアントに返すエラーコード
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthRequired => ErrorCode::AuthRequired,
            Self::NotInRoom { .. } => ErrorCode::NotInRoom,
            Self::RoomAccessDenied { .. } => ErrorCode::RoomAccessDenied,
            Self::EmptyMessage => ErrorCode::EmptyMessage,
            Self::InvalidCommand(_) => ErrorCode::InvalidCommand,
        }
    }

    /// 翻訳テンプレートに埋め込む値
    pub fn translation_args(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::AuthRequired | Self::EmptyMessage => Vec::new(),
            Self::NotInRoom { room_id } => vec![("roomId", room_id.to_string())],
            Self::RoomAccessDenied { room_id, reason } => vec![
                ("roomId", room_id.to_string()),
                ("reason", reason.to_string()),
            ],
            Self::InvalidCommand(detail) => vec![("detail", detail.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        // テスト項目: 各エラーがワイヤ上のコードに対応する
        // given (前提条件):
        let room_id = RoomId::new("general".to_string()).unwrap();

        // when (操作):
        // then (期待する結果):
        assert_eq!(CommandError::AuthRequired.code(), ErrorCode::AuthRequired);
        assert_eq!(
            CommandError::NotInRoom {
                room_id: room_id.clone()
            }
            .code(),
            ErrorCode::NotInRoom
        );
        assert_eq!(
            CommandError::RoomAccessDenied {
                room_id,
                reason: DenyReason::RoomFull { capacity: 2 }
            }
            .code(),
            ErrorCode::RoomAccessDenied
        );
        assert_eq!(CommandError::EmptyMessage.code(), ErrorCode::EmptyMessage);
        assert_eq!(
            CommandError::InvalidCommand("bad".to_string()).code(),
            ErrorCode::InvalidCommand
        );
    }

    #[test]
    fn test_translation_args_for_denied_join() {
        // テスト項目: 参加拒否の翻訳引数に Room ID と理由が入る
        // given (前提条件):
        let error = CommandError::RoomAccessDenied {
            room_id: RoomId::new("vip".to_string()).unwrap(),
            reason: DenyReason::RoomFull { capacity: 2 },
        };

        // when (操作):
        let args = error.translation_args();

        // then (期待する結果):
        assert_eq!(
            args,
            vec![
                ("roomId", "vip".to_string()),
                ("reason", "room is full (capacity 2)".to_string())
            ]
        );
    }
}
