//! ドメイン層のエラー定義

use thiserror::Error;

/// Value Object の生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} must be at most {max} characters (got {actual})")]
    TooLong {
        kind: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{kind} must not contain whitespace")]
    ContainsWhitespace { kind: &'static str },

    #[error("message body must not be empty")]
    EmptyMessage,

    #[error("unknown message type '{0}'")]
    UnknownMessageKind(String),
}

/// 外部 Key-Value ストアのエラー
///
/// 履歴・オフライン配信は補助機能のため、呼び出し側でログに残して握りつぶす。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(String),

    #[error("key '{0}' holds a value of the wrong type")]
    WrongType(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// 接続へのプッシュ失敗
///
/// どちらも「受信者オフライン」として扱われ、送信者にエラーは返らない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("principal '{0}' has no live connection")]
    ClientNotFound(String),

    #[error("connection of '{0}' is already closed")]
    ChannelClosed(String),
}

/// Room への参加拒否理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("room is full (capacity {capacity})")]
    RoomFull { capacity: usize },

    /// アプリケーション側ポリシーが独自に返す理由
    #[error("{0}")]
    Other(String),
}
