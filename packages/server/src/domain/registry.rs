//! Connection Registry の trait 定義
//!
//! 「誰がオンラインで、どの接続につながっているか」の唯一の情報源。
//! 他のコンポーネントは接続ハンドルを 1 操作を超えてキャッシュしてはいけない
//! （置き換え・切断後に古いハンドルへ送ってしまうため）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    entity::Principal,
    error::PushError,
    event::ServerEvent,
    value_object::{ConnectionId, PrincipalId, Timestamp},
};

/// 置き換えられた接続に送るクローズコード
pub const SUPERSEDED_CLOSE_CODE: u16 = 4001;
/// 置き換えられた接続に送るクローズ理由
pub const SUPERSEDED_CLOSE_REASON: &str = "superseded";

/// 接続の書き込みタスクに渡すフレーム
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Event(ServerEvent),
    Close { code: u16, reason: String },
}

/// 接続ごとの送信チャンネル
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

/// トランスポートの接続 1 本を表すハンドル
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub principal: Principal,
    pub opened_at: Timestamp,
    sender: PusherChannel,
}

impl ConnectionHandle {
    pub fn new(principal: Principal, opened_at: Timestamp, sender: PusherChannel) -> Self {
        Self {
            id: ConnectionId::generate(),
            principal,
            opened_at,
            sender,
        }
    }

    /// イベントを送る。接続が閉じていれば `ChannelClosed`
    pub fn send(&self, event: ServerEvent) -> Result<(), PushError> {
        self.sender
            .send(OutboundFrame::Event(event))
            .map_err(|_| PushError::ChannelClosed(self.principal.id.as_str().to_string()))
    }

    /// クローズフレームを送る（既に閉じていれば何もしない）
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.sender.send(OutboundFrame::Close {
            code,
            reason: reason.to_string(),
        });
    }
}

/// Connection Registry
///
/// エントリが無いことは正常系（切断後に届いたメッセージなど）。
/// 呼び出し側は `None` / `Err(PushError)` を「オフライン」として扱う。
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 接続を登録する
    ///
    /// 同じ Principal の既存接続があれば、クローズフレームを送って置き換え、
    /// 置き換えられたハンドルを返す。
    async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle>;

    /// 接続を登録解除する
    ///
    /// その接続が Principal の現在の接続である場合のみ削除し、Principal を返す。
    /// 未知・置き換え済みの接続なら `None`。
    async fn deregister(&self, connection_id: &ConnectionId) -> Option<Principal>;

    async fn resolve(&self, principal_id: &PrincipalId) -> Option<ConnectionHandle>;

    async fn is_online(&self, principal_id: &PrincipalId) -> bool;

    /// 接続 ID から現在の Principal を引く（置き換え済みなら `None`）
    async fn principal_of(&self, connection_id: &ConnectionId) -> Option<Principal>;

    /// 接続中の Principal 一覧（ID 順）
    async fn online_principals(&self) -> Vec<Principal>;

    async fn push_to(&self, principal_id: &PrincipalId, event: &ServerEvent)
    -> Result<(), PushError>;

    /// 複数の Principal に送る。届けられた数を返す
    ///
    /// オフライン・クローズ済みの宛先はスキップする。
    async fn broadcast(&self, targets: &[PrincipalId], event: &ServerEvent) -> usize;
}
