//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `RoomRepository`: Room Membership Tracker
//! - `KeyValueStore`: TTL 付き外部 Key-Value ストア
//! - `HistoryStore`: Room の履歴ウィンドウと Principal ごとのオフラインキュー
//! - `PresenceStore`: PresenceMark・参加中 Room の記録・Room スナップショット

use std::time::Duration;

use async_trait::async_trait;

use super::{
    entity::{Message, Notification, PresenceMark, Principal, Room},
    error::{DenyReason, StoreError},
    policy::RoomAccessPolicy,
    value_object::{PrincipalId, RoomId, Timestamp},
};

/// join の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// join 後の Room
    pub room: Room,
    /// この join で Room が作られた
    pub created: bool,
    /// 既にメンバーだった（状態は変わっていない）
    pub already_member: bool,
}

/// leave の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// leave 後の Room
    pub room: Room,
    /// この leave で Room が空になった（削除予約済み）
    pub emptied: bool,
}

/// 空 Room の掃除結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSweep {
    /// 削除された Room
    pub deleted: Vec<RoomId>,
    /// 今回初めて空と判定され、削除予約された Room
    pub marked: Vec<RoomId>,
}

/// Room Membership Tracker
///
/// 同じ Room に対する join / leave の変更と Room の作成・削除は不可分に行う。
/// 空の Room に同時に 2 つの join が来ても Room は 1 つしか作られない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Room に参加する
    ///
    /// `policy` は状態を変更する前に、その時点のメンバー数とともに評価される。
    /// Room が無ければ作る。
    async fn join(
        &self,
        room_id: &RoomId,
        principal: &Principal,
        access_token: Option<&str>,
        policy: &dyn RoomAccessPolicy,
        at: Timestamp,
    ) -> Result<JoinOutcome, DenyReason>;

    /// Room から抜ける。メンバーでなければ `None`
    ///
    /// 空になった Room は即座には削除せず、次の掃除で削除する。
    async fn leave(
        &self,
        room_id: &RoomId,
        principal_id: &PrincipalId,
        at: Timestamp,
    ) -> Option<LeaveOutcome>;

    /// Room のメンバー（ID 順）
    async fn members_of(&self, room_id: &RoomId) -> Vec<PrincipalId>;

    /// Principal が参加中の Room（ID 順）
    async fn rooms_of(&self, principal_id: &PrincipalId) -> Vec<RoomId>;

    async fn is_member(&self, room_id: &RoomId, principal_id: &PrincipalId) -> bool;

    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// 全 Room（ID 順）
    async fn list_rooms(&self) -> Vec<Room>;

    /// 最終アクティビティを更新する
    async fn touch(&self, room_id: &RoomId, at: Timestamp);

    /// 削除予約済みで空のままの Room を削除し、予約されていない空 Room を予約する
    async fn sweep_empty_rooms(&self) -> RoomSweep;
}

/// TTL 付き Key-Value ストア（外部コラボレーター）
///
/// すべての書き込みは明示的な TTL を伴う。リスト操作は 1 操作ごとに不可分。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// 削除する。キーが存在したら `true`
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// リスト末尾に追加し、`capacity` を超えた分を先頭から捨て、TTL を更新する。
    /// 追加後の長さを返す
    async fn list_push(
        &self,
        key: &str,
        item: String,
        capacity: usize,
        ttl: Duration,
    ) -> Result<usize, StoreError>;

    /// 末尾から最大 `limit` 件を古い順で返す
    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// リスト全体を古い順で取り出し、キーを削除する（読み出しと削除は不可分）
    async fn list_take(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// 期限切れのキーを削除し、削除した数を返す
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}

/// History & Offline Delivery Store
///
/// ストアが使えない場合、追加は捨てられ、読み出しは空になる。
/// 履歴とオフライン配信は補助機能であり、リアルタイム配信の成否には影響しない。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_to_room(&self, room_id: &RoomId, message: &Message);

    /// 直近 `limit` 件のスナップショット（ID 順）
    async fn recent_of(&self, room_id: &RoomId, limit: usize) -> Vec<Message>;

    async fn queue_offline(&self, principal_id: &PrincipalId, notification: &Notification);

    /// オフラインキューを取り出して空にする
    async fn drain_offline(&self, principal_id: &PrincipalId) -> Vec<Notification>;

    /// 期限切れエントリを削除し、削除数を返す
    async fn prune(&self) -> usize;
}

/// PresenceMark・参加中 Room の記録・Room スナップショット
///
/// `HistoryStore` と同じく、失敗はログに残して握りつぶす。
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn mark_presence(&self, mark: &PresenceMark);

    async fn presence_of(&self, principal_id: &PrincipalId) -> Option<PresenceMark>;

    /// 明示的に join した Room を記録する（切断しても残る）
    async fn remember_room(&self, principal_id: &PrincipalId, room_id: &RoomId);

    /// 明示的に leave した Room を記録から外す
    async fn forget_room(&self, principal_id: &PrincipalId, room_id: &RoomId);

    async fn active_rooms(&self, principal_id: &PrincipalId) -> Vec<RoomId>;

    async fn save_room_snapshot(&self, room: &Room);

    async fn delete_room_snapshot(&self, room_id: &RoomId);
}
