//! Entity 定義
//!
//! - `Principal`: 認証済みのアクター
//! - `Room`: 明示的なメンバーシップを持つブロードキャストグループ
//! - `Message`: Room 宛て、または Principal 宛てのメッセージ
//! - `Notification`: オフライン中の Principal に溜めておく通知
//! - `PresenceMark`: 最終接続時刻とオンライン状態

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::value_object::{
    Locale, MessageBody, MessageId, MessageKind, NotificationId, PresenceState, PrincipalId,
    Role, RoomId, Timestamp,
};

/// 認証済みのアクター
///
/// 1 つのコーディネーターにつき、同じ Principal の有効な接続は常に 1 本まで。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    pub locale: Locale,
    pub connected_at: Timestamp,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role, locale: Locale, connected_at: Timestamp) -> Self {
        Self {
            id,
            role,
            locale,
            connected_at,
        }
    }
}

/// Room エンティティ
///
/// 最初の join で暗黙的に作られ、メンバーが空になると削除予約される。
/// 実際の削除は次のクリーンアップで行う（leave と join が競合しても
/// 宛先の Room が消えないようにするため）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub members: BTreeSet<PrincipalId>,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
    #[serde(skip)]
    pending_deletion: bool,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            created_at,
            last_activity_at: created_at,
            pending_deletion: false,
        }
    }

    /// メンバーを追加する。新規追加なら `true`
    ///
    /// 削除予約は取り消される。
    pub fn add_member(&mut self, principal_id: PrincipalId, at: Timestamp) -> bool {
        self.pending_deletion = false;
        self.touch(at);
        self.members.insert(principal_id)
    }

    /// メンバーを削除する。削除できたら `true`
    ///
    /// 最後のメンバーが抜けた場合は削除予約される。
    pub fn remove_member(&mut self, principal_id: &PrincipalId, at: Timestamp) -> bool {
        let removed = self.members.remove(principal_id);
        if removed {
            self.touch(at);
        }
        if self.members.is_empty() {
            self.pending_deletion = true;
        }
        removed
    }

    pub fn is_member(&self, principal_id: &PrincipalId) -> bool {
        self.members.contains(principal_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn touch(&mut self, at: Timestamp) {
        if at > self.last_activity_at {
            self.last_activity_at = at;
        }
    }

    pub fn mark_pending_deletion(&mut self) {
        self.pending_deletion = true;
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.pending_deletion
    }
}

/// メッセージの宛先（Room か Principal のどちらか一方）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum MessageTarget {
    Room(RoomId),
    Principal(PrincipalId),
}

/// メッセージエンティティ
///
/// `id` はコーディネーターが採番する単調増加の値で、履歴の順序キーになる。
/// タイムスタンプから順序を導出してはいけない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub target: MessageTarget,
    pub sender_id: PrincipalId,
    pub body: MessageBody,
    pub kind: MessageKind,
    pub created_at: Timestamp,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub reactions: BTreeMap<String, BTreeSet<PrincipalId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Message {
    /// Room 宛てのメッセージを作成
    pub fn to_room(
        id: MessageId,
        room_id: RoomId,
        sender_id: PrincipalId,
        body: MessageBody,
        kind: MessageKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            target: MessageTarget::Room(room_id),
            sender_id,
            body,
            kind,
            created_at,
            edited: false,
            reactions: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Principal 宛て（プライベート）のメッセージを作成
    pub fn to_principal(
        id: MessageId,
        target_id: PrincipalId,
        sender_id: PrincipalId,
        body: MessageBody,
        kind: MessageKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            target: MessageTarget::Principal(target_id),
            sender_id,
            body,
            kind,
            created_at,
            edited: false,
            reactions: BTreeMap::new(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        match &self.target {
            MessageTarget::Room(room_id) => Some(room_id),
            MessageTarget::Principal(_) => None,
        }
    }

    pub fn target_principal_id(&self) -> Option<&PrincipalId> {
        match &self.target {
            MessageTarget::Principal(principal_id) => Some(principal_id),
            MessageTarget::Room(_) => None,
        }
    }
}

/// 通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    PrivateMessage,
}

impl NotificationKind {
    /// 表示テキストの翻訳キー
    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::PrivateMessage => "notification.private_message",
        }
    }
}

/// オフラインキューに積まれる通知
///
/// 表示テキストは配信時に受信者のロケールで生成する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: Message,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn private_message(message: Message, created_at: Timestamp) -> Self {
        Self {
            id: NotificationId::generate(),
            kind: NotificationKind::PrivateMessage,
            message,
            created_at,
        }
    }
}

/// 最終接続時刻とオンライン状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMark {
    pub principal_id: PrincipalId,
    pub last_seen_at: Timestamp,
    pub state: PresenceState,
}

/// `room:{id}:metadata` に保存する Room のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub members: Vec<PrincipalId>,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            members: room.members.iter().cloned().collect(),
            created_at: room.created_at,
            last_activity_at: room.last_activity_at,
        }
    }
}
