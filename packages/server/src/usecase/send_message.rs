//! UseCase: Room へのメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendRoomMessageUseCase::execute() メソッド
//! - 検証順序（メンバーシップ → 本文）、ID 採番、履歴への追加、送信者を含む全メンバーへの配信
//!
//! ### なぜこのテストが必要か
//! - 同じ Room のメッセージは全受信者に同じ順序で届く必要がある
//! - 配信に失敗しても履歴には残る（再接続時に再送される）
//!
//! ### どのような状況を想定しているか
//! - 正常系：メンバー全員への配信
//! - 異常系：非メンバーの送信、空の本文
//! - エッジケース：オフラインのメンバー、同時送信

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, EventPayload, HistoryStore, Message, MessageBody, MessageIdGenerator,
    MessageKind, PrincipalId, RoomId, RoomRepository, ServerEvent, Timestamp,
};

use super::{CommandError, RoomLocks};

/// Room へのメッセージ送信のユースケース
pub struct SendRoomMessageUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    locks: Arc<RoomLocks>,
    ids: Arc<MessageIdGenerator>,
    clock: Arc<dyn Clock>,
}

/// Room メッセージの送信内容
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMessageInput {
    pub room_id: RoomId,
    pub body: String,
    pub kind: MessageKind,
    pub metadata: Option<serde_json::Value>,
}

impl SendRoomMessageUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
        locks: Arc<RoomLocks>,
        ids: Arc<MessageIdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            registry,
            history,
            locks,
            ids,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok((Message, usize))` - 作成されたメッセージと、配信できた接続数
    /// * `Err(CommandError)` - `NotInRoom` または `EmptyMessage`
    pub async fn execute(
        &self,
        sender_id: &PrincipalId,
        input: RoomMessageInput,
    ) -> Result<(Message, usize), CommandError> {
        let RoomMessageInput {
            room_id,
            body,
            kind,
            metadata,
        } = input;

        // ID 採番・履歴追加・配信は Room のロック内で直列化する
        let _guard = self.locks.acquire(&room_id).await;

        // 1. 検証（メンバーシップが先）
        if !self.rooms.is_member(&room_id, sender_id).await {
            return Err(CommandError::NotInRoom { room_id });
        }
        let body = MessageBody::new(body).map_err(|_| CommandError::EmptyMessage)?;

        // 2. メッセージを作成
        let now = Timestamp::new(self.clock.now_millis());
        let message = Message::to_room(
            self.ids.next_id(),
            room_id.clone(),
            sender_id.clone(),
            body,
            kind,
            now,
        )
        .with_metadata(metadata);

        // 3. 履歴に追加してから最終アクティビティを更新
        self.history.append_to_room(&room_id, &message).await;
        self.rooms.touch(&room_id, now).await;

        // 4. 送信者を含む全メンバーに配信（オフラインのメンバーは履歴で補う）
        let members = self.rooms.members_of(&room_id).await;
        let event = ServerEvent::new(
            now,
            EventPayload::NewMessage {
                message: message.clone(),
            },
        );
        let delivered = self.registry.broadcast(&members, &event).await;

        tracing::debug!(
            sender_id = %sender_id,
            room_id = %room_id,
            message_id = %message.id,
            members = members.len(),
            delivered,
            "Room message fanned out"
        );

        Ok((message, delivered))
    }
}
