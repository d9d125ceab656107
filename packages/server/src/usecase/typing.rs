//! UseCase: 入力中インジケーター
//!
//! 永続化も ID 採番もしない一時的なブロードキャスト。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, EventPayload, PrincipalId, RoomId, RoomRepository, ServerEvent, Timestamp,
};

pub struct TypingUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl TypingUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            registry,
            clock,
        }
    }

    /// 送信者以外のメンバーに `userTyping` を送り、届いた数を返す
    ///
    /// 非メンバーからの通知は無視する。
    pub async fn execute(
        &self,
        principal_id: &PrincipalId,
        room_id: &RoomId,
        is_typing: bool,
    ) -> usize {
        let members = self.rooms.members_of(room_id).await;
        if !members.contains(principal_id) {
            tracing::debug!(
                principal_id = %principal_id,
                room_id = %room_id,
                "Ignoring typing indicator from non-member"
            );
            return 0;
        }

        let others: Vec<_> = members
            .into_iter()
            .filter(|id| id != principal_id)
            .collect();
        let event = ServerEvent::new(
            Timestamp::new(self.clock.now_millis()),
            EventPayload::UserTyping {
                room_id: room_id.clone(),
                principal_id: principal_id.clone(),
                is_typing,
            },
        );
        self.registry.broadcast(&others, &event).await
    }
}
