//! UseCase: Room 退出処理
//!
//! 明示的な退出は参加中 Room の記録からも外す（再接続しても復元されない）。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, EventPayload, LeaveOutcome, PresenceStore, PrincipalId, RoomId,
    RoomRepository, ServerEvent, Timestamp,
};

use super::{CommandError, RoomLocks};

/// Room 退出のユースケース
pub struct LeaveRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    presence: Arc<dyn PresenceStore>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        presence: Arc<dyn PresenceStore>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            registry,
            presence,
            locks,
            clock,
        }
    }

    /// Room 退出を実行
    ///
    /// 退出者には `leftRoom` を、残ったメンバーには `userLeftRoom` を送る。
    pub async fn execute(
        &self,
        principal_id: &PrincipalId,
        room_id: &RoomId,
    ) -> Result<LeaveOutcome, CommandError> {
        let _guard = self.locks.acquire(room_id).await;
        let now = Timestamp::new(self.clock.now_millis());

        let outcome = self
            .rooms
            .leave(room_id, principal_id, now)
            .await
            .ok_or_else(|| CommandError::NotInRoom {
                room_id: room_id.clone(),
            })?;

        self.presence.forget_room(principal_id, room_id).await;
        self.presence.save_room_snapshot(&outcome.room).await;

        let left = ServerEvent::new(
            now,
            EventPayload::LeftRoom {
                room_id: room_id.clone(),
            },
        );
        if let Err(e) = self.registry.push_to(principal_id, &left).await {
            tracing::debug!(principal_id = %principal_id, error = %e, "Leaver is offline");
        }

        let remaining: Vec<_> = outcome.room.members.iter().cloned().collect();
        let notice = ServerEvent::new(
            now,
            EventPayload::UserLeftRoom {
                room_id: room_id.clone(),
                principal_id: principal_id.clone(),
            },
        );
        self.registry.broadcast(&remaining, &notice).await;

        tracing::info!(
            principal_id = %principal_id,
            room_id = %room_id,
            emptied = outcome.emptied,
            "Principal left room"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::AllowAll,
        usecase::test_support::{Fixture, drain, principal_id, room_id},
    };

    fn usecase(fixture: &Fixture) -> LeaveRoomUseCase {
        LeaveRoomUseCase::new(
            fixture.rooms.clone(),
            fixture.registry.clone(),
            fixture.presence.clone(),
            fixture.locks.clone(),
            fixture.clock.clone(),
        )
    }

    async fn join(fixture: &Fixture, principal: &str, room: &str) {
        fixture
            .rooms
            .join(
                &room_id(room),
                &fixture.principal(principal),
                None,
                &AllowAll,
                fixture.now(),
            )
            .await
            .unwrap();
        fixture
            .presence
            .remember_room(&principal_id(principal), &room_id(room))
            .await;
    }

    #[tokio::test]
    async fn test_leave_notifies_leaver_and_remaining_members() {
        // テスト項目: 退出者に leftRoom、残ったメンバーに userLeftRoom が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let mut alice_rx = fixture.connect("alice").await;
        let mut bob_rx = fixture.connect("bob").await;
        join(&fixture, "alice", "general").await;
        join(&fixture, "bob", "general").await;

        // when (操作):
        let outcome = usecase(&fixture)
            .execute(&principal_id("alice"), &room_id("general"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!outcome.emptied);
        assert_eq!(
            drain(&mut alice_rx),
            vec![EventPayload::LeftRoom {
                room_id: room_id("general")
            }]
        );
        assert_eq!(
            drain(&mut bob_rx),
            vec![EventPayload::UserLeftRoom {
                room_id: room_id("general"),
                principal_id: principal_id("alice"),
            }]
        );
        assert!(
            fixture
                .presence
                .active_rooms(&principal_id("alice"))
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_leave_room_not_joined() {
        // テスト項目: 参加していない Room からの退出は NotInRoom
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice_rx = fixture.connect("alice").await;

        // when (操作):
        let result = usecase(&fixture)
            .execute(&principal_id("alice"), &room_id("general"))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(CommandError::NotInRoom {
                room_id: room_id("general")
            })
        );
    }

    #[tokio::test]
    async fn test_last_member_leaving_marks_room_for_deletion() {
        // テスト項目: 最後のメンバーが抜けると Room は削除予約される
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice_rx = fixture.connect("alice").await;
        join(&fixture, "alice", "general").await;

        // when (操作):
        let outcome = usecase(&fixture)
            .execute(&principal_id("alice"), &room_id("general"))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.emptied);
        assert!(outcome.room.is_pending_deletion());
    }
}
