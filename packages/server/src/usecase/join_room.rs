//! UseCase: Room 参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - アクセスポリシーの評価、参加者への joinedRoom / messageHistory、他メンバーへの通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規 Room への参加、既存 Room への参加（履歴の再送）
//! - 異常系：ポリシーによる参加拒否
//! - エッジケース：参加済みの Room への再参加

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, EventPayload, HistoryStore, JoinOutcome, PresenceStore, Principal,
    RoomAccessPolicy, RoomId, RoomRepository, ServerEvent, Timestamp,
};

use super::{CommandError, RoomLocks};

/// Room 参加のユースケース
pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    presence: Arc<dyn PresenceStore>,
    policy: Arc<dyn RoomAccessPolicy>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
    /// 参加時に再送する履歴の件数
    replay_limit: usize,
}

impl JoinRoomUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
        presence: Arc<dyn PresenceStore>,
        policy: Arc<dyn RoomAccessPolicy>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
        replay_limit: usize,
    ) -> Self {
        Self {
            rooms,
            registry,
            history,
            presence,
            policy,
            locks,
            clock,
            replay_limit,
        }
    }

    /// Room 参加を実行
    ///
    /// 参加者には `joinedRoom` と `messageHistory` を、他のメンバーには
    /// `userJoinedRoom` を送る。履歴の再送は Room のロック内で行うため、
    /// 再送と新着メッセージの間で取りこぼしや重複は起きない。
    pub async fn execute(
        &self,
        principal: &Principal,
        room_id: &RoomId,
        access_token: Option<&str>,
    ) -> Result<JoinOutcome, CommandError> {
        let _guard = self.locks.acquire(room_id).await;
        let now = Timestamp::new(self.clock.now_millis());

        // 1. ポリシーを評価して参加
        let outcome = self
            .rooms
            .join(room_id, principal, access_token, self.policy.as_ref(), now)
            .await
            .map_err(|reason| CommandError::RoomAccessDenied {
                room_id: room_id.clone(),
                reason,
            })?;

        // 2. 参加の記録（再接続時に復元するため）
        if !outcome.already_member {
            self.presence.remember_room(&principal.id, room_id).await;
            self.presence.save_room_snapshot(&outcome.room).await;
        }

        // 3. 参加者に joinedRoom と履歴を送る
        let members: Vec<_> = outcome.room.members.iter().cloned().collect();
        let joined = ServerEvent::new(
            now,
            EventPayload::JoinedRoom {
                room_id: room_id.clone(),
                members: members.clone(),
            },
        );
        let messages = self.history.recent_of(room_id, self.replay_limit).await;
        let history = ServerEvent::new(
            now,
            EventPayload::MessageHistory {
                room_id: room_id.clone(),
                messages,
            },
        );
        for event in [&joined, &history] {
            if let Err(e) = self.registry.push_to(&principal.id, event).await {
                tracing::debug!(principal_id = %principal.id, error = %e, "Joiner is offline");
            }
        }

        // 4. 他のメンバーに通知
        if !outcome.already_member {
            let others: Vec<_> = members
                .into_iter()
                .filter(|id| id != &principal.id)
                .collect();
            let notice = ServerEvent::new(
                now,
                EventPayload::UserJoinedRoom {
                    room_id: room_id.clone(),
                    principal_id: principal.id.clone(),
                },
            );
            self.registry.broadcast(&others, &notice).await;
        }

        tracing::info!(
            principal_id = %principal.id,
            room_id = %room_id,
            created = outcome.created,
            already_member = outcome.already_member,
            "Principal joined room"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AllowAll, DenyReason, MemberCapacityPolicy, Message, MessageBody, MessageKind},
        usecase::test_support::{Fixture, drain, principal_id, room_id},
    };

    fn usecase(fixture: &Fixture, policy: Arc<dyn RoomAccessPolicy>) -> JoinRoomUseCase {
        JoinRoomUseCase::new(
            fixture.rooms.clone(),
            fixture.registry.clone(),
            fixture.history.clone(),
            fixture.presence.clone(),
            policy,
            fixture.locks.clone(),
            fixture.clock.clone(),
            50,
        )
    }

    #[tokio::test]
    async fn test_join_sends_joined_room_and_history() {
        // テスト項目: 参加者に joinedRoom と messageHistory が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture, Arc::new(AllowAll));
        let mut alice_rx = fixture.connect("alice").await;
        let earlier = Message::to_room(
            fixture.ids.next_id(),
            room_id("general"),
            principal_id("bob"),
            MessageBody::new("earlier".to_string()).unwrap(),
            MessageKind::Text,
            fixture.now(),
        );
        fixture.history.append_to_room(&room_id("general"), &earlier).await;

        // when (操作):
        let outcome = usecase
            .execute(&fixture.principal("alice"), &room_id("general"), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.created);
        let events = drain(&mut alice_rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            EventPayload::JoinedRoom { members, .. } if members == &vec![principal_id("alice")]
        ));
        assert!(matches!(
            &events[1],
            EventPayload::MessageHistory { messages, .. } if messages == &vec![earlier.clone()]
        ));
    }

    #[tokio::test]
    async fn test_join_notifies_other_members() {
        // テスト項目: 既存メンバーに userJoinedRoom が届き、参加記録が残る
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture, Arc::new(AllowAll));
        let mut alice_rx = fixture.connect("alice").await;
        let _bob_rx = fixture.connect("bob").await;
        usecase
            .execute(&fixture.principal("alice"), &room_id("general"), None)
            .await
            .unwrap();
        drain(&mut alice_rx);

        // when (操作):
        usecase
            .execute(&fixture.principal("bob"), &room_id("general"), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            drain(&mut alice_rx),
            vec![EventPayload::UserJoinedRoom {
                room_id: room_id("general"),
                principal_id: principal_id("bob"),
            }]
        );
        assert_eq!(
            fixture.presence.active_rooms(&principal_id("bob")).await,
            vec![room_id("general")]
        );
    }

    #[tokio::test]
    async fn test_rejoin_does_not_notify_again() {
        // テスト項目: 参加済みの Room への再参加では他メンバーに通知しない
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture, Arc::new(AllowAll));
        let mut alice_rx = fixture.connect("alice").await;
        let _bob_rx = fixture.connect("bob").await;
        for id in ["alice", "bob"] {
            usecase
                .execute(&fixture.principal(id), &room_id("general"), None)
                .await
                .unwrap();
        }
        drain(&mut alice_rx);

        // when (操作):
        let outcome = usecase
            .execute(&fixture.principal("bob"), &room_id("general"), None)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(outcome.already_member);
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_join_denied_by_capacity() {
        // テスト項目: 定員に達した Room への参加は RoomAccessDenied
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture, Arc::new(MemberCapacityPolicy::new(1)));
        let _alice_rx = fixture.connect("alice").await;
        let mut bob_rx = fixture.connect("bob").await;
        usecase
            .execute(&fixture.principal("alice"), &room_id("small"), None)
            .await
            .unwrap();

        // when (操作):
        let result = usecase
            .execute(&fixture.principal("bob"), &room_id("small"), None)
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(CommandError::RoomAccessDenied {
                room_id: room_id("small"),
                reason: DenyReason::RoomFull { capacity: 1 },
            })
        );
        assert!(drain(&mut bob_rx).is_empty());
        assert!(fixture.presence.active_rooms(&principal_id("bob")).await.is_empty());
    }
}
