//! UseCase: 定期クリーンアップ
//!
//! 1. 接続のないメンバーを Room から外す（userLeftRoom を送る）
//! 2. 空の Room を掃除し、削除された Room のスナップショットと、存在しない Room のロックを消す
//! 3. ストアの期限切れエントリを消す
//!
//! Room ごとに独立して処理し、1 つの Room の失敗で全体を止めない。

use std::{sync::Arc, time::Duration};

use hiroba_shared::time::Clock;
use tokio::task::JoinHandle;

use crate::domain::{
    ConnectionRegistry, EventPayload, HistoryStore, PresenceStore, RoomId, RoomRepository,
    ServerEvent, Timestamp,
};

use super::RoomLocks;

/// クリーンアップの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 接続がないため外されたメンバー数
    pub evicted_members: usize,
    /// 削除された Room
    pub deleted_rooms: Vec<RoomId>,
    /// 次回削除される予定の Room
    pub marked_rooms: Vec<RoomId>,
    /// 削除されたロック数
    pub pruned_locks: usize,
    /// 削除された期限切れエントリ数
    pub pruned_entries: usize,
}

/// 定期クリーンアップのユースケース
pub struct SweepUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    presence: Arc<dyn PresenceStore>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
}

impl SweepUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        registry: Arc<dyn ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
        presence: Arc<dyn PresenceStore>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms,
            registry,
            history,
            presence,
            locks,
            clock,
        }
    }

    pub async fn execute(&self) -> SweepReport {
        let mut report = SweepReport::default();

        // 1. 接続のないメンバーを外す
        for room in self.rooms.list_rooms().await {
            report.evicted_members += self.evict_offline_members(&room.id).await;
        }

        // 2. 空 Room の掃除
        let sweep = self.rooms.sweep_empty_rooms().await;
        for room_id in &sweep.deleted {
            self.presence.delete_room_snapshot(room_id).await;
        }
        let live: Vec<_> = self
            .rooms
            .list_rooms()
            .await
            .into_iter()
            .map(|room| room.id)
            .collect();
        report.pruned_locks = self.locks.prune_stale(&live).await;
        report.deleted_rooms = sweep.deleted;
        report.marked_rooms = sweep.marked;

        // 3. 期限切れエントリの削除
        report.pruned_entries = self.history.prune().await;

        tracing::info!(
            evicted_members = report.evicted_members,
            deleted_rooms = report.deleted_rooms.len(),
            marked_rooms = report.marked_rooms.len(),
            pruned_locks = report.pruned_locks,
            pruned_entries = report.pruned_entries,
            "Sweep completed"
        );

        report
    }

    async fn evict_offline_members(&self, room_id: &RoomId) -> usize {
        let _guard = self.locks.acquire(room_id).await;
        let now = Timestamp::new(self.clock.now_millis());

        let mut evicted = 0;
        for member in self.rooms.members_of(room_id).await {
            if self.registry.is_online(&member).await {
                continue;
            }
            let Some(outcome) = self.rooms.leave(room_id, &member, now).await else {
                continue;
            };
            evicted += 1;
            tracing::debug!(room_id = %room_id, principal_id = %member, "Evicted stale member");

            let remaining: Vec<_> = outcome.room.members.iter().cloned().collect();
            let notice = ServerEvent::new(
                now,
                EventPayload::UserLeftRoom {
                    room_id: room_id.clone(),
                    principal_id: member,
                },
            );
            self.registry.broadcast(&remaining, &notice).await;
        }

        if evicted > 0
            && let Some(room) = self.rooms.get_room(room_id).await
        {
            self.presence.save_room_snapshot(&room).await;
        }
        evicted
    }
}

/// `interval` ごとにクリーンアップを実行するタスクを起動する
///
/// 最初の実行は起動から `interval` 後。
pub fn spawn_sweeper(usecase: Arc<SweepUseCase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval の初回 tick は即座に完了する
        ticker.tick().await;
        loop {
            ticker.tick().await;
            usecase.execute().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{AllowAll, KeyValueStore, MessageKind},
        infrastructure::store::keys,
        usecase::{
            RoomMessageInput, SendRoomMessageUseCase,
            test_support::{Fixture, drain, principal_id, room_id},
        },
    };

    fn usecase(fixture: &Fixture) -> SweepUseCase {
        SweepUseCase::new(
            fixture.rooms.clone(),
            fixture.registry.clone(),
            fixture.history.clone(),
            fixture.presence.clone(),
            fixture.locks.clone(),
            fixture.clock.clone(),
        )
    }

    async fn join(fixture: &Fixture, principal: &str, room: &str) {
        fixture
            .rooms
            .join(&room_id(room), &fixture.principal(principal), None, &AllowAll, fixture.now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_evicts_members_without_connection() {
        // テスト項目: 接続のないメンバーが外され、残ったメンバーに userLeftRoom が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let mut alice_rx = fixture.connect("alice").await;
        join(&fixture, "alice", "general").await;
        join(&fixture, "ghost", "general").await;

        // when (操作):
        let report = usecase(&fixture).execute().await;

        // then (期待する結果):
        assert_eq!(report.evicted_members, 1);
        assert_eq!(
            drain(&mut alice_rx),
            vec![EventPayload::UserLeftRoom {
                room_id: room_id("general"),
                principal_id: principal_id("ghost"),
            }]
        );
        assert_eq!(
            fixture.rooms.members_of(&room_id("general")).await,
            vec![principal_id("alice")]
        );
    }

    #[tokio::test]
    async fn test_two_sweeps_delete_abandoned_room() {
        // テスト項目: 接続のないメンバーしかいない Room は外された時点で空になり削除される
        // given (前提条件):
        let fixture = Fixture::new();
        join(&fixture, "ghost", "abandoned").await;
        let room = fixture.rooms.get_room(&room_id("abandoned")).await.unwrap();
        fixture.presence.save_room_snapshot(&room).await;
        let usecase = usecase(&fixture);

        // when (操作):
        let first = usecase.execute().await;
        let second = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(first.evicted_members, 1);
        assert_eq!(first.deleted_rooms, vec![room_id("abandoned")]);
        assert_eq!(first.pruned_locks, 1);
        assert!(second.deleted_rooms.is_empty());
        assert!(fixture.rooms.list_rooms().await.is_empty());
        assert!(
            fixture
                .store
                .get(&keys::room_metadata(&room_id("abandoned")))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sweep_prunes_expired_entries() {
        // テスト項目: 期限切れのストアエントリが削除される
        // given (前提条件):
        let fixture = Fixture::new();
        fixture
            .store
            .set("stale", "x".to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        fixture.clock.advance(2_000);

        // when (操作):
        let report = usecase(&fixture).execute().await;

        // then (期待する結果):
        assert_eq!(report.pruned_entries, 1);
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_rooms() {
        // テスト項目: 接続中のメンバーがいる Room は残る
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice_rx = fixture.connect("alice").await;
        join(&fixture, "alice", "general").await;

        // when (操作):
        let report = usecase(&fixture).execute().await;

        // then (期待する結果):
        assert_eq!(report, SweepReport::default());
        assert!(fixture.rooms.get_room(&room_id("general")).await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_prunes_locks_of_rejected_sends() {
        // テスト項目: 存在しない Room への送信で作られたロックは掃除で消える
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice_rx = fixture.connect("alice").await;
        join(&fixture, "alice", "general").await;
        let send = SendRoomMessageUseCase::new(
            fixture.rooms.clone(),
            fixture.registry.clone(),
            fixture.history.clone(),
            fixture.locks.clone(),
            fixture.ids.clone(),
            fixture.clock.clone(),
        );
        for i in 0..100 {
            let input = RoomMessageInput {
                room_id: room_id(&format!("nowhere-{i}")),
                body: "hi".to_string(),
                kind: MessageKind::Text,
                metadata: None,
            };
            assert!(send.execute(&principal_id("alice"), input).await.is_err());
        }

        // when (操作):
        let report = usecase(&fixture).execute().await;

        // then (期待する結果):
        assert_eq!(report.pruned_locks, 100);
        assert_eq!(fixture.locks.len().await, 1);
    }
}
