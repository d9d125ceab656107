//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 全 Room からの退出、残ったメンバーへの userLeftRoom / userOffline、オフラインの記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数 Room に参加中の Principal の切断
//! - エッジケース：置き換え済みの接続の切断（何もしない）、未知の接続

use std::{collections::BTreeSet, sync::Arc};

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRegistry, EventPayload, PresenceMark, PresenceState, PresenceStore,
    PrincipalId, RoomId, RoomRepository, ServerEvent, Timestamp,
};

use super::RoomLocks;

/// 切断処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReport {
    pub principal_id: PrincipalId,
    pub left_rooms: Vec<RoomId>,
}

/// 切断処理のユースケース
pub struct DisconnectParticipantUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<dyn RoomRepository>,
    presence: Arc<dyn PresenceStore>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rooms: Arc<dyn RoomRepository>,
        presence: Arc<dyn PresenceStore>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            rooms,
            presence,
            locks,
            clock,
        }
    }

    /// 切断処理を実行
    ///
    /// その接続が Principal の現在の接続でなければ何もせず `None` を返す。
    /// 参加中 Room の記録は残す（再接続で復元するため）。
    /// 処理の途中で同じ Principal が再接続したら、残りの Room からは抜けず、
    /// `userOffline` もオフラインの記録も行わない。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<DisconnectReport> {
        let principal = self.registry.deregister(connection_id).await?;
        let principal_id = principal.id;
        let now = Timestamp::new(self.clock.now_millis());

        // 1. 全 Room から退出
        let mut left_rooms = Vec::new();
        let mut co_members = BTreeSet::new();
        let mut reconnected = false;
        for room_id in self.rooms.rooms_of(&principal_id).await {
            let _guard = self.locks.acquire(&room_id).await;
            if self.registry.is_online(&principal_id).await {
                reconnected = true;
                break;
            }
            let Some(outcome) = self.rooms.leave(&room_id, &principal_id, now).await else {
                continue;
            };
            self.presence.save_room_snapshot(&outcome.room).await;

            let remaining: Vec<_> = outcome.room.members.iter().cloned().collect();
            let notice = ServerEvent::new(
                now,
                EventPayload::UserLeftRoom {
                    room_id: room_id.clone(),
                    principal_id: principal_id.clone(),
                },
            );
            self.registry.broadcast(&remaining, &notice).await;

            co_members.extend(remaining);
            left_rooms.push(room_id);
        }

        if reconnected || self.registry.is_online(&principal_id).await {
            tracing::info!(
                principal_id = %principal_id,
                connection_id = %connection_id,
                left_rooms = left_rooms.len(),
                "Principal reconnected while disconnecting"
            );
            return Some(DisconnectReport {
                principal_id,
                left_rooms,
            });
        }

        // 2. 残ったメンバーに 1 回ずつ userOffline
        let co_members: Vec<_> = co_members.into_iter().collect();
        let offline = ServerEvent::new(
            now,
            EventPayload::UserOffline {
                principal_id: principal_id.clone(),
                last_seen_at: now,
            },
        );
        self.registry.broadcast(&co_members, &offline).await;

        // 3. オフラインを記録
        self.presence
            .mark_presence(&PresenceMark {
                principal_id: principal_id.clone(),
                last_seen_at: now,
                state: PresenceState::Offline,
            })
            .await;

        tracing::info!(
            principal_id = %principal_id,
            connection_id = %connection_id,
            left_rooms = left_rooms.len(),
            "Principal disconnected"
        );

        Some(DisconnectReport {
            principal_id,
            left_rooms,
        })
    }
}
