//! UseCase: 接続確立処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 既存接続の置き換え、オフライン通知の再送、参加中 Room の復元と履歴の再送
//!
//! ### なぜこのテストが必要か
//! - 1 Principal につき有効な接続は常に 1 本
//! - オフライン中の通知はちょうど 1 回だけ届く
//! - 再接続した Principal は新着より先に履歴を受け取る
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回接続、参加中 Room を持つ再接続
//! - 異常系：復元時にポリシーで拒否される Room
//! - エッジケース：同じ Principal の多重接続

use std::{collections::BTreeSet, future::Future, sync::Arc, time::Duration};

use hiroba_shared::time::Clock;
use tokio::time::Instant;

use crate::domain::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, EventPayload, HistoryStore, Notification,
    PresenceMark, PresenceState, PresenceStore, Principal, PrincipalId, PusherChannel,
    RoomAccessPolicy, RoomId, RoomRepository, ServerEvent, Timestamp, Translator,
};

use super::RoomLocks;

/// 接続確立の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedSession {
    pub connection_id: ConnectionId,
    /// 置き換えられた既存接続
    pub superseded: Option<ConnectionId>,
    /// 復元できた Room
    pub restored_rooms: Vec<RoomId>,
    /// 再送したオフライン通知の数
    pub replayed_notifications: usize,
}

/// 接続確立のユースケース
pub struct ConnectParticipantUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    rooms: Arc<dyn RoomRepository>,
    history: Arc<dyn HistoryStore>,
    presence: Arc<dyn PresenceStore>,
    policy: Arc<dyn RoomAccessPolicy>,
    translator: Arc<dyn Translator>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
    replay_limit: usize,
    /// 接続確立中のストア操作全体の期限
    replay_timeout: Duration,
}

impl ConnectParticipantUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        rooms: Arc<dyn RoomRepository>,
        history: Arc<dyn HistoryStore>,
        presence: Arc<dyn PresenceStore>,
        policy: Arc<dyn RoomAccessPolicy>,
        translator: Arc<dyn Translator>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
        replay_limit: usize,
        replay_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            rooms,
            history,
            presence,
            policy,
            translator,
            locks,
            clock,
            replay_limit,
            replay_timeout,
        }
    }

    /// 接続確立を実行
    ///
    /// 1. 参加中 Room とオフライン通知を読む
    /// 2. `connected` と通知を新しい接続のキューに積む
    /// 3. Registry に登録（既存接続は置き換え）
    /// 4. 参加中 Room に再参加し、Room のロック内で `messageHistory` を積む
    /// 5. 置き換えの間に積まれた通知をもう一度取り出す
    /// 6. オンラインを記録し、同じ Room のメンバーに知らせる
    ///
    /// ストア操作はすべて `replay_timeout` の共通の期限内で行い、
    /// 期限を過ぎたものは飛ばす（履歴が読めなかった Room には `messageHistory` を送らない）。
    /// WebSocket 側は、この処理が終わるまでコマンドを読まない。
    pub async fn execute(&self, principal: Principal, sender: PusherChannel) -> ConnectedSession {
        let now = Timestamp::new(self.clock.now_millis());
        let deadline = Instant::now() + self.replay_timeout;

        // 1. 再送に必要な状態を読む
        let active_rooms = self
            .within(
                deadline,
                &principal.id,
                "active rooms",
                self.presence.active_rooms(&principal.id),
            )
            .await
            .unwrap_or_default();
        let backlog = self
            .within(
                deadline,
                &principal.id,
                "offline backlog",
                self.history.drain_offline(&principal.id),
            )
            .await
            .unwrap_or_default();

        // 2. connected と通知を積む
        let handle = ConnectionHandle::new(principal.clone(), now, sender);
        let connected = ServerEvent::new(
            now,
            EventPayload::Connected {
                connection_id: handle.id,
                principal: principal.clone(),
                restored_rooms: active_rooms.clone(),
            },
        );
        let mut replayed_notifications = 0;
        let _ = handle.send(connected);
        for notification in backlog {
            if handle.send(self.notification_event(&principal, notification, now)).is_ok() {
                replayed_notifications += 1;
            }
        }

        // 3. 登録
        let superseded = self
            .registry
            .register(handle.clone())
            .await
            .map(|previous| previous.id);

        // 4. 参加中 Room の復元
        let mut restored_rooms = Vec::new();
        let mut newly_joined = Vec::new();
        for room_id in active_rooms {
            let _guard = self.locks.acquire(&room_id).await;
            match self
                .rooms
                .join(&room_id, &principal, None, self.policy.as_ref(), now)
                .await
            {
                Ok(outcome) => {
                    if !outcome.already_member {
                        self.within(
                            deadline,
                            &principal.id,
                            "room snapshot",
                            self.presence.save_room_snapshot(&outcome.room),
                        )
                        .await;
                        newly_joined.push((room_id.clone(), outcome.room.members.clone()));
                    }
                    let history = self
                        .within(
                            deadline,
                            &principal.id,
                            "room history",
                            self.history.recent_of(&room_id, self.replay_limit),
                        )
                        .await;
                    if let Some(messages) = history {
                        let _ = handle.send(ServerEvent::new(
                            now,
                            EventPayload::MessageHistory {
                                room_id: room_id.clone(),
                                messages,
                            },
                        ));
                    }
                    restored_rooms.push(room_id);
                }
                Err(reason) => {
                    tracing::warn!(
                        principal_id = %principal.id,
                        room_id = %room_id,
                        reason = %reason,
                        "Dropping active room denied on reconnect"
                    );
                    self.within(
                        deadline,
                        &principal.id,
                        "active rooms",
                        self.presence.forget_room(&principal.id, &room_id),
                    )
                    .await;
                }
            }
        }

        // 5. 置き換えの間に積まれた通知
        let late_backlog = self
            .within(
                deadline,
                &principal.id,
                "offline backlog",
                self.history.drain_offline(&principal.id),
            )
            .await
            .unwrap_or_default();
        for notification in late_backlog {
            if handle.send(self.notification_event(&principal, notification, now)).is_ok() {
                replayed_notifications += 1;
            }
        }

        // 6. オンラインを記録して周知
        let mark = PresenceMark {
            principal_id: principal.id.clone(),
            last_seen_at: now,
            state: PresenceState::Online,
        };
        self.within(
            deadline,
            &principal.id,
            "presence mark",
            self.presence.mark_presence(&mark),
        )
        .await;
        self.announce(&principal.id, &newly_joined, now).await;

        tracing::info!(
            principal_id = %principal.id,
            connection_id = %handle.id,
            superseded = superseded.is_some(),
            restored_rooms = restored_rooms.len(),
            replayed_notifications,
            "Principal connected"
        );

        ConnectedSession {
            connection_id: handle.id,
            superseded,
            restored_rooms,
            replayed_notifications,
        }
    }

    async fn within<T>(
        &self,
        deadline: Instant,
        principal_id: &PrincipalId,
        what: &'static str,
        future: impl Future<Output = T>,
    ) -> Option<T> {
        match tokio::time::timeout_at(deadline, future).await {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(
                    principal_id = %principal_id,
                    timeout_ms = self.replay_timeout.as_millis() as u64,
                    "Store timed out on {what} during connect"
                );
                None
            }
        }
    }

    fn notification_event(
        &self,
        principal: &Principal,
        notification: Notification,
        now: Timestamp,
    ) -> ServerEvent {
        let text = self.translator.translate(
            &principal.locale,
            notification.kind.translation_key(),
            &[("senderId", notification.message.sender_id.as_str())],
        );
        ServerEvent::new(now, EventPayload::Notification { notification, text })
    }

    /// 同じ Room のメンバーに `userStatusChanged` と `userJoinedRoom` を送る
    async fn announce(
        &self,
        principal_id: &PrincipalId,
        newly_joined: &[(RoomId, BTreeSet<PrincipalId>)],
        now: Timestamp,
    ) {
        let mut co_members = BTreeSet::new();
        for room_id in self.rooms.rooms_of(principal_id).await {
            co_members.extend(self.rooms.members_of(&room_id).await);
        }
        co_members.remove(principal_id);
        let co_members: Vec<_> = co_members.into_iter().collect();

        let status = ServerEvent::new(
            now,
            EventPayload::UserStatusChanged {
                principal_id: principal_id.clone(),
                state: PresenceState::Online,
            },
        );
        self.registry.broadcast(&co_members, &status).await;

        for (room_id, members) in newly_joined {
            let others: Vec<_> = members
                .iter()
                .filter(|id| *id != principal_id)
                .cloned()
                .collect();
            let joined = ServerEvent::new(
                now,
                EventPayload::UserJoinedRoom {
                    room_id: room_id.clone(),
                    principal_id: principal_id.clone(),
                },
            );
            self.registry.broadcast(&others, &joined).await;
        }
    }
}
