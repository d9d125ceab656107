//! コーディネーター
//!
//! Registry・Room Tracker・ストアを組み立て、トランスポートからの
//! 「接続確立 / コマンド受信 / 切断」を各ユースケースに振り分ける。
//! トランスポート（WebSocket）には依存しない。

use std::sync::Arc;

use hiroba_shared::time::Clock;
use tokio::task::JoinHandle;

use crate::{
    config::CoordinatorConfig,
    domain::{
        Command, ConnectionId, ConnectionRegistry, EventPayload, KeyValueStore, Locale,
        MessageIdGenerator, OnlineUser, Principal, PusherChannel, Room, RoomAccessPolicy, RoomId,
        ServerEvent, Timestamp, Translator,
    },
    infrastructure::{
        registry::InMemoryConnectionRegistry,
        repository::InMemoryRoomRepository,
        store::{KvHistoryStore, KvPresenceStore},
    },
    usecase::{
        CommandError, ConnectParticipantUseCase, ConnectedSession, DisconnectParticipantUseCase,
        DisconnectReport, GetOnlineUsersUseCase, GetRoomDetailUseCase, GetRoomsUseCase,
        GetUserStatusUseCase, JoinRoomUseCase, LeaveRoomUseCase, RoomDetail, RoomLocks,
        RoomMessageInput, SendPrivateMessageUseCase, SendRoomMessageUseCase, SweepReport,
        SweepUseCase, TypingUseCase, spawn_sweeper,
    },
};

pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<dyn ConnectionRegistry>,
    translator: Arc<dyn Translator>,
    clock: Arc<dyn Clock>,
    connect_participant_usecase: ConnectParticipantUseCase,
    disconnect_participant_usecase: DisconnectParticipantUseCase,
    join_room_usecase: JoinRoomUseCase,
    leave_room_usecase: LeaveRoomUseCase,
    send_room_message_usecase: SendRoomMessageUseCase,
    send_private_message_usecase: SendPrivateMessageUseCase,
    typing_usecase: TypingUseCase,
    get_online_users_usecase: GetOnlineUsersUseCase,
    get_user_status_usecase: GetUserStatusUseCase,
    get_rooms_usecase: GetRoomsUseCase,
    get_room_detail_usecase: GetRoomDetailUseCase,
    sweep_usecase: Arc<SweepUseCase>,
}

impl Coordinator {
    /// 依存を組み立てる
    ///
    /// Registry と Room Tracker はこのインスタンスのメモリ上に持つ。
    /// 履歴・オフライン通知・Presence は `store` に書き込む。
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<dyn KeyValueStore>,
        policy: Arc<dyn RoomAccessPolicy>,
        translator: Arc<dyn Translator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // 1. 状態を持つコンポーネント
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let history = Arc::new(KvHistoryStore::new(
            store.clone(),
            clock.clone(),
            config.history_limits(),
        ));
        let presence = Arc::new(KvPresenceStore::new(store, config.presence_ttls()));
        let locks = Arc::new(RoomLocks::new());
        let ids = Arc::new(MessageIdGenerator::new());

        // 2. ユースケース
        let connect_participant_usecase = ConnectParticipantUseCase::new(
            registry.clone(),
            rooms.clone(),
            history.clone(),
            presence.clone(),
            policy.clone(),
            translator.clone(),
            locks.clone(),
            clock.clone(),
            config.replay_limit,
            config.replay_timeout,
        );
        let disconnect_participant_usecase = DisconnectParticipantUseCase::new(
            registry.clone(),
            rooms.clone(),
            presence.clone(),
            locks.clone(),
            clock.clone(),
        );
        let join_room_usecase = JoinRoomUseCase::new(
            rooms.clone(),
            registry.clone(),
            history.clone(),
            presence.clone(),
            policy,
            locks.clone(),
            clock.clone(),
            config.replay_limit,
        );
        let leave_room_usecase = LeaveRoomUseCase::new(
            rooms.clone(),
            registry.clone(),
            presence.clone(),
            locks.clone(),
            clock.clone(),
        );
        let send_room_message_usecase = SendRoomMessageUseCase::new(
            rooms.clone(),
            registry.clone(),
            history.clone(),
            locks.clone(),
            ids.clone(),
            clock.clone(),
        );
        let send_private_message_usecase =
            SendPrivateMessageUseCase::new(registry.clone(), history.clone(), ids, clock.clone());
        let typing_usecase = TypingUseCase::new(rooms.clone(), registry.clone(), clock.clone());
        let get_online_users_usecase = GetOnlineUsersUseCase::new(registry.clone());
        let get_user_status_usecase = GetUserStatusUseCase::new(registry.clone(), presence.clone());
        let get_rooms_usecase = GetRoomsUseCase::new(rooms.clone());
        let get_room_detail_usecase = GetRoomDetailUseCase::new(rooms.clone(), registry.clone());
        let sweep_usecase = Arc::new(SweepUseCase::new(
            rooms,
            registry.clone(),
            history,
            presence,
            locks,
            clock.clone(),
        ));

        Self {
            config,
            registry,
            translator,
            clock,
            connect_participant_usecase,
            disconnect_participant_usecase,
            join_room_usecase,
            leave_room_usecase,
            send_room_message_usecase,
            send_private_message_usecase,
            typing_usecase,
            get_online_users_usecase,
            get_user_status_usecase,
            get_rooms_usecase,
            get_room_detail_usecase,
            sweep_usecase,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// 接続確立
    ///
    /// 戻るまでに `connected`・オフライン通知・復元した Room の履歴が
    /// `sender` に積まれている。呼び出し側はその後でコマンドを読み始める。
    pub async fn connection_opened(
        &self,
        principal: Principal,
        sender: PusherChannel,
    ) -> ConnectedSession {
        self.connect_participant_usecase.execute(principal, sender).await
    }

    pub async fn connection_closed(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<DisconnectReport> {
        self.disconnect_participant_usecase.execute(connection_id).await
    }

    /// コマンドを処理する
    ///
    /// 発信元の接続にだけ返すイベント（エラー・問い合わせの応答）があれば返す。
    /// 他の接続への配信はユースケースの中で済んでいる。
    pub async fn handle_command(
        &self,
        connection_id: &ConnectionId,
        command: Command,
    ) -> Option<ServerEvent> {
        let Some(principal) = self.registry.principal_of(connection_id).await else {
            tracing::debug!(
                connection_id = %connection_id,
                command = command.name(),
                "Command from unregistered connection"
            );
            return Some(self.error_event(&Locale::default(), &CommandError::AuthRequired));
        };
        tracing::debug!(
            principal_id = %principal.id,
            command = command.name(),
            "Command received"
        );

        let result = match command {
            Command::JoinRoom {
                room_id,
                access_token,
            } => match self
                .join_room_usecase
                .execute(&principal, &room_id, access_token.as_deref())
                .await
            {
                Ok(_) => Ok(None),
                Err(error) => Ok(Some(self.join_error_payload(
                    &principal.locale,
                    room_id,
                    &error,
                ))),
            },
            Command::LeaveRoom { room_id } => self
                .leave_room_usecase
                .execute(&principal.id, &room_id)
                .await
                .map(|_| None),
            Command::SendRoomMessage {
                room_id,
                body,
                kind,
                metadata,
            } => self
                .send_room_message_usecase
                .execute(
                    &principal.id,
                    RoomMessageInput {
                        room_id,
                        body,
                        kind,
                        metadata,
                    },
                )
                .await
                .map(|_| None),
            Command::SendPrivateMessage {
                target_id,
                body,
                kind,
            } => self
                .send_private_message_usecase
                .execute(&principal.id, &target_id, body, kind)
                .await
                .map(|_| None),
            Command::Typing { room_id, is_typing } => {
                self.typing_usecase
                    .execute(&principal.id, &room_id, is_typing)
                    .await;
                Ok(None)
            }
            Command::GetOnlineUsers => Ok(Some(EventPayload::OnlineUsers {
                users: self.get_online_users_usecase.execute().await,
            })),
            Command::GetUserStatus { principal_id } => {
                let status = self.get_user_status_usecase.execute(&principal_id).await;
                Ok(Some(EventPayload::UserStatus {
                    principal_id,
                    state: status.state,
                    last_seen_at: status.last_seen_at,
                }))
            }
        };

        match result {
            Ok(payload) => payload.map(|payload| ServerEvent::new(self.now(), payload)),
            Err(error) => {
                tracing::debug!(
                    principal_id = %principal.id,
                    code = ?error.code(),
                    "Command rejected: {}",
                    error
                );
                Some(self.error_event(&principal.locale, &error))
            }
        }
    }

    /// 解釈できなかったフレームへの `error`（INVALID_COMMAND）
    pub async fn report_invalid(
        &self,
        connection_id: &ConnectionId,
        detail: String,
    ) -> ServerEvent {
        let locale = self
            .registry
            .principal_of(connection_id)
            .await
            .map(|principal| principal.locale)
            .unwrap_or_default();
        self.error_event(&locale, &CommandError::InvalidCommand(detail))
    }

    pub async fn online_users(&self) -> Vec<OnlineUser> {
        self.get_online_users_usecase.execute().await
    }

    pub async fn rooms(&self) -> Vec<Room> {
        self.get_rooms_usecase.execute().await
    }

    pub async fn room_detail(&self, room_id: &RoomId) -> Option<RoomDetail> {
        self.get_room_detail_usecase.execute(room_id).await
    }

    /// クリーンアップを 1 回実行する
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_usecase.execute().await
    }

    /// 設定の間隔でクリーンアップを繰り返すタスクを起動する
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(self.sweep_usecase.clone(), self.config.sweep_interval)
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    fn render(&self, locale: &Locale, error: &CommandError) -> String {
        let args = error.translation_args();
        let args: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.translator
            .translate(locale, error.code().translation_key(), &args)
    }

    fn error_event(&self, locale: &Locale, error: &CommandError) -> ServerEvent {
        ServerEvent::new(
            self.now(),
            EventPayload::Error {
                code: error.code(),
                message: self.render(locale, error),
            },
        )
    }

    fn join_error_payload(
        &self,
        locale: &Locale,
        room_id: RoomId,
        error: &CommandError,
    ) -> EventPayload {
        EventPayload::JoinRoomError {
            room_id,
            code: error.code(),
            message: self.render(locale, error),
        }
    }
}
