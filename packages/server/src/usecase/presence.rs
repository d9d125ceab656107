//! UseCase: オンライン状態の問い合わせ

use std::sync::Arc;

use crate::domain::{
    ConnectionRegistry, OnlineUser, PresenceState, PresenceStore, PrincipalId, Timestamp,
};

/// オンラインユーザー一覧取得のユースケース
pub struct GetOnlineUsersUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl GetOnlineUsersUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 接続中の Principal 一覧（ID 順）
    pub async fn execute(&self) -> Vec<OnlineUser> {
        self.registry
            .online_principals()
            .await
            .iter()
            .map(OnlineUser::from)
            .collect()
    }
}

/// Principal のオンライン状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStatus {
    pub state: PresenceState,
    pub last_seen_at: Option<Timestamp>,
}

/// Principal のオンライン状態取得のユースケース
pub struct GetUserStatusUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    presence: Arc<dyn PresenceStore>,
}

impl GetUserStatusUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, presence: Arc<dyn PresenceStore>) -> Self {
        Self { registry, presence }
    }

    /// Registry を正とし、最終接続時刻は PresenceMark から補う
    pub async fn execute(&self, principal_id: &PrincipalId) -> UserStatus {
        let state = if self.registry.is_online(principal_id).await {
            PresenceState::Online
        } else {
            PresenceState::Offline
        };
        let last_seen_at = self
            .presence
            .presence_of(principal_id)
            .await
            .map(|mark| mark.last_seen_at);

        UserStatus {
            state,
            last_seen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::PresenceMark,
        usecase::test_support::{Fixture, principal_id},
    };

    #[tokio::test]
    async fn test_online_users_sorted() {
        // テスト項目: オンラインユーザーは ID 順で返る
        // given (前提条件):
        let fixture = Fixture::new();
        let _bob_rx = fixture.connect("bob").await;
        let _alice_rx = fixture.connect("alice").await;
        let usecase = GetOnlineUsersUseCase::new(fixture.registry.clone());

        // when (操作):
        let users = usecase.execute().await;

        // then (期待する結果):
        let ids: Vec<_> = users.iter().map(|u| u.principal_id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_user_status_uses_registry_and_presence_mark() {
        // テスト項目: 接続がなければ offline、最終接続時刻は PresenceMark から
        // given (前提条件):
        let fixture = Fixture::new();
        let _alice_rx = fixture.connect("alice").await;
        fixture
            .presence
            .mark_presence(&PresenceMark {
                principal_id: principal_id("bob"),
                last_seen_at: Timestamp::new(1234),
                state: PresenceState::Offline,
            })
            .await;
        let usecase = GetUserStatusUseCase::new(fixture.registry.clone(), fixture.presence.clone());

        // when (操作):
        let alice = usecase.execute(&principal_id("alice")).await;
        let bob = usecase.execute(&principal_id("bob")).await;
        let nobody = usecase.execute(&principal_id("nobody")).await;

        // then (期待する結果):
        assert_eq!(alice.state, PresenceState::Online);
        assert_eq!(
            bob,
            UserStatus {
                state: PresenceState::Offline,
                last_seen_at: Some(Timestamp::new(1234)),
            }
        );
        assert_eq!(nobody.last_seen_at, None);
    }
}
