//! KeyValueStore 上の PresenceStore
//!
//! PresenceMark・参加中 Room の記録・Room スナップショットを JSON で保存する。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::keys;
use crate::domain::{
    KeyValueStore, PresenceMark, PresenceStore, PrincipalId, Room, RoomId, RoomSnapshot,
    StoreError,
};

/// PresenceStore が書き込むキーの TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceTtls {
    pub presence: Duration,
    pub active_rooms: Duration,
    pub room_metadata: Duration,
}

impl Default for PresenceTtls {
    fn default() -> Self {
        Self {
            presence: Duration::from_secs(24 * 60 * 60),
            active_rooms: Duration::from_secs(7 * 24 * 60 * 60),
            room_metadata: Duration::from_secs(24 * 60 * 60),
        }
    }
}

pub struct KvPresenceStore {
    store: Arc<dyn KeyValueStore>,
    ttls: PresenceTtls,
}

impl KvPresenceStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttls: PresenceTtls) -> Self {
        Self { store, ttls }
    }

    async fn load_rooms(&self, principal_id: &PrincipalId) -> Result<Vec<RoomId>, StoreError> {
        match self.store.get(&keys::user_rooms(principal_id)).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_rooms(
        &self,
        principal_id: &PrincipalId,
        rooms: &[RoomId],
    ) -> Result<(), StoreError> {
        let key = keys::user_rooms(principal_id);
        if rooms.is_empty() {
            self.store.delete(&key).await?;
            return Ok(());
        }
        let json = serde_json::to_string(rooms)?;
        self.store.set(&key, json, self.ttls.active_rooms).await
    }

    /// 参加中 Room の記録を読み、`update` で書き換えて保存する
    ///
    /// 1 Principal の接続は常に 1 本なので、読み出しと書き込みの間に
    /// 同じキーへの書き込みが割り込むことはない。
    async fn update_rooms<F>(&self, principal_id: &PrincipalId, update: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<RoomId>) -> bool + Send,
    {
        let mut rooms = self.load_rooms(principal_id).await?;
        if update(&mut rooms) {
            self.save_rooms(principal_id, &rooms).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PresenceStore for KvPresenceStore {
    async fn mark_presence(&self, mark: &PresenceMark) {
        let result = async {
            let json = serde_json::to_string(mark)?;
            self.store
                .set(&keys::user_online(&mark.principal_id), json, self.ttls.presence)
                .await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(
                principal_id = %mark.principal_id,
                error = %e,
                "Failed to write presence mark"
            );
        }
    }

    async fn presence_of(&self, principal_id: &PrincipalId) -> Option<PresenceMark> {
        let result: Result<Option<PresenceMark>, StoreError> = async {
            match self.store.get(&keys::user_online(principal_id)).await? {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        }
        .await;
        result.unwrap_or_else(|e| {
            tracing::warn!(principal_id = %principal_id, error = %e, "Failed to read presence mark");
            None
        })
    }

    async fn remember_room(&self, principal_id: &PrincipalId, room_id: &RoomId) {
        let result = self
            .update_rooms(principal_id, |rooms| {
                if rooms.contains(room_id) {
                    return false;
                }
                rooms.push(room_id.clone());
                rooms.sort();
                true
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(
                principal_id = %principal_id,
                room_id = %room_id,
                error = %e,
                "Failed to remember active room"
            );
        }
    }

    async fn forget_room(&self, principal_id: &PrincipalId, room_id: &RoomId) {
        let result = self
            .update_rooms(principal_id, |rooms| {
                let before = rooms.len();
                rooms.retain(|id| id != room_id);
                rooms.len() != before
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(
                principal_id = %principal_id,
                room_id = %room_id,
                error = %e,
                "Failed to forget active room"
            );
        }
    }

    async fn active_rooms(&self, principal_id: &PrincipalId) -> Vec<RoomId> {
        self.load_rooms(principal_id).await.unwrap_or_else(|e| {
            tracing::warn!(principal_id = %principal_id, error = %e, "Failed to read active rooms");
            Vec::new()
        })
    }

    async fn save_room_snapshot(&self, room: &Room) {
        let result = async {
            let json = serde_json::to_string(&RoomSnapshot::from(room))?;
            self.store
                .set(&keys::room_metadata(&room.id), json, self.ttls.room_metadata)
                .await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(room_id = %room.id, error = %e, "Failed to save room snapshot");
        }
    }

    async fn delete_room_snapshot(&self, room_id: &RoomId) {
        if let Err(e) = self.store.delete(&keys::room_metadata(room_id)).await {
            tracing::warn!(room_id = %room_id, error = %e, "Failed to delete room snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use hiroba_shared::time::ManualClock;

    use super::*;
    use crate::{
        domain::{MockKeyValueStore, PresenceState, Timestamp},
        infrastructure::store::InMemoryKeyValueStore,
    };

    fn alice() -> PrincipalId {
        PrincipalId::new("alice".to_string()).unwrap()
    }

    fn room_id(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn presence_store() -> (KvPresenceStore, Arc<InMemoryKeyValueStore>) {
        let store = Arc::new(InMemoryKeyValueStore::new(Arc::new(ManualClock::new(0))));
        (
            KvPresenceStore::new(store.clone(), PresenceTtls::default()),
            store,
        )
    }

    #[tokio::test]
    async fn test_presence_mark_round_trip() {
        // テスト項目: 書き込んだ PresenceMark を読み出せる
        // given (前提条件):
        let (presence, _store) = presence_store();
        let mark = PresenceMark {
            principal_id: alice(),
            last_seen_at: Timestamp::new(5000),
            state: PresenceState::Offline,
        };

        // when (操作):
        presence.mark_presence(&mark).await;

        // then (期待する結果):
        assert_eq!(presence.presence_of(&alice()).await, Some(mark));
    }

    #[tokio::test]
    async fn test_remember_and_forget_rooms() {
        // テスト項目: 参加中 Room の記録は重複せず ID 順、forget で外れる
        // given (前提条件):
        let (presence, _store) = presence_store();

        // when (操作):
        presence.remember_room(&alice(), &room_id("random")).await;
        presence.remember_room(&alice(), &room_id("general")).await;
        presence.remember_room(&alice(), &room_id("general")).await;
        let remembered = presence.active_rooms(&alice()).await;
        presence.forget_room(&alice(), &room_id("random")).await;
        let after_forget = presence.active_rooms(&alice()).await;

        // then (期待する結果):
        assert_eq!(remembered, vec![room_id("general"), room_id("random")]);
        assert_eq!(after_forget, vec![room_id("general")]);
    }

    #[tokio::test]
    async fn test_forgetting_last_room_deletes_key() {
        // テスト項目: 最後の Room を外すとキー自体が消える
        // given (前提条件):
        let (presence, store) = presence_store();
        presence.remember_room(&alice(), &room_id("general")).await;

        // when (操作):
        presence.forget_room(&alice(), &room_id("general")).await;

        // then (期待する結果):
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_room_snapshot_saved_and_deleted() {
        // テスト項目: Room スナップショットの保存と削除
        // given (前提条件):
        let (presence, store) = presence_store();
        let mut room = Room::new(room_id("general"), Timestamp::new(1000));
        room.add_member(alice(), Timestamp::new(1000));

        // when (操作):
        presence.save_room_snapshot(&room).await;
        let saved = store
            .get(&keys::room_metadata(&room.id))
            .await
            .unwrap()
            .unwrap();
        presence.delete_room_snapshot(&room.id).await;

        // then (期待する結果):
        let snapshot: RoomSnapshot = serde_json::from_str(&saved).unwrap();
        assert_eq!(snapshot.members, vec![alice()]);
        assert!(store.get(&keys::room_metadata(&room.id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_reads_as_empty() {
        // テスト項目: ストアが使えない場合、読み出しは空として扱われる
        // given (前提条件):
        let mut mock = MockKeyValueStore::new();
        mock.expect_get()
            .returning(|_| Err(StoreError::Unavailable("timeout".to_string())));
        mock.expect_set()
            .returning(|_, _, _| Err(StoreError::Unavailable("timeout".to_string())));
        let presence = KvPresenceStore::new(Arc::new(mock), PresenceTtls::default());

        // when (操作):
        presence.remember_room(&alice(), &room_id("general")).await;
        let rooms = presence.active_rooms(&alice()).await;
        let mark = presence.presence_of(&alice()).await;

        // then (期待する結果):
        assert!(rooms.is_empty());
        assert!(mark.is_none());
    }
}
