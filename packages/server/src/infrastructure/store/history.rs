//! KeyValueStore 上の History & Offline Delivery Store
//!
//! Room ごとの直近メッセージと、Principal ごとのオフライン通知キューを
//! JSON 文字列のリストとして保存する。
//! ストアのエラーは warn ログに残して握りつぶす（追加は捨て、読み出しは空）。

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use serde::{Serialize, de::DeserializeOwned};

use super::keys;
use crate::domain::{HistoryStore, KeyValueStore, Message, Notification, PrincipalId, RoomId};

/// 履歴とオフラインキューの容量・TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// Room ごとに保持するメッセージ数
    pub history_capacity: usize,
    /// Principal ごとに保持するオフライン通知数
    pub offline_capacity: usize,
    pub history_ttl: Duration,
    pub offline_ttl: Duration,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            offline_capacity: 50,
            history_ttl: Duration::from_secs(24 * 60 * 60),
            offline_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

pub struct KvHistoryStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    limits: HistoryLimits,
}

impl KvHistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, limits: HistoryLimits) -> Self {
        Self {
            store,
            clock,
            limits,
        }
    }

    /// `ttl` より古い時刻の下限（これより前に作られたエントリは読み出さない）
    fn oldest_allowed(&self, ttl: Duration) -> i64 {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_millis().saturating_sub(ttl_millis)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to encode store entry");
            None
        }
    }
}

fn decode_all<T: DeserializeOwned>(key: &str, items: Vec<String>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_str(&item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping undecodable store entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl HistoryStore for KvHistoryStore {
    async fn append_to_room(&self, room_id: &RoomId, message: &Message) {
        let key = keys::room_messages(room_id);
        let Some(json) = encode(&key, message) else {
            return;
        };
        if let Err(e) = self
            .store
            .list_push(
                &key,
                json,
                self.limits.history_capacity,
                self.limits.history_ttl,
            )
            .await
        {
            tracing::warn!(
                room_id = %room_id,
                message_id = %message.id,
                error = %e,
                "Dropping message from room history"
            );
        }
    }

    async fn recent_of(&self, room_id: &RoomId, limit: usize) -> Vec<Message> {
        let key = keys::room_messages(room_id);
        let items = match self.store.list_recent(&key, limit).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Failed to read room history");
                return Vec::new();
            }
        };

        let oldest = self.oldest_allowed(self.limits.history_ttl);
        let mut messages: Vec<Message> = decode_all(&key, items);
        messages.retain(|message| message.created_at.value() >= oldest);
        messages.sort_by_key(|message| message.id);
        messages
    }

    async fn queue_offline(&self, principal_id: &PrincipalId, notification: &Notification) {
        let key = keys::offline_notifications(principal_id);
        let Some(json) = encode(&key, notification) else {
            return;
        };
        if let Err(e) = self
            .store
            .list_push(
                &key,
                json,
                self.limits.offline_capacity,
                self.limits.offline_ttl,
            )
            .await
        {
            tracing::warn!(
                principal_id = %principal_id,
                notification_id = %notification.id,
                error = %e,
                "Dropping offline notification"
            );
        }
    }

    async fn drain_offline(&self, principal_id: &PrincipalId) -> Vec<Notification> {
        let key = keys::offline_notifications(principal_id);
        let items = match self.store.list_take(&key).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    principal_id = %principal_id,
                    error = %e,
                    "Failed to drain offline notifications"
                );
                return Vec::new();
            }
        };

        let oldest = self.oldest_allowed(self.limits.offline_ttl);
        let mut notifications: Vec<Notification> = decode_all(&key, items);
        notifications.retain(|notification| notification.created_at.value() >= oldest);
        notifications
    }

    async fn prune(&self) -> usize {
        match self.store.purge_expired().await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prune expired store entries");
                0
            }
        }
    }
}
