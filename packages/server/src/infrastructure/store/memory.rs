//! インメモリ Key-Value ストア
//!
//! 外部 Key-Value ストア（Redis 相当）のプロセス内実装。
//! 期限切れのキーは読み出し時に遅延削除し、`purge_expired` でまとめて掃除する。

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use hiroba_shared::time::{Clock, SystemClock};
use tokio::sync::Mutex;

use crate::domain::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: i64,
}

impl Entry {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

fn expires_at(now: i64, ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_add(ttl_millis)
}

/// インメモリ Key-Value ストア実装
pub struct InMemoryKeyValueStore {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 保持しているキー数（期限切れで未掃除のものも含む）
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// 期限切れなら削除して `None` を返す
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: i64,
) -> Option<&'a mut Entry> {
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        match live_entry(&mut entries, key, now) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value),
                expires_at: expires_at(now, ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        Ok(entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn list_push(
        &self,
        key: &str,
        item: String,
        capacity: usize,
        ttl: Duration,
    ) -> Result<usize, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;

        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: now,
        });
        let Value::List(items) = &mut entry.value else {
            return Err(StoreError::WrongType(key.to_string()));
        };

        items.push_back(item);
        while items.len() > capacity {
            items.pop_front();
        }
        let len = items.len();
        entry.expires_at = expires_at(now, ttl);

        Ok(len)
    }

    async fn list_recent(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        match live_entry(&mut entries, key, now) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => {
                let skip = items.len().saturating_sub(limit);
                Ok(items.iter().skip(skip).cloned().collect())
            }
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn list_take(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        let is_list = match live_entry(&mut entries, key, now) {
            None => return Ok(Vec::new()),
            Some(entry) => matches!(entry.value, Value::List(_)),
        };
        if !is_list {
            return Err(StoreError::WrongType(key.to_string()));
        }
        match entries.remove(key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}
