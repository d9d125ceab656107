//! Room ごとの順序付けロック
//!
//! 同じ Room へのメッセージ ID 採番・履歴追加・配信を直列化する。
//! ロック順序は RoomLocks → Room Membership Tracker → Connection Registry。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::RoomId;

#[derive(Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Room のロックを取得する（無ければ作る）
    pub async fn acquire(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(room_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// `live` に含まれない Room の、使われていないロックを削除し、削除した数を返す
    ///
    /// 存在しない Room 宛てのコマンドでもロックは作られるので、掃除のたびに呼ぶ。
    /// 取得中・待機中のロックは残す。
    pub async fn prune_stale(&self, live: &[RoomId]) -> usize {
        let live: HashSet<&RoomId> = live.iter().collect();
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|room_id, lock| live.contains(room_id) || Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
