//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! Room テーブルと Principal → Room の逆引きを 1 つのロックで守ることで、
//! メンバーシップの変更と Room の作成・削除を不可分にしています。

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AccessRequest, DenyReason, JoinOutcome, LeaveOutcome, Principal, PrincipalId, Room,
    RoomAccessPolicy, RoomId, RoomRepository, RoomSweep, Timestamp,
};

#[derive(Default)]
struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    /// Key: principal_id, Value: 参加中の Room（空になったら削除）
    memberships: HashMap<PrincipalId, BTreeSet<RoomId>>,
}

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    table: Mutex<RoomTable>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn join(
        &self,
        room_id: &RoomId,
        principal: &Principal,
        access_token: Option<&str>,
        policy: &dyn RoomAccessPolicy,
        at: Timestamp,
    ) -> Result<JoinOutcome, DenyReason> {
        let mut table = self.table.lock().await;

        if let Some(room) = table.rooms.get(room_id)
            && room.is_member(&principal.id)
        {
            return Ok(JoinOutcome {
                room: room.clone(),
                created: false,
                already_member: true,
            });
        }

        // 1. 変更前にポリシーを評価
        let current_members = table.rooms.get(room_id).map_or(0, Room::member_count);
        policy.check(&AccessRequest {
            room_id,
            principal_id: &principal.id,
            role: principal.role,
            access_token,
            current_members,
        })?;

        // 2. Room を（無ければ作って）メンバーを追加
        let created = !table.rooms.contains_key(room_id);
        let room = table
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), at));
        room.add_member(principal.id.clone(), at);
        let room = room.clone();

        // 3. 逆引きを更新
        table
            .memberships
            .entry(principal.id.clone())
            .or_default()
            .insert(room_id.clone());

        Ok(JoinOutcome {
            room,
            created,
            already_member: false,
        })
    }

    async fn leave(
        &self,
        room_id: &RoomId,
        principal_id: &PrincipalId,
        at: Timestamp,
    ) -> Option<LeaveOutcome> {
        let mut table = self.table.lock().await;

        let room = table.rooms.get_mut(room_id)?;
        if !room.remove_member(principal_id, at) {
            return None;
        }
        let outcome = LeaveOutcome {
            emptied: room.is_empty(),
            room: room.clone(),
        };

        if let Some(rooms) = table.memberships.get_mut(principal_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                table.memberships.remove(principal_id);
            }
        }

        Some(outcome)
    }

    async fn members_of(&self, room_id: &RoomId) -> Vec<PrincipalId> {
        let table = self.table.lock().await;
        table
            .rooms
            .get(room_id)
            .map(|room| room.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn rooms_of(&self, principal_id: &PrincipalId) -> Vec<RoomId> {
        let table = self.table.lock().await;
        table
            .memberships
            .get(principal_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn is_member(&self, room_id: &RoomId, principal_id: &PrincipalId) -> bool {
        let table = self.table.lock().await;
        table
            .rooms
            .get(room_id)
            .is_some_and(|room| room.is_member(principal_id))
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let table = self.table.lock().await;
        table.rooms.get(room_id).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let table = self.table.lock().await;
        let mut rooms: Vec<Room> = table.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn touch(&self, room_id: &RoomId, at: Timestamp) {
        let mut table = self.table.lock().await;
        if let Some(room) = table.rooms.get_mut(room_id) {
            room.touch(at);
        }
    }

    async fn sweep_empty_rooms(&self) -> RoomSweep {
        let mut table = self.table.lock().await;
        let mut sweep = RoomSweep::default();

        for room in table.rooms.values_mut() {
            if !room.is_empty() {
                continue;
            }
            if room.is_pending_deletion() {
                sweep.deleted.push(room.id.clone());
            } else {
                room.mark_pending_deletion();
                sweep.marked.push(room.id.clone());
            }
        }

        for room_id in &sweep.deleted {
            table.rooms.remove(room_id);
        }
        sweep.deleted.sort();
        sweep.marked.sort();

        sweep
    }
}
