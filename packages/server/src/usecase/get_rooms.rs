//! UseCase: Room 情報の取得（HTTP API 用）

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, PrincipalId, Room, RoomId, RoomRepository};

/// Room 一覧取得のユースケース
pub struct GetRoomsUseCase {
    rooms: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>) -> Self {
        Self { rooms }
    }

    pub async fn execute(&self) -> Vec<Room> {
        self.rooms.list_rooms().await
    }
}

/// メンバーとそのオンライン状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPresence {
    pub principal_id: PrincipalId,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetail {
    pub room: Room,
    pub members: Vec<MemberPresence>,
}

/// Room 詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    rooms: Arc<dyn RoomRepository>,
    registry: Arc<dyn ConnectionRegistry>,
}

impl GetRoomDetailUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { rooms, registry }
    }

    /// Room が無ければ `None`
    pub async fn execute(&self, room_id: &RoomId) -> Option<RoomDetail> {
        let room = self.rooms.get_room(room_id).await?;

        let mut members = Vec::with_capacity(room.member_count());
        for principal_id in &room.members {
            members.push(MemberPresence {
                principal_id: principal_id.clone(),
                online: self.registry.is_online(principal_id).await,
            });
        }

        Some(RoomDetail { room, members })
    }
}
