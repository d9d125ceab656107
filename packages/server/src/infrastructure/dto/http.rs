//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::OnlineUserDto;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Summary of a room, returned by `GET /api/rooms`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub members: Vec<String>,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub last_activity_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummaryDto>,
}

/// Detail of a room, returned by `GET /api/rooms/{room_id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub members: Vec<RoomMemberDto>,
    pub created_at: String,
    pub last_activity_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberDto {
    pub principal_id: String,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<OnlineUserDto>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
