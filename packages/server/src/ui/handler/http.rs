//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomId,
    infrastructure::dto::{
        http::{
            ErrorResponse, HealthResponse, OnlineUsersResponse, RoomDetailDto, RoomListResponse,
            RoomSummaryDto,
        },
        websocket::OnlineUserDto,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = state.coordinator.rooms().await;

    // Domain Model から DTO への変換
    Json(RoomListResponse {
        rooms: rooms.iter().map(RoomSummaryDto::from).collect(),
    })
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, (StatusCode, Json<ErrorResponse>)> {
    let room_id = RoomId::new(room_id).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    match state.coordinator.room_detail(&room_id).await {
        Some(detail) => Ok(Json(RoomDetailDto::from(&detail))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("room '{}' not found", room_id),
            }),
        )),
    }
}

/// Get the principals that currently hold a connection
pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersResponse> {
    let users: Vec<OnlineUserDto> = state
        .coordinator
        .online_users()
        .await
        .iter()
        .map(OnlineUserDto::from)
        .collect();

    Json(OnlineUsersResponse {
        count: users.len(),
        users,
    })
}
