//! WebSocket connection handlers.
//!
//! 1 接続につき 2 タスク：
//! - pusher: チャンネルに積まれたイベントを JSON にしてソケットへ書く
//! - receiver: フレームをコマンドに変換して `Coordinator` に渡す

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use hiroba_shared::time::now_millis;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Command, Locale, OutboundFrame, Principal, PrincipalId, Role, Timestamp},
    infrastructure::dto::websocket::{ClientCommandDto, OutboundEventDto},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
///
/// 認証は上流で済んでいる前提で、検証済みの Principal 情報を受け取る。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub principal_id: Option<String>,
    pub role: Option<String>,
    pub locale: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(raw_principal_id) = query.principal_id else {
        tracing::warn!("Rejecting WebSocket upgrade without principalId");
        return Err(StatusCode::UNAUTHORIZED);
    };

    // Convert String -> PrincipalId (Domain Model)
    let principal_id = match PrincipalId::new(raw_principal_id.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid principalId '{}': {}", raw_principal_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let principal = Principal::new(
        principal_id,
        Role::parse(query.role.as_deref()),
        Locale::new(query.locale),
        Timestamp::new(now_millis()),
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, principal)))
}

/// Spawns a task that writes queued frames to the WebSocket sink.
///
/// A `Close` frame ends the task after it is written.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                OutboundFrame::Event(event) => {
                    // Domain Model から DTO への変換
                    let json = match serde_json::to_string(&OutboundEventDto::from(&event)) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::warn!("Failed to serialize outbound event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close { code, reason } => {
                    let close = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(close))).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let principal_id = principal.id.clone();

    // 接続確立（connected・通知・履歴が積まれるまでコマンドは読まない）
    let session = state
        .coordinator
        .connection_opened(principal, tx.clone())
        .await;
    let connection_id = session.connection_id;
    tracing::debug!(
        principal_id = %principal_id,
        connection_id = %connection_id,
        "Reading commands"
    );

    let mut send_task = pusher_loop(rx, sender);

    let coordinator = state.coordinator.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let reply = match msg {
                Message::Text(text) => {
                    match serde_json::from_str::<ClientCommandDto>(text.as_str()) {
                        Ok(dto) => match Command::try_from(dto) {
                            Ok(command) => {
                                coordinator.handle_command(&connection_id, command).await
                            }
                            Err(e) => {
                                Some(coordinator.report_invalid(&connection_id, e.to_string()).await)
                            }
                        },
                        Err(e) => {
                            tracing::debug!(connection_id = %connection_id, "Malformed frame: {}", e);
                            Some(coordinator.report_invalid(&connection_id, e.to_string()).await)
                        }
                    }
                }
                Message::Binary(_) => Some(
                    coordinator
                        .report_invalid(&connection_id, "binary frames are not supported".to_string())
                        .await,
                ),
                Message::Close(_) => {
                    tracing::info!(connection_id = %connection_id, "Client requested close");
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                Message::Ping(_) | Message::Pong(_) => None,
            };

            // 応答は発信元の接続にだけ返す
            if let Some(event) = reply
                && tx.send(OutboundFrame::Event(event)).is_err()
            {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    match state.coordinator.connection_closed(&connection_id).await {
        Some(report) => tracing::info!(
            principal_id = %report.principal_id,
            left_rooms = report.left_rooms.len(),
            "Connection closed"
        ),
        None => tracing::debug!(
            connection_id = %connection_id,
            "Closed connection was already superseded"
        ),
    }
}
