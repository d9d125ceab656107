//! インメモリ Connection Registry 実装
//!
//! ## 責務
//!
//! - Principal ↔ 接続ハンドルの対応を管理（1 Principal につき 1 接続）
//! - 接続へのイベント送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! 接続の受付と送信チャンネルの生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成されたハンドルを受け取り、イベント送信に使用します。
//! 送信チャンネルの向こう側（書き込みタスク）が既に終了していても、
//! 送信は静かに失敗するだけで呼び出し元にはオフラインとして見えます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, Principal, PrincipalId, PushError,
    SUPERSEDED_CLOSE_CODE, SUPERSEDED_CLOSE_REASON, ServerEvent,
};

#[derive(Default)]
struct RegistryTable {
    /// Key: principal_id, Value: 現在の接続
    by_principal: HashMap<PrincipalId, ConnectionHandle>,
    /// Key: connection_id, Value: principal_id（逆引き）
    by_connection: HashMap<ConnectionId, PrincipalId>,
}

/// インメモリ Connection Registry
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    table: Mutex<RegistryTable>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut table = self.table.lock().await;
        let principal_id = handle.principal.id.clone();
        let connection_id = handle.id;

        let superseded = table.by_principal.remove(&principal_id);
        if let Some(previous) = &superseded {
            table.by_connection.remove(&previous.id);
            previous.close(SUPERSEDED_CLOSE_CODE, SUPERSEDED_CLOSE_REASON);
            tracing::info!(
                principal_id = %principal_id,
                superseded = %previous.id,
                connection_id = %connection_id,
                "Superseded previous connection"
            );
        }

        table.by_connection.insert(connection_id, principal_id.clone());
        table.by_principal.insert(principal_id.clone(), handle);
        tracing::debug!(
            principal_id = %principal_id,
            connection_id = %connection_id,
            "Connection registered"
        );

        superseded
    }

    async fn deregister(&self, connection_id: &ConnectionId) -> Option<Principal> {
        let mut table = self.table.lock().await;
        let principal_id = table.by_connection.remove(connection_id)?;
        let handle = table.by_principal.remove(&principal_id)?;
        tracing::debug!(
            principal_id = %principal_id,
            connection_id = %connection_id,
            "Connection deregistered"
        );
        Some(handle.principal)
    }

    async fn resolve(&self, principal_id: &PrincipalId) -> Option<ConnectionHandle> {
        let table = self.table.lock().await;
        table.by_principal.get(principal_id).cloned()
    }

    async fn is_online(&self, principal_id: &PrincipalId) -> bool {
        let table = self.table.lock().await;
        table.by_principal.contains_key(principal_id)
    }

    async fn principal_of(&self, connection_id: &ConnectionId) -> Option<Principal> {
        let table = self.table.lock().await;
        let principal_id = table.by_connection.get(connection_id)?;
        table
            .by_principal
            .get(principal_id)
            .map(|handle| handle.principal.clone())
    }

    async fn online_principals(&self) -> Vec<Principal> {
        let table = self.table.lock().await;
        let mut principals: Vec<Principal> = table
            .by_principal
            .values()
            .map(|handle| handle.principal.clone())
            .collect();

        // Sort by principal_id for consistent ordering
        principals.sort_by(|a, b| a.id.cmp(&b.id));
        principals
    }

    async fn push_to(
        &self,
        principal_id: &PrincipalId,
        event: &ServerEvent,
    ) -> Result<(), PushError> {
        let table = self.table.lock().await;

        match table.by_principal.get(principal_id) {
            Some(handle) => {
                handle.send(event.clone())?;
                tracing::debug!(principal_id = %principal_id, "Pushed event");
                Ok(())
            }
            None => Err(PushError::ClientNotFound(principal_id.as_str().to_string())),
        }
    }

    async fn broadcast(&self, targets: &[PrincipalId], event: &ServerEvent) -> usize {
        let table = self.table.lock().await;
        let mut delivered = 0;

        for target in targets {
            match table.by_principal.get(target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(handle) => match handle.send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => tracing::debug!(principal_id = %target, "Skipped: {}", e),
                },
                None => {
                    tracing::debug!(principal_id = %target, "Not connected, skipping");
                }
            }
        }

        delivered
    }
}
