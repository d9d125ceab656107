//! Server state shared by the handlers.

use std::sync::Arc;

use crate::coordinator::Coordinator;

/// Shared application state
pub struct AppState {
    /// Coordinator（接続・Room・配信の組み立て済みユースケース群）
    pub coordinator: Arc<Coordinator>,
}
