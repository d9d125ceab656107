//! WebSocket / HTTP アダプター
//!
//! axum のルーティングとハンドラー。コマンドの処理そのものは `Coordinator` に任せる。

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
