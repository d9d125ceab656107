//! Connection Registry の実装
//!
//! - `in_memory`: プロセス内の接続テーブル（tokio mpsc チャンネル経由で送信）

pub mod in_memory;

pub use in_memory::InMemoryConnectionRegistry;
