//! Key-Value ストアと、その上に載る History / Presence ストア
//!
//! - `memory`: TTL 付きインメモリ Key-Value ストア
//! - `history`: Room 履歴とオフライン通知キュー
//! - `presence`: PresenceMark・参加中 Room・Room スナップショット

pub mod history;
pub mod keys;
pub mod memory;
pub mod presence;

pub use history::{HistoryLimits, KvHistoryStore};
pub use memory::InMemoryKeyValueStore;
pub use presence::{KvPresenceStore, PresenceTtls};
