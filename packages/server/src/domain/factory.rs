//! ID の採番

use std::sync::atomic::{AtomicU64, Ordering};

use super::value_object::MessageId;

/// メッセージ ID の採番器
///
/// コーディネーターのインスタンス内で一意かつ単調増加。最初の ID は 1。
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> MessageId {
        MessageId::new(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
