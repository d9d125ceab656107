//! ストアのキー設計
//!
//! | key | 内容 |
//! |---|---|
//! | `room:{id}:metadata` | RoomSnapshot |
//! | `room:{id}:messages` | Message のリスト |
//! | `offline_notifications:{principal_id}` | Notification のリスト |
//! | `user:{principal_id}:online` | PresenceMark |
//! | `user:{principal_id}:rooms` | 参加中 Room ID の配列 |

use crate::domain::{PrincipalId, RoomId};

pub fn room_metadata(room_id: &RoomId) -> String {
    format!("room:{room_id}:metadata")
}

pub fn room_messages(room_id: &RoomId) -> String {
    format!("room:{room_id}:messages")
}

pub fn offline_notifications(principal_id: &PrincipalId) -> String {
    format!("offline_notifications:{principal_id}")
}

pub fn user_online(principal_id: &PrincipalId) -> String {
    format!("user:{principal_id}:online")
}

pub fn user_rooms(principal_id: &PrincipalId) -> String {
    format!("user:{principal_id}:rooms")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        // テスト項目: キーの形式
        // given (前提条件):
        let room_id = RoomId::new("general".to_string()).unwrap();
        let principal_id = PrincipalId::new("alice".to_string()).unwrap();

        // when (操作):
        // then (期待する結果):
        assert_eq!(room_metadata(&room_id), "room:general:metadata");
        assert_eq!(room_messages(&room_id), "room:general:messages");
        assert_eq!(
            offline_notifications(&principal_id),
            "offline_notifications:alice"
        );
        assert_eq!(user_online(&principal_id), "user:alice:online");
        assert_eq!(user_rooms(&principal_id), "user:alice:rooms");
    }
}
