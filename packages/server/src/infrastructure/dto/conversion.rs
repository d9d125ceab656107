//! Conversion logic between DTOs and domain types.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{
        Command, EventPayload, Message, MessageKind, Notification, OnlineUser, Principal,
        PrincipalId, Room, RoomId, ServerEvent, ValueObjectError,
    },
    infrastructure::dto::{http, websocket as dto},
    usecase::RoomDetail,
};

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<dto::ClientCommandDto> for Command {
    type Error = ValueObjectError;

    fn try_from(value: dto::ClientCommandDto) -> Result<Self, Self::Error> {
        use dto::ClientCommandDto as C;

        let command = match value {
            C::JoinRoom {
                room_id,
                access_token,
            } => Command::JoinRoom {
                room_id: RoomId::new(room_id)?,
                access_token,
            },
            C::LeaveRoom { room_id } => Command::LeaveRoom {
                room_id: RoomId::new(room_id)?,
            },
            C::SendRoomMessage {
                room_id,
                body,
                message_type,
                metadata,
            } => Command::SendRoomMessage {
                room_id: RoomId::new(room_id)?,
                body,
                kind: MessageKind::parse(message_type.as_deref())?,
                metadata,
            },
            C::SendPrivateMessage {
                target_principal_id,
                body,
                message_type,
            } => Command::SendPrivateMessage {
                target_id: PrincipalId::new(target_principal_id)?,
                body,
                kind: MessageKind::parse(message_type.as_deref())?,
            },
            C::TypingStart { room_id } => Command::Typing {
                room_id: RoomId::new(room_id)?,
                is_typing: true,
            },
            C::TypingStop { room_id } => Command::Typing {
                room_id: RoomId::new(room_id)?,
                is_typing: false,
            },
            C::GetOnlineUsers => Command::GetOnlineUsers,
            C::GetUserStatus { principal_id } => Command::GetUserStatus {
                principal_id: PrincipalId::new(principal_id)?,
            },
        };
        Ok(command)
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Message> for dto::MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.value(),
            room_id: message.room_id().map(|id| id.as_str().to_string()),
            target_principal_id: message.target_principal_id().map(|id| id.as_str().to_string()),
            sender_id: message.sender_id.as_str().to_string(),
            body: message.body.as_str().to_string(),
            message_type: message.kind.as_str().to_string(),
            created_at: message.created_at.value(),
            edited: message.edited,
            reactions: message
                .reactions
                .iter()
                .map(|(emoji, principals)| {
                    (
                        emoji.clone(),
                        principals.iter().map(|id| id.as_str().to_string()).collect(),
                    )
                })
                .collect(),
            metadata: message.metadata.clone(),
        }
    }
}

impl From<&Principal> for dto::PrincipalDto {
    fn from(principal: &Principal) -> Self {
        Self {
            principal_id: principal.id.as_str().to_string(),
            role: principal.role,
            locale: principal.locale.as_str().to_string(),
            connected_at: principal.connected_at.value(),
        }
    }
}

impl From<&OnlineUser> for dto::OnlineUserDto {
    fn from(user: &OnlineUser) -> Self {
        Self {
            principal_id: user.principal_id.as_str().to_string(),
            role: user.role,
            connected_at: user.connected_at.value(),
        }
    }
}

fn notification_dto(notification: &Notification, text: &str) -> dto::NotificationDto {
    dto::NotificationDto {
        id: notification.id.to_string(),
        kind: notification.kind.translation_key().to_string(),
        text: text.to_string(),
        message: dto::MessageDto::from(&notification.message),
        created_at: notification.created_at.value(),
    }
}

fn ids<T: ToString>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl From<&EventPayload> for dto::EventPayloadDto {
    fn from(payload: &EventPayload) -> Self {
        use dto::EventPayloadDto as D;

        match payload {
            EventPayload::Connected {
                connection_id,
                principal,
                restored_rooms,
            } => D::Connected {
                connection_id: connection_id.to_string(),
                principal: principal.into(),
                restored_rooms: ids(restored_rooms),
            },
            EventPayload::JoinedRoom { room_id, members } => D::JoinedRoom {
                room_id: room_id.to_string(),
                members: ids(members),
            },
            EventPayload::JoinRoomError {
                room_id,
                code,
                message,
            } => D::JoinRoomError {
                room_id: room_id.to_string(),
                code: *code,
                message: message.clone(),
            },
            EventPayload::LeftRoom { room_id } => D::LeftRoom {
                room_id: room_id.to_string(),
            },
            EventPayload::NewMessage { message } => D::NewMessage {
                message: message.into(),
            },
            EventPayload::PrivateMessage { message } => D::PrivateMessage {
                message: message.into(),
            },
            EventPayload::MessageHistory { room_id, messages } => D::MessageHistory {
                room_id: room_id.to_string(),
                messages: messages.iter().map(dto::MessageDto::from).collect(),
            },
            EventPayload::UserJoinedRoom {
                room_id,
                principal_id,
            } => D::UserJoinedRoom {
                room_id: room_id.to_string(),
                principal_id: principal_id.to_string(),
            },
            EventPayload::UserLeftRoom {
                room_id,
                principal_id,
            } => D::UserLeftRoom {
                room_id: room_id.to_string(),
                principal_id: principal_id.to_string(),
            },
            EventPayload::UserTyping {
                room_id,
                principal_id,
                is_typing,
            } => D::UserTyping {
                room_id: room_id.to_string(),
                principal_id: principal_id.to_string(),
                is_typing: *is_typing,
            },
            EventPayload::UserOffline {
                principal_id,
                last_seen_at,
            } => D::UserOffline {
                principal_id: principal_id.to_string(),
                last_seen_at: last_seen_at.value(),
            },
            EventPayload::UserStatusChanged {
                principal_id,
                state,
            } => D::UserStatusChanged {
                principal_id: principal_id.to_string(),
                status: *state,
            },
            EventPayload::Notification { notification, text } => D::Notification {
                notification: notification_dto(notification, text),
            },
            EventPayload::OnlineUsers { users } => D::OnlineUsers {
                users: users.iter().map(dto::OnlineUserDto::from).collect(),
            },
            EventPayload::UserStatus {
                principal_id,
                state,
                last_seen_at,
            } => D::UserStatus {
                principal_id: principal_id.to_string(),
                status: *state,
                last_seen_at: last_seen_at.map(|at| at.value()),
            },
            EventPayload::Error { code, message } => D::Error {
                code: *code,
                message: message.clone(),
            },
        }
    }
}

impl From<&ServerEvent> for dto::OutboundEventDto {
    fn from(event: &ServerEvent) -> Self {
        Self {
            payload: (&event.payload).into(),
            timestamp: event.timestamp.value(),
        }
    }
}

impl From<&Room> for http::RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            members: room.members.iter().map(|id| id.to_string()).collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(room.last_activity_at.value()),
        }
    }
}

impl From<&RoomDetail> for http::RoomDetailDto {
    fn from(detail: &RoomDetail) -> Self {
        Self {
            id: detail.room.id.to_string(),
            members: detail
                .members
                .iter()
                .map(|member| http::RoomMemberDto {
                    principal_id: member.principal_id.to_string(),
                    online: member.online,
                })
                .collect(),
            created_at: timestamp_to_rfc3339(detail.room.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(detail.room.last_activity_at.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{ErrorCode, MessageBody, MessageId, Role, Timestamp};

    fn decode(json: serde_json::Value) -> Result<Command, String> {
        let dto: dto::ClientCommandDto =
            serde_json::from_value(json).map_err(|e| e.to_string())?;
        Command::try_from(dto).map_err(|e| e.to_string())
    }

    #[test]
    fn test_decode_send_room_message() {
        // テスト項目: sendRoomMessage が Command に変換される
        // given (前提条件):
        let json = json!({
            "type": "sendRoomMessage",
            "roomId": "general",
            "body": "hello",
            "messageType": "image",
            "metadata": {"width": 10}
        });

        // when (操作):
        let command = decode(json).unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            Command::SendRoomMessage {
                room_id: RoomId::new("general".to_string()).unwrap(),
                body: "hello".to_string(),
                kind: MessageKind::Image,
                metadata: Some(json!({"width": 10})),
            }
        );
    }

    #[test]
    fn test_decode_typing_and_queries() {
        // テスト項目: typingStart / typingStop / getOnlineUsers が変換される
        // given (前提条件):
        let start = json!({"type": "typingStart", "roomId": "general"});
        let stop = json!({"type": "typingStop", "roomId": "general"});
        let online = json!({"type": "getOnlineUsers"});

        // when (操作):
        let start = decode(start).unwrap();
        let stop = decode(stop).unwrap();
        let online = decode(online).unwrap();

        // then (期待する結果):
        assert_eq!(start.name(), "typingStart");
        assert_eq!(stop.name(), "typingStop");
        assert_eq!(online, Command::GetOnlineUsers);
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        // テスト項目: 不正な ID・未知の種別・未知のコマンドは拒否される
        // given (前提条件):
        let bad_room = json!({"type": "joinRoom", "roomId": "has space"});
        let bad_kind = json!({
            "type": "sendPrivateMessage",
            "targetPrincipalId": "bob",
            "body": "hi",
            "messageType": "video"
        });
        let unknown = json!({"type": "dance"});

        // when (操作):
        // then (期待する結果):
        assert!(decode(bad_room).is_err());
        assert!(decode(bad_kind).is_err());
        assert!(decode(unknown).is_err());
    }

    #[test]
    fn test_encode_new_message_event() {
        // テスト項目: newMessage イベントが type タグと timestamp 付きの JSON になる
        // given (前提条件):
        let message = Message::to_room(
            MessageId::new(3),
            RoomId::new("general".to_string()).unwrap(),
            PrincipalId::new("alice".to_string()).unwrap(),
            MessageBody::new("hello".to_string()).unwrap(),
            MessageKind::Text,
            Timestamp::new(1000),
        );
        let event = ServerEvent::new(Timestamp::new(1001), EventPayload::NewMessage { message });

        // when (操作):
        let value = serde_json::to_value(dto::OutboundEventDto::from(&event)).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "newMessage");
        assert_eq!(value["timestamp"], 1001);
        assert_eq!(value["message"]["id"], 3);
        assert_eq!(value["message"]["roomId"], "general");
        assert_eq!(value["message"]["senderId"], "alice");
        assert_eq!(value["message"]["messageType"], "text");
        assert!(value["message"].get("targetPrincipalId").is_none());
    }

    #[test]
    fn test_encode_error_event() {
        // テスト項目: error イベントのコードは SCREAMING_SNAKE_CASE
        // given (前提条件):
        let event = ServerEvent::new(
            Timestamp::new(5),
            EventPayload::Error {
                code: ErrorCode::NotInRoom,
                message: "not in room".to_string(),
            },
        );

        // when (操作):
        let value = serde_json::to_value(dto::OutboundEventDto::from(&event)).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "NOT_IN_ROOM");
        assert_eq!(value["message"], "not in room");
    }

    #[test]
    fn test_room_summary_uses_rfc3339() {
        // テスト項目: Room の時刻は RFC 3339 文字列になる
        // given (前提条件):
        let mut room = Room::new(RoomId::new("general".to_string()).unwrap(), Timestamp::new(0));
        room.add_member(
            PrincipalId::new("alice".to_string()).unwrap(),
            Timestamp::new(1000),
        );

        // when (操作):
        let summary = http::RoomSummaryDto::from(&room);

        // then (期待する結果):
        assert_eq!(summary.members, vec!["alice"]);
        assert_eq!(summary.created_at, "1970-01-01T00:00:00.000Z");
        assert_eq!(summary.last_activity_at, "1970-01-01T00:00:01.000Z");
    }

    #[test]
    fn test_principal_dto() {
        // テスト項目: Principal が DTO に変換される
        // given (前提条件):
        let principal = Principal::new(
            PrincipalId::new("alice".to_string()).unwrap(),
            Role::Admin,
            crate::domain::Locale::new(Some("ja".to_string())),
            Timestamp::new(42),
        );

        // when (操作):
        let dto = dto::PrincipalDto::from(&principal);

        // then (期待する結果):
        assert_eq!(dto.principal_id, "alice");
        assert_eq!(dto.role, Role::Admin);
        assert_eq!(dto.locale, "ja");
        assert_eq!(dto.connected_at, 42);
    }
}
