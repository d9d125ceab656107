//! ドメイン層
//!
//! Value Object・Entity・送受信イベントと、Infrastructure 層が実装する
//! trait（Repository / Registry / Store / Policy / Translator）を定義する。

pub mod command;
pub mod entity;
pub mod error;
pub mod event;
pub mod factory;
pub mod policy;
pub mod registry;
pub mod repository;
pub mod translator;
pub mod value_object;

pub use command::Command;
pub use entity::{
    Message, MessageTarget, Notification, NotificationKind, PresenceMark, Principal, Room,
    RoomSnapshot,
};
pub use error::{DenyReason, PushError, StoreError, ValueObjectError};
pub use event::{ErrorCode, EventPayload, OnlineUser, ServerEvent};
pub use factory::MessageIdGenerator;
pub use policy::{AccessRequest, AllowAll, MemberCapacityPolicy, RoomAccessPolicy};
pub use registry::{
    ConnectionHandle, ConnectionRegistry, OutboundFrame, PusherChannel, SUPERSEDED_CLOSE_CODE,
    SUPERSEDED_CLOSE_REASON,
};
pub use repository::{
    HistoryStore, JoinOutcome, KeyValueStore, LeaveOutcome, PresenceStore, RoomRepository,
    RoomSweep,
};
#[cfg(test)]
pub use repository::MockKeyValueStore;
pub use translator::Translator;
pub use value_object::{
    ConnectionId, Locale, MessageBody, MessageId, MessageKind, NotificationId, PresenceState,
    PrincipalId, Role, RoomId, Timestamp,
};
