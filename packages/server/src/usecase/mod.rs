//! UseCase 層
//!
//! 1 ファイル 1 ユースケース。ユースケースはドメイン層の trait にだけ依存し、
//! `Coordinator` がそれらを組み立てる。

pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_rooms;
pub mod join_room;
pub mod leave_room;
pub mod presence;
pub mod room_locks;
pub mod send_message;
pub mod send_private_message;
pub mod sweep;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect_participant::{ConnectParticipantUseCase, ConnectedSession};
pub use disconnect_participant::{DisconnectParticipantUseCase, DisconnectReport};
pub use error::CommandError;
pub use get_rooms::{GetRoomDetailUseCase, GetRoomsUseCase, MemberPresence, RoomDetail};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use presence::{GetOnlineUsersUseCase, GetUserStatusUseCase, UserStatus};
pub use room_locks::RoomLocks;
pub use send_message::{RoomMessageInput, SendRoomMessageUseCase};
pub use send_private_message::{PrivateDelivery, SendPrivateMessageUseCase};
pub use sweep::{SweepReport, SweepUseCase, spawn_sweeper};
pub use typing::TypingUseCase;
