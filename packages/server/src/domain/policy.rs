//! Room 参加可否のポリシー
//!
//! join の直前、Room の状態を変更する前に評価される。パスワード付き Room や
//! BAN リストなど実際のルールは利用側のシステムが実装する。
//! 既定は常に許可する `AllowAll`。

use super::{
    error::DenyReason,
    value_object::{PrincipalId, Role, RoomId},
};

/// 参加可否の判定に渡す情報
#[derive(Debug, Clone)]
pub struct AccessRequest<'a> {
    pub room_id: &'a RoomId,
    pub principal_id: &'a PrincipalId,
    pub role: Role,
    pub access_token: Option<&'a str>,
    /// 判定時点のメンバー数（Room が未作成なら 0）
    pub current_members: usize,
}

pub trait RoomAccessPolicy: Send + Sync {
    fn check(&self, request: &AccessRequest<'_>) -> Result<(), DenyReason>;
}

/// 常に許可する
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RoomAccessPolicy for AllowAll {
    fn check(&self, _request: &AccessRequest<'_>) -> Result<(), DenyReason> {
        Ok(())
    }
}

/// Room ごとの人数上限（admin は対象外）
#[derive(Debug, Clone, Copy)]
pub struct MemberCapacityPolicy {
    capacity: usize,
}

impl MemberCapacityPolicy {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl RoomAccessPolicy for MemberCapacityPolicy {
    fn check(&self, request: &AccessRequest<'_>) -> Result<(), DenyReason> {
        if request.role == Role::Admin || request.current_members < self.capacity {
            Ok(())
        } else {
            Err(DenyReason::RoomFull {
                capacity: self.capacity,
            })
        }
    }
}
