//! UseCase のテスト用フィクスチャ

use std::sync::Arc;

use hiroba_shared::time::{Clock, ManualClock};
use tokio::sync::mpsc;

use super::RoomLocks;
use crate::{
    domain::{
        ConnectionHandle, ConnectionRegistry, EventPayload, Locale, MessageIdGenerator,
        OutboundFrame, Principal, PrincipalId, Role, RoomId, Timestamp,
    },
    infrastructure::{
        registry::InMemoryConnectionRegistry,
        repository::InMemoryRoomRepository,
        store::{HistoryLimits, InMemoryKeyValueStore, KvHistoryStore, KvPresenceStore, PresenceTtls},
        translator::StaticTranslator,
    },
};

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Fixture {
    pub rooms: Arc<InMemoryRoomRepository>,
    pub registry: Arc<InMemoryConnectionRegistry>,
    pub store: Arc<InMemoryKeyValueStore>,
    pub history: Arc<KvHistoryStore>,
    pub presence: Arc<KvPresenceStore>,
    pub locks: Arc<RoomLocks>,
    pub ids: Arc<MessageIdGenerator>,
    pub translator: Arc<StaticTranslator>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let store = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
        Self {
            rooms: Arc::new(InMemoryRoomRepository::new()),
            registry: Arc::new(InMemoryConnectionRegistry::new()),
            history: Arc::new(KvHistoryStore::new(
                store.clone(),
                clock.clone(),
                HistoryLimits::default(),
            )),
            presence: Arc::new(KvPresenceStore::new(store.clone(), PresenceTtls::default())),
            store,
            locks: Arc::new(RoomLocks::new()),
            ids: Arc::new(MessageIdGenerator::new()),
            translator: Arc::new(StaticTranslator::new()),
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub fn principal(&self, id: &str) -> Principal {
        Principal::new(principal_id(id), Role::Member, Locale::default(), self.now())
    }

    /// 接続を直接 Registry に登録する
    pub async fn connect(&self, id: &str) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(self.principal(id), self.now(), tx);
        self.registry.register(handle).await;
        rx
    }
}

pub fn principal_id(id: &str) -> PrincipalId {
    PrincipalId::new(id.to_string()).unwrap()
}

pub fn room_id(id: &str) -> RoomId {
    RoomId::new(id.to_string()).unwrap()
}

/// 受信済みのイベントをすべて取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<EventPayload> {
    let mut payloads = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let OutboundFrame::Event(event) = frame {
            payloads.push(event.payload);
        }
    }
    payloads
}
