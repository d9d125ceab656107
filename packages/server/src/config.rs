//! 起動オプションとコーディネーターの設定
//!
//! CLI 引数・環境変数（`HIROBA_*`）は `ServerArgs` で受け取り、
//! ライブラリ側は型付きの `CoordinatorConfig` だけを見る。

use std::{sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    domain::{AllowAll, MemberCapacityPolicy, RoomAccessPolicy},
    infrastructure::store::{HistoryLimits, PresenceTtls},
};

const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "hiroba-server")]
#[command(about = "Real-time session and room messaging coordinator", long_about = None)]
pub struct ServerArgs {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIROBA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIROBA_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Messages kept per room
    #[arg(long, env = "HIROBA_HISTORY_CAPACITY", default_value_t = 50)]
    pub history_capacity: usize,

    /// Notifications kept per offline principal
    #[arg(long, env = "HIROBA_OFFLINE_CAPACITY", default_value_t = 50)]
    pub offline_capacity: usize,

    /// Messages replayed on join / reconnect
    #[arg(long, env = "HIROBA_HISTORY_REPLAY_LIMIT", default_value_t = 50)]
    pub history_replay_limit: usize,

    #[arg(long, env = "HIROBA_HISTORY_TTL_SECS", default_value_t = DAY_SECS)]
    pub history_ttl_secs: u64,

    #[arg(long, env = "HIROBA_OFFLINE_TTL_SECS", default_value_t = 7 * DAY_SECS)]
    pub offline_ttl_secs: u64,

    #[arg(long, env = "HIROBA_PRESENCE_TTL_SECS", default_value_t = DAY_SECS)]
    pub presence_ttl_secs: u64,

    #[arg(long, env = "HIROBA_ROOM_METADATA_TTL_SECS", default_value_t = DAY_SECS)]
    pub room_metadata_ttl_secs: u64,

    #[arg(long, env = "HIROBA_ACTIVE_ROOMS_TTL_SECS", default_value_t = 7 * DAY_SECS)]
    pub active_rooms_ttl_secs: u64,

    /// Interval of the cleanup sweep
    #[arg(
        long,
        env = "HIROBA_SWEEP_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,

    /// Deadline for reading reconnect state from the store
    #[arg(long, env = "HIROBA_REPLAY_TIMEOUT_MS", default_value_t = 2000)]
    pub replay_timeout_ms: u64,

    /// Maximum members per room (admins are exempt)
    #[arg(long, env = "HIROBA_ROOM_CAPACITY")]
    pub room_capacity: Option<usize>,
}

impl ServerArgs {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            history_capacity: self.history_capacity,
            offline_capacity: self.offline_capacity,
            replay_limit: self.history_replay_limit,
            history_ttl: Duration::from_secs(self.history_ttl_secs),
            offline_ttl: Duration::from_secs(self.offline_ttl_secs),
            presence_ttl: Duration::from_secs(self.presence_ttl_secs),
            room_metadata_ttl: Duration::from_secs(self.room_metadata_ttl_secs),
            active_rooms_ttl: Duration::from_secs(self.active_rooms_ttl_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            replay_timeout: Duration::from_millis(self.replay_timeout_ms),
            room_capacity: self.room_capacity,
        }
    }
}

/// コーディネーターの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub history_capacity: usize,
    pub offline_capacity: usize,
    /// join・再接続時に再送する履歴の件数
    pub replay_limit: usize,
    pub history_ttl: Duration,
    pub offline_ttl: Duration,
    pub presence_ttl: Duration,
    pub room_metadata_ttl: Duration,
    pub active_rooms_ttl: Duration,
    pub sweep_interval: Duration,
    pub replay_timeout: Duration,
    pub room_capacity: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            offline_capacity: 50,
            replay_limit: 50,
            history_ttl: Duration::from_secs(DAY_SECS),
            offline_ttl: Duration::from_secs(7 * DAY_SECS),
            presence_ttl: Duration::from_secs(DAY_SECS),
            room_metadata_ttl: Duration::from_secs(DAY_SECS),
            active_rooms_ttl: Duration::from_secs(7 * DAY_SECS),
            sweep_interval: Duration::from_secs(300),
            replay_timeout: Duration::from_millis(2000),
            room_capacity: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn history_limits(&self) -> HistoryLimits {
        HistoryLimits {
            history_capacity: self.history_capacity,
            offline_capacity: self.offline_capacity,
            history_ttl: self.history_ttl,
            offline_ttl: self.offline_ttl,
        }
    }

    pub fn presence_ttls(&self) -> PresenceTtls {
        PresenceTtls {
            presence: self.presence_ttl,
            active_rooms: self.active_rooms_ttl,
            room_metadata: self.room_metadata_ttl,
        }
    }

    /// `room_capacity` があれば人数上限、なければ常に許可
    pub fn access_policy(&self) -> Arc<dyn RoomAccessPolicy> {
        match self.room_capacity {
            Some(capacity) => Arc::new(MemberCapacityPolicy::new(capacity)),
            None => Arc::new(AllowAll),
        }
    }
}
