//! Hiroba server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --room-capacity 100
//! ```

use std::sync::Arc;

use clap::Parser;
use hiroba_server::{
    config::ServerArgs,
    coordinator::Coordinator,
    infrastructure::{store::InMemoryKeyValueStore, translator::StaticTranslator},
    ui::Server,
};
use hiroba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = ServerArgs::parse();
    let config = args.coordinator_config();
    tracing::info!(?config, "Starting coordinator");

    // Initialize dependencies in order:
    // 1. Clock / Store / Translator / Policy
    // 2. Coordinator (registry, rooms, usecases)
    // 3. Sweeper
    // 4. Server
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryKeyValueStore::new(clock.clone()));
    let translator = Arc::new(StaticTranslator::new());
    let policy = config.access_policy();

    let coordinator = Arc::new(Coordinator::new(config, store, policy, translator, clock));
    let _sweeper = coordinator.spawn_sweeper();

    let server = Server::new(coordinator);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
