//! Hiroba: real-time session and room messaging coordinator.
//!
//! Authenticated principals connect over WebSocket, join rooms, exchange
//! room and private messages, and receive presence changes. Messages sent to
//! offline principals are queued and replayed on their next connection.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
pub mod coordinator;
