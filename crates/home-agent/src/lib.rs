//! Persistent bridge between a remote control server and a local
//! Home Assistant API.
//!
//! The agent keeps one long-lived WebSocket to the control server, executes
//! the commands it receives against the local REST API, and replies with
//! results tagged by the peer's correlation id.
//!
//! # Architecture
//!
//! ```text
//! Control server <--ws--> Session --HTTP--> Home Assistant
//!                            ^
//!                       Supervisor (reconnect forever)
//! ```
//!
//! The supervisor runs one session at a time. A session performs the
//! handshake, then runs a heartbeat task and the inbound dispatch loop
//! concurrently over the single connection until either fails or a stop is
//! requested.

pub mod commands;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod messages;
pub mod session;
pub mod supervisor;

pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use supervisor::Supervisor;
