//! # pingwire-server
//!
//! Axum `WebSocket` echo server.
//!
//! - Per-connection liveness supervisor: periodic probe, timer released on close
//! - Fixed echo reply to every inbound text frame
//! - `GET /health` with the live connection count
//! - Explicit `start` / `stop` lifecycle via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::{ServerError, SupervisorError, TransportError};
pub use server::EchoServer;
