//! `WebSocket` connection management, liveness supervision, and echo dispatch.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `transport` | `Connection` trait, connection state, typed connection events |
//! | `connection` | axum-backed `Connection` with a bounded outbound queue |
//! | `supervisor` | Per-connection probe timer, released exactly once on close |
//! | `handler` | Fixed echo reply to inbound text |
//! | `registry` | Live connections, for health reporting |
//! | `session` | Per-socket read/write loops and event dispatch |

pub mod connection;
pub mod handler;
pub mod registry;
pub mod session;
pub mod supervisor;
pub mod transport;
