//! # pingwire-core
//!
//! Foundation types shared by every pingwire crate.
//!
//! - [`ids::ConnectionId`]: branded, time-ordered connection identifier
//! - [`constants`]: wire literals and default tunables
//! - [`logging`]: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod constants;
pub mod ids;
pub mod logging;

pub use ids::ConnectionId;
