//! # pingwire-client
//!
//! Connects to an echo server, sends the greeting, and surfaces every
//! inbound frame as a typed [`ClientEvent`].

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;

pub use client::{ClientEvent, ClientSession, EchoClient};
pub use config::ClientConfig;
pub use errors::ClientError;
