//! Echo dispatch: every inbound text gets the same fixed reply.

use pingwire_core::constants::{REPLY_MESSAGE, REPLY_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// The fixed reply sent for every inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    /// Type tag, always `"Hello"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `"hi"`.
    pub message: String,
}

impl Default for EchoReply {
    fn default() -> Self {
        Self {
            kind: REPLY_TYPE.into(),
            message: REPLY_MESSAGE.into(),
        }
    }
}

/// Handle an inbound text payload and return the serialized reply.
///
/// The payload is logged and never parsed.
#[instrument(skip_all, fields(len = message.len()))]
pub fn handle_message(message: &str) -> serde_json::Result<String> {
    info!(text = message, "received message");
    serde_json::to_string(&EchoReply::default())
}
