//! Wire message types and the encode/decode pair.
//!
//! A wire frame is exactly one JSON object on a single line. serde_json
//! escapes control characters inside strings, so the delimiter can never
//! appear inside a valid payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::DELIMITER;

/// A notification protocol message.
///
/// The `type` field on the wire is a closed discriminator: `watching` or
/// `changed`. Anything else is a decode error, never a silently ignored case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Sent once per connection, immediately after accept.
    Watching { file: String },
    /// Sent once per observed modification of the watched resource.
    Changed {
        /// Milliseconds since the Unix epoch at the moment the change
        /// was observed.
        timestamp: u64,
    },
}

/// Encode a message to its wire form: JSON object plus trailing delimiter.
///
/// Pure, no side effects. `Message` is built from plain strings and integers,
/// so serialization cannot fail; a serializer error here would be a bug in
/// the type itself.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut bytes =
        serde_json::to_vec(message).expect("Message serializes from strings and integers");
    bytes.push(DELIMITER);
    bytes
}

/// Decode one framed line into a [`Message`].
///
/// Two-step on purpose: malformed JSON and an out-of-set discriminator are
/// distinct failures, and both must point at one specific frame rather than
/// poison the framer.
pub fn decode(raw: &str) -> Result<Message, ProtocolError> {
    let value: Value = serde_json::from_str(raw)?;
    match value.get("type").and_then(Value::as_str) {
        Some("watching") | Some("changed") => Ok(serde_json::from_value(value)?),
        Some(other) => Err(ProtocolError::UnknownMessageType {
            found: other.to_string(),
        }),
        None => Err(ProtocolError::MissingMessageType),
    }
}
