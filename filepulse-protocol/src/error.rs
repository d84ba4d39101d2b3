//! Error types for filepulse-protocol.

use thiserror::Error;

/// All errors that can arise while framing or decoding wire messages.
///
/// Every variant is fatal to the connection it occurred on, never to the
/// process: the owning session reacts by closing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A framed line was not valid JSON.
    #[error("malformed JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` discriminator held a value outside the declared set.
    #[error("unrecognized message type '{found}'")]
    UnknownMessageType { found: String },

    /// The JSON object carried no `type` discriminator at all.
    #[error("message has no 'type' field")]
    MissingMessageType,

    /// Bytes between delimiters were not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The peer sent more delimiter-less bytes than the framer allows.
    #[error("frame exceeds {limit} bytes ({buffered} buffered without a delimiter)")]
    FrameTooLarge { buffered: usize, limit: usize },
}
