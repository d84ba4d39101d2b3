//! Filepulse wire protocol — line-delimited JSON over a byte stream.
//!
//! Public API surface:
//! - [`message`] — [`Message`] tagged union, [`encode`] / [`decode`]
//! - [`framer`] — [`LineFramer`], reconstructs frames from arbitrary chunks
//! - [`error`] — [`ProtocolError`]

pub mod error;
pub mod framer;
pub mod message;

pub use error::ProtocolError;
pub use framer::LineFramer;
pub use message::{decode, encode, Message};

/// Frame delimiter: every wire message is one JSON object followed by `\n`.
pub const DELIMITER: u8 = b'\n';
