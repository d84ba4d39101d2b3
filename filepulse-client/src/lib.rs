//! Subscriber-side protocol client.
//!
//! [`ProtocolClient`] owns a byte-stream source and exposes typed message
//! consumption on top of it: composition over a [`LineFramer`], no event
//! plumbing underneath. One client per connection; the framer buffer is
//! exclusively owned.

use std::collections::VecDeque;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use filepulse_protocol::{decode, LineFramer, Message, ProtocolError};

const READ_CHUNK: usize = 4096;

/// Errors surfaced to the subscriber.
///
/// Both variants are fatal to this connection, never to the process.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed frame or out-of-set message type.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The underlying transport failed mid-read.
    #[error("transport read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads framed messages off an inbound byte stream.
pub struct ProtocolClient<R> {
    reader: R,
    framer: LineFramer,
    /// Framed lines not yet handed to the caller, oldest first.
    pending: VecDeque<String>,
}

impl<R: AsyncRead + Unpin> ProtocolClient<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            framer: LineFramer::new(),
            pending: VecDeque::new(),
        }
    }

    /// Client with a custom cap on buffered delimiter-less bytes.
    pub fn with_max_frame(reader: R, max_frame: usize) -> Self {
        Self {
            reader,
            framer: LineFramer::with_max_frame(max_frame),
            pending: VecDeque::new(),
        }
    }

    /// Next decoded message, `Ok(None)` on clean end-of-stream.
    ///
    /// A decode failure consumes exactly the offending frame; calling again
    /// continues with the next one, so one bad payload never corrupts the
    /// rest of the stream.
    pub async fn next_message(&mut self) -> Result<Option<Message>, ClientError> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                return Ok(Some(decode(&raw)?));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let read = self.reader.read(&mut chunk).await?;
            if read == 0 {
                if self.framer.buffered() > 0 {
                    // Truncated trailing frame at EOF has no well-formed
                    // reading; the reference behavior is to drop it.
                    tracing::debug!(
                        buffered = self.framer.buffered(),
                        "discarding partial frame at end of stream",
                    );
                }
                return Ok(None);
            }

            self.pending.extend(self.framer.feed(&chunk[..read])?);
        }
    }

    /// Drain the stream, invoking `handler` once per decoded message.
    ///
    /// Returns on clean end-of-stream; the first protocol or transport error
    /// ends the subscription.
    pub async fn for_each<F>(mut self, mut handler: F) -> Result<(), ClientError>
    where
        F: FnMut(Message),
    {
        while let Some(message) = self.next_message().await? {
            handler(message);
        }
        Ok(())
    }
}
