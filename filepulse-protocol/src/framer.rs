//! Stateful frame reconstruction from an arbitrarily chunked byte stream.

use crate::error::ProtocolError;
use crate::DELIMITER;

/// Default cap on delimiter-less bytes buffered per connection.
///
/// The largest legal frame is tens of bytes; 1 MiB bounds memory against a
/// peer that never sends a delimiter while staying far above anything a
/// well-behaved sender produces.
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Reconstructs newline-delimited frames from raw byte chunks.
///
/// One framer per connection; the buffer is exclusively owned. After every
/// [`feed`](LineFramer::feed) the buffer holds at most one partial frame —
/// never a complete, unconsumed one.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_frame: usize,
    /// Set once the stream is beyond recovery; every later feed fails.
    fatal: Option<Fatal>,
}

/// Stream-fatal conditions, kept separately so they can be re-reported on
/// every call after the one that detected them.
#[derive(Debug, Clone)]
enum Fatal {
    Utf8(std::string::FromUtf8Error),
    FrameTooLarge { buffered: usize, limit: usize },
}

impl Fatal {
    fn to_error(&self) -> ProtocolError {
        match self {
            Fatal::Utf8(err) => ProtocolError::Utf8(err.clone()),
            Fatal::FrameTooLarge { buffered, limit } => ProtocolError::FrameTooLarge {
                buffered: *buffered,
                limit: *limit,
            },
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Framer with a custom cap on buffered delimiter-less bytes.
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame,
            fatal: None,
        }
    }

    /// Append a chunk and return every frame it completes, in arrival order.
    ///
    /// A chunk may complete zero frames (no delimiter yet), one, or many.
    /// Trailing bytes after the last delimiter stay buffered for the next
    /// call. Decoding each returned line as JSON is the caller's job, so a
    /// malformed payload is an error on one message, not a framing failure.
    ///
    /// A fatal condition (non-UTF-8 frame, oversized partial frame) never
    /// swallows frames completed earlier in the same chunk: those are
    /// returned, and the error is reported on this call only when there was
    /// nothing to deliver, otherwise on every call after it.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProtocolError> {
        if let Some(fatal) = &self.fatal {
            return Err(fatal.to_error());
        }

        self.buffer.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(boundary) = self.buffer.iter().position(|b| *b == DELIMITER) {
            let mut frame: Vec<u8> = self.buffer.drain(..=boundary).collect();
            frame.pop(); // drop the delimiter itself
            match String::from_utf8(frame) {
                Ok(frame) => frames.push(frame),
                Err(err) => {
                    self.fatal = Some(Fatal::Utf8(err));
                    break;
                }
            }
        }

        if self.fatal.is_none() && self.buffer.len() > self.max_frame {
            self.fatal = Some(Fatal::FrameTooLarge {
                buffered: self.buffer.len(),
                limit: self.max_frame,
            });
        }

        match &self.fatal {
            Some(fatal) if frames.is_empty() => Err(fatal.to_error()),
            _ => Ok(frames),
        }
    }

    /// Bytes currently buffered without a terminating delimiter.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
