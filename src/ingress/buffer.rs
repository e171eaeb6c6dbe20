//! Command Buffer
//!
//! The read side of a client stream. Bytes are appended to a `BytesMut` as
//! they arrive and commands are parsed straight out of it.
//!
//! ## Buffer Lifecycle
//!
//! ```text
//! 1. Bytes arrive (socket read, file chunk, test reader)
//!        │
//!        ▼
//! 2. ┌──────────────────────────────┐
//!    │ Append to buffer             │
//!    └──────────────┬───────────────┘
//!                   ▼
//! 3. ┌──────────────────────────────┐
//!    │ Parse at the read offset     │──── incomplete ───> back to 1
//!    └──────────────┬───────────────┘
//!                   ▼
//! 4. ┌──────────────────────────────┐
//!    │ Caller uses the tokens       │
//!    └──────────────┬───────────────┘
//!                   ▼
//! 5. ┌──────────────────────────────┐
//!    │ Advance past the frame       │──── back to 3 (pipelining)
//!    └──────────────────────────────┘
//! ```
//!
//! Step 5 only happens after step 4 finishes. [`CommandBuffer::with_next_command`]
//! enforces that with a closure: tokens borrow the buffer, so they can't escape
//! the call that advances it.

use crate::protocol::{Command, CommandParser, ParseError, ParseOutcome, ParserLimits};
use bytes::{Buf, Bytes, BytesMut};
use std::ops::Range;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{error, trace, warn};

/// Maximum amount of unparsed data held for one stream (64 MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Free space below which the buffer grows before a read
const MIN_READ_SPACE: usize = 1024;

/// Errors that can occur while reading commands from a stream.
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    /// I/O error from the underlying reader
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream contains a malformed frame
    #[error("Parse error: {0}")]
    Protocol(#[from] ParseError),

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded: {size} bytes (max: {max})")]
    BufferFull { size: usize, max: usize },

    /// Stream ended in the middle of a frame
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// An owned command split off the buffer.
///
/// `raw` is the encoded frame; every token is a refcounted slice of it, so
/// producing a `Frame` copies no argument data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: Bytes,
    tokens: Vec<Bytes>,
}

impl Frame {
    /// The encoded frame, framing included.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn tokens(&self) -> &[Bytes] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Bytes> {
        self.tokens
    }

    /// The command name (first token), if any.
    pub fn name(&self) -> Option<&Bytes> {
        self.tokens.first()
    }

    /// Every token after the name.
    pub fn args(&self) -> &[Bytes] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Accumulates stream bytes and yields complete commands.
#[derive(Debug)]
pub struct CommandBuffer {
    /// Unparsed bytes; the read offset is always the front
    buffer: BytesMut,

    /// Bounds handed to every parse
    limits: ParserLimits,

    /// Largest amount of unparsed data we'll hold
    max_size: usize,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    /// Creates a buffer with default parser limits and size cap.
    pub fn new() -> Self {
        Self::with_limits(ParserLimits::default(), DEFAULT_MAX_BUFFER_SIZE)
    }

    /// Creates a buffer with explicit parser limits and size cap.
    pub fn with_limits(limits: ParserLimits, max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE.min(max_size)),
            limits,
            max_size,
        }
    }

    /// Number of buffered, unparsed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Drops every buffered byte.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Appends bytes received from the stream.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), IngressError> {
        let size = self.buffer.len() + data.len();
        if size > self.max_size {
            warn!(size, max = self.max_size, "Buffer size limit exceeded");
            return Err(IngressError::BufferFull {
                size,
                max: self.max_size,
            });
        }

        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Reads once from `reader` into the buffer.
    ///
    /// Returns the number of bytes read; `0` means the reader hit EOF. At most
    /// `max_size - len()` bytes are read.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> Result<usize, IngressError>
    where
        R: AsyncRead + Unpin,
    {
        if self.buffer.len() >= self.max_size {
            error!(
                size = self.buffer.len(),
                max = self.max_size,
                "Buffer size limit exceeded"
            );
            return Err(IngressError::BufferFull {
                size: self.buffer.len(),
                max: self.max_size,
            });
        }

        // A single read never takes the buffer past max_size
        let room = self.max_size - self.buffer.len();
        if self.buffer.capacity() - self.buffer.len() < MIN_READ_SPACE.min(room) {
            self.buffer.reserve(INITIAL_BUFFER_SIZE.min(room));
        }

        let n = (&mut *reader)
            .take(room as u64)
            .read_buf(&mut self.buffer)
            .await?;
        trace!(bytes = n, buffered = self.buffer.len(), "Read data");
        Ok(n)
    }

    /// Parses the next command and hands it to `f`, then advances past it.
    ///
    /// Returns `Ok(None)` without touching the buffer if the frame is not
    /// complete yet.
    pub fn with_next_command<F, R>(&mut self, f: F) -> Result<Option<R>, IngressError>
    where
        F: FnOnce(&Command<'_>) -> R,
    {
        let (result, consumed) = {
            let Some(cmd) = self.parse_front()? else {
                return Ok(None);
            };
            (f(&cmd), cmd.consumed())
        };

        self.buffer.advance(consumed);
        trace!(
            consumed,
            remaining = self.buffer.len(),
            "Parsed command"
        );
        Ok(Some(result))
    }

    /// Splits the next command off the buffer as an owned [`Frame`].
    pub fn next_frame(&mut self) -> Result<Option<Frame>, IngressError> {
        let (consumed, spans) = {
            let Some(cmd) = self.parse_front()? else {
                return Ok(None);
            };
            let base = self.buffer.as_ptr() as usize;
            let spans: Vec<Range<usize>> = cmd
                .tokens()
                .iter()
                .map(|token| {
                    let start = token.as_ptr() as usize - base;
                    start..start + token.len()
                })
                .collect();
            (cmd.consumed(), spans)
        };

        let raw = self.buffer.split_to(consumed).freeze();
        let tokens = spans.into_iter().map(|span| raw.slice(span)).collect();
        trace!(
            consumed,
            remaining = self.buffer.len(),
            "Split frame"
        );
        Ok(Some(Frame { raw, tokens }))
    }

    /// Checks that the stream ended on a frame boundary.
    pub fn finish(&self) -> Result<(), IngressError> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            warn!(
                buffered = self.buffer.len(),
                "Stream ended with a partial command"
            );
            Err(IngressError::UnexpectedEof)
        }
    }

    fn parse_front(&self) -> Result<Option<Command<'_>>, IngressError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match CommandParser::with_limits(&self.buffer, self.limits).next_command() {
            ParseOutcome::Complete(cmd) => Ok(Some(cmd)),
            ParseOutcome::NeedMoreData => {
                trace!(
                    buffered = self.buffer.len(),
                    "Incomplete command, need more data"
                );
                Ok(None)
            }
            ParseOutcome::Invalid(e) => {
                warn!(error = %e, "Parse error");
                Err(IngressError::Protocol(e))
            }
        }
    }
}
