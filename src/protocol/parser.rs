//! Zero-Copy RESP Command Parser
//!
//! This module implements the parser that sits directly on a connection's read
//! buffer. It recognises exactly one shape, the request form every Redis client
//! sends: an array of bulk strings.
//!
//! ## Design Philosophy
//!
//! 1. **Zero-Copy**: Tokens are `&[u8]` slices of the input. Nothing is copied.
//! 2. **Resumable**: A failed attempt restores the cursor, so the caller can
//!    append more bytes and retry from the same offset.
//! 3. **All-or-Nothing**: Tokens from a failed attempt are discarded in full.
//! 4. **Bounded**: Counts and lengths are checked against [`ParserLimits`]
//!    before anything is reserved.
//!
//! ## How the Parser Works
//!
//! Each attempt walks a small state machine:
//!
//! ```text
//! ExpectArrayHeader ──> ExpectBulkHeader(i) ──> ExpectBulkBody(i) ──┐
//!                              ▲                                    │
//!                              └──────────── i + 1 < N ─────────────┤
//!                                                                   ▼
//!                                                                 Done
//! ```
//!
//! and reports one of three outcomes:
//! - `Complete(command)` - a whole frame was decoded, `command.consumed()` bytes
//! - `NeedMoreData` - the bytes so far are a valid prefix of a frame
//! - `Invalid(err)` - no amount of extra data can make the bytes valid

use crate::protocol::command::{prefix, Command, CRLF};
use thiserror::Error;

/// Errors that make a frame structurally impossible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A type prefix other than the one the grammar requires
    #[error("expected '{expected}' at offset {offset}, found {found:#04x}")]
    UnexpectedByte {
        expected: char,
        found: u8,
        offset: usize,
    },

    /// A length or count with no digits
    #[error("invalid integer at offset {0}")]
    InvalidInteger(usize),

    /// A length or count that doesn't fit in an i64
    #[error("integer overflow at offset {0}")]
    IntegerOverflow(usize),

    /// Negative array count (null arrays are not commands)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Negative bulk string length (null bulk strings are not arguments)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// The declared element count exceeds the configured maximum
    #[error("too many elements: {count} (max: {max})")]
    TooManyElements { count: u64, max: usize },

    /// The declared bulk length exceeds the configured maximum
    #[error("bulk string too large: {size} bytes (max: {max})")]
    BulkTooLarge { size: u64, max: usize },

    /// Something other than CRLF where a line must end
    #[error("missing CRLF at offset {0}")]
    MissingCrlf(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum number of arguments in one command (1M, same bound Redis uses for multibulk)
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Upper bound on the token capacity reserved up front from a declared count.
const MAX_PREALLOC_TOKENS: usize = 64;

/// Bounds applied to declared counts and lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Maximum number of bulk strings in one command
    pub max_array_len: usize,
    /// Maximum length of one bulk string in bytes
    pub max_bulk_len: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
        }
    }
}

impl ParserLimits {
    /// Sets the maximum number of bulk strings per command.
    pub fn with_max_array_len(mut self, max: usize) -> Self {
        self.max_array_len = max;
        self
    }

    /// Sets the maximum bulk string length.
    pub fn with_max_bulk_len(mut self, max: usize) -> Self {
        self.max_bulk_len = max;
        self
    }
}

/// The outcome of one parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<'a> {
    /// A complete command was decoded
    Complete(Command<'a>),
    /// The input ends before the frame does
    NeedMoreData,
    /// The input can never become a valid frame
    Invalid(ParseError),
}

impl<'a> ParseOutcome<'a> {
    /// Bytes consumed by the attempt; `0` unless complete.
    pub fn consumed(&self) -> usize {
        match self {
            ParseOutcome::Complete(cmd) => cmd.consumed(),
            _ => 0,
        }
    }

    /// Tokens produced by the attempt; empty unless complete.
    pub fn tokens(&self) -> &[&'a [u8]] {
        match self {
            ParseOutcome::Complete(cmd) => cmd.tokens(),
            _ => &[],
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::Complete(_))
    }

    /// Converts into the `Ok(Some) / Ok(None) / Err` shape used across the crate.
    pub fn into_result(self) -> ParseResult<Option<Command<'a>>> {
        match self {
            ParseOutcome::Complete(cmd) => Ok(Some(cmd)),
            ParseOutcome::NeedMoreData => Ok(None),
            ParseOutcome::Invalid(e) => Err(e),
        }
    }
}

/// A zero-copy command parser bound to one buffer snapshot.
///
/// The only state is the cursor into the buffer. Every method that fails puts
/// the cursor back where the attempt started.
///
/// # Example
///
/// ```
/// use flashkv_core::protocol::CommandParser;
///
/// let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
/// let mut parser = CommandParser::new(data);
/// let mut tokens = Vec::new();
///
/// let consumed = parser.try_parse_command(&mut tokens);
/// assert_eq!(consumed, data.len());
/// assert_eq!(tokens, [&b"GET"[..], &b"name"[..]]);
/// ```
#[derive(Debug, Clone)]
pub struct CommandParser<'a> {
    data: &'a [u8],
    pos: usize,
    limits: ParserLimits,
}

impl<'a> CommandParser<'a> {
    /// Creates a parser over `data` with default limits.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_limits(data, ParserLimits::default())
    }

    /// Creates a parser over `data` with explicit limits.
    pub fn with_limits(data: &'a [u8], limits: ParserLimits) -> Self {
        Self {
            data,
            pos: 0,
            limits,
        }
    }

    /// Moves the cursor to `pos`.
    pub fn starting_at(mut self, pos: usize) -> Self {
        self.pos = pos;
        self
    }

    /// Offset of the next unconsumed byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unconsumed tail of the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    /// Returns true when every byte of the buffer has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Attempts to parse one command into `tokens`.
    ///
    /// Returns the number of bytes consumed, or `0` if the frame is incomplete
    /// or malformed. `tokens` is cleared first and stays empty on failure, so
    /// one vector can be reused across calls without reallocating.
    pub fn try_parse_command(&mut self, tokens: &mut Vec<&'a [u8]>) -> usize {
        match self.parse_into(tokens) {
            Ok(Some(consumed)) => consumed,
            Ok(None) | Err(_) => 0,
        }
    }

    /// Like [`try_parse_command`](Self::try_parse_command) but tells an
    /// incomplete frame (`Ok(None)`) apart from a malformed one (`Err`).
    pub fn parse_into(&mut self, tokens: &mut Vec<&'a [u8]>) -> ParseResult<Option<usize>> {
        tokens.clear();
        let start = self.pos;

        match self.parse_frame(tokens) {
            Ok(Some(())) => Ok(Some(self.pos - start)),
            other => {
                self.pos = start;
                tokens.clear();
                other.map(|_| None)
            }
        }
    }

    /// Parses the next command into a freshly allocated token list.
    pub fn next_command(&mut self) -> ParseOutcome<'a> {
        let mut tokens = Vec::new();
        match self.parse_into(&mut tokens) {
            Ok(Some(consumed)) => ParseOutcome::Complete(Command::new(tokens, consumed)),
            Ok(None) => ParseOutcome::NeedMoreData,
            Err(e) => ParseOutcome::Invalid(e),
        }
    }

    /// Iterates over pipelined commands until the buffer runs out or a
    /// malformed frame is hit.
    pub fn commands(&mut self) -> Commands<'_, 'a> {
        Commands {
            parser: self,
            done: false,
        }
    }

    /// `*<count>\r\n` followed by `count` bulk strings.
    fn parse_frame(&mut self, tokens: &mut Vec<&'a [u8]>) -> ParseResult<Option<()>> {
        let Some(count) = self.read_header(prefix::ARRAY)? else {
            return Ok(None);
        };
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let max = self.limits.max_array_len;
        let count = match usize::try_from(count) {
            Ok(n) if n <= max => n,
            _ => {
                return Err(ParseError::TooManyElements {
                    count: count.unsigned_abs(),
                    max,
                })
            }
        };

        tokens.reserve(count.min(MAX_PREALLOC_TOKENS));
        for _ in 0..count {
            let Some(token) = self.read_bulk()? else {
                return Ok(None);
            };
            tokens.push(token);
        }

        Ok(Some(()))
    }

    /// `$<len>\r\n<len bytes>\r\n`
    fn read_bulk(&mut self) -> ParseResult<Option<&'a [u8]>> {
        let Some(len) = self.read_header(prefix::BULK_STRING)? else {
            return Ok(None);
        };
        if len < 0 {
            return Err(ParseError::InvalidBulkLength(len));
        }

        let max = self.limits.max_bulk_len;
        let too_large = ParseError::BulkTooLarge {
            size: len.unsigned_abs(),
            max,
        };
        let len = match usize::try_from(len) {
            Ok(n) if n <= max => n,
            _ => return Err(too_large),
        };

        let body_start = self.pos;
        let body_end = body_start.checked_add(len).ok_or(too_large)?;
        if body_end > self.data.len() {
            return Ok(None);
        }

        self.pos = body_end;
        if self.expect_crlf()?.is_none() {
            return Ok(None);
        }

        Ok(Some(&self.data[body_start..body_end]))
    }

    /// A prefix byte, an integer and CRLF.
    fn read_header(&mut self, expected: u8) -> ParseResult<Option<i64>> {
        let Some(&found) = self.data.get(self.pos) else {
            return Ok(None);
        };
        if found != expected {
            return Err(ParseError::UnexpectedByte {
                expected: expected as char,
                found,
                offset: self.pos,
            });
        }
        self.pos += 1;

        let Some(value) = self.read_integer()? else {
            return Ok(None);
        };
        if self.expect_crlf()?.is_none() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    /// Optional `-`, then base-10 digits up to the first non-digit.
    ///
    /// Running out of input while still reading digits is `Ok(None)`: the
    /// next read may carry more of them.
    fn read_integer(&mut self) -> ParseResult<Option<i64>> {
        let start = self.pos;
        let negative = self.data.get(self.pos) == Some(&b'-');
        if negative {
            self.pos += 1;
        }

        let digits_start = self.pos;
        let mut value: i64 = 0;
        while let Some(&byte) = self.data.get(self.pos) {
            if !byte.is_ascii_digit() {
                break;
            }
            let digit = i64::from(byte - b'0');
            value = value
                .checked_mul(10)
                .and_then(|v| {
                    if negative {
                        v.checked_sub(digit)
                    } else {
                        v.checked_add(digit)
                    }
                })
                .ok_or(ParseError::IntegerOverflow(start))?;
            self.pos += 1;
        }

        if self.pos >= self.data.len() {
            return Ok(None);
        }
        if self.pos == digits_start {
            return Err(ParseError::InvalidInteger(start));
        }

        Ok(Some(value))
    }

    fn expect_crlf(&mut self) -> ParseResult<Option<()>> {
        match self.data.get(self.pos..self.pos + 2) {
            Some(line_end) if line_end == CRLF => {
                self.pos += 2;
                Ok(Some(()))
            }
            Some(_) => Err(ParseError::MissingCrlf(self.pos)),
            // A lone trailing '\r' may still be completed by the next read
            None => match self.data.get(self.pos) {
                Some(&b'\r') | None => Ok(None),
                Some(_) => Err(ParseError::MissingCrlf(self.pos)),
            },
        }
    }
}

/// Iterator over the pipelined commands in a buffer.
///
/// Created by [`CommandParser::commands`]. Yields `Ok(command)` for every
/// complete frame, then stops at the first incomplete one. A malformed frame
/// yields one `Err` and ends the iteration; the parser's cursor is left at the
/// start of that frame.
pub struct Commands<'p, 'a> {
    parser: &'p mut CommandParser<'a>,
    done: bool,
}

impl<'a> Iterator for Commands<'_, 'a> {
    type Item = ParseResult<Command<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.parser.next_command() {
            ParseOutcome::Complete(cmd) => Some(Ok(cmd)),
            ParseOutcome::NeedMoreData => {
                self.done = true;
                None
            }
            ParseOutcome::Invalid(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Attempts to parse one command from `buf` starting at `start`.
///
/// A pure function of its inputs: the same buffer and offset always give the
/// same outcome.
pub fn try_parse_command(buf: &[u8], start: usize) -> ParseOutcome<'_> {
    CommandParser::new(buf).starting_at(start).next_command()
}
