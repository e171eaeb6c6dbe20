//! RESP Command Protocol
//!
//! This module implements the request side of the Redis Serialization Protocol
//! (RESP): the parser that turns raw bytes from a client into commands.
//!
//! ## Overview
//!
//! Clients send every command as an array of bulk strings. The parser reads
//! those frames straight out of the caller's buffer and hands back slices of
//! it, so decoding a command never copies its arguments.
//!
//! ## Modules
//!
//! - `command`: The borrowed `Command` view and a request encoder
//! - `parser`: Zero-copy, resumable command parser
//!
//! ## Example
//!
//! ```
//! use flashkv_core::protocol::{encode_command, try_parse_command, ParseOutcome};
//!
//! let data = encode_command(&["SET", "name", "Ariz"]);
//!
//! match try_parse_command(&data, 0) {
//!     ParseOutcome::Complete(cmd) => {
//!         assert!(cmd.name_eq_ignore_case(b"set"));
//!         assert_eq!(cmd.consumed(), data.len());
//!     }
//!     ParseOutcome::NeedMoreData => { /* wait for the next read */ }
//!     ParseOutcome::Invalid(e) => panic!("bad frame: {e}"),
//! }
//! ```

pub mod command;
pub mod parser;

// Re-export commonly used types for convenience
pub use command::{encode_command, encode_command_into, Command};
pub use parser::{
    try_parse_command, CommandParser, Commands, ParseError, ParseOutcome, ParseResult,
    ParserLimits, DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_BULK_LEN,
};
