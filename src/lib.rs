//! # FlashKV Core - Ingress Primitives for FlashKV
//!
//! The two building blocks that sit at the very front of the FlashKV server:
//! a zero-copy RESP command parser and a fixed-capacity bump arena. Both are
//! meant to run directly on a connection's read buffer without allocating or
//! copying per request.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            flashkv-core                                 │
//! │                                                                         │
//! │  ┌─────────────┐  parse at offset  ┌─────────────┐                      │
//! │  │  Command    │──────────────────>│   Command   │──> Command<'a>       │
//! │  │  Buffer     │<──────────────────│   Parser    │    (borrowed tokens) │
//! │  │ (BytesMut)  │ advance(consumed) └─────────────┘                      │
//! │  └──────┬──────┘                                                        │
//! │         │ split + freeze                                                │
//! │         ▼                                                               │
//! │      Frame (refcounted Bytes tokens)                                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────┐                        │
//! │  │ Arena   [ r1 | r2 | r3 |      free       ]  │  reply staging,        │
//! │  │          0            offset     capacity   │  per-request scratch   │
//! │  └─────────────────────────────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The parser and the arena are independent: neither uses the other.
//!
//! ## Quick Start
//!
//! ```
//! use flashkv_core::{Arena, CommandParser};
//!
//! let data = b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$3\r\nval\r\n";
//! let mut parser = CommandParser::new(data);
//! let mut tokens = Vec::new();
//!
//! assert_eq!(parser.try_parse_command(&mut tokens), data.len());
//! assert_eq!(tokens, [&b"SET"[..], &b"key"[..], &b"val"[..]]);
//!
//! let arena = Arena::new(100);
//! assert!(arena.allocate(200).is_none());
//! assert!(arena.allocate(50).is_some());
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Zero-copy RESP command parser and request encoding
//! - [`arena`]: Fixed-capacity bump allocator
//! - [`ingress`]: Stream buffer that drives the parser
//!
//! ## Design Highlights
//!
//! ### Zero-Copy Parsing
//!
//! Tokens are slices of the input buffer. `CommandBuffer::next_frame` turns
//! them into `bytes::Bytes` handles on the same memory when a command has to
//! outlive the read buffer.
//!
//! ### All-or-Nothing
//!
//! A parse attempt either yields a whole command or leaves the cursor where
//! it started, so a caller can append the next read and try again.
//!
//! ### Single-Threaded by Construction
//!
//! Neither primitive synchronizes. `Arena` is `Send` but not `Sync`; give
//! each connection its own.

pub mod arena;
pub mod ingress;
pub mod protocol;

// Re-export commonly used types for convenience
pub use arena::{AllocError, Arena};
pub use ingress::{CommandBuffer, Frame, IngressError};
pub use protocol::{
    try_parse_command, Command, CommandParser, ParseError, ParseOutcome, ParserLimits,
};

/// Version of FlashKV Core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
