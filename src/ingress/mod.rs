//! Stream Ingress Module
//!
//! This module owns the bytes a client stream delivers until the parser has
//! turned them into commands. It is the only piece of the crate that knows
//! about readers and buffers; the parser itself only ever sees a `&[u8]`.
//!
//! ## Features
//!
//! - **Buffer Management**: Efficient BytesMut buffer for incoming data
//! - **Pipelining**: Drains every complete command in the buffer
//! - **Borrowed or Owned**: Tokens as slices (`with_next_command`) or as
//!   refcounted `Bytes` (`next_frame`), both without copying
//! - **Bounded**: Parser limits and a cap on buffered bytes
//!
//! ## Example
//!
//! ```
//! use flashkv_core::ingress::CommandBuffer;
//! use flashkv_core::protocol::encode_command;
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.extend_from_slice(&encode_command(&["GET", "name"])).unwrap();
//!
//! let argc = buffer.with_next_command(|cmd| cmd.len()).unwrap();
//! assert_eq!(argc, Some(2));
//! ```

pub mod buffer;

// Re-export commonly used types
pub use buffer::{CommandBuffer, Frame, IngressError, DEFAULT_MAX_BUFFER_SIZE};
