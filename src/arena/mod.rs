//! Arena Allocation Module
//!
//! Short-lived, append-only byte storage for the hot path. Reply staging and
//! other per-request scratch space can be carved out of one pre-sized block
//! instead of going through the global allocator for every piece.
//!
//! ## Features
//!
//! - **O(1) Allocation**: A bounds check and a cursor bump
//! - **Bulk Reclamation**: `reset()` frees every region at once
//! - **Borrow-Checked Regions**: A region can't outlive a reset
//! - **No Synchronization**: One arena per connection or unit of work
//!
//! ## Example
//!
//! ```
//! use flashkv_core::arena::Arena;
//!
//! let mut arena = Arena::new(4096);
//!
//! for _ in 0..3 {
//!     let reply = arena.alloc_copy(b"+PONG\r\n").unwrap();
//!     assert_eq!(reply, b"+PONG\r\n");
//!     arena.reset();
//! }
//! ```

pub mod bump;

// Re-export commonly used types
pub use bump::{AllocError, Arena, DEFAULT_ARENA_CAPACITY};
