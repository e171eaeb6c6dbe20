//! Fixed-Capacity Bump Arena
//!
//! The arena owns one contiguous block of memory and hands out regions of it
//! by moving a cursor forward. There is no per-allocation free: the whole
//! arena is reclaimed at once with [`Arena::reset`] or by dropping it.
//!
//! ## Memory Layout
//!
//! ```text
//!  0                  offset                         capacity
//!  ├──────┬──────┬──────┼──────────────────────────────┤
//!  │ r1   │ r2   │ r3   │           free               │
//!  └──────┴──────┴──────┴──────────────────────────────┘
//! ```
//!
//! ## Lifetimes
//!
//! Allocating takes `&self` and returns `&mut [u8]` borrowed from the arena,
//! so any number of regions can be alive at once. Resetting takes `&mut self`,
//! which the borrow checker refuses while a region is still in use:
//!
//! ```compile_fail
//! use flashkv_core::arena::Arena;
//!
//! let mut arena = Arena::new(16);
//! let region = arena.allocate(4).unwrap();
//! arena.reset();
//! region[0] = 1;
//! ```

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::slice;
use thiserror::Error;

/// Default arena capacity (64 KB)
pub const DEFAULT_ARENA_CAPACITY: usize = 64 * 1024;

/// Errors returned by [`Arena::try_allocate`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Not enough room left for the request
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },
}

/// A fixed-capacity bump allocator.
///
/// Allocation is O(1): a bounds check and a cursor bump. Regions are
/// byte-granular with no alignment padding.
///
/// The arena is `Send` but not `Sync`. Use one arena per unit of work.
///
/// # Example
///
/// ```
/// use flashkv_core::arena::Arena;
///
/// let arena = Arena::new(1024);
///
/// let greeting = arena.alloc_copy(b"+OK\r\n").unwrap();
/// let scratch = arena.allocate(10).unwrap();
/// scratch[..5].copy_from_slice(greeting);
///
/// assert_eq!(arena.used(), 15);
/// assert!(arena.allocate(2048).is_none());
/// ```
pub struct Arena {
    /// Start of the backing storage, owned by the arena
    ptr: NonNull<u8>,

    /// Size of the backing storage in bytes
    capacity: usize,

    /// Next free byte; always `<= capacity`
    offset: Cell<usize>,

    _owns: PhantomData<Box<[u8]>>,
}

// SAFETY: the arena exclusively owns its storage. Moving it to another thread
// moves that ownership; regions borrow the arena and can't travel without it.
unsafe impl Send for Arena {}

impl Arena {
    /// Creates an arena with `capacity` bytes of backing storage.
    ///
    /// The storage is allocated once, up front.
    pub fn new(capacity: usize) -> Self {
        let storage: Box<[u8]> = vec![0u8; capacity].into_boxed_slice();
        let ptr = NonNull::from(Box::leak(storage)).cast::<u8>();

        Self {
            ptr,
            capacity,
            offset: Cell::new(0),
            _owns: PhantomData,
        }
    }

    /// Reserves `n` contiguous bytes.
    ///
    /// Returns `None` when fewer than `n` bytes remain; the cursor doesn't
    /// move in that case. The contents of a fresh region are unspecified:
    /// they may hold bytes written before the last [`reset`](Self::reset).
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub fn allocate(&self, n: usize) -> Option<&mut [u8]> {
        let start = self.offset.get();
        let end = start.checked_add(n)?;
        if end > self.capacity {
            return None;
        }
        self.offset.set(end);

        // SAFETY: `start..end` lies inside the storage. Regions never overlap
        // because the cursor only moves forward while `&self` borrows exist,
        // and moving it back requires `&mut self`.
        Some(unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr().add(start), n) })
    }

    /// Like [`allocate`](Self::allocate), reporting exhaustion as an error.
    #[allow(clippy::mut_from_ref)]
    pub fn try_allocate(&self, n: usize) -> Result<&mut [u8], AllocError> {
        let remaining = self.remaining();
        self.allocate(n).ok_or(AllocError::Exhausted {
            requested: n,
            remaining,
        })
    }

    /// Allocates a region and copies `src` into it.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_copy(&self, src: &[u8]) -> Option<&mut [u8]> {
        let region = self.allocate(src.len())?;
        region.copy_from_slice(src);
        Some(region)
    }

    /// Moves the cursor back to zero, reclaiming every region at once.
    pub fn reset(&mut self) {
        self.offset.set(0);
    }

    /// Total size of the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current cursor position.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Bytes handed out since creation or the last reset.
    #[inline]
    pub fn used(&self) -> usize {
        self.offset.get()
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset.get()
    }

    /// Returns true if nothing has been allocated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.offset.get() == 0
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(DEFAULT_ARENA_CAPACITY)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: `ptr` and `capacity` came from the leaked box in `new`, and
        // no region can outlive `&mut self`.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.capacity,
            )));
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("offset", &self.offset.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allocation_works() {
        let arena = Arena::new(1024);

        let r1 = arena.allocate(10).unwrap();
        r1[..5].copy_from_slice(b"Hello");
        let p1 = r1.as_ptr();

        let r2 = arena.allocate(10).unwrap();
        assert_eq!(r2.as_ptr(), p1.wrapping_add(10));
        assert_eq!(arena.offset(), 20);
    }

    #[test]
    fn test_regions_are_disjoint() {
        let arena = Arena::new(64);

        let a = arena.allocate(8).unwrap();
        let b = arena.allocate(8).unwrap();
        a.fill(0xAA);
        b.fill(0xBB);

        assert!(a.iter().all(|&x| x == 0xAA));
        assert!(b.iter().all(|&x| x == 0xBB));
    }

    #[test]
    fn test_out_of_memory() {
        let arena = Arena::new(100);
        assert!(arena.allocate(200).is_none());
        assert_eq!(arena.offset(), 0);

        // A request that fits still succeeds afterwards
        assert_eq!(arena.allocate(50).map(|r| r.len()), Some(50));
        assert_eq!(arena.offset(), 50);
    }

    #[test]
    fn test_no_partial_reservation() {
        let arena = Arena::new(16);
        arena.allocate(10).unwrap();

        assert!(arena.allocate(7).is_none());
        assert_eq!(arena.remaining(), 6);
        assert!(arena.allocate(6).is_some());
        assert_eq!(arena.remaining(), 0);
        assert!(arena.allocate(1).is_none());
    }

    #[test]
    fn test_exact_capacity() {
        let arena = Arena::new(32);
        assert_eq!(arena.allocate(32).map(|r| r.len()), Some(32));
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn test_overflowing_request() {
        let arena = Arena::new(8);
        arena.allocate(4).unwrap();
        assert!(arena.allocate(usize::MAX).is_none());
        assert_eq!(arena.offset(), 4);
    }

    #[test]
    fn test_zero_sized() {
        let arena = Arena::new(0);
        assert_eq!(arena.allocate(0).map(|r| r.len()), Some(0));
        assert!(arena.allocate(1).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_reset_reclaims_everything() {
        let mut arena = Arena::new(16);
        arena.allocate(16).unwrap();
        assert!(arena.allocate(1).is_none());

        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.remaining(), 16);
        assert!(arena.allocate(16).is_some());
    }

    #[test]
    fn test_alloc_copy() {
        let arena = Arena::new(16);
        let copy = arena.alloc_copy(b"$3\r\nval\r\n").unwrap();
        assert_eq!(copy, b"$3\r\nval\r\n");
        assert_eq!(arena.used(), 9);

        assert!(arena.alloc_copy(&[0u8; 8]).is_none());
        assert_eq!(arena.used(), 9);
    }

    #[test]
    fn test_try_allocate_error() {
        let arena = Arena::new(100);
        arena.allocate(40).unwrap();

        let err = arena.try_allocate(200).unwrap_err();
        assert_eq!(
            err,
            AllocError::Exhausted {
                requested: 200,
                remaining: 60
            }
        );
        assert_eq!(
            err.to_string(),
            "arena exhausted: requested 200 bytes, 60 remaining"
        );
    }

    #[test]
    fn test_default_capacity() {
        let arena = Arena::default();
        assert_eq!(arena.capacity(), DEFAULT_ARENA_CAPACITY);
    }

    #[test]
    fn test_arena_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Arena>();

        let arena = Arena::new(8);
        let handle = std::thread::spawn(move || arena.allocate(8).map(|r| r.len()));
        assert_eq!(handle.join().unwrap(), Some(8));
    }

    #[test]
    fn test_debug_output() {
        let arena = Arena::new(8);
        arena.allocate(3).unwrap();
        assert_eq!(format!("{:?}", arena), "Arena { capacity: 8, offset: 3 }");
    }

    proptest! {
        #[test]
        fn prop_regions_are_contiguous(
            capacity in 0usize..512,
            sizes in proptest::collection::vec(0usize..64, 0..32),
        ) {
            let arena = Arena::new(capacity);
            // Empty regions start at the cursor, so this is the base address
            let mut next = arena.allocate(0).unwrap().as_ptr() as usize;

            for n in sizes {
                let before = arena.offset();
                match arena.allocate(n) {
                    Some(region) => {
                        prop_assert_eq!(region.as_ptr() as usize, next);
                        prop_assert_eq!(region.len(), n);
                        prop_assert_eq!(arena.offset(), before + n);
                        next += n;
                    }
                    None => {
                        prop_assert!(before + n > capacity);
                        prop_assert_eq!(arena.offset(), before);
                    }
                }
                prop_assert!(arena.offset() <= arena.capacity());
            }
        }
    }
}
