//! # Arena Handles
//!
//! A handle is the arena's answer to "give me N bytes": an offset into one
//! specific block of one specific arena.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of process-unique arena ids.
static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArenaId(u64);

impl ArenaId {
    /// Hands out the next unused id.
    pub(crate) fn next() -> Self {
        Self(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena#{}", self.0)
    }
}

/// Reference to a byte offset inside an arena block.
///
/// Returned by [`Arena::allocate`](crate::Arena::allocate). A handle does not
/// remember how many bytes were requested; callers that want bounded access
/// must keep the size themselves.
///
/// The `epoch` names the block instance. [`Arena::release_all`](crate::Arena::release_all)
/// swaps in a new block with a new epoch, after which older handles dangle
/// and are rejected as foreign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    /// Arena that issued the handle.
    arena: ArenaId,
    /// Block instance within that arena.
    epoch: u32,
    /// Byte offset from the start of the block.
    offset: usize,
}

impl Handle {
    pub(crate) const fn new(arena: ArenaId, epoch: u32, offset: usize) -> Self {
        Self {
            arena,
            epoch,
            offset,
        }
    }

    /// Returns the arena that issued this handle.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Returns the block epoch this handle points into.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Returns the byte offset from the start of the block.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns a handle `bytes` further into the same block.
    ///
    /// Like pointer arithmetic, the result is not checked here; the arena
    /// range-checks it when it is used. Saturates instead of wrapping.
    #[inline]
    #[must_use]
    pub const fn offset_by(self, bytes: usize) -> Self {
        Self {
            offset: self.offset.saturating_add(bytes),
            ..self
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/epoch{}+{}", self.arena, self.epoch, self.offset)
    }
}
