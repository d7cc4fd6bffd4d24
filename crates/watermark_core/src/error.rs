//! # Arena Error Types
//!
//! All errors that can occur while operating on an arena.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::memory::{ArenaId, Handle};

/// Errors that can occur in arena operations.
///
/// Every variant except [`ArenaError::Allocation`] leaves the arena exactly as
/// it was before the failed call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// The backing block could not be obtained from the system allocator.
    #[error("failed to allocate a {capacity}-byte arena block")]
    Allocation {
        /// Size of the block that was requested.
        capacity: usize,
        /// Allocator failure.
        #[source]
        source: TryReserveError,
    },

    /// Zero, negative, or larger than the whole arena.
    #[error("invalid allocation size {requested:?}: must be between 1 and {capacity} bytes")]
    InvalidSize {
        /// The requested size, or `None` if it is not representable as a size.
        requested: Option<usize>,
        /// Total arena capacity.
        capacity: usize,
    },

    /// The request is valid but does not fit behind the watermark.
    #[error("arena exhausted: requested {requested} bytes, {used} of {capacity} bytes in use")]
    PoolExhausted {
        /// Bytes requested.
        requested: usize,
        /// Watermark at the time of the request.
        used: usize,
        /// Total arena capacity.
        capacity: usize,
    },

    /// The handle does not point into this arena's current block.
    #[error("handle {handle} is not owned by this arena")]
    InvalidPointer {
        /// The rejected handle.
        handle: Handle,
    },

    /// The arena has been destroyed.
    #[error("{arena} has been destroyed")]
    UseAfterDestroy {
        /// The destroyed arena.
        arena: ArenaId,
    },

    /// A byte access reaches past the watermark.
    #[error("access of {len} bytes at offset {offset} reaches past the watermark ({used})")]
    OutOfBounds {
        /// Start of the access.
        offset: usize,
        /// Length of the access.
        len: usize,
        /// Watermark at the time of the access.
        used: usize,
    },

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
