//! # Backing Block
//!
//! The single contiguous buffer behind an arena, plus its watermark.

use crate::error::{ArenaError, ArenaResult};

/// One fixed-size byte buffer and the offset of its first free byte.
///
/// Not synchronized; the arena keeps it behind its lock.
pub(crate) struct Block {
    /// Backing storage, exactly `capacity` bytes.
    bytes: Box<[u8]>,
    /// Watermark: offset of the first unallocated byte.
    used: usize,
    /// Which block instance this is within its arena.
    epoch: u32,
}

impl Block {
    /// Allocates a zeroed block without aborting on allocator failure.
    pub(crate) fn allocate(capacity: usize, epoch: u32) -> ArenaResult<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|source| ArenaError::Allocation { capacity, source })?;
        bytes.resize(capacity, 0);

        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            used: 0,
            epoch,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.capacity() - self.used
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Advances the watermark by `size`, returning the old watermark.
    ///
    /// Returns `None` if fewer than `size` bytes remain.
    pub(crate) fn bump(&mut self, size: usize) -> Option<usize> {
        if self.remaining() < size {
            return None;
        }
        let offset = self.used;
        self.used += size;
        Some(offset)
    }

    /// Moves the watermark to `offset`, in either direction.
    ///
    /// `offset` must be below capacity; the arena checks ownership first.
    pub(crate) fn truncate_to(&mut self, offset: usize) {
        debug_assert!(offset < self.capacity());
        self.used = offset;
    }

    /// Returns the allocated bytes `[offset, offset + len)`.
    ///
    /// The range must end at or below the watermark.
    pub(crate) fn allocated(&self, offset: usize, len: usize) -> ArenaResult<&[u8]> {
        let end = self.allocated_end(offset, len)?;
        Ok(&self.bytes[offset..end])
    }

    /// Mutable variant of [`Block::allocated`].
    pub(crate) fn allocated_mut(&mut self, offset: usize, len: usize) -> ArenaResult<&mut [u8]> {
        let end = self.allocated_end(offset, len)?;
        Ok(&mut self.bytes[offset..end])
    }

    fn allocated_end(&self, offset: usize, len: usize) -> ArenaResult<usize> {
        match offset.checked_add(len) {
            Some(end) if end <= self.used => Ok(end),
            _ => Err(ArenaError::OutOfBounds {
                offset,
                len,
                used: self.used,
            }),
        }
    }
}
