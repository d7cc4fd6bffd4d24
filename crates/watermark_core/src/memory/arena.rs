//! # Arena Allocator
//!
//! A bump-pointer arena over one fixed block, shared between threads.

use std::fmt;

use bytemuck::Pod;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::block::Block;
use super::handle::{ArenaId, Handle};
use crate::config::ArenaConfig;
use crate::error::{ArenaError, ArenaResult};

/// A fixed-capacity bump-pointer arena.
///
/// Allocations are fast (check, then bump the watermark). Memory comes back
/// either by truncating the watermark to a handle or all at once.
///
/// # Thread Safety
///
/// This arena IS thread-safe. Every operation runs as one critical section on
/// the arena's lock: the capacity check and the watermark update of an
/// allocation are never separated, so concurrent callers always receive
/// disjoint ranges. Share it by reference (`&Arena`, `Arc<Arena>`).
///
/// # Lifecycle
///
/// [`Arena::new`] allocates the block. [`Arena::destroy`] frees it early;
/// every later call fails with [`ArenaError::UseAfterDestroy`]. Dropping the
/// arena frees the block too.
///
/// # Example
///
/// ```rust,ignore
/// let arena = Arena::with_capacity(1024)?;
///
/// let a = arena.allocate(200)?; // offset 0
/// let b = arena.allocate(300)?; // offset 200
///
/// arena.release(b)?; // watermark back to 200
/// arena.release(a)?; // watermark back to 0
/// ```
pub struct Arena {
    /// Identity stamped into every handle.
    id: ArenaId,
    /// Fixed block size; never changes.
    capacity: usize,
    /// Diagnostic name.
    label: String,
    /// The block and its watermark. `None` once destroyed.
    state: Mutex<Option<Block>>,
}

/// Point-in-time view of an arena's watermark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaStats {
    /// Total block size in bytes.
    pub capacity: usize,
    /// Watermark: bytes from the start of the block that are handed out.
    pub used: usize,
    /// Bytes behind the watermark still available.
    pub remaining: usize,
    /// Block instance; bumped by every [`Arena::release_all`].
    pub epoch: u32,
}

impl Arena {
    /// Creates an arena and allocates its block.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::InvalidConfig`] if the config fails validation.
    /// - [`ArenaError::Allocation`] if the block cannot be allocated. Nothing
    ///   is left behind in that case.
    pub fn new(config: ArenaConfig) -> ArenaResult<Self> {
        config.validate()?;

        let id = ArenaId::next();
        let block = match Block::allocate(config.capacity, 0) {
            Ok(block) => block,
            Err(err) => {
                warn!(arena = %id, label = %config.label, error = %err, "arena initialization failed");
                return Err(err);
            }
        };

        info!(arena = %id, label = %config.label, capacity = config.capacity, "arena initialized");

        Ok(Self {
            id,
            capacity: config.capacity,
            label: config.label,
            state: Mutex::new(Some(block)),
        })
    }

    /// Creates an arena of `capacity` bytes with the default label.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::new`].
    pub fn with_capacity(capacity: usize) -> ArenaResult<Self> {
        Self::new(ArenaConfig::new(capacity))
    }

    /// Returns the arena's identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArenaId {
        self.id
    }

    /// Returns the diagnostic label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocates `size` bytes and returns a handle to the first of them.
    ///
    /// The handle's offset is the watermark before the call; the watermark
    /// then advances by `size`. The bytes are not cleared.
    ///
    /// `size` may be any integer type. Values that do not fit in a `usize`,
    /// such as negative numbers, are rejected as invalid sizes.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    /// - [`ArenaError::InvalidSize`] for zero, negative, or more than the
    ///   whole capacity.
    /// - [`ArenaError::PoolExhausted`] if fewer than `size` bytes remain.
    ///
    /// On error the watermark is unchanged.
    pub fn allocate<S: TryInto<usize>>(&self, size: S) -> ArenaResult<Handle> {
        let requested = size.try_into().ok();
        let result = self.bump(requested);

        match &result {
            Ok(handle) => debug!(
                arena = %self.id,
                label = %self.label,
                size = ?requested,
                offset = handle.offset(),
                "allocated"
            ),
            Err(err) => warn!(arena = %self.id, label = %self.label, error = %err, "allocation rejected"),
        }
        result
    }

    fn bump(&self, requested: Option<usize>) -> ArenaResult<Handle> {
        let mut state = self.state.lock();
        let block = self.live_mut(&mut state)?;

        let size = match requested {
            Some(size) if size > 0 && size <= self.capacity => size,
            _ => {
                return Err(ArenaError::InvalidSize {
                    requested,
                    capacity: self.capacity,
                })
            }
        };

        let Some(offset) = block.bump(size) else {
            return Err(ArenaError::PoolExhausted {
                requested: size,
                used: block.used(),
                capacity: self.capacity,
            });
        };

        Ok(Handle::new(self.id, block.epoch(), offset))
    }

    /// Moves the watermark back to `handle`, freeing everything at or after it.
    ///
    /// This is truncation, not a per-object free. The arena keeps no record
    /// of individual allocations and does not check that `handle` was
    /// returned by [`Arena::allocate`] or sits on an allocation boundary.
    ///
    /// **Releases must happen in reverse allocation order.** Releasing an
    /// older handle while newer allocations are still in use hands their
    /// bytes out again. Releasing a handle above the watermark raises it,
    /// and the bytes in between are lost until the next reset.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    /// - [`ArenaError::InvalidPointer`] if the handle is not owned by this
    ///   arena's current block (see [`Arena::is_owned`]). The watermark is
    ///   unchanged.
    pub fn release(&self, handle: Handle) -> ArenaResult<()> {
        let result = self.truncate(handle);

        match result {
            Ok(previous) if handle.offset() > previous => warn!(
                arena = %self.id,
                label = %self.label,
                offset = handle.offset(),
                previous,
                "released above the watermark; bytes in between are lost until reset"
            ),
            Ok(previous) => debug!(
                arena = %self.id,
                label = %self.label,
                offset = handle.offset(),
                reclaimed = previous - handle.offset(),
                "released"
            ),
            Err(ref err) => warn!(arena = %self.id, label = %self.label, error = %err, "release rejected"),
        }
        result.map(|_| ())
    }

    /// Returns the watermark before truncation.
    fn truncate(&self, handle: Handle) -> ArenaResult<usize> {
        let mut state = self.state.lock();
        let block = self.live_mut(&mut state)?;
        self.check_owned(block, handle)?;

        let previous = block.used();
        block.truncate_to(handle.offset());
        Ok(previous)
    }

    /// Replaces the block with a fresh one and resets the watermark to zero.
    ///
    /// Every handle issued before this call dangles afterwards: the arena
    /// rejects them as foreign, and what they referred to is gone.
    ///
    /// The new block is allocated before the old one is dropped. If that
    /// allocation fails, the arena keeps its old block and watermark.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    /// - [`ArenaError::Allocation`] if the new block cannot be allocated.
    pub fn release_all(&self) -> ArenaResult<()> {
        let result = self.swap_block();

        match &result {
            Ok(epoch) => info!(arena = %self.id, label = %self.label, epoch, "released all; block replaced"),
            Err(err) => warn!(arena = %self.id, label = %self.label, error = %err, "release all failed"),
        }
        result.map(|_| ())
    }

    /// Returns the new epoch.
    fn swap_block(&self) -> ArenaResult<u32> {
        let mut state = self.state.lock();
        let block = self.live_mut(&mut state)?;

        let fresh = Block::allocate(self.capacity, block.epoch().wrapping_add(1))?;
        let epoch = fresh.epoch();
        *block = fresh;
        Ok(epoch)
    }

    /// Frees the block. The arena rejects every call after this one.
    ///
    /// # Errors
    ///
    /// [`ArenaError::UseAfterDestroy`] if the arena was already destroyed.
    pub fn destroy(&self) -> ArenaResult<()> {
        let retired = self.state.lock().take();

        match retired {
            Some(block) => {
                let used = block.used();
                drop(block);
                info!(arena = %self.id, label = %self.label, used, "arena destroyed");
                Ok(())
            }
            None => {
                let err = ArenaError::UseAfterDestroy { arena: self.id };
                warn!(arena = %self.id, label = %self.label, error = %err, "destroy rejected");
                Err(err)
            }
        }
    }

    /// Returns `true` if `handle` points into this arena's current block.
    ///
    /// That means: issued by this arena, for the current block (not one
    /// discarded by [`Arena::release_all`]), with an offset below capacity.
    /// `None` and a destroyed arena both give `false`.
    #[must_use]
    pub fn is_owned(&self, handle: Option<Handle>) -> bool {
        let Some(handle) = handle else {
            return false;
        };
        if handle.arena() != self.id {
            return false;
        }

        let state = self.state.lock();
        state.as_ref().is_some_and(|block| Self::owns(block, handle))
    }

    /// Returns the watermark and capacity figures.
    ///
    /// # Errors
    ///
    /// [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    pub fn stats(&self) -> ArenaResult<ArenaStats> {
        let state = self.state.lock();
        let block = self.live(&state)?;
        Ok(ArenaStats {
            capacity: self.capacity,
            used: block.used(),
            remaining: block.remaining(),
            epoch: block.epoch(),
        })
    }

    /// Returns the watermark.
    ///
    /// # Errors
    ///
    /// [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    pub fn used(&self) -> ArenaResult<usize> {
        self.stats().map(|stats| stats.used)
    }

    /// Returns the bytes left behind the watermark.
    ///
    /// # Errors
    ///
    /// [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    pub fn remaining(&self) -> ArenaResult<usize> {
        self.stats().map(|stats| stats.remaining)
    }

    /// Returns `true` once [`Arena::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().is_none()
    }

    /// Copies `bytes` into the arena starting at `handle`.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::UseAfterDestroy`] after [`Arena::destroy`].
    /// - [`ArenaError::InvalidPointer`] for a handle this arena does not own.
    /// - [`ArenaError::OutOfBounds`] if the range reaches past the watermark.
    pub fn write(&self, handle: Handle, bytes: &[u8]) -> ArenaResult<()> {
        let mut state = self.state.lock();
        let block = self.live_mut(&mut state)?;
        self.check_owned(block, handle)?;

        block
            .allocated_mut(handle.offset(), bytes.len())?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Copies `out.len()` bytes starting at `handle` into `out`.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::write`].
    pub fn read_into(&self, handle: Handle, out: &mut [u8]) -> ArenaResult<()> {
        let state = self.state.lock();
        let block = self.live(&state)?;
        self.check_owned(block, handle)?;

        out.copy_from_slice(block.allocated(handle.offset(), out.len())?);
        Ok(())
    }

    /// Returns a copy of `len` bytes starting at `handle`.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::write`].
    pub fn read(&self, handle: Handle, len: usize) -> ArenaResult<Vec<u8>> {
        let state = self.state.lock();
        let block = self.live(&state)?;
        self.check_owned(block, handle)?;

        Ok(block.allocated(handle.offset(), len)?.to_vec())
    }

    /// Stores a plain-old-data value at `handle`. No alignment is required.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::write`].
    pub fn write_value<T: Pod>(&self, handle: Handle, value: &T) -> ArenaResult<()> {
        self.write(handle, bytemuck::bytes_of(value))
    }

    /// Loads a plain-old-data value from `handle`. No alignment is required.
    ///
    /// # Errors
    ///
    /// Same as [`Arena::write`].
    pub fn read_value<T: Pod>(&self, handle: Handle) -> ArenaResult<T> {
        let state = self.state.lock();
        let block = self.live(&state)?;
        self.check_owned(block, handle)?;

        let bytes = block.allocated(handle.offset(), std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn live<'a>(&self, state: &'a Option<Block>) -> ArenaResult<&'a Block> {
        state
            .as_ref()
            .ok_or(ArenaError::UseAfterDestroy { arena: self.id })
    }

    fn live_mut<'a>(&self, state: &'a mut Option<Block>) -> ArenaResult<&'a mut Block> {
        state
            .as_mut()
            .ok_or(ArenaError::UseAfterDestroy { arena: self.id })
    }

    fn check_owned(&self, block: &Block, handle: Handle) -> ArenaResult<()> {
        if handle.arena() == self.id && Self::owns(block, handle) {
            Ok(())
        } else {
            Err(ArenaError::InvalidPointer { handle })
        }
    }

    /// Block-level half of the ownership test; the caller compares arena ids.
    fn owns(block: &Block, handle: Handle) -> bool {
        handle.epoch() == block.epoch() && handle.offset() < block.capacity()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self
            .state
            .try_lock()
            .map(|state| state.as_ref().map(Block::used));

        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("capacity", &self.capacity)
            .field("used", &used)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(capacity: usize) -> Arena {
        Arena::with_capacity(capacity).unwrap()
    }

    #[test]
    fn test_allocate_returns_watermark_then_bumps() {
        let arena = arena(1024);
        let a = arena.allocate(200).unwrap();
        let b = arena.allocate(300).unwrap();

        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 200);
        assert_eq!(arena.used().unwrap(), 500);
        assert_eq!(arena.remaining().unwrap(), 524);
    }

    #[test]
    fn test_allocate_exact_fit() {
        let arena = arena(64);
        arena.allocate(60).unwrap();
        assert_eq!(arena.allocate(4).unwrap().offset(), 60);
        assert_eq!(arena.remaining().unwrap(), 0);
    }

    #[test]
    fn test_invalid_sizes_leave_watermark() {
        let arena = arena(1024);
        arena.allocate(10).unwrap();

        assert_eq!(
            arena.allocate(0),
            Err(ArenaError::InvalidSize {
                requested: Some(0),
                capacity: 1024
            })
        );
        assert_eq!(
            arena.allocate(-40),
            Err(ArenaError::InvalidSize {
                requested: None,
                capacity: 1024
            })
        );
        assert_eq!(
            arena.allocate(1025_usize),
            Err(ArenaError::InvalidSize {
                requested: Some(1025),
                capacity: 1024
            })
        );
        assert_eq!(arena.used().unwrap(), 10);
    }

    #[test]
    fn test_exhaustion_leaves_watermark() {
        let arena = arena(1024);
        arena.allocate(500).unwrap();

        assert_eq!(
            arena.allocate(600),
            Err(ArenaError::PoolExhausted {
                requested: 600,
                used: 500,
                capacity: 1024
            })
        );
        assert_eq!(arena.used().unwrap(), 500);
    }

    #[test]
    fn test_release_truncates_regardless_of_order() {
        let arena = arena(1024);
        let a = arena.allocate(100).unwrap();
        let _b = arena.allocate(100).unwrap();
        let c = arena.allocate(100).unwrap();

        // Releasing the oldest handle reclaims everything after it.
        arena.release(a.offset_by(50)).unwrap();
        assert_eq!(arena.used().unwrap(), 50);

        // Releasing above the watermark raises it.
        arena.release(c).unwrap();
        assert_eq!(arena.used().unwrap(), 200);
    }

    #[test]
    fn test_release_rejects_out_of_range() {
        let arena = arena(128);
        let a = arena.allocate(16).unwrap();

        let past_end = a.offset_by(128);
        assert_eq!(
            arena.release(past_end),
            Err(ArenaError::InvalidPointer { handle: past_end })
        );
        assert_eq!(arena.used().unwrap(), 16);
    }

    #[test]
    fn test_release_rejects_other_arena() {
        let mine = arena(128);
        let theirs = arena(128);
        mine.allocate(32).unwrap();
        let foreign = theirs.allocate(8).unwrap();

        assert!(matches!(
            mine.release(foreign),
            Err(ArenaError::InvalidPointer { .. })
        ));
        assert_eq!(mine.used().unwrap(), 32);
    }

    #[test]
    fn test_is_owned() {
        let arena = arena(100);
        let h = arena.allocate(10).unwrap();

        assert!(arena.is_owned(Some(h)));
        assert!(arena.is_owned(Some(h.offset_by(99))));
        assert!(!arena.is_owned(Some(h.offset_by(100))));
        assert!(!arena.is_owned(None));
    }

    #[test]
    fn test_release_all_resets_and_bumps_epoch() {
        let arena = arena(1024);
        let old = arena.allocate(1000).unwrap();

        arena.release_all().unwrap();
        let stats = arena.stats().unwrap();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.epoch, 1);

        assert!(!arena.is_owned(Some(old)));
        assert!(matches!(
            arena.release(old),
            Err(ArenaError::InvalidPointer { .. })
        ));

        let whole = arena.allocate(1024).unwrap();
        assert_eq!(whole.offset(), 0);
        assert_eq!(whole.epoch(), 1);
    }

    #[test]
    fn test_destroy_rejects_everything_after() {
        let arena = arena(64);
        let h = arena.allocate(8).unwrap();
        arena.destroy().unwrap();

        let gone = ArenaError::UseAfterDestroy { arena: arena.id() };
        assert!(arena.is_destroyed());
        assert_eq!(arena.allocate(8), Err(gone.clone()));
        assert_eq!(arena.allocate(0), Err(gone.clone()));
        assert_eq!(arena.release(h), Err(gone.clone()));
        assert_eq!(arena.release_all(), Err(gone.clone()));
        assert_eq!(arena.stats(), Err(gone.clone()));
        assert_eq!(arena.write(h, &[1]), Err(gone.clone()));
        assert_eq!(arena.destroy(), Err(gone));
        assert!(!arena.is_owned(Some(h)));
    }

    #[test]
    fn test_bytes_round_trip_below_watermark() {
        let arena = arena(64);
        let h = arena.allocate(8).unwrap();
        arena.write(h, b"watermrk").unwrap();

        assert_eq!(arena.read(h, 8).unwrap(), b"watermrk");
        assert_eq!(arena.read(h.offset_by(5), 3).unwrap(), b"mrk");

        let mut out = [0u8; 4];
        arena.read_into(h.offset_by(4), &mut out).unwrap();
        assert_eq!(&out, b"rmrk");
    }

    #[test]
    fn test_access_past_watermark_rejected() {
        let arena = arena(64);
        let h = arena.allocate(4).unwrap();

        assert_eq!(
            arena.write(h, &[0; 5]),
            Err(ArenaError::OutOfBounds {
                offset: 0,
                len: 5,
                used: 4
            })
        );
        assert!(matches!(
            arena.read(h.offset_by(2), 3),
            Err(ArenaError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_typed_values_unaligned() {
        let arena = arena(64);
        let _pad = arena.allocate(3).unwrap();
        let h = arena.allocate(std::mem::size_of::<u64>()).unwrap();

        arena.write_value(h, &0xDEAD_BEEF_u64).unwrap();
        assert_eq!(arena.read_value::<u64>(h).unwrap(), 0xDEAD_BEEF);
        assert!(matches!(
            arena.read_value::<u128>(h),
            Err(ArenaError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_debug_shows_watermark() {
        let arena = Arena::new(ArenaConfig::new(32).with_label("dbg")).unwrap();
        arena.allocate(5).unwrap();
        let text = format!("{arena:?}");
        assert!(text.contains("dbg"));
        assert!(text.contains("Some(Some(5))"));
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        assert!(matches!(
            Arena::with_capacity(0),
            Err(ArenaError::InvalidConfig(_))
        ));
    }
}
