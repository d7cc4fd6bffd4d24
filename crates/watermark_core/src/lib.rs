//! # WATERMARK Core
//!
//! A fixed-capacity memory arena: one contiguous block, carved front to back
//! by a single watermark, shared between threads behind one lock.
//!
//! ## Architecture Rules
//!
//! 1. **One block, fixed size** - The block is allocated at initialization and
//!    only ever replaced by a block of the same capacity.
//! 2. **Bump allocation** - Allocating returns the watermark and advances it.
//! 3. **Truncation release** - Releasing moves the watermark back to a handle.
//!    Releases must follow stack order (see [`Arena::release`]).
//! 4. **One critical section per operation** - The capacity check and the
//!    watermark update never happen apart.
//!
//! ## Example
//!
//! ```rust,ignore
//! use watermark_core::{Arena, ArenaConfig};
//!
//! let arena = Arena::new(ArenaConfig::new(1024))?;
//!
//! let header = arena.allocate(200)?;
//! let body = arena.allocate(300)?;
//! arena.write(body, b"payload")?;
//!
//! // Stack order: newest first.
//! arena.release(body)?;
//! arena.release(header)?;
//!
//! arena.release_all()?;
//! arena.destroy()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;

pub use config::ArenaConfig;
pub use error::{ArenaError, ArenaResult};
pub use memory::{Arena, ArenaId, ArenaStats, Handle};
