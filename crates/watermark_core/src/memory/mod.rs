//! # Memory Management
//!
//! The arena, its backing block, and the handles it hands out.
//!
//! ## Design Philosophy
//!
//! The block is allocated once, at initialization. After that:
//! - Allocation is a bounds check and an addition
//! - Release is a bounds check and an assignment
//! - The only heap traffic is a full reset, which swaps in a fresh block
//!
//! Handles are byte offsets tagged with the arena and block they came from.
//! Ownership checks compare those tags and range-check the offset; no raw
//! pointers are ever compared.

mod arena;
mod block;
mod handle;

pub use arena::{Arena, ArenaStats};
pub use handle::{ArenaId, Handle};
