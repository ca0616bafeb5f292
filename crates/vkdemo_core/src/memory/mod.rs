//! # Memory Management
//!
//! One pre-reserved arena for the demos' CPU-side buffers (staging data,
//! decoded meshes, glyph atlases, sound samples).
//!
//! ## Design Philosophy
//!
//! All memory is reserved once at startup. During a frame:
//! - No heap allocations
//! - No raw pointers held across frames, only [`Handle`]s
//! - Stale handles are rejected by generation, never dereferenced
//!
//! ## Caller Obligations
//!
//! Freeing anything but the newest allocation leaves a gap. Call
//! [`HandleArena::defragment`] at a quiet point (level load, end of frame)
//! when [`ArenaStats::fragmented_bytes`] grows.

mod arena;
mod backing;
mod handle;
mod order;
mod scoped;
mod stats;
mod typed;

pub use arena::{HandleArena, ALLOC_FILL, FREE_FILL};
pub use handle::{Handle, Region};
pub use scoped::ScopedHandle;
pub use stats::ArenaStats;
pub use typed::TypedHandle;
