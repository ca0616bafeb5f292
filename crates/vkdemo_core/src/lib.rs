//! # VKDemo Core
//!
//! Shared runtime pieces for the Vulkan demos. The centrepiece is the
//! handle arena: one fixed-capacity byte buffer that every demo carves its
//! CPU-side data out of, referenced only through generation-checked handles.
//!
//! ## Architecture Rules
//!
//! 1. **Reserve once** - Capacity is fixed at startup, never grown
//! 2. **Handles, not pointers** - Bytes are reached through scoped accessors
//! 3. **Failures are values** - Exhaustion returns an error, the caller decides
//!
//! ## Example
//!
//! ```rust,ignore
//! use vkdemo_core::{ArenaConfig, HandleArena};
//!
//! let mut arena = HandleArena::new(ArenaConfig::from_toml_file("arena.toml")?)?;
//! let glyphs = arena.allocate_typed::<[u8; 4]>(512 * 512)?;
//! arena.with_typed_mut(glyphs, |pixels| pixels.fill([0, 0, 0, 255]));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::ArenaConfig;
pub use error::{ArenaError, ArenaResult};
pub use memory::{
    ArenaStats, Handle, HandleArena, Region, ScopedHandle, TypedHandle, ALLOC_FILL, FREE_FILL,
};
pub use sync::SharedArena;
