//! # Arena Error Types
//!
//! All errors that can occur while configuring or allocating from the arena.
//!
//! Invalid or stale handles are NOT errors: they are reported as `false` or
//! `None` by the operation that received them.

use thiserror::Error;

/// Errors that can occur in the memory arena.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// The rounded request does not fit between the cursor and the capacity.
    #[error("arena out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        /// Requested size after rounding to the chunk size.
        requested: usize,
        /// Bytes left between the cursor and the capacity.
        available: usize,
    },

    /// Every slot index is in use.
    #[error("arena slots exhausted: all {max_slots} slots are live")]
    SlotsExhausted {
        /// Size of the slot table.
        max_slots: u32,
    },

    /// Size arithmetic overflowed `usize`.
    #[error("allocation size overflow: {count} x {element_size} bytes")]
    SizeOverflow {
        /// Number of elements requested.
        count: usize,
        /// Size of one element in bytes.
        element_size: usize,
    },

    /// A typed allocation needs a stricter alignment than the arena provides.
    #[error("type alignment {required} exceeds arena alignment {available}")]
    Alignment {
        /// Alignment of the requested type.
        required: usize,
        /// Alignment of every region in the arena.
        available: usize,
    },

    /// The backing store could not be reserved.
    #[error("failed to reserve {bytes} bytes for the arena backing store")]
    Reservation {
        /// Raw bytes requested from the system allocator.
        bytes: usize,
    },

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::ArenaConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
