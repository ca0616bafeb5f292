//! # Arena Configuration
//!
//! Startup-time parameters for the handle arena. Loaded once, typically from
//! a TOML file next to the demo's assets:
//!
//! ```toml
//! capacity = 67108864   # 64 MiB
//! max_slots = 4096
//! chunk_size = 256
//! alignment = 64
//! debug_fill = false
//! ```
//!
//! Missing keys fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};

/// Default arena capacity: 64 MiB.
pub const DEFAULT_CAPACITY: usize = 64 * 1024 * 1024;

/// Default number of slots (simultaneously live allocations).
pub const DEFAULT_MAX_SLOTS: u32 = 4096;

/// Default allocation quantum in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Default alignment of the usable region.
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Configuration for a [`crate::HandleArena`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArenaConfig {
    /// Hard capacity of the arena in bytes. Never grows.
    pub capacity: usize,
    /// Size of the slot table.
    pub max_slots: u32,
    /// Every request is rounded up to a multiple of this.
    pub chunk_size: usize,
    /// Alignment of the first usable byte of the backing store.
    pub alignment: usize,
    /// Paint fresh and freed regions with a recognizable pattern.
    pub debug_fill: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_slots: DEFAULT_MAX_SLOTS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            alignment: DEFAULT_ALIGNMENT,
            debug_fill: cfg!(debug_assertions),
        }
    }
}

impl ArenaConfig {
    /// Creates a configuration with the given capacity and slot count,
    /// keeping the default chunk size and alignment.
    #[must_use]
    pub fn new(capacity: usize, max_slots: u32) -> Self {
        Self {
            capacity,
            max_slots,
            ..Self::default()
        }
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::ConfigParse`] for malformed TOML and
    /// [`ArenaError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(text: &str) -> ArenaResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::ConfigIo`] if the file cannot be read, otherwise
    /// the same errors as [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the configuration describes a usable arena.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.capacity == 0 {
            return Err(ArenaError::InvalidConfig("capacity must be non-zero".into()));
        }
        // u32::MAX is the index of Handle::NULL.
        if self.max_slots == 0 || self.max_slots == u32::MAX {
            return Err(ArenaError::InvalidConfig(format!(
                "max_slots must be in 1..{}, got {}",
                u32::MAX,
                self.max_slots
            )));
        }
        if !self.alignment.is_power_of_two() {
            return Err(ArenaError::InvalidConfig(format!(
                "alignment must be a power of two, got {}",
                self.alignment
            )));
        }
        if !self.chunk_size.is_power_of_two() {
            return Err(ArenaError::InvalidConfig(format!(
                "chunk_size must be a power of two, got {}",
                self.chunk_size
            )));
        }
        if self.chunk_size < self.alignment {
            return Err(ArenaError::InvalidConfig(format!(
                "chunk_size {} is smaller than alignment {}",
                self.chunk_size, self.alignment
            )));
        }
        if self.capacity.checked_add(self.alignment).is_none() {
            return Err(ArenaError::InvalidConfig(format!(
                "capacity {} leaves no room for alignment slack",
                self.capacity
            )));
        }
        Ok(())
    }

    /// Rounds `size` up to the chunk size, or `None` on overflow.
    #[inline]
    #[must_use]
    pub fn round_to_chunk(&self, size: usize) -> Option<usize> {
        let mask = self.chunk_size - 1;
        size.checked_add(mask).map(|s| s & !mask)
    }
}
