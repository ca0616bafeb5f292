//! # Arena Statistics
//!
//! Occupancy snapshot used by the demos' debug overlays and by the stress tool
//! to decide when to compact.

/// Point-in-time occupancy of a [`super::HandleArena`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Total capacity in bytes.
    pub capacity: usize,
    /// End of the used region, gaps included.
    pub cursor: usize,
    /// Sum of live region sizes.
    pub live_bytes: usize,
    /// Number of live allocations.
    pub live_slots: usize,
    /// Number of slots available for new allocations.
    pub free_slots: usize,
    /// Size of the slot table.
    pub max_slots: u32,
    /// Whether the backing store is reserved.
    pub initialized: bool,
}

impl ArenaStats {
    /// Bytes lost to gaps below the cursor. Zero right after a defragment.
    #[inline]
    #[must_use]
    pub const fn fragmented_bytes(&self) -> usize {
        self.cursor - self.live_bytes
    }

    /// Bytes available above the cursor.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// Share of the used region lost to gaps, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fragmentation(&self) -> f64 {
        if self.cursor == 0 {
            0.0
        } else {
            self.fragmented_bytes() as f64 / self.cursor as f64
        }
    }
}
