//! # Backing Store
//!
//! The single contiguous byte buffer every allocation lives in.

use crate::error::{ArenaError, ArenaResult};

use super::handle::Region;

/// Aligned, fixed-size byte buffer.
///
/// The raw allocation is `capacity + alignment` bytes; the usable window
/// starts at the first byte aligned to `alignment`. The buffer lives on the
/// heap, so moving the owning arena never changes the window's address.
pub struct BackingStore {
    /// Raw storage including alignment slack.
    storage: Box<[u8]>,
    /// Offset of the first aligned byte within `storage`.
    base: usize,
    /// Usable bytes starting at `base`.
    capacity: usize,
}

impl BackingStore {
    /// Reserves `capacity` usable bytes aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Reservation`] if the system allocator refuses the
    /// request or the alignment cannot be honoured.
    pub fn reserve(capacity: usize, alignment: usize) -> ArenaResult<Self> {
        let raw_len = capacity
            .checked_add(alignment)
            .ok_or(ArenaError::Reservation { bytes: usize::MAX })?;

        let mut raw = Vec::new();
        raw.try_reserve_exact(raw_len)
            .map_err(|_| ArenaError::Reservation { bytes: raw_len })?;
        raw.resize(raw_len, 0u8);
        let storage = raw.into_boxed_slice();

        let base = storage.as_ptr().align_offset(alignment);
        if base > alignment {
            return Err(ArenaError::Reservation { bytes: raw_len });
        }

        Ok(Self {
            storage,
            base,
            capacity,
        })
    }

    /// Usable capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of `region`.
    ///
    /// # Panics
    ///
    /// Panics if the region extends past the capacity.
    #[inline]
    #[must_use]
    pub fn bytes(&self, region: Region) -> &[u8] {
        let start = self.base + region.offset;
        &self.storage[start..start + region.size]
    }

    /// Mutable bytes of `region`.
    ///
    /// # Panics
    ///
    /// Panics if the region extends past the capacity.
    #[inline]
    pub fn bytes_mut(&mut self, region: Region) -> &mut [u8] {
        let start = self.base + region.offset;
        &mut self.storage[start..start + region.size]
    }

    /// Moves the bytes of `region` so they start at `to`. Source and
    /// destination may overlap.
    #[inline]
    pub fn relocate(&mut self, region: Region, to: usize) {
        let start = self.base + region.offset;
        self.storage
            .copy_within(start..start + region.size, self.base + to);
    }

    /// Paints `region` with `byte`.
    #[inline]
    pub fn fill(&mut self, region: Region, byte: u8) {
        self.bytes_mut(region).fill(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_is_aligned() {
        for alignment in [1, 16, 64, 256, 4096] {
            let mut store = BackingStore::reserve(1024, alignment).unwrap();
            assert_eq!(store.capacity(), 1024);
            let whole = Region { offset: 0, size: 1024 };
            let ptr = store.bytes_mut(whole).as_ptr() as usize;
            assert_eq!(ptr % alignment, 0, "alignment {alignment}");
        }
    }

    #[test]
    fn test_relocate_overlapping() {
        let mut store = BackingStore::reserve(64, 16).unwrap();
        let src = Region { offset: 8, size: 16 };
        for (i, byte) in store.bytes_mut(src).iter_mut().enumerate() {
            *byte = i as u8;
        }

        store.relocate(src, 0);

        let moved = store.bytes(Region { offset: 0, size: 16 });
        assert_eq!(moved, (0u8..16).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn test_fill() {
        let mut store = BackingStore::reserve(32, 8).unwrap();
        let region = Region { offset: 16, size: 16 };
        store.fill(region, 0xAB);
        assert!(store.bytes(region).iter().all(|&b| b == 0xAB));
        assert!(store.bytes(Region { offset: 0, size: 16 }).iter().all(|&b| b == 0));
    }
}
