//! # Arena Handles
//!
//! Handles are the only references callers hold into the arena.
//! A handle consists of:
//! - A slot index into the arena's slot table
//! - A generation counter for detecting stale references

use std::fmt;

/// Opaque reference to one allocation in a [`super::HandleArena`].
///
/// The value is split into two parts:
/// - Lower 32 bits: slot index
/// - Upper 32 bits: generation of the slot when the allocation was made
///
/// A handle never resolves to an address on its own; it can only be used
/// through the arena that issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The "no allocation" sentinel returned for zero-sized requests.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a handle from a slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (slot as u64))
    }

    /// Returns the slot index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw bits, for storing a handle in plain-data structures.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds a handle from raw bits. Any value is accepted; the arena
    /// decides whether it is valid.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Handle(NULL)")
        } else {
            write!(f, "Handle({}v{})", self.slot(), self.generation())
        }
    }
}

/// Placement of one live allocation: byte offset from the start of the
/// usable region and the chunk-rounded size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    /// Byte offset of the first byte.
    pub offset: usize,
    /// Size in bytes, a multiple of the chunk size.
    pub size: usize,
}

impl Region {
    /// One past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(self) -> usize {
        self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let handle = Handle::new(12345, 67890);
        assert_eq!(handle.slot(), 12345);
        assert_eq!(handle.generation(), 67890);
        assert_eq!(Handle::from_bits(handle.to_bits()), handle);
    }

    #[test]
    fn test_null_handle() {
        assert!(Handle::NULL.is_null());
        assert!(Handle::default().is_null());
        assert!(!Handle::new(0, 1).is_null());
        assert_eq!(Handle::NULL.slot(), u32::MAX);
        assert_eq!(format!("{:?}", Handle::NULL), "Handle(NULL)");
        assert_eq!(format!("{:?}", Handle::new(3, 5)), "Handle(3v5)");
    }

    #[test]
    fn test_region_end() {
        let region = Region { offset: 256, size: 512 };
        assert_eq!(region.end(), 768);
    }
}
