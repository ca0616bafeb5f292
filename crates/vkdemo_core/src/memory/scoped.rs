//! # Scoped Allocations
//!
//! An allocation that is freed when its guard goes out of scope, on every
//! exit path including early returns and `?`.

use std::ops::{Deref, DerefMut};

use crate::error::ArenaResult;

use super::arena::HandleArena;
use super::handle::Handle;

/// Guard owning one allocation for the duration of a scope.
///
/// The guard holds the arena's exclusive borrow, and dereferences to it, so
/// further allocations can be made through the guard while it is alive.
///
/// ```rust,ignore
/// let mut staging = arena.scoped(64 * 1024)?;
/// staging.bytes_mut(|bytes| upload(bytes));
/// // freed here
/// ```
pub struct ScopedHandle<'a> {
    arena: &'a mut HandleArena,
    handle: Handle,
}

impl ScopedHandle<'_> {
    /// The guarded handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// Frees the allocation now.
    ///
    /// # Returns
    ///
    /// `false` if the handle had already been freed through the arena.
    pub fn release(mut self) -> bool {
        let handle = std::mem::replace(&mut self.handle, Handle::NULL);
        self.arena.free(handle)
    }

    /// Ends the scope without freeing, handing the allocation back to manual
    /// management.
    #[must_use]
    pub fn into_handle(mut self) -> Handle {
        std::mem::replace(&mut self.handle, Handle::NULL)
    }

    /// Runs `f` over the guarded bytes.
    pub fn bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.arena.with_bytes(self.handle, f)
    }

    /// Runs `f` over the guarded mutable bytes.
    pub fn bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        self.arena.with_bytes_mut(self.handle, f)
    }
}

impl Deref for ScopedHandle<'_> {
    type Target = HandleArena;

    fn deref(&self) -> &HandleArena {
        &*self.arena
    }
}

impl DerefMut for ScopedHandle<'_> {
    fn deref_mut(&mut self) -> &mut HandleArena {
        self.arena
    }
}

impl Drop for ScopedHandle<'_> {
    fn drop(&mut self) {
        // NULL after release/into_handle; free() ignores it.
        self.arena.free(self.handle);
    }
}

impl HandleArena {
    /// Allocates `size` bytes that are freed when the returned guard drops.
    ///
    /// # Errors
    ///
    /// Same as [`HandleArena::allocate`].
    pub fn scoped(&mut self, size: usize) -> ArenaResult<ScopedHandle<'_>> {
        let handle = self.allocate(size)?;
        Ok(ScopedHandle {
            arena: self,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::error::ArenaError;

    fn arena() -> HandleArena {
        HandleArena::new(ArenaConfig::new(4096, 4)).unwrap()
    }

    #[test]
    fn test_scoped_frees_on_drop() {
        let mut arena = arena();
        let handle = {
            let mut guard = arena.scoped(10).unwrap();
            guard.bytes_mut(|bytes| bytes[0] = 42);
            assert_eq!(guard.bytes(|bytes| bytes[0]), Some(42));
            guard.handle()
        };
        assert!(!arena.is_valid(handle));
        assert_eq!(arena.cursor(), 0);
    }

    #[test]
    fn test_scoped_frees_on_error_path() {
        fn upload(arena: &mut HandleArena) -> Result<(), ArenaError> {
            let mut staging = arena.scoped(1024)?;
            staging.allocate(8192)?; // fails, staging still freed
            Ok(())
        }

        let mut arena = arena();
        assert!(upload(&mut arena).is_err());
        assert!(arena.is_empty());
        assert_eq!(arena.cursor(), 0);
    }

    #[test]
    fn test_scoped_nested_allocation() {
        let mut arena = arena();
        let inner = {
            let mut guard = arena.scoped(256).unwrap();
            let inner = guard.allocate(256).unwrap();
            assert_eq!(guard.len(), 2);
            inner
        };
        // The guard's block is now a gap below `inner`.
        assert!(arena.is_valid(inner));
        assert_eq!(arena.stats().fragmented_bytes(), 256);
    }

    #[test]
    fn test_release_and_into_handle() {
        let mut arena = arena();

        let guard = arena.scoped(1).unwrap();
        assert!(guard.release());
        assert!(arena.is_empty());

        let kept = arena.scoped(1).unwrap().into_handle();
        assert!(arena.is_valid(kept));
        assert!(arena.free(kept));
    }

    #[test]
    fn test_release_after_manual_free() {
        let mut arena = arena();
        let mut guard = arena.scoped(1).unwrap();
        let handle = guard.handle();
        assert!(guard.free(handle));
        assert!(!guard.release());
    }
}
