//! # Shared Arena
//!
//! A [`HandleArena`] behind a `parking_lot::Mutex`, for the demos that stream
//! assets from a loader thread while the render thread reads them.
//!
//! The arena itself stays lock-free and single-threaded; the lock lives at
//! the call boundary. Every method below takes the lock for exactly one
//! arena operation. Use [`SharedArena::lock`] to batch several.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::ArenaConfig;
use crate::error::ArenaResult;
use crate::memory::{ArenaStats, Handle, HandleArena};

/// Cloneable, thread-safe handle to one arena.
#[derive(Clone)]
pub struct SharedArena {
    inner: Arc<Mutex<HandleArena>>,
}

impl SharedArena {
    /// Wraps an existing arena.
    #[must_use]
    pub fn new(arena: HandleArena) -> Self {
        Self {
            inner: Arc::new(Mutex::new(arena)),
        }
    }

    /// Builds an arena from `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ArenaError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: ArenaConfig) -> ArenaResult<Self> {
        HandleArena::new(config).map(Self::new)
    }

    /// Locks the arena for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, HandleArena> {
        self.inner.lock()
    }

    /// See [`HandleArena::allocate`].
    ///
    /// # Errors
    ///
    /// Same as [`HandleArena::allocate`].
    pub fn allocate(&self, size: usize) -> ArenaResult<Handle> {
        self.inner.lock().allocate(size)
    }

    /// See [`HandleArena::free`].
    pub fn free(&self, handle: Handle) -> bool {
        self.inner.lock().free(handle)
    }

    /// See [`HandleArena::is_valid`].
    #[must_use]
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.inner.lock().is_valid(handle)
    }

    /// See [`HandleArena::defragment`].
    pub fn defragment(&self) {
        self.inner.lock().defragment();
    }

    /// Runs `f` over a live allocation's bytes while holding the lock.
    pub fn with_bytes<R>(&self, handle: Handle, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        self.inner.lock().with_bytes(handle, f)
    }

    /// Runs `f` over a live allocation's mutable bytes while holding the lock.
    pub fn with_bytes_mut<R>(&self, handle: Handle, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        self.inner.lock().with_bytes_mut(handle, f)
    }

    /// See [`HandleArena::stats`].
    #[must_use]
    pub fn stats(&self) -> ArenaStats {
        self.inner.lock().stats()
    }
}
