//! # Typed Allocations
//!
//! Convenience layer for arrays of plain-old-data values (vertices, indices,
//! uniform blocks). A typed allocation is an ordinary byte allocation of
//! `size_of::<T>() * count` bytes; the arena rules are unchanged.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

use crate::error::{ArenaError, ArenaResult};

use super::arena::HandleArena;
use super::handle::Handle;

/// A [`Handle`] that remembers its element type and count.
pub struct TypedHandle<T> {
    handle: Handle,
    count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedHandle<T> {
    /// The "no allocation" sentinel.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self {
            handle: Handle::NULL,
            count: 0,
            _marker: PhantomData,
        }
    }

    /// The untyped handle.
    #[inline]
    #[must_use]
    pub const fn handle(self) -> Handle {
        self.handle
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        self.count
    }

    /// Checks if this is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.handle.is_null()
    }
}

impl<T> Clone for TypedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedHandle<T> {}

impl<T> PartialEq for TypedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.count == other.count
    }
}

impl<T> Eq for TypedHandle<T> {}

impl<T> fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandle")
            .field("handle", &self.handle)
            .field("count", &self.count)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> From<TypedHandle<T>> for Handle {
    fn from(typed: TypedHandle<T>) -> Self {
        typed.handle
    }
}

impl HandleArena {
    /// Allocates room for `count` values of `T`.
    ///
    /// A `count` of zero (or a zero-sized `T`) returns [`TypedHandle::null`].
    ///
    /// # Errors
    ///
    /// - [`ArenaError::Alignment`] if `T` needs a stricter alignment than the arena
    /// - [`ArenaError::SizeOverflow`] if `size_of::<T>() * count` overflows
    /// - any error from [`HandleArena::allocate`]
    pub fn allocate_typed<T: Pod>(&mut self, count: usize) -> ArenaResult<TypedHandle<T>> {
        let alignment = self.config().alignment;
        if align_of::<T>() > alignment {
            return Err(ArenaError::Alignment {
                required: align_of::<T>(),
                available: alignment,
            });
        }

        let element_size = size_of::<T>();
        let size = element_size
            .checked_mul(count)
            .ok_or(ArenaError::SizeOverflow {
                count,
                element_size,
            })?;

        let handle = self.allocate(size)?;
        if handle.is_null() {
            return Ok(TypedHandle::null());
        }
        Ok(TypedHandle {
            handle,
            count,
            _marker: PhantomData,
        })
    }

    /// Frees a typed allocation. Same rules as [`HandleArena::free`].
    #[inline]
    pub fn free_typed<T>(&mut self, typed: TypedHandle<T>) -> bool {
        self.free(typed.handle)
    }

    /// Runs `f` over the elements of a typed allocation.
    ///
    /// # Returns
    ///
    /// `None` if the handle is invalid or does not cover `count` elements.
    pub fn with_typed<T: Pod, R>(
        &self,
        typed: TypedHandle<T>,
        f: impl FnOnce(&[T]) -> R,
    ) -> Option<R> {
        let len = typed.count * size_of::<T>();
        self.with_bytes(typed.handle, |bytes| {
            let bytes = bytes.get(..len)?;
            bytemuck::try_cast_slice(bytes).ok().map(f)
        })
        .flatten()
    }

    /// Runs `f` over the mutable elements of a typed allocation.
    ///
    /// # Returns
    ///
    /// `None` if the handle is invalid.
    pub fn with_typed_mut<T: Pod, R>(
        &mut self,
        typed: TypedHandle<T>,
        f: impl FnOnce(&mut [T]) -> R,
    ) -> Option<R> {
        let len = typed.count * size_of::<T>();
        self.with_bytes_mut(typed.handle, |bytes| {
            let bytes = bytes.get_mut(..len)?;
            bytemuck::try_cast_slice_mut(bytes).ok().map(f)
        })
        .flatten()
    }
}
