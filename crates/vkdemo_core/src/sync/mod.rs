//! # Synchronization at the Call Boundary
//!
//! [`crate::HandleArena`] is single-threaded by construction (`Send`, not
//! `Sync`). Demos that touch the arena from more than one thread share it
//! through [`SharedArena`], which serializes whole operations with a lock.

mod shared;

pub use shared::SharedArena;
