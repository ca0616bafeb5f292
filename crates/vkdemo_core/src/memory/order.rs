//! # Live-Order List
//!
//! Slot indices of live allocations, oldest first. Each slot stores the
//! index of its neighbours, so removal from any position is O(1) and the
//! relative order of the remaining entries never changes.

/// End-of-list marker.
const NONE: u32 = u32::MAX;

/// Doubly linked list threaded through two fixed-size index arrays.
pub struct LiveOrder {
    /// Previous slot in live order, per slot.
    prev: Box<[u32]>,
    /// Next slot in live order, per slot.
    next: Box<[u32]>,
    /// Oldest live slot.
    head: u32,
    /// Most recently allocated live slot.
    tail: u32,
    /// Number of linked slots.
    len: usize,
}

impl LiveOrder {
    /// Creates an empty list able to hold `slots` entries.
    #[must_use]
    pub fn new(slots: u32) -> Self {
        let links = vec![NONE; slots as usize].into_boxed_slice();
        Self {
            prev: links.clone(),
            next: links,
            head: NONE,
            tail: NONE,
            len: 0,
        }
    }

    /// Number of linked slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no slot is linked.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The most recently appended slot still linked.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<u32> {
        (self.tail != NONE).then_some(self.tail)
    }

    /// Appends `slot`, which must not already be linked.
    pub fn push_back(&mut self, slot: u32) {
        let idx = slot as usize;
        self.prev[idx] = self.tail;
        self.next[idx] = NONE;

        if self.tail == NONE {
            self.head = slot;
        } else {
            self.next[self.tail as usize] = slot;
        }
        self.tail = slot;
        self.len += 1;
    }

    /// Unlinks `slot`, which must currently be linked.
    pub fn remove(&mut self, slot: u32) {
        let idx = slot as usize;
        let prev = self.prev[idx];
        let next = self.next[idx];

        if prev == NONE {
            self.head = next;
        } else {
            self.next[prev as usize] = next;
        }
        if next == NONE {
            self.tail = prev;
        } else {
            self.prev[next as usize] = prev;
        }

        self.prev[idx] = NONE;
        self.next[idx] = NONE;
        self.len -= 1;
    }

    /// Unlinks every slot.
    pub fn clear(&mut self) {
        self.prev.fill(NONE);
        self.next.fill(NONE);
        self.head = NONE;
        self.tail = NONE;
        self.len = 0;
    }

    /// Iterates slots from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NONE {
                return None;
            }
            let slot = cursor;
            cursor = self.next[slot as usize];
            Some(slot)
        })
    }
}
