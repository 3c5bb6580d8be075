//! Filepath: src/slot.rs
//!
//! One cell of the heap array.
//!
//! A [`HeapSlot`] carries its element, an active flag, and the number of
//! free slots in the subtree rooted at it. It has no synchronization of its
//! own: every slot lives inside the row of its level's
//! [`LevelToken`](crate::token::LevelToken), so touching it requires that
//! level's lock.
//!
//! # Capacity Invariant
//!
//! ```text
//! capacity(i) = (active(i) ? 0 : 1) + capacity(2i + 1) + capacity(2i + 2)
//! ```
//!
//! with out-of-range children contributing 0. In-flight operations shift the
//! counts one level at a time; the equation holds again once they finish.

use std::mem as StdMem;

use crate::compare::Compare;

// ============================================================================
//  HeapSlot
// ============================================================================

/// A single heap array cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSlot<T> {
    active: bool,
    value: Option<T>,
    capacity: usize,
}

impl<T> Default for HeapSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HeapSlot<T> {
    /// An inactive slot with zero recorded capacity.
    ///
    /// Capacities are filled in by [`restore_capacities`](crate::token::restore_capacities).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: false,
            value: None,
            capacity: 0,
        }
    }

    /// `true` iff this slot holds a live element.
    #[inline(always)]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The stored element, if any.
    #[inline(always)]
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Free slots in this subtree, including this one.
    #[inline(always)]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Overwrite the recorded capacity.
    #[inline]
    pub const fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Mark the slot active or inactive without touching its value.
    #[inline]
    pub const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Replace the stored value, returning the previous one.
    #[inline]
    pub const fn set_value(&mut self, value: Option<T>) -> Option<T> {
        StdMem::replace(&mut self.value, value)
    }

    /// Store `value` and mark the slot active. Capacity is left to the caller.
    #[inline]
    pub fn activate(&mut self, value: T) {
        debug_assert!(!self.active, "activating an occupied slot");
        self.value = Some(value);
        self.active = true;
    }

    /// Clear the slot and return its element. Capacity is left to the caller.
    #[inline]
    pub const fn deactivate(&mut self) -> Option<T> {
        self.active = false;
        self.value.take()
    }

    /// One more free slot below (or at) this node.
    #[inline]
    pub const fn increment_capacity(&mut self) {
        self.capacity += 1;
    }

    /// One free slot below (or at) this node has been claimed.
    #[inline]
    pub fn decrement_capacity(&mut self) {
        debug_assert!(self.capacity > 0, "capacity underflow");
        self.capacity = self.capacity.saturating_sub(1);
    }

    /// `true` iff `other` should sit above this slot's element under `cmp`.
    ///
    /// An empty slot ranks below everything.
    #[inline]
    pub fn is_greater_than<C: Compare<T>>(&self, other: &T, cmp: &C) -> bool {
        self.value.as_ref().is_none_or(|mine| cmp.greater(other, mine))
    }

    /// Clear the slot back to its freshly constructed state.
    #[inline]
    pub fn reset(&mut self) {
        self.active = false;
        self.value = None;
        self.capacity = 0;
    }
}

// ============================================================================
//  Tests
// ============================================================================
