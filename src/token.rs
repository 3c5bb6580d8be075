//! Filepath: src/token.rs
//!
//! Per-level lock tokens.
//!
//! Each tree level owns exactly one [`LevelToken`]. The token's mutex guards
//! a [`TokenState`]: the staging record (`position`, `value`) used to hand an
//! in-flight operation from level `i` to level `i + 1`, plus the row of
//! [`HeapSlot`]s that make up the level. Holding a [`LevelGuard`] is
//! therefore proof that the caller may read and write every slot on that
//! level, and nothing else.
//!
//! # Locking Protocol
//!
//! 1. Levels are always locked in ascending order.
//! 2. A pipelined step at level `i` holds the guards for `i` and `i + 1`.
//! 3. Full scans hold every guard, acquired `0..height`.
//!
//! ```rust,ignore
//! let mut cur = tree.level(0).lock();
//! let mut next = tree.level(1).map(LevelToken::lock);
//! // ... single-level step ...
//! cur = next.take()?;                      // releases level 0
//! next = tree.level(2).map(LevelToken::lock);
//! ```

use std::ops::DerefMut;

use parking_lot::{Mutex, MutexGuard};

use crate::slot::HeapSlot;
use crate::tree_math::{left_child, level_span, level_start, levels_for_size, right_child};

/// Guard proving the holder owns one level.
pub type LevelGuard<'a, T> = MutexGuard<'a, TokenState<T>>;

// ============================================================================
//  TokenState
// ============================================================================

/// Everything protected by one level's lock.
#[derive(Debug)]
pub struct TokenState<T> {
    /// Array index being processed at this level by the in-flight operation.
    position: usize,

    /// Value carried through this level. Empty between steps.
    value: Option<T>,

    /// Array index of `row[0]`.
    base: usize,

    /// Slots `base .. base + row.len()`.
    row: Box<[HeapSlot<T>]>,
}

impl<T> TokenState<T> {
    fn from_row(base: usize, row: Box<[HeapSlot<T>]>) -> Self {
        Self {
            position: 0,
            value: None,
            base,
            row,
        }
    }

    /// Array index being processed at this level.
    #[inline(always)]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Point the in-flight operation at `position`.
    #[inline(always)]
    pub const fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Value currently staged at this level.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Stage `value` for the step at this level.
    #[inline]
    pub fn set_value(&mut self, value: T) {
        debug_assert!(self.value.is_none(), "token already carries a value");
        self.value = Some(value);
    }

    /// Remove the staged value, leaving the token empty.
    #[inline]
    pub const fn take_value(&mut self) -> Option<T> {
        self.value.take()
    }

    /// First array index on this level.
    #[inline]
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Number of slots on this level (the last level may be partial).
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.row.len()
    }

    /// Slot at array `index`, if it lies on this level.
    #[inline]
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&HeapSlot<T>> {
        self.row.get(index.checked_sub(self.base)?)
    }

    /// Mutable slot at array `index`, if it lies on this level.
    #[inline]
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut HeapSlot<T>> {
        self.row.get_mut(index.checked_sub(self.base)?)
    }

    /// Iterate `(array index, slot)` across the row.
    pub fn slots(&self) -> impl Iterator<Item = (usize, &HeapSlot<T>)> {
        let base = self.base;
        self.row.iter().enumerate().map(move |(i, s)| (base + i, s))
    }

    /// Iterate `(array index, slot)` mutably across the row.
    pub fn slots_mut(&mut self) -> impl Iterator<Item = (usize, &mut HeapSlot<T>)> {
        let base = self.base;
        self.row
            .iter_mut()
            .enumerate()
            .map(move |(i, s)| (base + i, s))
    }

    /// Sum of the capacities of `index`'s children on this level.
    #[inline]
    #[must_use]
    pub fn child_capacity(&self, index: usize) -> usize {
        let left = self.slot(left_child(index)).map_or(0, HeapSlot::capacity);
        let right = self.slot(right_child(index)).map_or(0, HeapSlot::capacity);
        left + right
    }

    /// Take the row out, leaving an empty one. Used when rebuilding.
    pub(crate) fn take_row(&mut self) -> Box<[HeapSlot<T>]> {
        std::mem::take(&mut self.row)
    }
}

// ============================================================================
//  LevelToken
// ============================================================================

/// The lockable token for one tree level.
#[derive(Debug)]
pub struct LevelToken<T> {
    state: Mutex<TokenState<T>>,
}

impl<T> LevelToken<T> {
    /// A token for `level` owning the slots of `row`, which must start at
    /// array index `2^level - 1`.
    #[must_use]
    pub fn new(level: usize, row: Box<[HeapSlot<T>]>) -> Self {
        Self {
            state: Mutex::new(TokenState::from_row(level_start(level), row)),
        }
    }

    /// Build one token per level for a flat slot array.
    pub fn split_rows(slots: Vec<HeapSlot<T>>) -> Vec<Self> {
        let len = slots.len();
        let height = levels_for_size(len);
        let mut rest = slots.into_iter();

        (0..height)
            .map(|level| {
                let (start, end) = level_span(level, len);
                let row: Box<[HeapSlot<T>]> = rest.by_ref().take(end - start).collect();
                Self::new(level, row)
            })
            .collect()
    }

    /// Block until this level is free and take it.
    #[inline]
    pub fn lock(&self) -> LevelGuard<'_, T> {
        self.state.lock()
    }

    /// Direct access when the caller already has exclusive ownership.
    #[inline]
    pub fn get_mut(&mut self) -> &mut TokenState<T> {
        self.state.get_mut()
    }

    /// Consume the token and return its row.
    pub fn into_row(self) -> Box<[HeapSlot<T>]> {
        self.into_state().take_row()
    }

    /// Consume the token and return the state it guarded.
    pub fn into_state(self) -> TokenState<T> {
        self.state.into_inner()
    }
}

/// Anything that can hand out exclusive access to one level's state.
///
/// The pipelined walks are written against this so the same loop runs on
/// [`LevelToken`] and on the model-checker mutexes used in tests.
pub(crate) trait LevelLock<T> {
    type Guard<'a>: DerefMut<Target = TokenState<T>>
    where
        Self: 'a;

    /// Block until the level is free and take it.
    fn lock_level(&self) -> Self::Guard<'_>;
}

impl<T> LevelLock<T> for LevelToken<T> {
    type Guard<'a>
        = LevelGuard<'a, T>
    where
        Self: 'a;

    #[inline]
    fn lock_level(&self) -> LevelGuard<'_, T> {
        self.lock()
    }
}

// ============================================================================
//  Capacity pass
// ============================================================================

/// Recompute every slot's capacity from the bottom level up.
///
/// `levels[L]` must be the state of level `L`. Children live exclusively on
/// the next level, so walking levels in reverse is a post-order pass over
/// the whole tree.
pub fn restore_capacities<T, S>(levels: &mut [S])
where
    S: DerefMut<Target = TokenState<T>>,
{
    for level in (0..levels.len()).rev() {
        let (upper, lower) = levels.split_at_mut(level + 1);
        let below: Option<&TokenState<T>> = lower.first().map(|s| &**s);
        let Some(current) = upper.last_mut() else {
            continue;
        };

        for (index, slot) in current.slots_mut() {
            let own = usize::from(!slot.is_active());
            let children = below.map_or(0, |b| b.child_capacity(index));
            slot.set_capacity(own + children);
        }
    }
}

// ============================================================================
//  Tests
// ============================================================================
