//! Filepath: src/heap/insert.rs
//!
//! Pipelined insertion.
//!
//! The new element enters at the root and sinks level by level. At each
//! level it either lands in a free slot, or trades places with the resident
//! element if it ranks higher and carries the loser one level down. Subtree
//! capacities steer it toward free slots, so it always reaches one.

use super::PipelinedHeap;
use crate::compare::Compare;
use crate::error::PqError;
use crate::ordering::COUNT_WRITE;
use crate::slot::HeapSlot;
use crate::token::{LevelLock, TokenState};
use crate::tracing_helpers::{error_log, trace_log};
use crate::tree_math::{left_child, right_child};

/// Outcome of one insert step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum InsertStep {
    /// The carried value now occupies a slot.
    Placed,
    /// The carried value moved into the next level's token.
    Descend,
}

impl<T, C: Compare<T>> PipelinedHeap<T, C> {
    /// Add `value` to the queue.
    ///
    /// Never blocks on a full queue: when the tree has no free slot left
    /// the slot array grows first. Wakes one blocked taker, if any.
    ///
    /// # Errors
    ///
    /// - [`PqError::CapacityOverflow`] if the array is already at
    ///   [`MAX_SLOTS`](crate::MAX_SLOTS).
    /// - [`PqError::Corrupted`] if the walk finds broken capacity accounting.
    pub fn insert(&self, value: T) -> Result<(), PqError> {
        let mut pending: T = value;

        loop {
            match self.try_insert(pending)? {
                None => break,
                Some(returned) => {
                    pending = returned;
                    self.resize()?;
                }
            }
        }

        self.signal_not_empty();
        Ok(())
    }

    /// Alias for [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert).
    #[inline]
    pub fn put(&self, value: T) -> Result<(), PqError> {
        self.insert(value)
    }

    /// Insert a value that may be absent.
    ///
    /// # Errors
    ///
    /// [`PqError::InvalidArgument`] for `None`, before any lock is taken.
    /// Otherwise as [`insert`](Self::insert).
    pub fn offer(&self, value: Option<T>) -> Result<(), PqError> {
        let Some(value) = value else {
            return Err(PqError::InvalidArgument);
        };
        self.insert(value)
    }

    /// Insert every element of `items`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// The first error returned by [`insert`](Self::insert).
    pub fn add_all<I>(&self, items: I) -> Result<(), PqError>
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().try_for_each(|item| self.insert(item))
    }

    /// One walk from the root. Hands `value` back if the tree is full.
    fn try_insert(&self, value: T) -> Result<Option<T>, PqError> {
        let tree = self.tree.read();
        insert_walk(&tree.tokens, &self.cmp, value, || {
            self.count.fetch_add(1, COUNT_WRITE);
        })
    }
}

/// Sink `value` from the root of `levels` to a free slot, hand-over-hand.
///
/// `on_placed` runs once the value lands, while the landing level is still
/// held. Returns the value untouched, with every level released, if the
/// root reports no free capacity.
pub(super) fn insert_walk<T, C, L>(
    levels: &[L],
    cmp: &C,
    value: T,
    on_placed: impl FnOnce(),
) -> Result<Option<T>, PqError>
where
    C: Compare<T>,
    L: LevelLock<T>,
{
    let Some(root) = levels.first() else {
        return Err(PqError::corrupted(0, "tree has no levels"));
    };

    let mut cur = root.lock_level();
    if cur.slot(0).map_or(0, HeapSlot::capacity) < 1 {
        // Release everything before growing; resize needs full exclusion.
        return Ok(Some(value));
    }
    let mut next = levels.get(1).map(L::lock_level);

    cur.set_position(0);
    cur.set_value(value);

    let mut level: usize = 0;
    loop {
        match insert_step(cmp, &mut *cur, next.as_deref_mut())? {
            InsertStep::Placed => {
                on_placed();
                trace_log!(depth = level, position = cur.position(), "insert placed");
                return Ok(None);
            }

            InsertStep::Descend => {
                let Some(below) = next.take() else {
                    return Err(PqError::corrupted(cur.position(), "descended past the last level"));
                };
                // Releases `level`; `level + 1` stays held.
                cur = below;
                level += 1;
                next = levels.get(level + 1).map(L::lock_level);
            }
        }
    }
}

/// Run the insert step for the level owned by `cur`.
///
/// `next` is the following level, already locked, or `None` at the bottom.
pub(super) fn insert_step<T, C: Compare<T>>(
    cmp: &C,
    cur: &mut TokenState<T>,
    next: Option<&mut TokenState<T>>,
) -> Result<InsertStep, PqError> {
    let pos: usize = cur.position();
    let Some(mut carried) = cur.take_value() else {
        return Err(PqError::corrupted(pos, "insert token carries no value"));
    };
    let Some(slot) = cur.slot_mut(pos) else {
        return Err(PqError::corrupted(pos, "token position outside its level"));
    };

    if !slot.is_active() {
        slot.activate(carried);
        slot.decrement_capacity();
        return Ok(InsertStep::Placed);
    }

    if slot.is_greater_than(&carried, cmp) {
        match slot.set_value(Some(carried)) {
            Some(displaced) => carried = displaced,
            None => return Err(PqError::corrupted(pos, "active slot holds no value")),
        }
    }
    // One free slot somewhere below has just been claimed.
    slot.decrement_capacity();

    let Some(below) = next else {
        error_log!(position = pos, "active leaf reached with a value in transit");
        return Err(PqError::corrupted(pos, "no free slot below an active leaf"));
    };
    let Some(child) = choose_child(below, pos) else {
        error_log!(position = pos, "no child subtree has free capacity");
        return Err(PqError::corrupted(pos, "no child subtree has free capacity"));
    };

    below.set_position(child);
    below.set_value(carried);
    Ok(InsertStep::Descend)
}

/// Pick the child of `pos` to sink into.
///
/// A vacant child wins outright; otherwise the one with strictly more free
/// capacity; ties go right. The winner must have room.
fn choose_child<T>(below: &TokenState<T>, pos: usize) -> Option<usize> {
    let (left, right) = (left_child(pos), right_child(pos));

    let chosen: usize = match (below.slot(left), below.slot(right)) {
        (None, None) => return None,
        (Some(_), None) => left,
        (None, Some(_)) => right,
        (Some(l), Some(r)) => {
            if !r.is_active() {
                right
            } else if !l.is_active() || l.capacity() > r.capacity() {
                left
            } else {
                right
            }
        }
    };

    below
        .slot(chosen)
        .filter(|slot| slot.capacity() > 0)
        .map(|_| chosen)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use crate::token::{LevelGuard, LevelToken, restore_capacities};

    fn tokens(len: usize) -> Vec<LevelToken<u32>> {
        let tokens = LevelToken::split_rows((0..len).map(|_| HeapSlot::new()).collect());
        {
            let mut guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
            restore_capacities(&mut guards);
        }
        tokens
    }

    #[test]
    fn step_places_into_vacant_slot() {
        let tokens = tokens(3);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();

        root.set_position(0);
        root.set_value(7);
        let step = insert_step(&NaturalOrder, &mut root, Some(&mut *below)).unwrap();

        assert_eq!(step, InsertStep::Placed);
        assert_eq!(root.slot(0).unwrap().value(), Some(&7));
        assert_eq!(root.slot(0).unwrap().capacity(), 2);
        assert!(root.value().is_none());
    }

    #[test]
    fn step_swaps_and_carries_loser_down() {
        let tokens = tokens(3);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();
        root.slot_mut(0).unwrap().activate(4);
        root.slot_mut(0).unwrap().decrement_capacity();

        root.set_position(0);
        root.set_value(9);
        let step = insert_step(&NaturalOrder, &mut root, Some(&mut *below)).unwrap();

        assert_eq!(step, InsertStep::Descend);
        assert_eq!(root.slot(0).unwrap().value(), Some(&9));
        assert_eq!(root.slot(0).unwrap().capacity(), 1);
        assert_eq!(below.value(), Some(&4));
        // Both children vacant: tie goes right.
        assert_eq!(below.position(), 2);
    }

    #[test]
    fn step_keeps_resident_when_it_ranks_higher() {
        let tokens = tokens(3);
        let mut guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
        guards[0].slot_mut(0).unwrap().activate(10);
        guards[1].slot_mut(2).unwrap().activate(1);
        restore_capacities(&mut guards);
        let (upper, lower) = guards.split_at_mut(1);
        let (root, below) = (&mut upper[0], &mut lower[0]);

        root.set_position(0);
        root.set_value(3);
        let step = insert_step(&NaturalOrder, root, Some(&mut **below)).unwrap();

        assert_eq!(step, InsertStep::Descend);
        assert_eq!(root.slot(0).unwrap().value(), Some(&10));
        assert_eq!(below.value(), Some(&3));
        // Left child is the vacant one.
        assert_eq!(below.position(), 1);
    }

    #[test]
    fn choose_child_prefers_more_capacity() {
        let tokens = tokens(7);
        let mut guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
        guards[1].slot_mut(1).unwrap().activate(5);
        guards[1].slot_mut(2).unwrap().activate(5);
        guards[2].slot_mut(6).unwrap().activate(1);
        restore_capacities(&mut guards);

        // Left subtree has 2 free, right has 1.
        assert_eq!(choose_child(&guards[1], 0), Some(1));
    }

    #[test]
    fn choose_child_rejects_full_subtrees() {
        let tokens = tokens(3);
        let mut guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
        guards[1].slot_mut(1).unwrap().activate(5);
        guards[1].slot_mut(2).unwrap().activate(5);
        restore_capacities(&mut guards);

        assert_eq!(choose_child(&guards[1], 0), None);
    }

    #[test]
    fn walk_hands_value_back_when_root_is_full() {
        let tokens = tokens(1);
        tokens[0].lock().slot_mut(0).unwrap().activate(5);
        restore_capacities(&mut [tokens[0].lock()]);

        let mut placed = false;
        let back = insert_walk(&tokens, &NaturalOrder, 9, || placed = true).unwrap();

        assert_eq!(back, Some(9));
        assert!(!placed);
        // Nothing stays locked or staged after the early return.
        assert!(tokens[0].lock().value().is_none());
    }

    #[test]
    fn walk_sinks_displaced_values_to_the_bottom() {
        let tokens = tokens(7);
        let mut placed = 0;
        for v in [1, 2, 3, 4, 5, 6, 7] {
            let back = insert_walk(&tokens, &NaturalOrder, v, || placed += 1).unwrap();
            assert_eq!(back, None);
        }

        assert_eq!(placed, 7);
        let guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
        assert_eq!(guards[0].slot(0).unwrap().value(), Some(&7));
        assert_eq!(guards[0].slot(0).unwrap().capacity(), 0);
        assert!(guards.iter().all(|g| g.value().is_none()));
        assert!(guards[2].slots().all(|(_, slot)| slot.is_active()));
    }

    #[test]
    fn step_without_next_level_is_corruption() {
        let tokens = tokens(1);
        let mut root = tokens[0].lock();
        root.slot_mut(0).unwrap().activate(1);
        root.slot_mut(0).unwrap().set_capacity(1);

        root.set_position(0);
        root.set_value(2);
        let err = insert_step(&NaturalOrder, &mut root, None).unwrap_err();

        assert!(err.is_fatal());
    }
}
