//! Filepath: src/heap/scan.rs
//!
//! Operations that lock every level at once.
//!
//! Guards are taken top-down, the same order every walk uses, so a scan
//! queues up behind in-flight walks instead of deadlocking with them. Once
//! it holds level `L`, no walk can be active at or above `L`.

use super::PipelinedHeap;
use crate::compare::Compare;
use crate::error::PqError;
use crate::ordering::{COUNT_READ, COUNT_WRITE};
use crate::token::{LevelGuard, TokenState, restore_capacities};
use crate::tracing_helpers::{debug_log, error_log};
use crate::tree_math::parent;

impl<T, C> PipelinedHeap<T, C> {
    /// `true` if some queued element equals `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let tree = self.tree.read();
        let guards: Vec<LevelGuard<'_, T>> = tree.lock_all();
        guards.iter().any(|level| level_holds(level, value))
    }

    /// `true` if every element of `items` is queued.
    ///
    /// # Errors
    ///
    /// [`PqError::InvalidArgument`] if any item is `None`. Checked before
    /// any lock is taken.
    pub fn contains_all<'a, I>(&self, items: I) -> Result<bool, PqError>
    where
        I: IntoIterator<Item = Option<&'a T>>,
        T: PartialEq + 'a,
    {
        let wanted: Vec<&T> = items
            .into_iter()
            .collect::<Option<Vec<&T>>>()
            .ok_or(PqError::InvalidArgument)?;

        let tree = self.tree.read();
        let guards: Vec<LevelGuard<'_, T>> = tree.lock_all();
        Ok(wanted
            .iter()
            .all(|value| guards.iter().any(|level| level_holds(level, value))))
    }

    /// Remove every element. The slot array keeps its current length.
    pub fn clear(&self) {
        let tree = self.tree.read();
        let mut guards: Vec<LevelGuard<'_, T>> = tree.lock_all();

        for level in &mut guards {
            let _ = level.take_value();
            for (_, slot) in level.slots_mut() {
                slot.reset();
            }
        }
        restore_capacities(&mut guards);

        self.count.store(0, COUNT_WRITE);
        debug_log!(slots = tree.len, "queue cleared");
    }

    /// Copies of every queued element, in slot order (not priority order).
    pub fn to_snapshot_array(&self) -> Vec<T>
    where
        T: Clone,
    {
        let tree = self.tree.read();
        let guards: Vec<LevelGuard<'_, T>> = tree.lock_all();

        let mut out: Vec<T> = Vec::with_capacity(self.count.load(COUNT_READ));
        for level in &guards {
            out.extend(
                level
                    .slots()
                    .filter(|(_, slot)| slot.is_active())
                    .filter_map(|(_, slot)| slot.value().cloned()),
            );
        }
        out
    }
}

impl<T, C: Compare<T>> PipelinedHeap<T, C> {
    /// Verify the whole heap under full exclusion.
    ///
    /// Checks, for every slot:
    /// - its capacity equals its own vacancy plus its children's capacities,
    /// - an active slot holds a value and sits under an active parent,
    /// - an active slot does not rank above its parent;
    ///
    /// that no level token is carrying a value; and that the number of
    /// active slots equals [`len`](Self::len).
    ///
    /// # Errors
    ///
    /// [`PqError::Corrupted`] naming the first offending index.
    pub fn check_invariants(&self) -> Result<(), PqError> {
        let tree = self.tree.read();
        let guards: Vec<LevelGuard<'_, T>> = tree.lock_all();

        let mut active: usize = 0;
        for (depth, level) in guards.iter().enumerate() {
            if level.value().is_some() {
                return Err(corruption(level.position(), "token carries a value between walks"));
            }

            let above: Option<&TokenState<T>> = depth.checked_sub(1).and_then(|d| guards.get(d)).map(|g| &**g);
            let below: Option<&TokenState<T>> = guards.get(depth + 1).map(|g| &**g);

            for (index, slot) in level.slots() {
                let expected = usize::from(!slot.is_active()) + below.map_or(0, |b| b.child_capacity(index));
                if slot.capacity() != expected {
                    return Err(corruption(index, "capacity does not match subtree vacancies"));
                }
                if !slot.is_active() {
                    continue;
                }
                active += 1;

                let Some(value) = slot.value() else {
                    return Err(corruption(index, "active slot holds no value"));
                };
                let Some(up) = parent(index) else {
                    continue;
                };
                let parent_slot = above.and_then(|a| a.slot(up));
                match parent_slot.filter(|p| p.is_active()).and_then(|p| p.value()) {
                    None => return Err(corruption(index, "active slot under an empty parent")),
                    Some(above_value) if self.cmp.greater(value, above_value) => {
                        return Err(corruption(index, "slot ranks above its parent"));
                    }
                    Some(_) => {}
                }
            }
        }

        let len = self.count.load(COUNT_READ);
        if active != len {
            return Err(corruption(active, "active slot count differs from len"));
        }
        Ok(())
    }
}

fn level_holds<T: PartialEq>(level: &TokenState<T>, value: &T) -> bool {
    level
        .slots()
        .any(|(_, slot)| slot.is_active() && slot.value() == Some(value))
}

#[cold]
fn corruption(index: usize, reason: &'static str) -> PqError {
    error_log!(index, reason, "heap invariant violated");
    PqError::corrupted(index, reason)
}
