//! Filepath: src/heap/resize.rs
//!
//! Growing the slot array.
//!
//! Growth takes the write side of the tree lock, so it runs only once every
//! in-flight walk has released its levels. The flattened slots keep their
//! indices; new slots are appended inactive and the level rows and
//! capacities are rebuilt from scratch.

use std::mem as StdMem;

use super::{DOUBLING_LIMIT, MAX_SLOTS, PipelinedHeap, Tree};
use crate::error::PqError;
use crate::slot::HeapSlot;
use crate::token::LevelToken;
use crate::tracing_helpers::{debug_log, warn_log};

impl<T, C> PipelinedHeap<T, C> {
    /// Grow the slot array if the root has no free capacity left.
    ///
    /// Several inserters may find the tree full at once; only the first to
    /// get the write lock grows it, the rest see free capacity and return.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub(super) fn resize(&self) -> Result<(), PqError> {
        let mut tree = self.tree.write();

        let root_capacity: usize = tree
            .tokens
            .first_mut()
            .and_then(|token| token.get_mut().slot(0).map(HeapSlot::capacity))
            .unwrap_or(0);
        if root_capacity > 0 {
            return Ok(());
        }

        let old_len: usize = tree.len;
        let new_len: usize = grown_len(old_len);
        if new_len <= old_len {
            warn_log!(old_len, "slot array cannot grow further");
            return Err(PqError::CapacityOverflow);
        }

        tree.rebuild(new_len);
        debug_log!(old_len, new_len, height = tree.height(), "slot array grown");
        Ok(())
    }
}

impl<T> Tree<T> {
    /// Flatten the rows, extend to `new_len` slots, and re-split.
    fn rebuild(&mut self, new_len: usize) {
        let tokens: Vec<LevelToken<T>> = StdMem::take(&mut self.tokens);

        let mut slots: Vec<HeapSlot<T>> = Vec::with_capacity(new_len);
        for token in tokens {
            slots.extend(token.into_row().into_vec());
        }
        slots.resize_with(new_len, HeapSlot::new);

        *self = Self::from_slots(slots);
    }
}

/// Next slot array length: doubles below [`DOUBLING_LIMIT`], then grows by
/// half. Never exceeds [`MAX_SLOTS`].
pub(super) const fn grown_len(len: usize) -> usize {
    let step: usize = if len < DOUBLING_LIMIT { len } else { len >> 1 };
    let step: usize = if step == 0 { 1 } else { step };

    let grown: usize = len.saturating_add(step);
    if grown > MAX_SLOTS { MAX_SLOTS } else { grown }
}
