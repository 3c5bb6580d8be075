//! Filepath: src/heap/extract.rs
//!
//! Pipelined extraction and the blocking take family.
//!
//! Removing the head leaves a hole at the root. The hole then sinks: at each
//! level the greater active child is promoted into it and the hole moves to
//! that child's slot. The walk ends when the hole has no active child.

use std::iter;

use super::PipelinedHeap;
use crate::cancel::CancelToken;
use crate::compare::Compare;
use crate::error::PqError;
use crate::ordering::{COUNT_READ, COUNT_WRITE};
use crate::token::{LevelLock, TokenState};
use crate::tracing_helpers::{debug_log, trace_log};
use crate::tree_math::{left_child, right_child};

impl<T, C: Compare<T>> PipelinedHeap<T, C> {
    /// Remove and return the head, or `None` if the queue is empty.
    ///
    /// Never waits for an element to arrive.
    pub fn poll(&self) -> Option<T> {
        if self.count.load(COUNT_READ) == 0 {
            return None;
        }

        let tree = self.tree.read();
        extract_walk(&tree.tokens, &self.cmp, || {
            self.count.fetch_sub(1, COUNT_WRITE);
        })
    }

    /// Remove and return the head.
    ///
    /// # Errors
    ///
    /// [`PqError::EmptyQueue`] if there is nothing to remove.
    pub fn remove(&self) -> Result<T, PqError> {
        self.poll().ok_or(PqError::EmptyQueue)
    }

    /// Remove and return the head, waiting for one to be inserted if the
    /// queue is empty.
    pub fn take(&self) -> T {
        loop {
            if let Some(head) = self.poll() {
                return head;
            }
            self.wait_not_empty(None);
        }
    }

    /// Like [`take`](Self::take), but gives up once `cancel` fires.
    ///
    /// Cancellation is observed before the first attempt and at every wake.
    /// A walk that has already started always completes.
    ///
    /// # Errors
    ///
    /// [`PqError::Cancelled`] if `cancel` fired before an element was taken.
    pub fn take_cancellable(&self, cancel: &CancelToken) -> Result<T, PqError> {
        loop {
            if cancel.is_cancelled() {
                // Pass on any wake-up this waiter may have absorbed.
                if self.count.load(COUNT_READ) > 0 {
                    self.signal_not_empty();
                }
                debug_log!("take cancelled");
                return Err(PqError::Cancelled);
            }
            if let Some(head) = self.poll() {
                return Ok(head);
            }
            self.wait_not_empty(Some(cancel));
        }
    }

    /// Move every queued element into `sink`, head first. Returns how many
    /// were moved.
    pub fn drain_to<E: Extend<T>>(&self, sink: &mut E) -> usize {
        self.drain_to_max(sink, usize::MAX)
    }

    /// Move up to `max` elements into `sink`, head first. Returns how many
    /// were moved.
    pub fn drain_to_max<E: Extend<T>>(&self, sink: &mut E, max: usize) -> usize {
        let mut moved: usize = 0;
        while moved < max {
            let Some(head) = self.poll() else {
                break;
            };
            sink.extend(iter::once(head));
            moved += 1;
        }

        debug_log!(moved, max, "drain finished");
        moved
    }
}

impl<T: Clone, C> PipelinedHeap<T, C> {
    /// A copy of the head, or `None` if the queue is empty.
    ///
    /// Only level 0 is locked, so an insert that is still sinking a
    /// displaced element does not delay the read.
    pub fn peek(&self) -> Option<T> {
        let tree = self.tree.read();
        let root = tree.level(0)?.lock();
        root.slot(0)
            .filter(|slot| slot.is_active())
            .and_then(|slot| slot.value().cloned())
    }

    /// A copy of the head.
    ///
    /// # Errors
    ///
    /// [`PqError::EmptyQueue`] if the queue is empty.
    pub fn element(&self) -> Result<T, PqError> {
        self.peek().ok_or(PqError::EmptyQueue)
    }
}

/// Remove the head of `levels` and sink the hole it leaves, hand-over-hand.
///
/// `on_removed` runs once the hole has settled, while its level is still
/// held. `None` without side effects if the root is empty.
pub(super) fn extract_walk<T, C, L>(levels: &[L], cmp: &C, on_removed: impl FnOnce()) -> Option<T>
where
    C: Compare<T>,
    L: LevelLock<T>,
{
    let mut cur = levels.first()?.lock_level();
    let mut next = levels.get(1).map(L::lock_level);

    let root = cur.slot_mut(0)?;
    if !root.is_active() {
        trace_log!("poll found an empty root");
        return None;
    }
    let head: Option<T> = root.deactivate();
    root.increment_capacity();
    cur.set_position(0);

    let mut level: usize = 0;
    while let Some(below) = next.as_deref_mut() {
        if !extract_step(cmp, &mut *cur, below) {
            break;
        }
        let Some(below) = next.take() else {
            break;
        };
        // Releases `level`; `level + 1` stays held.
        cur = below;
        level += 1;
        next = levels.get(level + 1).map(L::lock_level);
    }

    on_removed();
    trace_log!(depth = level, position = cur.position(), "hole settled");
    head
}

/// Run the extract step for the level owned by `cur`.
///
/// The hole sits at `cur.position()`. Promotes the greater active child from
/// `below` into it (ties go left) and moves the hole down. Returns `false`
/// when the hole has no active child and the walk is over.
pub(super) fn extract_step<T, C: Compare<T>>(
    cmp: &C,
    cur: &mut TokenState<T>,
    below: &mut TokenState<T>,
) -> bool {
    let pos: usize = cur.position();
    let Some(child) = greater_child(cmp, below, pos) else {
        return false;
    };

    let Some(child_slot) = below.slot_mut(child) else {
        return false;
    };
    let promoted: Option<T> = child_slot.deactivate();
    child_slot.increment_capacity();

    let (Some(promoted), Some(hole)) = (promoted, cur.slot_mut(pos)) else {
        return false;
    };
    hole.activate(promoted);

    below.set_position(child);
    true
}

/// The active child of `pos` ranking greatest, left on ties.
fn greater_child<T, C: Compare<T>>(cmp: &C, below: &TokenState<T>, pos: usize) -> Option<usize> {
    let active = |index: usize| {
        below
            .slot(index)
            .filter(|slot| slot.is_active())
            .and_then(|slot| slot.value())
            .map(|value| (index, value))
    };

    match (active(left_child(pos)), active(right_child(pos))) {
        (None, None) => None,
        (Some((l, _)), None) => Some(l),
        (None, Some((r, _))) => Some(r),
        (Some((l, lv)), Some((r, rv))) => {
            if cmp.greater(rv, lv) {
                Some(r)
            } else {
                Some(l)
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "fail fast in tests")]
mod tests {
    use super::*;
    use crate::compare::{NaturalOrder, ReverseOrder};
    use crate::slot::HeapSlot;
    use crate::token::{LevelGuard, LevelToken, restore_capacities};

    fn filled(values: &[Option<u32>]) -> Vec<LevelToken<u32>> {
        let slots: Vec<HeapSlot<u32>> = values
            .iter()
            .map(|v| {
                let mut slot = HeapSlot::new();
                if let Some(v) = v {
                    slot.activate(*v);
                }
                slot
            })
            .collect();
        let tokens = LevelToken::split_rows(slots);
        {
            let mut guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
            restore_capacities(&mut guards);
        }
        tokens
    }

    #[test]
    fn step_promotes_greater_child() {
        let tokens = filled(&[None, Some(3), Some(8)]);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();
        root.slot_mut(0).unwrap().set_capacity(2);

        root.set_position(0);
        assert!(extract_step(&NaturalOrder, &mut root, &mut below));

        assert_eq!(root.slot(0).unwrap().value(), Some(&8));
        assert!(!below.slot(2).unwrap().is_active());
        assert_eq!(below.slot(2).unwrap().capacity(), 1);
        assert_eq!(below.position(), 2);
    }

    #[test]
    fn step_respects_reverse_order() {
        let tokens = filled(&[None, Some(3), Some(8)]);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();

        root.set_position(0);
        assert!(extract_step(&ReverseOrder, &mut root, &mut below));

        assert_eq!(root.slot(0).unwrap().value(), Some(&3));
        assert_eq!(below.position(), 1);
    }

    #[test]
    fn ties_promote_left() {
        let tokens = filled(&[None, Some(5), Some(5)]);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();

        root.set_position(0);
        assert!(extract_step(&NaturalOrder, &mut root, &mut below));
        assert_eq!(below.position(), 1);
    }

    #[test]
    fn step_stops_without_active_children() {
        let tokens = filled(&[None, None, None]);
        let mut root = tokens[0].lock();
        let mut below = tokens[1].lock();

        root.set_position(0);
        assert!(!extract_step(&NaturalOrder, &mut root, &mut below));
        assert!(!root.slot(0).unwrap().is_active());
    }

    #[test]
    fn walk_on_empty_root_leaves_tree_alone() {
        let tokens = filled(&[None, None, None]);
        let mut removed = false;

        assert_eq!(extract_walk(&tokens, &NaturalOrder, || removed = true), None);
        assert!(!removed);
        assert_eq!(tokens[0].lock().slot(0).unwrap().capacity(), 3);
    }

    #[test]
    fn walk_promotes_along_the_greater_path() {
        let tokens = filled(&[Some(9), Some(4), Some(8), Some(1), Some(2), Some(7), Some(3)]);
        let mut removed = 0;

        assert_eq!(extract_walk(&tokens, &NaturalOrder, || removed += 1), Some(9));
        assert_eq!(removed, 1);

        let guards: Vec<LevelGuard<'_, u32>> = tokens.iter().map(LevelToken::lock).collect();
        assert_eq!(guards[0].slot(0).unwrap().value(), Some(&8));
        assert_eq!(guards[1].slot(2).unwrap().value(), Some(&7));
        // The hole settles where 7 was.
        assert!(!guards[2].slot(5).unwrap().is_active());
        assert_eq!(guards[0].slot(0).unwrap().capacity(), 1);
    }

    #[test]
    fn poll_and_peek_on_empty_queue() {
        let heap: PipelinedHeap<u32> = PipelinedHeap::new();

        assert_eq!(heap.poll(), None);
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.remove(), Err(PqError::EmptyQueue));
        assert_eq!(heap.element(), Err(PqError::EmptyQueue));
    }

    #[test]
    fn poll_keeps_capacities_consistent() {
        let heap: PipelinedHeap<u32> = PipelinedHeap::with_capacity(15);
        for v in [4, 11, 7, 2, 9, 13, 1, 6] {
            heap.insert(v).unwrap();
        }

        for expected in [13, 11, 9, 7] {
            assert_eq!(heap.poll(), Some(expected));
            heap.check_invariants().unwrap();
        }
        assert_eq!(heap.len(), 4);
    }

    #[test]
    fn drain_to_max_stops_at_limit() {
        let heap: PipelinedHeap<u32> = PipelinedHeap::new();
        heap.add_all([1, 5, 3, 9, 7]).unwrap();

        let mut sink: Vec<u32> = Vec::new();
        assert_eq!(heap.drain_to_max(&mut sink, 2), 2);
        assert_eq!(sink, vec![9, 7]);

        assert_eq!(heap.drain_to(&mut sink), 3);
        assert_eq!(sink, vec![9, 7, 5, 3, 1]);
        assert!(heap.is_empty());
    }

    #[test]
    fn take_returns_immediately_when_non_empty() {
        let heap: PipelinedHeap<u32> = PipelinedHeap::new();
        heap.insert(12).unwrap();

        assert_eq!(heap.take(), 12);
    }

    #[test]
    fn cancelled_take_fails_fast() {
        let heap: PipelinedHeap<u32> = PipelinedHeap::new();
        heap.insert(1).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        assert_eq!(heap.take_cancellable(&cancel), Err(PqError::Cancelled));
        assert_eq!(heap.len(), 1);
    }
}
