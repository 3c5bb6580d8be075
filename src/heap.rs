//! Filepath: src/heap.rs
//!
//! `PipelinedHeap` - a concurrent priority queue with per-level locking.
//!
//! The heap array is partitioned by tree level. Level `L` is owned by one
//! [`LevelToken`], whose mutex guards both the level's slots and the staging
//! record used to hand an operation down to level `L + 1`. Inserts and
//! extracts walk the tree hand-over-hand, holding at most two adjacent
//! levels at a time, so several operations can be in flight at different
//! depths.
//!
//! # Structural Changes
//!
//! The token array sits behind an [`RwLock`]. Every operation holds the
//! read side while it walks; growing the array takes the write side, which
//! waits for all in-flight walks to drain. This is the "all level locks"
//! exclusion, and it is never requested while any level guard is held.

use std::fmt as StdFmt;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::cancel::CancelToken;
use crate::compare::{Compare, NaturalOrder};
use crate::ordering::{COUNT_READ, SIGNAL_ORD};
use crate::slot::HeapSlot;
use crate::token::{LevelGuard, LevelToken, TokenState, restore_capacities};
use crate::tree_math::levels_for_size;

mod extract;
mod insert;
mod resize;
mod scan;




// ============================================================================
//  Configuration
// ============================================================================

/// Slot count used by [`PipelinedHeap::new`].
pub const DEFAULT_CAPACITY: usize = 11;

/// Level count of a [`DEFAULT_CAPACITY`]-slot tree.
pub const DEFAULT_LEVELS: usize = levels_for_size(DEFAULT_CAPACITY);

/// Below this many slots the array doubles on growth; above it, it grows by half.
pub const DOUBLING_LIMIT: usize = 64;

/// Largest slot array the heap will grow to.
pub const MAX_SLOTS: usize = isize::MAX as usize;

/// How often a cancellable take re-checks its token while waiting.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ============================================================================
//  Tree
// ============================================================================

/// The level tokens plus the slot array length they cover.
pub(crate) struct Tree<T> {
    tokens: Vec<LevelToken<T>>,
    len: usize,
}

impl<T> Tree<T> {
    fn with_slots(len: usize) -> Self {
        Self::from_slots((0..len).map(|_| HeapSlot::new()).collect())
    }

    /// Partition `slots` into level rows and run the capacity pass.
    fn from_slots(slots: Vec<HeapSlot<T>>) -> Self {
        let len = slots.len();
        let mut tokens = LevelToken::split_rows(slots);
        {
            let mut states: Vec<&mut TokenState<T>> =
                tokens.iter_mut().map(LevelToken::get_mut).collect();
            restore_capacities(&mut states);
        }
        Self { tokens, len }
    }

    #[inline]
    fn height(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    fn level(&self, level: usize) -> Option<&LevelToken<T>> {
        self.tokens.get(level)
    }

    /// Every level guard, acquired in ascending order.
    fn lock_all(&self) -> Vec<LevelGuard<'_, T>> {
        self.tokens.iter().map(LevelToken::lock).collect()
    }
}

// ============================================================================
//  PipelinedHeap
// ============================================================================

/// A concurrent, unbounded priority queue.
///
/// The head is the element that ranks greatest under `C`. With the default
/// [`NaturalOrder`] this is a max-queue; use
/// [`ReverseOrder`](crate::ReverseOrder) for a min-queue.
///
/// # Example
///
/// ```rust
/// use pipeheap::PipelinedHeap;
///
/// let heap: PipelinedHeap<u32> = PipelinedHeap::new();
/// for v in [5, 1, 4, 2, 8] {
///     heap.insert(v).unwrap();
/// }
///
/// assert_eq!(heap.peek(), Some(8));
/// let drained: Vec<u32> = std::iter::from_fn(|| heap.poll()).collect();
/// assert_eq!(drained, vec![8, 5, 4, 2, 1]);
/// ```
///
/// # Thread Safety
///
/// `PipelinedHeap<T, C>` is `Send + Sync` when `T: Send` and `C: Send + Sync`;
/// share it with an `Arc`.
pub struct PipelinedHeap<T, C = NaturalOrder> {
    /// Level tokens. Read side for walks, write side for growth.
    tree: RwLock<Tree<T>>,

    /// Number of active slots.
    count: AtomicUsize,

    /// Ordering used to rank elements.
    cmp: C,

    /// Threads parked in a blocking take.
    waiters: AtomicUsize,

    /// Mutex paired with `not_empty` (required by the [`parking_lot`] API).
    signal: Mutex<()>,

    /// Notified after an insert when a waiter may be parked.
    not_empty: Condvar,
}

impl<T> PipelinedHeap<T, NaturalOrder> {
    /// An empty max-queue with [`DEFAULT_CAPACITY`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// An empty max-queue with room for `capacity` elements before growing.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_ordering(capacity, NaturalOrder)
    }
}

impl<T, C> PipelinedHeap<T, C> {
    /// An empty queue ranked by `cmp`, with room for `capacity` elements.
    ///
    /// A capacity of zero is treated as one.
    ///
    /// ```rust
    /// use pipeheap::PipelinedHeap;
    ///
    /// let heap: PipelinedHeap<u32, _> =
    ///     PipelinedHeap::with_capacity_and_ordering(4, |a: &u32, b: &u32| b.cmp(a));
    /// heap.insert(3).unwrap();
    /// heap.insert(1).unwrap();
    /// assert_eq!(heap.poll(), Some(1));
    /// ```
    #[must_use]
    pub fn with_capacity_and_ordering(capacity: usize, cmp: C) -> Self {
        Self::from_tree(Tree::with_slots(capacity.max(1)), 0, cmp)
    }

    fn from_tree(tree: Tree<T>, count: usize, cmp: C) -> Self {
        Self {
            tree: RwLock::new(tree),
            count: AtomicUsize::new(count),
            cmp,
            waiters: AtomicUsize::new(0),
            signal: Mutex::new(()),
            not_empty: Condvar::new(),
        }
    }

    /// Number of queued elements.
    ///
    /// Lock-free; may be momentarily stale while operations are in flight.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count.load(COUNT_READ)
    }

    /// `true` if no elements are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Always `usize::MAX`: the queue grows instead of filling up.
    #[inline]
    #[must_use]
    pub const fn remaining_capacity(&self) -> usize {
        usize::MAX
    }

    /// Current length of the slot array.
    #[must_use]
    pub fn slot_capacity(&self) -> usize {
        self.tree.read().len
    }

    /// Current number of tree levels (and level tokens).
    #[must_use]
    pub fn height(&self) -> usize {
        self.tree.read().height()
    }

    /// The ordering this queue ranks by.
    #[inline]
    pub const fn ordering(&self) -> &C {
        &self.cmp
    }

    // ------------------------------------------------------------------------
    //  Not-empty signalling
    // ------------------------------------------------------------------------

    /// Wake one parked taker, if any is parked.
    ///
    /// Called after every insert. `waiters` is read under the signal mutex,
    /// which a waiter holds from its registration until it parks, so either
    /// the waiter sees the new `count` or this sees the waiter.
    pub(crate) fn signal_not_empty(&self) {
        let _guard = self.signal.lock();
        if self.waiters.load(SIGNAL_ORD) > 0 {
            self.not_empty.notify_one();
        }
    }

    /// Park until `count` is non-zero or `cancel` fires.
    pub(crate) fn wait_not_empty(&self, cancel: Option<&CancelToken>) {
        let mut guard = self.signal.lock();
        self.waiters.fetch_add(1, SIGNAL_ORD);

        while self.count.load(SIGNAL_ORD) == 0 {
            match cancel {
                None => self.not_empty.wait(&mut guard),
                Some(token) => {
                    if token.is_cancelled() {
                        break;
                    }
                    let _ = self.not_empty.wait_for(&mut guard, CANCEL_POLL_INTERVAL);
                }
            }
        }

        self.waiters.fetch_sub(1, SIGNAL_ORD);
    }
}

impl<T, C: Compare<T>> PipelinedHeap<T, C> {
    /// Build a queue holding `items`, sized to fit them exactly.
    ///
    /// The elements are ranked once up front, so no per-element walk or
    /// growth is needed.
    #[must_use]
    pub fn from_iterable_with_ordering<I>(items: I, cmp: C) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut items: Vec<T> = items.into_iter().collect();
        // Descending rank order is already a valid heap layout.
        items.sort_by(|a, b| cmp.compare(b, a));

        let count = items.len();
        let mut slots: Vec<HeapSlot<T>> = Vec::with_capacity(count.max(1));
        for item in items {
            let mut slot = HeapSlot::new();
            slot.activate(item);
            slots.push(slot);
        }
        if slots.is_empty() {
            slots.push(HeapSlot::new());
        }

        Self::from_tree(Tree::from_slots(slots), count, cmp)
    }
}

impl<T: Ord> PipelinedHeap<T, NaturalOrder> {
    /// Build a max-queue holding `items`.
    #[must_use]
    pub fn from_iterable<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self::from_iterable_with_ordering(items, NaturalOrder)
    }
}

impl<T: Ord> FromIterator<T> for PipelinedHeap<T, NaturalOrder> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iterable(iter)
    }
}

impl<T> Default for PipelinedHeap<T, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> StdFmt::Debug for PipelinedHeap<T, C> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        let (slots, height) = self
            .tree
            .try_read()
            .map_or((None, None), |tree| (Some(tree.len), Some(tree.height())));

        f.debug_struct("PipelinedHeap")
            .field("len", &self.len())
            .field("slot_capacity", &slots)
            .field("height", &height)
            .field("waiters", &self.waiters.load(COUNT_READ))
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Tests
// ============================================================================
