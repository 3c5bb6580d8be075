//! # `pipeheap`
//!
//! A concurrent, unbounded priority queue built on an array binary heap
//! with one lock per tree level.
//!
//! Instead of one lock around the whole heap, each level of the tree has its
//! own token. Inserts and extracts walk the tree hand-over-hand, holding at
//! most two adjacent levels, so several operations are in flight at once at
//! different depths:
//! - **Insert** enters at the root and sinks, swapping past smaller
//!   elements, steered by per-slot free-capacity counts toward a free slot.
//! - **Extract** removes the root and sinks the resulting hole, promoting
//!   the greater child at each level.
//! - **Resize** grows the array when the root reports no free capacity, under
//!   exclusion from every walk.
//!
//! ## Thread Safety
//!
//! `PipelinedHeap<T, C>` is `Send + Sync` when `T: Send` and `C: Send + Sync`.
//! Every operation takes `&self`:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use pipeheap::PipelinedHeap;
//!
//! let heap: Arc<PipelinedHeap<u64>> = Arc::new(PipelinedHeap::new());
//!
//! let handles: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let heap = Arc::clone(&heap);
//!         thread::spawn(move || {
//!             for v in (t * 100)..((t + 1) * 100) {
//!                 heap.insert(v).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(heap.len(), 400);
//! assert_eq!(heap.poll(), Some(399));
//! ```
//!
//! ## Ordering
//!
//! The head is the element ranking greatest under the queue's [`Compare`]:
//!
//! | Ordering | Head |
//! |----------|------|
//! | [`NaturalOrder`] (default) | largest by `Ord` |
//! | [`ReverseOrder`] | smallest by `Ord` |
//! | `Fn(&T, &T) -> Ordering` | greatest by the closure |
//!
//! Elements of equal rank come out in no particular order.
//!
//! ## Blocking
//!
//! [`PipelinedHeap::take`] waits for an element; insertion never blocks
//! because the array grows instead of filling up.
//! [`PipelinedHeap::take_cancellable`] gives up when its [`CancelToken`]
//! fires.
//!
//! ## Logging
//!
//! Build with the `tracing` feature to route internal events to the
//! `tracing` crate. Without it the logging macros compile to nothing.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Hot step functions are small and called once per level.
#![allow(clippy::inline_always)]

pub mod cancel;
pub mod compare;
pub mod error;
pub mod heap;
pub mod ordering;
pub mod slot;
pub mod token;
pub mod tree_math;

mod tracing_helpers;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use compare::{Compare, NaturalOrder, ReverseOrder};
pub use error::PqError;
pub use heap::{
    CANCEL_POLL_INTERVAL, DEFAULT_CAPACITY, DEFAULT_LEVELS, DOUBLING_LIMIT, MAX_SLOTS,
    PipelinedHeap,
};
pub use slot::HeapSlot;
pub use token::{LevelGuard, LevelToken, TokenState};
