//! Standard memory orderings for the heap's shared counters.
//!
//! Slot contents are always protected by a level mutex, so these orderings
//! only matter for the lock-free `len` counter and the waiter count used by
//! the blocking take.

use std::sync::atomic::Ordering;

/// Ordering for `len` reads on the fast path (`len`, `poll` early-out).
pub const COUNT_READ: Ordering = Ordering::Acquire;

/// Ordering for `len` increments and decrements.
pub const COUNT_WRITE: Ordering = Ordering::Release;

/// Ordering for the waiter count and the waiter's read of `len`.
///
/// Every such access happens under the signal mutex, which orders the
/// waiter's registration against the inserter's check.
pub const SIGNAL_ORD: Ordering = Ordering::Relaxed;

/// Ordering for setting the cancellation flag.
pub const CANCEL_ORD: Ordering = Ordering::Release;

/// Ordering for observing the cancellation flag.
pub const CANCEL_READ: Ordering = Ordering::Acquire;
