//! Cooperative cancellation for blocking takes.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::ordering::{CANCEL_ORD, CANCEL_READ};

/// A cloneable cancellation flag.
///
/// All clones share one flag. A thread blocked in
/// [`PipelinedHeap::take_cancellable`](crate::PipelinedHeap::take_cancellable)
/// re-checks it at every wait point and returns
/// [`PqError::Cancelled`](crate::PqError::Cancelled) once it is set.
/// Operations that are already walking the tree are never interrupted.
///
/// ```rust
/// use pipeheap::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, CANCEL_ORD);
    }

    /// `true` once any clone has called [`cancel`](Self::cancel).
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(CANCEL_READ)
    }
}
