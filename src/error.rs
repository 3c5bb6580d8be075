//! Filepath: src/error.rs
//!
//! Error type shared by every queue operation.

use std::fmt as StdFmt;

// ============================================================================
//  PqError
// ============================================================================

/// Errors surfaced by [`PipelinedHeap`](crate::PipelinedHeap).
///
/// Only [`PqError::Corrupted`] indicates a broken heap. Every other variant
/// is reported before any lock is taken, or after the heap has been left in
/// a consistent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PqError {
    /// An absent value was offered, or an absent element was found in a
    /// `contains_all` input.
    InvalidArgument,

    /// A throwing accessor (`element`, `remove`) was called on an empty queue.
    EmptyQueue,

    /// A cancellable blocking take observed its [`CancelToken`](crate::CancelToken).
    Cancelled,

    /// The slot array is already at [`MAX_SLOTS`](crate::MAX_SLOTS) and cannot grow.
    CapacityOverflow,

    /// Internal accounting no longer matches the heap contents.
    ///
    /// Fatal: the queue should be discarded.
    Corrupted {
        /// Array index where the mismatch was detected.
        index: usize,
        /// Which invariant failed.
        reason: &'static str,
    },
}

impl PqError {
    /// `true` for errors that mean the heap itself is no longer trustworthy.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    pub(crate) const fn corrupted(index: usize, reason: &'static str) -> Self {
        Self::Corrupted { index, reason }
    }
}

impl StdFmt::Display for PqError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "absent values cannot be stored in the queue"),

            Self::EmptyQueue => write!(f, "queue is empty"),

            Self::Cancelled => write!(f, "blocking take was cancelled"),

            Self::CapacityOverflow => write!(f, "slot array cannot grow past its maximum size"),

            Self::Corrupted { index, reason } => {
                write!(f, "heap corrupted at slot {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for PqError {}
