//! Filepath: src/compare.rs
//!
//! Ordering functions used to rank queue elements.
//!
//! The head of a [`PipelinedHeap`](crate::PipelinedHeap) is the element that
//! compares *greatest* under its [`Compare`] implementation. Use
//! [`NaturalOrder`] for a max-queue over `Ord` types, [`ReverseOrder`] for a
//! min-queue, or any `Fn(&T, &T) -> Ordering` closure.

use std::cmp::Ordering;

/// A total order over `T` used to decide which element sits above another.
pub trait Compare<T: ?Sized> {
    /// Compare `a` against `b`.
    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// `true` if `a` ranks strictly above `b`.
    #[inline]
    fn greater(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Greater
    }
}

/// Order by the element's own [`Ord`] implementation. Greatest element first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Compare<T> for NaturalOrder {
    #[inline(always)]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Inverse of [`NaturalOrder`]. Smallest element first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReverseOrder;

impl<T: Ord + ?Sized> Compare<T> for ReverseOrder {
    #[inline(always)]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        b.cmp(a)
    }
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> Ordering,
{
    #[inline(always)]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}
