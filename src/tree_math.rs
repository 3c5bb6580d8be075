//! Filepath: src/tree_math.rs
//!
//! Index arithmetic for a complete binary tree stored in a flat array.
//!
//! Slot `i` has children `2i + 1` and `2i + 2`. Level `L` spans indices
//! `2^L - 1 ..= 2^(L+1) - 2`. All functions are pure integer math, so a tree
//! of exactly `2^h - 1` slots always reports `h` levels.

/// Number of levels needed to hold `size` slots: `ceil(log2(size + 1))`.
///
/// # Example
///
/// ```rust
/// use pipeheap::tree_math::levels_for_size;
///
/// assert_eq!(levels_for_size(0), 0);
/// assert_eq!(levels_for_size(7), 3);
/// assert_eq!(levels_for_size(8), 4);
/// assert_eq!(levels_for_size(11), 4);
/// ```
#[inline]
#[must_use]
pub const fn levels_for_size(size: usize) -> usize {
    // Bit length of `size` equals ceil(log2(size + 1)).
    (usize::BITS - size.leading_zeros()) as usize
}

/// Number of slots in a perfect tree of `levels` levels: `2^levels - 1`.
///
/// Saturates at `usize::MAX` for `levels >= usize::BITS`.
#[inline]
#[must_use]
pub const fn size_for_levels(levels: usize) -> usize {
    if levels >= usize::BITS as usize {
        usize::MAX
    } else {
        (1usize << levels) - 1
    }
}

/// Zero-based level of the slot at `index`.
#[inline]
#[must_use]
pub const fn level_of_index(index: usize) -> usize {
    levels_for_size(index.saturating_add(1)) - 1
}

/// First array index belonging to `level`.
#[inline]
#[must_use]
pub const fn level_start(level: usize) -> usize {
    size_for_levels(level)
}

/// Half-open index range `[start, end)` that `level` occupies in an array of
/// `len` slots. Empty when the level lies entirely past the end.
#[inline]
#[must_use]
pub const fn level_span(level: usize, len: usize) -> (usize, usize) {
    let start = level_start(level);
    let full_end = size_for_levels(level + 1);
    let end = if full_end < len { full_end } else { len };
    if start > end { (end, end) } else { (start, end) }
}

/// Index of the left child of `index`.
#[inline(always)]
#[must_use]
pub const fn left_child(index: usize) -> usize {
    index.saturating_mul(2).saturating_add(1)
}

/// Index of the right child of `index`.
#[inline(always)]
#[must_use]
pub const fn right_child(index: usize) -> usize {
    index.saturating_mul(2).saturating_add(2)
}

/// Index of the parent of `index`, or `None` for the root.
#[inline(always)]
#[must_use]
pub const fn parent(index: usize) -> Option<usize> {
    if index == 0 { None } else { Some((index - 1) / 2) }
}
