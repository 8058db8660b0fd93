//! Layout descriptor and alignment arithmetic
//!
//! Design: `{size, align}` pairs validated once at construction so every
//! consumer can assume a power-of-two alignment.

use core::mem;

/// Size and alignment of a memory request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    size: usize,
    align: usize,
}

impl Layout {
    /// Create a layout
    ///
    /// Panics if `align` is not a power of two.
    #[inline]
    #[track_caller]
    pub const fn new(size: usize, align: usize) -> Self {
        assert!(align.is_power_of_two(), "layout alignment must be a power of two");
        Self { size, align }
    }

    /// Layout of a single `T`
    #[inline]
    pub const fn of<T>() -> Self {
        Self::new(mem::size_of::<T>(), mem::align_of::<T>())
    }

    /// Layout of `count` consecutive `T`s, `None` on size overflow
    #[inline]
    pub const fn array<T>(count: usize) -> Option<Self> {
        match mem::size_of::<T>().checked_mul(count) {
            Some(size) => Some(Self::new(size, mem::align_of::<T>())),
            None => None,
        }
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Same size, alignment raised to at least `align`
    #[inline]
    #[track_caller]
    pub const fn align_to(&self, align: usize) -> Self {
        let align = if align > self.align { align } else { self.align };
        Self::new(self.size, align)
    }
}

/// Align `value` upward to a multiple of `align` (wrapping)
///
/// Uses bit manipulation for branch-free execution:
/// - Add (align - 1) to round up
/// - Mask with !(align - 1) to align down
#[inline(always)]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value.wrapping_add(align).wrapping_sub(1)) & !align.wrapping_sub(1)
}

/// Align `value` upward, `None` if the result does not fit in `usize`
#[inline(always)]
pub const fn checked_align_up(value: usize, align: usize) -> Option<usize> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Align `value` downward to a multiple of `align`
#[inline(always)]
pub const fn align_down(value: usize, align: usize) -> usize {
    value & !align.wrapping_sub(1)
}
