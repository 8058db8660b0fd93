//! Bump allocation - downward fast path and chunk-growing slow path
//!
//! Design: The fast path is a couple of subtractions against the current
//! chunk and never logs. The slow path sizes a new chunk by doubling,
//! honors the allocation limit, links the chunk and retries there.

use super::chunk::{self, ChunkFooter, CHUNK_ALIGN, DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER};
use super::Region;
use crate::allocator::{align_down, checked_align_up, Layout};
use crate::logging;
use core::ptr::NonNull;

/// Carve `layout` out of `footer`'s chunk, moving its bump pointer down
///
/// `None` when the chunk cannot hold the request; the chunk is untouched.
#[inline(always)]
pub(crate) fn bump_down(footer: &ChunkFooter, layout: Layout, min_align: usize) -> Option<NonNull<u8>> {
    let ptr = footer.ptr.get();
    let addr = ptr.as_ptr() as usize;
    let start = footer.data_start.as_ptr() as usize;

    debug_assert!(footer.is_empty() || addr % min_align == 0, "bump pointer invariant broken");

    let result = if layout.align() <= min_align {
        // Decrement by a multiple of min_align keeps the pointer aligned
        let aligned_size = checked_align_up(layout.size(), min_align)?;
        if aligned_size > addr - start {
            return None;
        }
        addr - aligned_size
    } else {
        let aligned_size = checked_align_up(layout.size(), layout.align())?;
        let aligned_end = align_down(addr, layout.align());
        if aligned_end < start {
            return None;
        }
        if aligned_size > aligned_end - start {
            return None;
        }
        aligned_end - aligned_size
    };

    // Derive from the chunk pointer to keep provenance
    let new_ptr = unsafe { NonNull::new_unchecked(ptr.as_ptr().sub(addr - result)) };
    footer.ptr.set(new_ptr);
    Some(new_ptr)
}

/// Aligned, non-null pointer for a zero-sized request
#[inline]
fn zero_sized(footer: &ChunkFooter, align: usize) -> NonNull<u8> {
    let ptr = footer.ptr.get().as_ptr();
    let addr = ptr as usize;
    let aligned = ptr.wrapping_sub(addr - align_down(addr, align));
    // Fall back to the canonical dangling address for this alignment
    NonNull::new(aligned).unwrap_or_else(|| unsafe { NonNull::new_unchecked(align as *mut u8) })
}

impl<'a> Region<'a> {
    /// Allocate memory for `layout`
    ///
    /// Zero-sized requests return an aligned pointer without consuming
    /// space. `None` on backing OOM, size overflow or when the allocation
    /// limit forbids another chunk.
    #[inline]
    pub fn alloc_layout(&self, layout: Layout) -> Option<NonNull<u8>> {
        let footer = self.current_footer();
        if layout.size() == 0 {
            return Some(zero_sized(footer, layout.align()));
        }

        if let Some(ptr) = bump_down(footer, layout, self.min_align) {
            return Some(ptr);
        }

        self.alloc_layout_slow(layout)
    }

    #[cold]
    #[inline(never)]
    fn alloc_layout_slow(&self, layout: Layout) -> Option<NonNull<u8>> {
        let current = self.current_chunk_footer.get();
        let current_ref = unsafe { current.as_ref() };

        let new_size = self.next_chunk_size(current_ref, layout)?;

        let chunk_align = CHUNK_ALIGN.max(self.min_align).max(layout.align());
        let footer = chunk::new_chunk(&self.backing, new_size, chunk_align, self.min_align, current)?;
        self.current_chunk_footer.set(footer);

        let footer = unsafe { footer.as_ref() };
        let result = bump_down(footer, layout, self.min_align);
        debug_assert!(result.is_some(), "fresh chunk too small for its request");
        result
    }

    /// Usable size for the next chunk, `None` when the limit forbids it
    fn next_chunk_size(&self, current: &ChunkFooter, layout: Layout) -> Option<usize> {
        let prev_usable = current.usable_size();

        let mut new_size = prev_usable
            .checked_mul(2)
            .unwrap_or(usize::MAX)
            .max(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER);

        let requested_align = layout.align().max(self.min_align);
        let requested_size = checked_align_up(layout.size(), requested_align)?;
        new_size = new_size.max(requested_size);

        // Footer placement rounds to CHUNK_ALIGN, account for it up front
        new_size = checked_align_up(new_size, CHUNK_ALIGN)
            .unwrap_or_else(|| align_down(usize::MAX, CHUNK_ALIGN));

        if let Some(limit) = self.allocation_limit.get() {
            let allocated = current.allocated_bytes.get();
            let remaining = limit.saturating_sub(allocated);

            if new_size > remaining {
                let needed = checked_align_up(requested_size, CHUNK_ALIGN)?;
                if needed > remaining {
                    logging::log_allocation_limit(layout.size(), limit, allocated);
                    return None;
                }
                new_size = align_down(remaining, CHUNK_ALIGN);
            }
        }

        Some(new_size)
    }
}
