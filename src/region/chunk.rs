//! Chunk management - memory blocks obtained from the backing allocator
//!
//! Memory layout of one chunk:
//!
//! ```text
//! [------------------ data ------------------][-- ChunkFooter --][pad]
//! ^                                   ^       ^
//! data_start                          ptr     footer
//! ```
//!
//! The bump pointer starts at the footer and moves down toward
//! `data_start`. Chunks form a singly-linked list toward older chunks that
//! ends at the static empty sentinel.

use crate::allocator::{align_down, align_up, checked_align_up, Allocer, Layout};
use crate::logging;
use core::cell::Cell;
use core::mem;
use core::ptr::{self, NonNull};

/// Minimum alignment of every chunk and of the footer inside it
pub const CHUNK_ALIGN: usize = 16;

/// Footer size rounded so the footer keeps chunk alignment
pub const FOOTER_SIZE: usize = align_up(mem::size_of::<ChunkFooter>(), CHUNK_ALIGN);

/// Usable bytes of the smallest chunk: one page including its footer
pub const DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER: usize = 4096 - FOOTER_SIZE;

/// Bookkeeping stored at the high end of each chunk
#[repr(C)]
pub struct ChunkFooter {
    /// First byte of the block returned by the backing allocator
    pub(crate) data_start: NonNull<u8>,
    /// Total bytes requested from the backing allocator
    pub(crate) chunk_size: usize,
    /// Alignment requested from the backing allocator
    pub(crate) chunk_align: usize,
    /// Next-older chunk, or the sentinel
    pub(crate) prev: Cell<NonNull<ChunkFooter>>,
    /// Bump pointer; always a multiple of the region's `min_align`
    pub(crate) ptr: Cell<NonNull<u8>>,
    /// Usable bytes of this chunk and every older one
    pub(crate) allocated_bytes: Cell<usize>,
}

#[repr(transparent)]
struct EmptyChunkFooter(ChunkFooter);

// Never written: every mutation path checks `is_empty` first or fails
// before storing.
unsafe impl Sync for EmptyChunkFooter {}

static EMPTY_CHUNK: EmptyChunkFooter = EmptyChunkFooter(ChunkFooter {
    data_start: unsafe {
        NonNull::new_unchecked(&EMPTY_CHUNK as *const EmptyChunkFooter as *mut u8)
    },
    chunk_size: 0,
    chunk_align: CHUNK_ALIGN,
    prev: Cell::new(unsafe {
        NonNull::new_unchecked(&EMPTY_CHUNK as *const EmptyChunkFooter as *mut ChunkFooter)
    }),
    ptr: Cell::new(unsafe {
        NonNull::new_unchecked(&EMPTY_CHUNK as *const EmptyChunkFooter as *mut u8)
    }),
    allocated_bytes: Cell::new(0),
});

/// Pointer to the shared zero-capacity sentinel
#[inline]
pub(crate) fn empty_chunk() -> NonNull<ChunkFooter> {
    NonNull::from(&EMPTY_CHUNK.0)
}

impl ChunkFooter {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        ptr::eq(self, &EMPTY_CHUNK.0)
    }

    /// Address of the footer, the ceiling for user allocations
    #[inline]
    pub(crate) fn footer_base(&self) -> usize {
        self as *const Self as usize
    }

    /// Bytes between `data_start` and the footer
    #[inline]
    pub(crate) fn usable_size(&self) -> usize {
        self.footer_base() - self.data_start.as_ptr() as usize
    }

    /// Bytes still free below the bump pointer
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.ptr.get().as_ptr() as usize - self.data_start.as_ptr() as usize
    }

    /// Move the bump pointer back to the footer
    #[inline]
    pub(crate) fn rewind(&self, min_align: usize) {
        debug_assert!(!self.is_empty(), "cannot rewind the empty sentinel");
        // Derive from data_start: the footer reference only covers the footer
        let data = self.data_start.as_ptr();
        let offset = align_down(self.footer_base(), min_align) - data as usize;
        let start = unsafe { data.add(offset) };
        self.ptr.set(unsafe { NonNull::new_unchecked(start) });
    }
}

/// Obtain a chunk with `size_no_footer` usable bytes from `backing`
///
/// Returns `None` on arithmetic overflow or backing OOM. The new chunk
/// links to `prev` and accounts its usable bytes on top of `prev`'s.
pub(crate) fn new_chunk(
    backing: &Allocer<'_>,
    size_no_footer: usize,
    chunk_align: usize,
    min_align: usize,
    prev: NonNull<ChunkFooter>,
) -> Option<NonNull<ChunkFooter>> {
    debug_assert!(chunk_align >= CHUNK_ALIGN && chunk_align.is_power_of_two());

    // Keep the footer on a CHUNK_ALIGN boundary
    let size_no_footer = checked_align_up(size_no_footer, CHUNK_ALIGN)?;
    let alloc_size = size_no_footer.checked_add(FOOTER_SIZE)?;
    let alloc_size = checked_align_up(alloc_size, chunk_align)?;

    let data = backing.alloc(Layout::new(alloc_size, chunk_align))?;

    unsafe {
        let footer_ptr = data.as_ptr().add(size_no_footer) as *mut ChunkFooter;
        let prev_bytes = prev.as_ref().allocated_bytes.get();

        footer_ptr.write(ChunkFooter {
            data_start: data,
            chunk_size: alloc_size,
            chunk_align,
            prev: Cell::new(prev),
            ptr: Cell::new(data),
            allocated_bytes: Cell::new(prev_bytes.saturating_add(size_no_footer)),
        });

        let footer = &*footer_ptr;
        footer.rewind(min_align);
        debug_assert!(footer.ptr.get() >= footer.data_start, "bump pointer below data start");

        logging::log_chunk_acquired(alloc_size, chunk_align, footer.allocated_bytes.get());
        Some(NonNull::new_unchecked(footer_ptr))
    }
}

/// Release `footer` and every older chunk back to `backing`
///
/// # Safety
///
/// Every chunk in the list must have been created by [`new_chunk`] with
/// `backing` and must not be referenced afterwards.
pub(crate) unsafe fn dealloc_chunk_list(backing: &Allocer<'_>, mut footer: NonNull<ChunkFooter>) {
    while !footer.as_ref().is_empty() {
        // The footer lives inside the block being released
        let chunk = footer.as_ref();
        let prev = chunk.prev.get();
        let data = chunk.data_start;
        let layout = Layout::new(chunk.chunk_size, chunk.chunk_align);

        logging::log_chunk_released(layout.size());
        backing.free(data.as_ptr(), layout);
        footer = prev;
    }
}
