//! Region allocator - downward bump allocation over a chunk list
//!
//! Design: Three-layer architecture:
//! 1. Bump allocation inside the current chunk (fast path)
//! 2. Chunk growth by doubling when the current chunk is exhausted
//! 3. Backing [`Allocer`] for raw chunks (never asked to free user blocks)
//!
//! Individual allocations are never freed. Memory comes back in bulk on
//! [`Region::reset`] (older chunks) and [`Region::deinit`] / drop (all).
//! Single-threaded: the region is `!Sync` and allocates through `&self`.

mod adapter;
mod bump;
mod chunk;

#[cfg(test)]
mod tests;

pub use chunk::{CHUNK_ALIGN, DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER, FOOTER_SIZE};

use crate::allocator::{AllocBox, Allocer, Layout};
use crate::config::RegionConfig;
use crate::logging;
use chunk::{empty_chunk, ChunkFooter};
use core::cell::Cell;
use core::ffi::CStr;
use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};
use core::slice;

/// Bump region over chunks from a backing allocator
pub struct Region<'a> {
    current_chunk_footer: Cell<NonNull<ChunkFooter>>,
    backing: Allocer<'a>,
    allocation_limit: Cell<Option<usize>>,
    min_align: usize,
}

/// Region statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    /// Usable bytes across all live chunks
    pub allocated_bytes: usize,
    /// Live chunks (the sentinel is not counted)
    pub chunk_count: usize,
    /// Free bytes below the bump pointer of the current chunk
    pub current_chunk_remaining: usize,
}

impl<'a> Region<'a> {
    /// Create an empty region drawing chunks from `backing`
    ///
    /// Every allocation is aligned to at least `min_align`. Panics unless
    /// `min_align` is a power of two no larger than [`CHUNK_ALIGN`].
    #[track_caller]
    pub fn new(backing: Allocer<'a>, min_align: usize) -> Self {
        assert!(min_align.is_power_of_two(), "min_align must be a power of two");
        assert!(min_align <= CHUNK_ALIGN, "min_align cannot exceed CHUNK_ALIGN");

        Self {
            current_chunk_footer: Cell::new(empty_chunk()),
            backing,
            allocation_limit: Cell::new(None),
            min_align,
        }
    }

    /// Create a region from validated configuration
    #[track_caller]
    pub fn with_config(backing: Allocer<'a>, config: &RegionConfig) -> Self {
        let region = Self::new(backing, config.min_align);
        region.set_allocation_limit(config.allocation_limit);
        region
    }

    /// Create a region whose own storage also comes from `backing`
    ///
    /// Dropping the box releases every chunk, then the region itself.
    #[track_caller]
    pub fn boxed(backing: Allocer<'a>, min_align: usize) -> Option<AllocBox<'a, Region<'a>>> {
        AllocBox::try_new_in(Self::new(backing, min_align), backing).ok()
    }

    /// Release every chunk back to the backing allocator
    ///
    /// The region stays usable and starts over from the empty sentinel.
    pub fn deinit(&mut self) {
        let footer = self.current_chunk_footer.replace(empty_chunk());
        unsafe { chunk::dealloc_chunk_list(&self.backing, footer) };
    }

    /// Keep the current chunk, release all older ones and rewind
    ///
    /// Every pointer handed out before the reset is invalidated.
    pub fn reset(&mut self) {
        let current = self.current_footer();
        if current.is_empty() {
            return;
        }

        let older = current.prev.replace(empty_chunk());
        unsafe { chunk::dealloc_chunk_list(&self.backing, older) };

        current.rewind(self.min_align);
        current.allocated_bytes.set(current.usable_size());

        logging::log_region_reset(current.usable_size());
    }

    /// Allocate `size` bytes aligned to `align`
    #[inline]
    #[track_caller]
    pub fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.alloc_layout(Layout::new(size, align))
    }

    /// Allocate zero-filled memory for `layout`
    pub fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = self.alloc_layout(layout)?;
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, layout.size()) };
        Some(ptr)
    }

    /// Allocate a copy of `src` aligned to `align`
    #[track_caller]
    pub fn alloc_copy(&self, src: &[u8], align: usize) -> Option<NonNull<u8>> {
        let dest = self.alloc(src.len(), align)?;
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dest.as_ptr(), src.len()) };
        Some(dest)
    }

    /// Copy a C string, terminator included
    pub fn alloc_cstr(&self, src: &CStr) -> Option<&CStr> {
        let bytes = src.to_bytes_with_nul();
        let dest = self.alloc_copy(bytes, 1)?;
        unsafe {
            let copied = slice::from_raw_parts(dest.as_ptr(), bytes.len());
            Some(CStr::from_bytes_with_nul_unchecked(copied))
        }
    }

    /// Copy `src` followed by one zero byte
    ///
    /// The returned slice excludes the terminator, which stays in place so
    /// the copy can also be read as a C string.
    pub fn dup_slice(&self, src: &[u8]) -> Option<&[u8]> {
        let len = src.len();
        let dest = self.alloc(len.checked_add(1)?, 1)?;
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dest.as_ptr(), len);
            dest.as_ptr().add(len).write(0);
            Some(slice::from_raw_parts(dest.as_ptr(), len))
        }
    }

    /// Copy a string slice into the region
    pub fn alloc_str(&self, src: &str) -> Option<&str> {
        let dest = self.alloc_copy(src.as_bytes(), 1)?;
        unsafe {
            let bytes = slice::from_raw_parts(dest.as_ptr(), src.len());
            Some(core::str::from_utf8_unchecked(bytes))
        }
    }

    /// Move a `Copy` value into the region
    pub fn alloc_value<T: Copy>(&self, value: T) -> Option<&mut T> {
        let ptr = self.alloc_layout(Layout::of::<T>())?.cast::<T>();
        unsafe {
            ptr.as_ptr().write(value);
            Some(&mut *ptr.as_ptr())
        }
    }

    /// Copy a slice of `Copy` values into the region
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Option<&mut [T]> {
        let layout = Layout::array::<T>(src.len())?;
        let ptr = self.alloc_layout(layout)?.cast::<T>();
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Some(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Move a block to a new size
    ///
    /// - null `old_ptr` allocates `new_size`
    /// - `new_size == 0` returns `None`; the old bytes stay orphaned
    /// - otherwise allocates fresh bytes and copies `min(old, new)`
    ///
    /// Storage is never reused in place.
    ///
    /// # Safety
    ///
    /// A non-null `old_ptr` must be readable for `old_size` bytes.
    #[track_caller]
    pub unsafe fn realloc(
        &self,
        old_ptr: *const u8,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> Option<NonNull<u8>> {
        if old_ptr.is_null() {
            return self.alloc(new_size, align);
        }
        if new_size == 0 {
            return None;
        }

        let new_ptr = self.alloc(new_size, align)?;
        ptr::copy_nonoverlapping(old_ptr, new_ptr.as_ptr(), old_size.min(new_size));
        Some(new_ptr)
    }

    /// Cap the bytes requested from the backing allocator (`None` = unlimited)
    pub fn set_allocation_limit(&self, limit: Option<usize>) {
        self.allocation_limit.set(limit);
    }

    pub fn allocation_limit(&self) -> Option<usize> {
        self.allocation_limit.get()
    }

    /// Usable bytes obtained from the backing allocator, footers excluded
    #[inline]
    pub fn allocated_bytes(&self) -> usize {
        self.current_footer().allocated_bytes.get()
    }

    #[inline]
    pub fn min_align(&self) -> usize {
        self.min_align
    }

    #[inline]
    pub fn backing(&self) -> Allocer<'a> {
        self.backing
    }

    pub fn stats(&self) -> RegionStats {
        let current = self.current_footer();
        RegionStats {
            allocated_bytes: current.allocated_bytes.get(),
            chunk_count: self.chunk_count(),
            current_chunk_remaining: current.remaining(),
        }
    }

    fn chunk_count(&self) -> usize {
        let mut count = 0;
        let mut footer = self.current_footer();
        while !footer.is_empty() {
            count += 1;
            footer = unsafe { footer.prev.get().as_ref() };
        }
        count
    }

    #[inline]
    pub(crate) fn current_footer(&self) -> &ChunkFooter {
        unsafe { self.current_chunk_footer.get().as_ref() }
    }
}

impl Drop for Region<'_> {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("min_align", &self.min_align)
            .field("allocation_limit", &self.allocation_limit.get())
            .field("stats", &self.stats())
            .finish()
    }
}

const _: () = assert!(mem::align_of::<ChunkFooter>() <= CHUNK_ALIGN);
