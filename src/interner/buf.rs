//! Growable raw buffer over an allocator handle

use crate::allocator::{Allocer, Layout};
use core::ptr::NonNull;

/// Uninitialized storage for `cap` values of `T`
///
/// Tracks capacity only; callers track which slots are initialized.
pub(crate) struct RawBuf<'a, T: Copy> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: Allocer<'a>,
}

impl<'a, T: Copy> RawBuf<'a, T> {
    /// Empty buffer that owns no memory
    pub(crate) fn new(alloc: Allocer<'a>) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            alloc,
        }
    }

    /// Zero-filled buffer of `cap` values
    pub(crate) fn zeroed(alloc: Allocer<'a>, cap: usize) -> Option<Self> {
        if cap == 0 {
            return Some(Self::new(alloc));
        }
        let ptr = alloc.zalloc_array::<T>(cap)?;
        Some(Self { ptr, cap, alloc })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub(crate) fn allocer(&self) -> Allocer<'a> {
        self.alloc
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Resize to `new_cap`, keeping the first `min(cap, new_cap)` values
    ///
    /// `None` on OOM, the buffer is unchanged.
    pub(crate) fn resize(&mut self, new_cap: usize) -> Option<()> {
        let new_layout = Layout::array::<T>(new_cap)?;
        let new_ptr = if self.cap == 0 {
            self.alloc.alloc(new_layout)?
        } else {
            let old_layout = Layout::array::<T>(self.cap)?;
            unsafe {
                self.alloc
                    .realloc(self.ptr.as_ptr().cast(), old_layout, new_layout)?
            }
        };
        self.ptr = new_ptr.cast();
        self.cap = new_cap;
        Some(())
    }

    /// Return the memory to the allocator, leaving an empty buffer
    pub(crate) fn release(&mut self) {
        if self.cap > 0 {
            unsafe { self.alloc.free_array(self.ptr.as_ptr(), self.cap) };
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
    }
}

impl<T: Copy> Drop for RawBuf<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}
