//! System allocator - platform aligned heap
//!
//! Design: Stateless handle over the C runtime's aligned allocation:
//! - POSIX: `posix_memalign` / `free`
//! - Windows: `_aligned_malloc` / `_aligned_free`
//!
//! Neither platform path provides an aligned realloc through `libc`, so the
//! vtable leaves `realloc` empty and [`Allocer`] composes it.

use super::{Allocer, AllocerVTable, Layout};
use core::ptr::{self, NonNull};

static SYSTEM_VTABLE: AllocerVTable = AllocerVTable {
    alloc: sys_alloc,
    free: sys_free,
    realloc: None,
    zalloc: Some(sys_zalloc),
};

/// Handle to the process-wide system allocator
#[inline]
pub fn system() -> Allocer<'static> {
    unsafe { Allocer::from_raw_parts(ptr::null_mut(), &SYSTEM_VTABLE) }
}

unsafe fn sys_alloc(_state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    // Zero-sized requests still get a unique block
    let size = layout.size().max(1);
    let ptr = NonNull::new(platform::aligned_alloc(size, layout.align()));
    if ptr.is_none() {
        tracing::debug!(
            target: "strata::system",
            size,
            align = layout.align(),
            "system allocation failed"
        );
    }
    ptr
}

unsafe fn sys_free(_state: *mut (), ptr: NonNull<u8>, layout: Layout) {
    platform::aligned_free(ptr.as_ptr(), layout.size().max(1), layout.align());
}

unsafe fn sys_zalloc(state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    // calloc only guarantees default alignment
    let ptr = sys_alloc(state, layout)?;
    ptr::write_bytes(ptr.as_ptr(), 0, layout.size());
    Some(ptr)
}

#[cfg(unix)]
mod platform {
    use core::mem;
    use core::ptr;

    pub(super) unsafe fn aligned_alloc(size: usize, align: usize) -> *mut u8 {
        // posix_memalign wants a multiple of sizeof(void *)
        let align = align.max(mem::size_of::<*mut libc::c_void>());
        let mut out: *mut libc::c_void = ptr::null_mut();
        if libc::posix_memalign(&mut out, align, size) != 0 {
            return ptr::null_mut();
        }
        out.cast()
    }

    pub(super) unsafe fn aligned_free(ptr: *mut u8, _size: usize, _align: usize) {
        libc::free(ptr.cast());
    }
}

#[cfg(windows)]
mod platform {
    pub(super) unsafe fn aligned_alloc(size: usize, align: usize) -> *mut u8 {
        libc::aligned_malloc(size, align).cast()
    }

    pub(super) unsafe fn aligned_free(ptr: *mut u8, _size: usize, _align: usize) {
        libc::aligned_free(ptr.cast());
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::alloc::{alloc, dealloc, Layout};

    pub(super) unsafe fn aligned_alloc(size: usize, align: usize) -> *mut u8 {
        match Layout::from_size_align(size, align) {
            Ok(layout) => alloc(layout),
            Err(_) => core::ptr::null_mut(),
        }
    }

    pub(super) unsafe fn aligned_free(ptr: *mut u8, size: usize, align: usize) {
        dealloc(ptr, Layout::from_size_align_unchecked(size, align));
    }
}
