//! Region as a generic allocator handle

use super::Region;
use crate::allocator::{Allocer, AllocerVTable, Layout};
use core::ptr::NonNull;

static REGION_VTABLE: AllocerVTable = AllocerVTable {
    alloc: region_alloc,
    free: region_free,
    realloc: Some(region_realloc),
    zalloc: Some(region_zalloc),
};

impl<'a> Region<'a> {
    /// Handle that allocates from this region
    ///
    /// `free` through the handle is a no-op and `realloc` always copies
    /// into fresh bytes. The handle borrows the region, so it cannot
    /// outlive it or observe a reset.
    #[inline]
    pub fn as_allocer(&self) -> Allocer<'_> {
        unsafe { Allocer::from_raw_parts(self as *const Self as *mut (), &REGION_VTABLE) }
    }
}

#[inline]
unsafe fn region<'r>(state: *mut ()) -> &'r Region<'r> {
    &*(state as *const Region<'r>)
}

unsafe fn region_alloc(state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    region(state).alloc_layout(layout)
}

unsafe fn region_free(_state: *mut (), _ptr: NonNull<u8>, _layout: Layout) {}

unsafe fn region_realloc(
    state: *mut (),
    ptr: NonNull<u8>,
    old: Layout,
    new: Layout,
) -> Option<NonNull<u8>> {
    region(state).realloc(ptr.as_ptr(), old.size(), new.size(), new.align())
}

unsafe fn region_zalloc(state: *mut (), layout: Layout) -> Option<NonNull<u8>> {
    region(state).alloc_zeroed(layout)
}
