//! Polymorphic allocator handles
//!
//! Design: An allocator is a `{state, vtable}` fat handle. Implementations
//! publish one static [`AllocerVTable`] and hand out handles at the boundary:
//! 1. `alloc` / `free` are mandatory (plain function pointers)
//! 2. `realloc` / `zalloc` are optional, the handle composes them from
//!    `alloc` + copy/zero + `free` when absent
//!
//! Out-of-memory is reported as `None`, never as a panic.

mod boxed;
mod layout;
pub mod system;
mod tracking;


pub use boxed::AllocBox;
pub use layout::{align_down, align_up, checked_align_up, Layout};
pub use system::system;
pub use tracking::{TrackingAllocer, TrackingStats};

use core::fmt;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};

/// Allocate `layout` bytes; `None` on OOM
pub type AllocFn = unsafe fn(state: *mut (), layout: Layout) -> Option<NonNull<u8>>;

/// Release a block previously returned for `layout`
pub type FreeFn = unsafe fn(state: *mut (), ptr: NonNull<u8>, layout: Layout);

/// Move a live block to a new layout; `None` on OOM (old block untouched)
pub type ReallocFn =
    unsafe fn(state: *mut (), ptr: NonNull<u8>, old: Layout, new: Layout) -> Option<NonNull<u8>>;

/// Operations record shared by every handle of one allocator kind
///
/// Immutable and normally `static`. Optional entries left as `None` are
/// filled in by [`Allocer`].
#[derive(Debug)]
pub struct AllocerVTable {
    pub alloc: AllocFn,
    pub free: FreeFn,
    pub realloc: Option<ReallocFn>,
    pub zalloc: Option<AllocFn>,
}

/// Allocator handle (state pointer + operations)
///
/// Cheap to copy; does not own the state. `'a` bounds how long the state
/// stays valid, stateless allocators are `Allocer<'static>`.
#[derive(Clone, Copy)]
pub struct Allocer<'a> {
    state: *mut (),
    vtable: &'static AllocerVTable,
    _state: PhantomData<&'a ()>,
}

impl<'a> Allocer<'a> {
    /// Build a handle from its parts
    ///
    /// # Safety
    ///
    /// Every function in `vtable` must accept `state` (which may be null for
    /// stateless allocators) for as long as `'a`, and must honor the
    /// contract documented on the function types.
    #[inline]
    pub const unsafe fn from_raw_parts(state: *mut (), vtable: &'static AllocerVTable) -> Self {
        Self {
            state,
            vtable,
            _state: PhantomData,
        }
    }

    #[inline]
    pub fn state(&self) -> *mut () {
        self.state
    }

    #[inline]
    pub fn vtable(&self) -> &'static AllocerVTable {
        self.vtable
    }

    /// True when the allocator carries no state
    #[inline]
    pub fn is_stateless(&self) -> bool {
        self.state.is_null()
    }

    /// Allocate memory for `layout`
    #[inline]
    pub fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        unsafe { (self.vtable.alloc)(self.state, layout) }
    }

    /// Allocate zeroed memory for `layout`
    ///
    /// Falls back to `alloc` + zero-fill when the allocator has no `zalloc`.
    #[inline]
    pub fn zalloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        match self.vtable.zalloc {
            Some(zalloc) => unsafe { zalloc(self.state, layout) },
            None => {
                let ptr = self.alloc(layout)?;
                unsafe { ptr::write_bytes(ptr.as_ptr(), 0, layout.size()) };
                Some(ptr)
            }
        }
    }

    /// Release `ptr`; null is a no-op
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must have been returned by this allocator for
    /// `layout` and not released since.
    #[inline]
    pub unsafe fn free(&self, ptr: *mut u8, layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            (self.vtable.free)(self.state, ptr, layout);
        }
    }

    /// Resize the block at `ptr` from `old` to `new`
    ///
    /// - null `ptr` behaves as `alloc(new)`
    /// - without a native `realloc`, a zero-sized `new` frees the block and
    ///   returns `None`; otherwise the block is moved with alloc + copy + free
    ///
    /// On OOM the old block stays valid.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be a live block of this allocator for `old`.
    pub unsafe fn realloc(&self, ptr: *mut u8, old: Layout, new: Layout) -> Option<NonNull<u8>> {
        let Some(old_ptr) = NonNull::new(ptr) else {
            return self.alloc(new);
        };

        if let Some(realloc) = self.vtable.realloc {
            return realloc(self.state, old_ptr, old, new);
        }

        if new.size() == 0 {
            (self.vtable.free)(self.state, old_ptr, old);
            return None;
        }

        let new_ptr = self.alloc(new)?;
        ptr::copy_nonoverlapping(
            old_ptr.as_ptr(),
            new_ptr.as_ptr(),
            old.size().min(new.size()),
        );
        (self.vtable.free)(self.state, old_ptr, old);
        Some(new_ptr)
    }

    /// Allocate uninitialized storage for one `T`
    #[inline]
    pub fn alloc_type<T>(&self) -> Option<NonNull<T>> {
        self.alloc(Layout::of::<T>()).map(NonNull::cast)
    }

    /// Allocate zeroed storage for one `T`
    #[inline]
    pub fn zalloc_type<T>(&self) -> Option<NonNull<T>> {
        self.zalloc(Layout::of::<T>()).map(NonNull::cast)
    }

    /// Allocate uninitialized storage for `count` `T`s
    #[inline]
    pub fn alloc_array<T>(&self, count: usize) -> Option<NonNull<T>> {
        self.alloc(Layout::array::<T>(count)?).map(NonNull::cast)
    }

    /// Allocate zeroed storage for `count` `T`s
    #[inline]
    pub fn zalloc_array<T>(&self, count: usize) -> Option<NonNull<T>> {
        self.zalloc(Layout::array::<T>(count)?).map(NonNull::cast)
    }

    /// Release storage from [`alloc_type`](Self::alloc_type)
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free) with `Layout::of::<T>()`.
    #[inline]
    pub unsafe fn free_type<T>(&self, ptr: *mut T) {
        self.free(ptr.cast(), Layout::of::<T>());
    }

    /// Release storage from [`alloc_array`](Self::alloc_array)
    ///
    /// # Safety
    ///
    /// Same contract as [`free`](Self::free); `count` must match the
    /// allocation.
    #[inline]
    #[track_caller]
    pub unsafe fn free_array<T>(&self, ptr: *mut T, count: usize) {
        let layout = Layout::array::<T>(count).expect("array layout overflow on free");
        self.free(ptr.cast(), layout);
    }
}

impl fmt::Debug for Allocer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocer")
            .field("state", &self.state)
            .field("vtable", &(self.vtable as *const AllocerVTable))
            .finish()
    }
}
