//! Owned values living in memory from an [`Allocer`]

use super::Allocer;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

/// Owning pointer to a `T` allocated through an [`Allocer`]
///
/// Dropping the box drops the value and returns its storage to the same
/// allocator. This is how heap-placed regions and interners are created.
pub struct AllocBox<'a, T> {
    ptr: NonNull<T>,
    alloc: Allocer<'a>,
    _owns: PhantomData<T>,
}

impl<'a, T> AllocBox<'a, T> {
    /// Move `value` into storage from `alloc`
    ///
    /// Returns the value back if the allocator is out of memory.
    pub fn try_new_in(value: T, alloc: Allocer<'a>) -> Result<Self, T> {
        match alloc.alloc_type::<T>() {
            Some(ptr) => {
                unsafe { ptr.as_ptr().write(value) };
                Ok(Self {
                    ptr,
                    alloc,
                    _owns: PhantomData,
                })
            }
            None => Err(value),
        }
    }

    /// Allocator the value lives in
    #[inline]
    pub fn allocer(this: &Self) -> Allocer<'a> {
        this.alloc
    }

    #[inline]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }
}

impl<T> Deref for AllocBox<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for AllocBox<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for AllocBox<'_, T> {
    fn drop(&mut self) {
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.alloc.free_type(self.ptr.as_ptr());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AllocBox<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
