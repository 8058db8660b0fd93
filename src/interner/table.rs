//! Symbol id -> interned bytes

use super::buf::RawBuf;
use crate::allocator::Allocer;
use crate::error::InternError;
use crate::logging;
use core::ptr::NonNull;
use core::slice;

/// Capacity of the first table allocation when none was configured
pub(crate) const DEFAULT_TABLE_CAPACITY: usize = 64;

/// Location of one interned byte string (terminator not counted)
#[derive(Clone, Copy)]
pub(crate) struct Entry {
    ptr: NonNull<u8>,
    len: usize,
}

impl Entry {
    #[inline]
    pub(crate) fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// # Safety
    ///
    /// The arena holding the bytes must outlive `'b` and not have been reset.
    #[inline]
    pub(crate) unsafe fn bytes<'b>(&self) -> &'b [u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }
}

pub(crate) struct SymbolTable<'a> {
    buf: RawBuf<'a, Entry>,
    len: usize,
    initial_capacity: usize,
}

impl<'a> SymbolTable<'a> {
    pub(crate) fn new(alloc: Allocer<'a>, initial_capacity: usize) -> Self {
        Self {
            buf: RawBuf::new(alloc),
            len: 0,
            initial_capacity: initial_capacity.max(1),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Make room for one more entry, doubling when full
    pub(crate) fn reserve_one(&mut self) -> Result<(), InternError> {
        let cap = self.capacity();
        if self.len < cap {
            return Ok(());
        }

        let new_cap = if cap == 0 {
            self.initial_capacity
        } else {
            cap.checked_mul(2)
                .ok_or(InternError::TableExhausted { capacity: cap })?
        };
        self.buf
            .resize(new_cap)
            .ok_or(InternError::TableExhausted { capacity: cap })?;

        if cap > 0 {
            logging::log_interner_grow("table", cap, new_cap);
        }
        Ok(())
    }

    /// Append an entry; capacity must have been reserved
    pub(crate) fn push(&mut self, entry: Entry) {
        debug_assert!(self.len < self.capacity(), "push without reserve");
        unsafe { self.buf.as_ptr().add(self.len).write(entry) };
        self.len += 1;
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<Entry> {
        if index < self.len {
            Some(unsafe { *self.buf.as_ptr().add(index) })
        } else {
            None
        }
    }

    /// Forget every entry, keep the storage
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// Forget every entry and return the storage
    pub(crate) fn release(&mut self) {
        self.buf.release();
        self.len = 0;
    }
}
