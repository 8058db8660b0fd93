//! Slice -> symbol index
//!
//! Design: Open addressing with linear probing over a power-of-two slot
//! array. Slots hold the key's hash and `id + 1` (zero marks an empty slot,
//! so a zeroed allocation is an empty map). Keys themselves live in the
//! symbol table; equality is delegated to the caller.

use super::buf::RawBuf;
use crate::allocator::Allocer;
use crate::error::InternError;
use crate::logging;

/// Smallest non-empty slot array
const MIN_SLOTS: usize = 16;

#[derive(Clone, Copy)]
#[repr(C)]
struct Slot {
    hash: u64,
    tag: u32,
}

impl Slot {
    #[inline]
    fn is_empty(&self) -> bool {
        self.tag == 0
    }

    #[inline]
    fn id(&self) -> u32 {
        self.tag - 1
    }
}

pub(crate) struct SymbolMap<'a> {
    slots: RawBuf<'a, Slot>,
    len: usize,
    load_factor: f64,
}

impl<'a> SymbolMap<'a> {
    #[track_caller]
    pub(crate) fn new(alloc: Allocer<'a>, load_factor: f64) -> Self {
        assert!(
            load_factor > 0.0 && load_factor < 1.0,
            "load factor must lie in (0, 1)"
        );
        Self {
            slots: RawBuf::new(alloc),
            len: 0,
            load_factor,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    #[inline]
    pub(crate) fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Entries `cap` slots may hold before resizing
    ///
    /// Always leaves one empty slot so probing terminates.
    fn threshold(&self, cap: usize) -> usize {
        if cap == 0 {
            return 0;
        }
        ((cap as f64 * self.load_factor) as usize).min(cap - 1)
    }

    /// Find the id whose key has `hash` and satisfies `eq`
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(u32) -> bool) -> Option<u32> {
        let cap = self.capacity();
        if cap == 0 {
            return None;
        }

        let mask = cap - 1;
        let mut idx = hash as usize & mask;
        loop {
            let slot = unsafe { *self.slots.as_ptr().add(idx) };
            if slot.is_empty() {
                return None;
            }
            if slot.hash == hash && eq(slot.id()) {
                return Some(slot.id());
            }
            idx = (idx + 1) & mask;
        }
    }

    /// Make room for `additional` more entries
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), InternError> {
        let cap = self.capacity();
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(InternError::MapExhausted { capacity: cap })?;
        if needed <= self.threshold(cap) {
            return Ok(());
        }

        let mut new_cap = cap.max(MIN_SLOTS);
        while self.threshold(new_cap) < needed {
            new_cap = new_cap
                .checked_mul(2)
                .ok_or(InternError::MapExhausted { capacity: cap })?;
        }
        self.rehash(new_cap)
    }

    fn rehash(&mut self, new_cap: usize) -> Result<(), InternError> {
        let old_cap = self.capacity();
        let mut slots = RawBuf::<Slot>::zeroed(self.slots.allocer(), new_cap)
            .ok_or(InternError::MapExhausted { capacity: old_cap })?;

        let mask = new_cap - 1;
        for i in 0..old_cap {
            let slot = unsafe { *self.slots.as_ptr().add(i) };
            if slot.is_empty() {
                continue;
            }
            let mut idx = slot.hash as usize & mask;
            unsafe {
                while !(*slots.as_ptr().add(idx)).is_empty() {
                    idx = (idx + 1) & mask;
                }
                slots.as_ptr().add(idx).write(slot);
            }
        }

        logging::log_interner_grow("map", old_cap, new_cap);
        core::mem::swap(&mut self.slots, &mut slots);
        Ok(())
    }

    /// Insert a key known to be absent
    ///
    /// Capacity must have been reserved beforehand.
    pub(crate) fn insert_unique(&mut self, hash: u64, id: u32) {
        debug_assert!(self.len < self.threshold(self.capacity()), "insert without reserve");

        let mask = self.capacity() - 1;
        let mut idx = hash as usize & mask;
        unsafe {
            while !(*self.slots.as_ptr().add(idx)).is_empty() {
                idx = (idx + 1) & mask;
            }
            self.slots.as_ptr().add(idx).write(Slot { hash, tag: id + 1 });
        }
        self.len += 1;
    }

    /// Drop every entry, keep the slot array
    pub(crate) fn clear(&mut self) {
        unsafe { core::ptr::write_bytes(self.slots.as_ptr(), 0, self.capacity()) };
        self.len = 0;
    }

    /// Drop every entry and the slot array
    pub(crate) fn release(&mut self) {
        self.slots.release();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::system;

    #[test]
    fn test_empty_map_finds_nothing() {
        let map = SymbolMap::new(system(), 0.75);
        assert_eq!(map.find(42, |_| true), None);
        assert_eq!(map.capacity(), 0);
    }

    #[test]
    fn test_insert_and_find_with_collisions() {
        let mut map = SymbolMap::new(system(), 0.75);
        map.reserve(3).unwrap();

        // Same hash, told apart by the equality callback
        map.insert_unique(7, 0);
        map.insert_unique(7, 1);
        map.insert_unique(7 + map.capacity() as u64, 2);

        assert_eq!(map.find(7, |id| id == 1), Some(1));
        assert_eq!(map.find(7, |id| id == 0), Some(0));
        assert_eq!(map.find(7 + map.capacity() as u64, |id| id == 2), Some(2));
        assert_eq!(map.find(7, |_| false), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_growth_respects_load_factor() {
        let mut map = SymbolMap::new(system(), 0.5);
        for id in 0..100u32 {
            map.reserve(1).unwrap();
            map.insert_unique((id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15), id);
            assert!(map.len() as f64 <= map.capacity() as f64 * 0.5);
        }
        for id in 0..100u32 {
            let hash = (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            assert_eq!(map.find(hash, |found| found == id), Some(id));
        }
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut map = SymbolMap::new(system(), 0.75);
        map.reserve(10).unwrap();
        map.insert_unique(1, 0);
        let cap = map.capacity();

        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.capacity(), cap);
        assert_eq!(map.find(1, |_| true), None);
    }

    #[test]
    #[should_panic(expected = "load factor")]
    fn test_rejects_full_load_factor() {
        let _ = SymbolMap::new(system(), 1.0);
    }
}
