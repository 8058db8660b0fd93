//! String interning - byte strings to compact 32-bit symbols
//!
//! Design: Three structures, all fed by one allocator handle:
//! 1. A private [`Region`] holding one copy of every interned string, with a
//!    trailing zero byte so any symbol resolves to a C string
//! 2. A symbol table mapping id -> bytes (O(1) resolve, doubling growth)
//! 3. An open-addressing map from content hash to id
//!
//! Arena bytes are never moved or freed while the interner lives, so
//! resolved slices stay valid across growth. Symbols are issued densely
//! from zero and only mean something to the interner that issued them.

mod buf;
mod map;
mod table;


use crate::allocator::{AllocBox, Allocer};
use crate::config::InternerConfig;
use crate::error::InternError;
use crate::logging;
use crate::region::{Region, RegionStats};
use ahash::RandomState;
use core::ffi::CStr;
use core::fmt;
use core::hash::{BuildHasher, Hasher};
use core::ptr::NonNull;
use map::SymbolMap;
use table::{Entry, SymbolTable, DEFAULT_TABLE_CAPACITY};

/// Content-only hasher; seeds are fixed so hashes do not depend on the
/// interner instance
static HASHER: RandomState = RandomState::with_seeds(
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// Number of distinct symbols one interner can issue
const MAX_SYMBOLS: usize = u32::MAX as usize;

const DEFAULT_LOAD_FACTOR: f64 = 0.75;

#[inline]
fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = HASHER.build_hasher();
    hasher.write(bytes);
    hasher.finish()
}

/// Interned string handle
///
/// Ids are dense: the n-th distinct string interned gets id `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub const fn from_u32(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Symbol> for u32 {
    fn from(sym: Symbol) -> u32 {
        sym.0
    }
}

/// Byte-string interner
pub struct Interner<'a> {
    arena: Region<'a>,
    map: SymbolMap<'a>,
    table: SymbolTable<'a>,
    alloc: Allocer<'a>,
}

impl<'a> Interner<'a> {
    /// Create an empty interner; nothing is allocated until the first intern
    pub fn new(alloc: Allocer<'a>) -> Self {
        Self {
            arena: Region::new(alloc, 1),
            map: SymbolMap::new(alloc, DEFAULT_LOAD_FACTOR),
            table: SymbolTable::new(alloc, DEFAULT_TABLE_CAPACITY),
            alloc,
        }
    }

    /// Create an interner pre-sized from configuration
    ///
    /// Panics on a load factor outside `(0, 1)`; run
    /// [`InternerConfig::validate`] on untrusted input first.
    #[track_caller]
    pub fn with_config(alloc: Allocer<'a>, config: &InternerConfig) -> Result<Self, InternError> {
        let mut interner = Self {
            arena: Region::new(alloc, 1),
            map: SymbolMap::new(alloc, config.load_factor),
            table: SymbolTable::new(alloc, config.initial_capacity),
            alloc,
        };
        interner.arena.set_allocation_limit(config.arena_limit);

        if config.initial_capacity > 0 {
            interner.table.reserve_one()?;
            interner.map.reserve(config.initial_capacity)?;
        }
        Ok(interner)
    }

    /// Create an interner whose own storage also comes from `alloc`
    pub fn boxed(alloc: Allocer<'a>) -> Option<AllocBox<'a, Interner<'a>>> {
        AllocBox::try_new_in(Self::new(alloc), alloc).ok()
    }

    /// Intern `bytes`, returning the existing symbol when already present
    ///
    /// On failure nothing changes: the count, the table and every lookup
    /// are as they were before the call.
    pub fn intern(&mut self, bytes: &[u8]) -> Result<Symbol, InternError> {
        let hash = hash_bytes(bytes);
        if let Some(sym) = self.lookup(hash, bytes) {
            return Ok(sym);
        }

        self.insert(hash, bytes).map_err(|err| {
            logging::log_intern_failure(bytes.len(), &err);
            err
        })
    }

    #[inline]
    pub fn intern_str(&mut self, s: &str) -> Result<Symbol, InternError> {
        self.intern(s.as_bytes())
    }

    /// Intern the bytes of a C string, terminator excluded
    #[inline]
    pub fn intern_cstr(&mut self, s: &CStr) -> Result<Symbol, InternError> {
        self.intern(s.to_bytes())
    }

    /// Intern several strings, stopping at the first failure
    pub fn intern_many<'s, I>(&mut self, items: I) -> Result<Vec<Symbol>, InternError>
    where
        I: IntoIterator<Item = &'s [u8]>,
    {
        items.into_iter().map(|bytes| self.intern(bytes)).collect()
    }

    /// Symbol for `bytes` if it has been interned
    #[inline]
    pub fn get(&self, bytes: &[u8]) -> Option<Symbol> {
        self.lookup(hash_bytes(bytes), bytes)
    }

    #[inline]
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.get(bytes).is_some()
    }

    /// Bytes of `sym`, exactly as interned
    ///
    /// Panics if `sym` was not issued by this interner.
    #[inline]
    #[track_caller]
    pub fn resolve(&self, sym: Symbol) -> &[u8] {
        unsafe { self.entry(sym).bytes() }
    }

    /// Bytes of `sym` as UTF-8, `None` if they are not valid UTF-8
    #[track_caller]
    pub fn resolve_str(&self, sym: Symbol) -> Option<&str> {
        core::str::from_utf8(self.resolve(sym)).ok()
    }

    /// Bytes of `sym` as a C string
    ///
    /// Ends at the first zero byte, so strings with embedded zeros come
    /// back shorter than interned.
    #[track_caller]
    pub fn resolve_cstr(&self, sym: Symbol) -> &CStr {
        let entry = self.entry(sym);
        // The arena copy carries a zero byte right after the slice
        unsafe { CStr::from_ptr(entry.as_ptr().cast()) }
    }

    /// Number of distinct strings interned
    #[inline]
    pub fn count(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Every symbol with its bytes, in id order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Symbol, &[u8])> + '_ {
        (0..self.count()).map(move |index| {
            let sym = Symbol(index as u32);
            (sym, self.resolve(sym))
        })
    }

    /// Forget every symbol and rewind the arena
    ///
    /// The arena keeps its newest chunk; the table and map keep their
    /// capacity. Previously issued symbols become meaningless.
    pub fn clear(&mut self) {
        self.arena.reset();
        self.map.clear();
        self.table.clear();
    }

    /// Release all memory; the interner stays usable
    pub fn deinit(&mut self) {
        self.arena.deinit();
        self.map.release();
        self.table.release();
    }

    /// Allocator feeding the arena, map and table
    #[inline]
    pub fn allocer(&self) -> Allocer<'a> {
        self.alloc
    }

    pub fn arena_stats(&self) -> RegionStats {
        self.arena.stats()
    }

    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.map.load_factor()
    }

    fn lookup(&self, hash: u64, bytes: &[u8]) -> Option<Symbol> {
        self.map
            .find(hash, |id| match self.table.get(id as usize) {
                Some(entry) => unsafe { entry.bytes() == bytes },
                None => false,
            })
            .map(Symbol)
    }

    fn insert(&mut self, hash: u64, bytes: &[u8]) -> Result<Symbol, InternError> {
        let id = self.table.len();
        if id >= MAX_SYMBOLS {
            return Err(InternError::SymbolSpaceExhausted);
        }

        // Reserve everything fallible before the arena copy; a grown table
        // or map with no new entry is not observable
        self.table.reserve_one()?;
        self.map.reserve(1)?;

        let copy = self
            .arena
            .dup_slice(bytes)
            .ok_or(InternError::ArenaExhausted { len: bytes.len() })?;
        let entry = Entry::new(NonNull::from(copy).cast::<u8>(), bytes.len());

        self.table.push(entry);
        self.map.insert_unique(hash, id as u32);
        debug_assert_eq!(self.map.len(), self.table.len());
        Ok(Symbol(id as u32))
    }

    #[track_caller]
    fn entry(&self, sym: Symbol) -> Entry {
        match self.table.get(sym.index()) {
            Some(entry) => entry,
            None => panic!(
                "symbol {} out of range for interner with {} symbols",
                sym.0,
                self.count()
            ),
        }
    }
}

impl fmt::Debug for Interner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("count", &self.count())
            .field("map_capacity", &self.map.capacity())
            .field("table_capacity", &self.table.capacity())
            .field("arena", &self.arena.stats())
            .finish()
    }
}
