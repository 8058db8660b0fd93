//! Region tests - bump behavior, chunk lifecycle and limits
//!
//! Test suite organized by component:
//! - Bump: ordering, adjacency and alignment
//! - Chunks: growth, exact fill and the allocation limit
//! - Lifecycle: reset, deinit and drop against a tracking backing
//! - Helpers: copies, C strings, typed values, realloc
//! - Adapter: the region behind an allocator handle

use super::*;
use crate::allocator::{align_up, system, TrackingAllocer};

fn addr(ptr: NonNull<u8>) -> usize {
    ptr.as_ptr() as usize
}

// ===== Bump Tests =====

#[test]
fn region_starts_empty() {
    let region = Region::new(system(), 1);
    let stats = region.stats();
    assert_eq!(stats.allocated_bytes, 0);
    assert_eq!(stats.chunk_count, 0);
    assert_eq!(stats.current_chunk_remaining, 0);
    assert!(region.current_footer().is_empty());
}

#[test]
fn consecutive_bytes_are_adjacent_downward() {
    let region = Region::new(system(), 1);
    let p1 = region.alloc(1, 1).expect("first alloc");
    let p2 = region.alloc(1, 1).expect("second alloc");
    assert!(addr(p1) > addr(p2));
    assert_eq!(addr(p1) - addr(p2), 1);
}

#[test]
fn adjacency_rounds_to_min_align() {
    for min_align in [1, 2, 4, 8, 16] {
        let region = Region::new(system(), min_align);
        let mut prev = region.alloc(3, 1).unwrap();
        for size in [1, 5, 7, 16, 33] {
            let next = region.alloc(size, 1).unwrap();
            assert_eq!(addr(prev) - addr(next), align_up(size, min_align));
            assert_eq!(addr(next) % min_align, 0);
            prev = next;
        }
    }
}

#[test]
fn large_alignment_is_honored() {
    let region = Region::new(system(), 1);
    let p = region.alloc(16, 128).expect("aligned alloc");
    assert_eq!(addr(p) % 128, 0);

    let mut align = 1;
    while align <= 4096 {
        let p = region.alloc(24, align).expect("aligned alloc");
        assert_eq!(addr(p) % align, 0, "not aligned to {}", align);
        unsafe { ptr::write_bytes(p.as_ptr(), 0xCD, 24) };
        align *= 2;
    }
}

#[test]
fn zero_sized_alloc_keeps_bump_pointer() {
    let region = Region::new(system(), 1);

    // Works against the sentinel too
    let z = region.alloc(0, 8).expect("zero-sized on sentinel");
    assert_eq!(addr(z) % 8, 0);

    region.alloc(3, 1).unwrap();
    let before = region.current_footer().ptr.get();
    for align in [1, 2, 16, 256] {
        let z = region.alloc(0, align).expect("zero-sized");
        assert_eq!(addr(z) % align, 0);
    }
    assert_eq!(region.current_footer().ptr.get(), before);
}

#[test]
fn allocations_do_not_overlap() {
    let region = Region::new(system(), 8);
    let blocks: Vec<(NonNull<u8>, usize)> = (1..200)
        .map(|i| {
            let size = (i * 37) % 300 + 1;
            let p = region.alloc(size, 8).unwrap();
            unsafe { ptr::write_bytes(p.as_ptr(), (i % 251) as u8, size) };
            (p, size)
        })
        .collect();

    for (i, (p, size)) in blocks.iter().enumerate() {
        let expected = ((i + 1) % 251) as u8;
        let bytes = unsafe { slice::from_raw_parts(p.as_ptr(), *size) };
        assert!(bytes.iter().all(|&b| b == expected), "block {} clobbered", i);
    }
}

// ===== Chunk Tests =====

#[test]
fn first_chunk_is_one_page() {
    let tracker = TrackingAllocer::new(system());
    let region = Region::new(tracker.allocer(), 1);
    region.alloc(1, 1).unwrap();

    assert_eq!(region.allocated_bytes(), DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER);
    assert_eq!(tracker.outstanding_bytes(), 4096);
    assert_eq!(region.stats().chunk_count, 1);
}

#[test]
fn chunks_grow_and_watermark_increases() {
    let region = Region::new(system(), 1);
    let mut last = 0;
    for _ in 0..64 {
        region.alloc(1000, 8).unwrap();
        let now = region.allocated_bytes();
        assert!(now >= last);
        last = now;
    }

    let stats = region.stats();
    assert!(stats.chunk_count > 1);
    assert!(stats.allocated_bytes >= 64 * 1000);
}

#[test]
fn exact_fill_then_one_more_byte() {
    let region = Region::new(system(), 1);
    region.set_allocation_limit(Some(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER));

    let p = region.alloc(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER, 1);
    assert!(p.is_some(), "exact fill must succeed");
    assert_eq!(region.stats().current_chunk_remaining, 0);
    assert!(region.alloc(1, 1).is_none());

    let fresh = Region::new(system(), 1);
    fresh.set_allocation_limit(Some(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER));
    assert!(fresh.alloc(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER + 1, 1).is_none());
    assert_eq!(fresh.stats().chunk_count, 0);
}

#[test]
fn limit_blocks_second_chunk() {
    let region = Region::new(system(), 1);
    region.set_allocation_limit(Some(5000));

    let a = region.alloc(3000, 1);
    let b = region.alloc(3000, 1);
    assert!(a.is_some());
    assert!(b.is_none());

    // Room left in the current chunk is still usable
    assert!(region.alloc(500, 1).is_some());
}

#[test]
fn limit_at_allocated_bytes_stops_growth() {
    let region = Region::new(system(), 1);
    region.alloc(100, 1).unwrap();
    region.set_allocation_limit(Some(region.allocated_bytes()));

    let remaining = region.stats().current_chunk_remaining;
    assert!(region.alloc(remaining + 1, 1).is_none());
    assert!(region.alloc(remaining, 1).is_some());
    assert!(region.alloc(1, 1).is_none());

    region.set_allocation_limit(None);
    assert!(region.alloc(1, 1).is_some());
}

#[test]
fn limit_shrinks_next_chunk() {
    let region = Region::new(system(), 1);
    region.set_allocation_limit(Some(6000));
    region.alloc(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER, 1).unwrap();

    // Doubling would ask for ~8K; the limit leaves less than that
    let p = region.alloc(1000, 1);
    assert!(p.is_some());
    assert!(region.allocated_bytes() <= 6000);
}

#[test]
fn backing_oom_returns_none() {
    let tracker = TrackingAllocer::with_budget(system(), 100);
    let region = Region::new(tracker.allocer(), 1);

    assert!(region.alloc(1, 1).is_none());
    assert_eq!(region.stats().chunk_count, 0);
    assert_eq!(region.allocated_bytes(), 0);
    assert_eq!(tracker.stats().failures, 1);
}

#[test]
fn size_overflow_returns_none() {
    let region = Region::new(system(), 1);
    assert!(region.alloc(usize::MAX, 1).is_none());
    assert!(region.alloc(usize::MAX - 8, 16).is_none());
    assert!(region.alloc_layout(Layout::array::<u64>(usize::MAX / 16).unwrap()).is_none());
}

// ===== Lifecycle Tests =====

#[test]
fn returned_pointers_are_writable_across_chunks_and_reset() {
    let mut region = Region::new(system(), 1);
    let first = region.alloc(8, 1).unwrap();
    unsafe { ptr::write_bytes(first.as_ptr(), 0xAB, 8) };

    // Force a second chunk and write at both ends of it
    let big = region.alloc(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER, 16).unwrap();
    unsafe {
        ptr::write_bytes(big.as_ptr(), 0xCD, DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER);
        assert_eq!(*big.as_ptr().add(DEFAULT_CHUNK_SIZE_WITHOUT_FOOTER - 1), 0xCD);
        assert_eq!(*first.as_ptr().add(7), 0xAB);
    }

    region.reset();
    let again = region.alloc(32, 8).unwrap();
    unsafe {
        ptr::write_bytes(again.as_ptr(), 0xEF, 32);
        assert_eq!(*again.as_ptr(), 0xEF);
    }
}

#[test]
fn reset_reuses_first_address() {
    let mut region = Region::new(system(), 1);
    let first = region.alloc(64, 8).unwrap();
    region.alloc(100, 1).unwrap();
    region.alloc(7, 4).unwrap();

    region.reset();
    let again = region.alloc(64, 8).unwrap();
    assert_eq!(first, again);
}

#[test]
fn reset_keeps_only_current_chunk() {
    let tracker = TrackingAllocer::new(system());
    let mut region = Region::new(tracker.allocer(), 8);
    for _ in 0..20 {
        region.alloc(2048, 8).unwrap();
    }
    assert!(region.stats().chunk_count > 1);

    region.reset();
    let stats = region.stats();
    let current = region.current_footer();
    assert_eq!(stats.chunk_count, 1);
    assert_eq!(stats.allocated_bytes, current.usable_size());
    assert_eq!(stats.current_chunk_remaining, current.usable_size());
    assert_eq!(tracker.outstanding_bytes(), current.chunk_size);

    // First allocation after the reset sits right below the footer
    let p = region.alloc(64, 8).unwrap();
    assert_eq!(addr(p), current.footer_base() - 64);
}

#[test]
fn reset_on_empty_region_is_noop() {
    let mut region = Region::new(system(), 1);
    region.reset();
    assert!(region.current_footer().is_empty());
    assert!(region.alloc(1, 1).is_some());
}

#[test]
fn deinit_returns_every_chunk() {
    let tracker = TrackingAllocer::new(system());
    let mut region = Region::new(tracker.allocer(), 1);
    for i in 0..50 {
        region.alloc(100 * i + 1, 1 << (i % 8)).unwrap();
    }
    region.alloc(64, 4096).unwrap();
    assert!(tracker.outstanding_bytes() > 0);

    region.deinit();
    assert_eq!(tracker.outstanding_bytes(), 0);
    assert_eq!(region.allocated_bytes(), 0);
    assert_eq!(region.stats().chunk_count, 0);

    // Still usable afterwards
    assert!(region.alloc(8, 8).is_some());
    drop(region);
    assert_eq!(tracker.outstanding_bytes(), 0);
}

#[test]
fn drop_returns_every_chunk() {
    let tracker = TrackingAllocer::new(system());
    {
        let region = Region::new(tracker.allocer(), 4);
        for _ in 0..10 {
            region.alloc(5000, 4).unwrap();
        }
    }
    assert_eq!(tracker.outstanding_bytes(), 0);
    assert_eq!(tracker.stats().allocations, tracker.stats().frees);
}

#[test]
fn boxed_region_frees_itself() {
    let tracker = TrackingAllocer::new(system());
    {
        let region = Region::boxed(tracker.allocer(), 8).expect("boxed region");
        region.alloc(100, 8).unwrap();
        assert!(tracker.outstanding_bytes() > mem::size_of::<Region<'_>>());
    }
    assert_eq!(tracker.outstanding_bytes(), 0);
}

#[test]
fn with_config_applies_settings() {
    let config = RegionConfig {
        min_align: 8,
        allocation_limit: Some(2048),
    };
    let region = Region::with_config(system(), &config);
    assert_eq!(region.min_align(), 8);
    assert_eq!(region.allocation_limit(), Some(2048));

    let p = region.alloc(3, 1).unwrap();
    assert_eq!(addr(p) % 8, 0);
    assert!(region.allocated_bytes() <= 2048);
}

// ===== Helper Tests =====

#[test]
fn alloc_zeroed_clears_reused_bytes() {
    let mut region = Region::new(system(), 1);
    let p = region.alloc(128, 8).unwrap();
    unsafe { ptr::write_bytes(p.as_ptr(), 0xFF, 128) };

    region.reset();
    let z = region.alloc_zeroed(Layout::new(128, 8)).unwrap();
    assert_eq!(z, p);
    let bytes = unsafe { slice::from_raw_parts(z.as_ptr(), 128) };
    assert!(bytes.iter().all(|&b| b == 0));
}

#[test]
fn dup_slice_appends_terminator() {
    let region = Region::new(system(), 1);
    let copy = region.dup_slice(b"a\0b").unwrap();
    assert_eq!(copy, b"a\0b");
    assert_eq!(unsafe { *copy.as_ptr().add(3) }, 0);

    let empty = region.dup_slice(b"").unwrap();
    assert!(empty.is_empty());
    assert_eq!(unsafe { *empty.as_ptr() }, 0);
}

#[test]
fn alloc_cstr_and_str() {
    let region = Region::new(system(), 1);
    let src = CStr::from_bytes_with_nul(b"region\0").unwrap();
    let c = region.alloc_cstr(src).unwrap();
    assert_ne!(c.as_ptr(), src.as_ptr());
    assert_eq!(c.to_bytes(), b"region");

    let s = region.alloc_str("héllo").unwrap();
    assert_eq!(s, "héllo");
}

#[test]
fn typed_values() {
    let region = Region::new(system(), 1);
    let v = region.alloc_value(0x1234_5678_u64).unwrap();
    assert_eq!(*v, 0x1234_5678);
    *v += 1;
    assert_eq!(*v, 0x1234_5679);
    assert_eq!(ptr::addr_of!(*v) as usize % mem::align_of::<u64>(), 0);

    let xs = region.alloc_slice_copy(&[1u32, 2, 3]).unwrap();
    xs[0] = 10;
    assert_eq!(xs, &[10, 2, 3]);

    let empty: &mut [u32] = region.alloc_slice_copy(&[]).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn realloc_copies_into_fresh_bytes() {
    let region = Region::new(system(), 1);
    let p = region.alloc_copy(b"abcdef", 1).unwrap();

    let grown = unsafe { region.realloc(p.as_ptr(), 6, 12, 4) }.unwrap();
    assert_ne!(grown, p);
    assert_eq!(addr(grown) % 4, 0);
    assert_eq!(unsafe { slice::from_raw_parts(grown.as_ptr(), 6) }, b"abcdef");

    let shrunk = unsafe { region.realloc(grown.as_ptr(), 12, 3, 1) }.unwrap();
    assert_eq!(unsafe { slice::from_raw_parts(shrunk.as_ptr(), 3) }, b"abc");

    assert!(unsafe { region.realloc(shrunk.as_ptr(), 3, 0, 1) }.is_none());
    assert!(unsafe { region.realloc(ptr::null(), 0, 16, 16) }.is_some());
}

// ===== Adapter Tests =====

#[test]
fn region_as_allocer() {
    let region = Region::new(system(), 1);
    let alloc = region.as_allocer();
    assert!(!alloc.is_stateless());

    let p1 = alloc.alloc(Layout::new(1, 1)).unwrap();
    let p2 = alloc.alloc(Layout::new(1, 1)).unwrap();
    assert_eq!(addr(p1) - addr(p2), 1);

    // Freeing through the handle does not give bytes back
    let before = region.current_footer().ptr.get();
    unsafe { alloc.free(p2.as_ptr(), Layout::new(1, 1)) };
    assert_eq!(region.current_footer().ptr.get(), before);

    let z = alloc.zalloc(Layout::new(32, 16)).unwrap();
    assert_eq!(addr(z) % 16, 0);
    assert!(unsafe { slice::from_raw_parts(z.as_ptr(), 32) }.iter().all(|&b| b == 0));

    unsafe { z.as_ptr().write(42) };
    let moved = unsafe { alloc.realloc(z.as_ptr(), Layout::new(32, 16), Layout::new(64, 16)) }.unwrap();
    assert_eq!(unsafe { moved.as_ptr().read() }, 42);
}

#[test]
fn region_backed_by_region() {
    let outer = Region::new(system(), 1);
    let inner = Region::new(outer.as_allocer(), 1);
    let p = inner.alloc(100, 8).unwrap();
    assert_eq!(addr(p) % 8, 0);
    assert!(outer.allocated_bytes() >= inner.allocated_bytes());
}

// ===== Contract Violation Tests =====

#[test]
#[should_panic(expected = "min_align must be a power of two")]
fn min_align_not_power_of_two() {
    let _ = Region::new(system(), 3);
}

#[test]
#[should_panic(expected = "min_align cannot exceed CHUNK_ALIGN")]
fn min_align_too_large() {
    let _ = Region::new(system(), 32);
}

#[test]
#[should_panic(expected = "layout alignment must be a power of two")]
fn alloc_with_bad_alignment() {
    let region = Region::new(system(), 1);
    let _ = region.alloc(8, 24);
}
