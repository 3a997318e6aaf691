// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of slab allocator tests from memory-allocator-project's allocator
// test suite.

use std::sync::Arc;

use palloc::{Allocator, SlabEngine};

#[test]
fn allocate_serves_object_sized_blocks() {
    let slab = SlabEngine::new(64, 32, 4096).unwrap();
    let p = slab.allocate(64);
    assert!(!p.is_null());
    slab.deallocate(p);
}

#[test]
fn request_larger_than_object_size_fails() {
    let slab = SlabEngine::new(64, 32, 4096).unwrap();
    assert!(slab.allocate(65).is_null());
}

#[test]
fn exhausting_a_slab_creates_another() {
    let slab = SlabEngine::new(64, 4, 4096).unwrap();
    let ptrs: Vec<_> = (0..4).map(|_| slab.allocate(16)).collect();
    assert!(ptrs.iter().all(|p| !p.is_null()));
    assert_eq!(slab.slab_count(), 1);

    let overflow = slab.allocate(16);
    assert!(!overflow.is_null());
    assert_eq!(slab.slab_count(), 2);

    slab.deallocate(overflow);
    for p in ptrs {
        slab.deallocate(p);
    }
}

#[test]
fn exhausting_all_slabs_returns_null() {
    let slab = SlabEngine::new(64, 2, 64 * 2 + 16).unwrap(); // max_slabs == 1
    assert_eq!(slab.max_slabs(), 1);
    let a = slab.allocate(16);
    let b = slab.allocate(16);
    assert!(!a.is_null() && !b.is_null());
    assert!(slab.allocate(16).is_null());

    slab.deallocate(a);
    slab.deallocate(b);
}

#[test]
fn freed_slot_is_reused() {
    let slab = SlabEngine::new(64, 4, 4096).unwrap();
    let a = slab.allocate(16);
    slab.deallocate(a);
    let b = slab.allocate(16);
    assert_eq!(a, b);
    slab.deallocate(b);
}

#[test]
fn fragmentation_reflects_free_fraction() {
    let slab = SlabEngine::new(64, 4, 4096).unwrap();
    assert_eq!(slab.fragmentation(), 100);
    let p = slab.allocate(16);
    assert_eq!(slab.fragmentation(), 75);
    slab.deallocate(p);
}

#[test]
fn deallocate_of_unrelated_address_is_silently_ignored() {
    let slab = SlabEngine::new(64, 4, 4096).unwrap();
    let mut stray = [0u8; 8];
    slab.deallocate(stray.as_mut_ptr());
}

#[test]
fn reset_reclaims_all_slabs() {
    let slab = SlabEngine::new(64, 4, 4096).unwrap();
    for _ in 0..8 {
        let _ = slab.allocate(16);
    }
    assert!(slab.slab_count() > 1);
    slab.reset();
    assert_eq!(slab.slab_count(), 1);
    assert_eq!(slab.fragmentation(), 100);
}

#[test]
fn concurrent_allocate_deallocate_never_double_hands_out_a_slot() {
    let slab = Arc::new(SlabEngine::new(64, 32, 1 << 20).unwrap());
    let mut handles = Vec::new();

    for _ in 0..4 {
        let slab = Arc::clone(&slab);
        handles.push(std::thread::spawn(move || {
            let mut ptrs = std::collections::HashSet::new();
            for _ in 0..1000 {
                let p = slab.allocate(16);
                if !p.is_null() {
                    assert!(ptrs.insert(p as usize), "slot handed out twice concurrently");
                    slab.deallocate(p);
                    ptrs.remove(&(p as usize));
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
