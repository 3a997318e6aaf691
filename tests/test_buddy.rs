// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of buddy allocator tests from memory-allocator-project's allocator
// test suite, adapted to the flat node-arena implementation.

use std::sync::Arc;

use palloc::{Allocator, BuddyEngine};

#[test]
fn rounds_arena_up_to_power_of_two() {
    let buddy = BuddyEngine::new(1000).unwrap();
    assert_eq!(buddy.max_block(), 1024);
}

#[test]
fn single_allocation_succeeds_and_is_non_null() {
    let buddy = BuddyEngine::new(4096).unwrap();
    let p = buddy.allocate(100);
    assert!(!p.is_null());
    buddy.deallocate(p);
}

#[test]
fn allocate_zero_returns_null() {
    let buddy = BuddyEngine::new(4096).unwrap();
    assert!(buddy.allocate(0).is_null());
}

#[test]
fn allocation_larger_than_arena_fails() {
    let buddy = BuddyEngine::new(1024).unwrap();
    assert!(buddy.allocate(4096).is_null());
}

#[test]
fn split_then_coalesce_returns_to_single_leaf() {
    let buddy = BuddyEngine::new(1024).unwrap();
    let a = buddy.allocate(100);
    let b = buddy.allocate(100);
    assert!(buddy.splits() > 0);

    buddy.deallocate(a);
    buddy.deallocate(b);
    assert_eq!(buddy.leaf_count(), 1);
    assert_eq!(buddy.coalesces(), buddy.splits());
}

#[test]
fn distinct_allocations_get_distinct_addresses() {
    let buddy = BuddyEngine::new(4096).unwrap();
    let a = buddy.allocate(64);
    let b = buddy.allocate(64);
    assert_ne!(a, b);
    buddy.deallocate(a);
    buddy.deallocate(b);
}

#[test]
fn double_free_is_diagnosed_not_fatal() {
    struct Capture(std::sync::Mutex<Vec<String>>);
    impl palloc::Diagnostics for Capture {
        fn emit(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    let sink = Arc::new(Capture(std::sync::Mutex::new(Vec::new())));
    let buddy = BuddyEngine::with_diagnostics(1024, sink.clone()).unwrap();
    let p = buddy.allocate(64);
    buddy.deallocate(p);
    buddy.deallocate(p); // double free: diagnosed, not a panic

    assert_eq!(sink.0.lock().unwrap().len(), 1);
}

#[test]
fn deallocate_null_is_a_no_op() {
    let buddy = BuddyEngine::new(1024).unwrap();
    buddy.deallocate(std::ptr::null_mut());
}

#[test]
fn reset_restores_single_free_leaf() {
    let buddy = BuddyEngine::new(1024).unwrap();
    let _ = buddy.allocate(64);
    let _ = buddy.allocate(64);
    buddy.reset();
    assert_eq!(buddy.leaf_count(), 1);
    assert_eq!(buddy.fragmentation(), 0);
}

#[test]
fn fuzz_allocate_deallocate_conserves_leaf_count() {
    let buddy = BuddyEngine::new(1 << 16).unwrap();
    let mut live = Vec::new();
    let sizes = [32usize, 48, 100, 256, 900, 2048];

    for round in 0..500 {
        let size = sizes[round % sizes.len()];
        if round % 3 != 0 {
            let p = buddy.allocate(size);
            if !p.is_null() {
                live.push(p);
            }
        } else if let Some(p) = live.pop() {
            buddy.deallocate(p);
        }
    }
    for p in live {
        buddy.deallocate(p);
    }

    assert_eq!(buddy.leaf_count(), 1);
}

#[test]
fn concurrent_allocations_stay_disjoint() {
    let buddy = Arc::new(BuddyEngine::new(1 << 20).unwrap());
    let mut handles = Vec::new();

    for _ in 0..4 {
        let buddy = Arc::clone(&buddy);
        handles.push(std::thread::spawn(move || {
            let mut ptrs = Vec::new();
            for _ in 0..500 {
                let p = buddy.allocate(64);
                if !p.is_null() {
                    ptrs.push(p);
                }
            }
            for p in ptrs {
                buddy.deallocate(p);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(buddy.leaf_count(), 1);
}
