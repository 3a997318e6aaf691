// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of memory-allocator-project/src/core/pool_allocator.cpp.
// A set of fixed-block-size classes, each with its own intrusive singly
// linked free list threaded through the block bytes (`FreeBlock { next }` in
// the C++ source). Classes are kept sorted ascending by block size so the
// first class that both fits the request and has a free block wins.

use std::sync::{Arc, Mutex};

use crate::arena::Arena;
use crate::contract::{Allocator, LayoutEntry};
use crate::diagnostics::{default_sink, Diagnostics};

const LINK_SIZE: usize = std::mem::size_of::<u64>();
const SENTINEL: u64 = u64::MAX;

struct PoolClass {
    block_size: usize,
    block_count: usize,
    arena_offset: usize, // offset of this class's region within the shared arena
    free_head: u64,      // index into this class's blocks, or SENTINEL
    free_count: usize,
}

struct PoolState {
    classes: Vec<PoolClass>,
    allocations: std::collections::HashMap<usize, usize>, // block offset -> class index
    allocated_bytes: usize,
    allocation_count: u64,
    deallocation_count: u64,
}

/// Multi-class fixed-block-size allocator.
///
/// `block_sizes` and `blocks_per_class` must be the same length; classes are
/// stored sorted ascending by block size regardless of input order.
pub struct PoolEngine {
    arena: Arena,
    state: Mutex<PoolState>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl PoolEngine {
    /// Construct a Pool engine with the default stderr diagnostic sink.
    pub fn new(block_sizes: &[usize], blocks_per_class: &[usize]) -> std::io::Result<Self> {
        Self::with_diagnostics(block_sizes, blocks_per_class, default_sink())
    }

    /// Construct a Pool engine with an explicit diagnostics sink.
    pub fn with_diagnostics(
        block_sizes: &[usize],
        blocks_per_class: &[usize],
        diagnostics: Arc<dyn Diagnostics>,
    ) -> std::io::Result<Self> {
        if block_sizes.is_empty() || block_sizes.len() != blocks_per_class.len() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "pool requires matching, non-empty block_sizes and blocks_per_class",
            ));
        }
        if block_sizes.iter().any(|&s| s < LINK_SIZE) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("pool block sizes must be at least {LINK_SIZE} bytes"),
            ));
        }

        let mut order: Vec<usize> = (0..block_sizes.len()).collect();
        order.sort_by_key(|&i| block_sizes[i]);

        let mut classes = Vec::with_capacity(order.len());
        let mut arena_offset = 0usize;
        for i in order {
            let block_size = block_sizes[i];
            let block_count = blocks_per_class[i];
            classes.push(PoolClass {
                block_size,
                block_count,
                arena_offset,
                free_head: 0,
                free_count: block_count,
            });
            arena_offset += block_size * block_count;
        }

        let arena = Arena::new(arena_offset.max(1))?;

        let engine = Self {
            arena,
            state: Mutex::new(PoolState {
                classes,
                allocations: std::collections::HashMap::new(),
                allocated_bytes: 0,
                allocation_count: 0,
                deallocation_count: 0,
            }),
            diagnostics,
        };
        engine.init_classes();
        Ok(engine)
    }

    fn init_classes(&self) {
        let mut state = self.state.lock().unwrap();
        for class in &mut state.classes {
            if class.block_count == 0 {
                class.free_head = SENTINEL;
                continue;
            }
            class.free_head = 0;
            class.free_count = class.block_count;
            for i in 0..class.block_count {
                let next = if i + 1 < class.block_count { (i + 1) as u64 } else { SENTINEL };
                let slot = unsafe { self.arena.at(class.arena_offset + i * class.block_size) };
                unsafe { (slot as *mut u64).write(next) };
            }
        }
    }

    /// Block-size classes this engine serves, sorted ascending.
    pub fn class_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().classes.iter().map(|c| c.block_size).collect()
    }

    /// Bytes currently handed out to callers.
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().unwrap().allocated_bytes
    }

    /// Whether any class can currently serve `size` bytes.
    pub fn can_allocate(&self, size: usize) -> bool {
        let state = self.state.lock().unwrap();
        state.classes.iter().any(|c| c.block_size >= size && c.free_head != SENTINEL)
    }
}

impl Allocator for PoolEngine {
    fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return std::ptr::null_mut();
        }

        let mut state = self.state.lock().unwrap();
        let class_idx = state
            .classes
            .iter()
            .position(|c| c.block_size >= size && c.free_head != SENTINEL);
        let Some(class_idx) = class_idx else {
            return std::ptr::null_mut();
        };

        let (slot_offset, block_size) = {
            let class = &mut state.classes[class_idx];
            let index = class.free_head;
            let offset = class.arena_offset + index as usize * class.block_size;
            let next = unsafe { ((self.arena.at(offset)) as *const u64).read() };
            class.free_head = next;
            class.free_count -= 1;
            (offset, class.block_size)
        };

        state.allocations.insert(slot_offset, class_idx);
        state.allocated_bytes += block_size;
        state.allocation_count += 1;

        let ptr = unsafe { self.arena.at(slot_offset) };
        unsafe { std::ptr::write_bytes(ptr, 0, block_size) };
        ptr
    }

    fn deallocate(&self, addr: *mut u8) {
        if addr.is_null() {
            return;
        }
        if !self.arena.contains(addr) {
            // Not an address this engine ever served: silently return, per spec §4.4.
            return;
        }
        let offset = self.arena.offset_of(addr);

        let mut state = self.state.lock().unwrap();
        let Some(&class_idx) = state.allocations.get(&offset) else {
            // Absent from the allocation map: silently return, per spec §4.4.
            return;
        };
        state.allocations.remove(&offset);

        let (index, block_size) = {
            let class = &state.classes[class_idx];
            ((offset - class.arena_offset) / class.block_size, class.block_size)
        };

        {
            let class = &mut state.classes[class_idx];
            unsafe { (addr as *mut u64).write(class.free_head) };
            class.free_head = index as u64;
            class.free_count += 1;
        }

        state.allocated_bytes -= block_size;
        state.deallocation_count += 1;
    }

    fn reset(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.allocations.clear();
            state.allocated_bytes = 0;
            state.allocation_count = 0;
            state.deallocation_count = 0;
        }
        self.init_classes();
    }

    fn stats(&self) -> String {
        let state = self.state.lock().unwrap();
        let mut out = String::from("Pool Allocator Stats:\n");
        for class in &state.classes {
            out.push_str(&format!(
                "\x20 Class {}B: {}/{} free\n",
                class.block_size, class.free_count, class.block_count
            ));
        }
        out.push_str(&format!(
            " Allocations: {}\n Deallocations: {}\n",
            state.allocation_count, state.deallocation_count
        ));
        out
    }

    fn layout(&self) -> Vec<LayoutEntry> {
        let state = self.state.lock().unwrap();
        let mut entries = Vec::new();
        for class in &state.classes {
            let mut free_indices = std::collections::HashSet::new();
            let mut cursor = class.free_head;
            while cursor != SENTINEL && free_indices.len() < class.free_count {
                free_indices.insert(cursor as usize);
                let slot = unsafe { self.arena.at(class.arena_offset + cursor as usize * class.block_size) };
                cursor = unsafe { (slot as *const u64).read() };
            }
            for i in 0..class.block_count {
                entries.push(LayoutEntry {
                    offset: class.arena_offset + i * class.block_size,
                    size: class.block_size,
                    free: free_indices.contains(&i),
                    label: format!("Pool[{}B]", class.block_size),
                });
            }
        }
        entries
    }

    fn fragmentation(&self) -> u8 {
        let state = self.state.lock().unwrap();
        let total_free: usize = state.classes.iter().map(|c| c.free_count * c.block_size).sum();
        if total_free == 0 {
            return 0;
        }
        let largest_free_class_bytes = state
            .classes
            .iter()
            .filter(|c| c.free_count > 0)
            .map(|c| c.free_count * c.block_size)
            .max()
            .unwrap_or(0);
        (100 * (total_free - largest_free_class_bytes) / total_free) as u8
    }

    fn total_memory(&self) -> usize {
        self.arena.capacity()
    }
}
