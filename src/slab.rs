// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of memory-allocator-project/src/core/slab_allocator.cpp.
// Fixed-size object allocator: slabs of N equal-size slots, each slot free or
// allocated, with an intrusive free-index list threaded through the slot
// bytes themselves (mirrors the Slab/Pool free-list convention this crate
// already documents for shared-memory chunk storage in chunk_storage.rs).

use std::sync::{Arc, Mutex};

use crate::arena::Arena;
use crate::contract::{Allocator, LayoutEntry};
use crate::diagnostics::{default_sink, Diagnostics};

const INDEX_SIZE: usize = std::mem::size_of::<u64>();
const HEADER_SIZE: usize = 2 * INDEX_SIZE; // free_count, first_free
const SENTINEL: u64 = u64::MAX;

struct SlabState {
    slab_count: usize,
    allocated_bytes: usize,
    allocation_count: u64,
    deallocation_count: u64,
}

/// Fixed-size-object allocator. Objects are packed into slabs of
/// `objects_per_slab` equal-size slots; slabs are created lazily up to
/// `max_slabs = arena_capacity / slab_size`.
pub struct SlabEngine {
    arena: Arena,
    object_size: usize,
    objects_per_slab: usize,
    slab_size: usize,
    max_slabs: usize,
    state: Mutex<SlabState>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl SlabEngine {
    /// Construct a Slab engine. `object_size` must be at least `sizeof(u64)`
    /// so a free slot can hold its free-index link.
    pub fn new(object_size: usize, objects_per_slab: usize, arena_capacity: usize) -> std::io::Result<Self> {
        Self::with_diagnostics(object_size, objects_per_slab, arena_capacity, default_sink())
    }

    /// Construct a Slab engine with an explicit diagnostics sink.
    pub fn with_diagnostics(
        object_size: usize,
        objects_per_slab: usize,
        arena_capacity: usize,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> std::io::Result<Self> {
        if object_size < INDEX_SIZE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("slab object_size must be at least {INDEX_SIZE} bytes"),
            ));
        }
        if objects_per_slab == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "slab objects_per_slab must be non-zero",
            ));
        }

        let slab_size = object_size * objects_per_slab + HEADER_SIZE;
        let max_slabs = (arena_capacity / slab_size).max(1);
        let arena = Arena::new(max_slabs * slab_size)?;

        let engine = Self {
            arena,
            object_size,
            objects_per_slab,
            slab_size,
            max_slabs,
            state: Mutex::new(SlabState {
                slab_count: 0,
                allocated_bytes: 0,
                allocation_count: 0,
                deallocation_count: 0,
            }),
            diagnostics,
        };
        {
            let mut state = engine.state.lock().unwrap();
            engine.init_slab(&mut state, 0);
            state.slab_count = 1;
        }
        Ok(engine)
    }

    /// Fixed object size this engine serves.
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Number of slabs currently created.
    pub fn slab_count(&self) -> usize {
        self.state.lock().unwrap().slab_count
    }

    /// Upper bound on slabs this engine can ever create.
    pub fn max_slabs(&self) -> usize {
        self.max_slabs
    }

    /// Bytes currently handed out to callers.
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().unwrap().allocated_bytes
    }

    fn slab_base(&self, idx: usize) -> *mut u8 {
        unsafe { self.arena.at(idx * self.slab_size) }
    }

    fn objects_base(&self, idx: usize) -> *mut u8 {
        unsafe { self.slab_base(idx).add(HEADER_SIZE) }
    }

    fn read_header(&self, idx: usize) -> (u64, u64) {
        let base = self.slab_base(idx) as *const u64;
        unsafe { (base.read(), base.add(1).read()) }
    }

    fn write_header(&self, idx: usize, free_count: u64, first_free: u64) {
        let base = self.slab_base(idx) as *mut u64;
        unsafe {
            base.write(free_count);
            base.add(1).write(first_free);
        }
    }

    fn init_slab(&self, _state: &mut SlabState, idx: usize) {
        let base = self.slab_base(idx);
        unsafe { std::ptr::write_bytes(base, 0, self.slab_size) };
        self.write_header(idx, self.objects_per_slab as u64, 0);

        let objects = self.objects_base(idx);
        for i in 0..self.objects_per_slab {
            let next = if i + 1 < self.objects_per_slab { (i + 1) as u64 } else { SENTINEL };
            unsafe {
                (objects.add(i * self.object_size) as *mut u64).write(next);
            }
        }
    }

    fn allocate_from_slab(&self, idx: usize) -> *mut u8 {
        let (free_count, first_free) = self.read_header(idx);
        if free_count == 0 {
            return std::ptr::null_mut();
        }
        let slot = unsafe { self.objects_base(idx).add(first_free as usize * self.object_size) };
        let next = unsafe { (slot as *const u64).read() };
        self.write_header(idx, free_count - 1, next);
        unsafe { std::ptr::write_bytes(slot, 0, self.object_size) };
        slot
    }

    /// Free object slots across every created slab (used by `fragmentation`).
    fn free_object_count(&self, state: &SlabState) -> u64 {
        (0..state.slab_count).map(|idx| self.read_header(idx).0).sum()
    }
}

impl Allocator for SlabEngine {
    fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 || size > self.object_size {
            return std::ptr::null_mut();
        }

        let mut state = self.state.lock().unwrap();
        for idx in 0..state.slab_count {
            if self.read_header(idx).0 > 0 {
                let ptr = self.allocate_from_slab(idx);
                if !ptr.is_null() {
                    state.allocated_bytes += self.object_size;
                    state.allocation_count += 1;
                    return ptr;
                }
            }
        }

        if state.slab_count < self.max_slabs {
            let idx = state.slab_count;
            self.init_slab(&mut state, idx);
            state.slab_count += 1;
            let ptr = self.allocate_from_slab(idx);
            if !ptr.is_null() {
                state.allocated_bytes += self.object_size;
                state.allocation_count += 1;
                return ptr;
            }
        }

        std::ptr::null_mut()
    }

    fn deallocate(&self, addr: *mut u8) {
        if addr.is_null() {
            return;
        }

        let mut state = self.state.lock().unwrap();
        for idx in 0..state.slab_count {
            let start = self.objects_base(idx);
            let end = unsafe { start.add(self.objects_per_slab * self.object_size) };
            if addr >= start && addr < end {
                let index = unsafe { addr.offset_from(start) } as usize / self.object_size;
                let (free_count, first_free) = self.read_header(idx);
                unsafe { (addr as *mut u64).write(first_free) };
                self.write_header(idx, free_count + 1, index as u64);
                state.allocated_bytes = state.allocated_bytes.saturating_sub(self.object_size);
                state.deallocation_count += 1;
                return;
            }
        }
        // No slab contains this address: silently return, per spec §4.3.
    }

    fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        self.init_slab(&mut state, 0);
        state.slab_count = 1;
        state.allocated_bytes = 0;
        state.allocation_count = 0;
        state.deallocation_count = 0;
    }

    fn stats(&self) -> String {
        let state = self.state.lock().unwrap();
        let free_objects = self.free_object_count(&state);
        format!(
            "Slab Allocator Stats:\n\
             \x20 Object Size: {} bytes\n\
             \x20 Objects per Slab: {}\n\
             \x20 Total Slabs: {}\n\
             \x20 Max Slabs: {}\n\
             \x20 Slab Size: {} bytes\n\
             \x20 Free Objects: {}\n\
             \x20 Allocations: {}\n\
             \x20 Deallocations: {}\n",
            self.object_size,
            self.objects_per_slab,
            state.slab_count,
            self.max_slabs,
            self.slab_size,
            free_objects,
            state.allocation_count,
            state.deallocation_count,
        )
    }

    fn layout(&self) -> Vec<LayoutEntry> {
        let state = self.state.lock().unwrap();
        let mut entries = Vec::new();

        for idx in 0..state.slab_count {
            let slab_offset = idx * self.slab_size;
            entries.push(LayoutEntry {
                offset: slab_offset,
                size: HEADER_SIZE,
                free: false,
                label: "Slab Header".to_string(),
            });

            let (free_count, mut cursor) = self.read_header(idx);
            let mut free_indices = std::collections::HashSet::new();
            while cursor != SENTINEL && (free_indices.len() as u64) < free_count {
                free_indices.insert(cursor as usize);
                let slot = unsafe { self.objects_base(idx).add(cursor as usize * self.object_size) };
                cursor = unsafe { (slot as *const u64).read() };
            }

            for j in 0..self.objects_per_slab {
                let is_free = free_indices.contains(&j);
                entries.push(LayoutEntry {
                    offset: slab_offset + HEADER_SIZE + j * self.object_size,
                    size: self.object_size,
                    free: is_free,
                    label: if is_free { "Free Object".to_string() } else { "Allocated Object".to_string() },
                });
            }
        }

        entries
    }

    fn fragmentation(&self) -> u8 {
        let state = self.state.lock().unwrap();
        if state.slab_count == 0 {
            return 0;
        }
        let total_objects = (state.slab_count * self.objects_per_slab) as u64;
        let free_objects = self.free_object_count(&state);
        ((100 * free_objects) / total_objects) as u8
    }

    fn total_memory(&self) -> usize {
        self.arena.capacity()
    }
}
