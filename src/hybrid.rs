// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of memory-allocator-project/src/core/hybrid_allocator.cpp.
// Routes requests across a Buddy engine and fixed sets of Pool and Slab
// engines by size, splitting the arena between them per `HybridPolicy`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::buddy::BuddyEngine;
use crate::contract::{Allocator, LayoutEntry};
use crate::diagnostics::{default_sink, Diagnostics};
use crate::pool::PoolEngine;
use crate::slab::SlabEngine;

const POOL_SIZES: [usize; 6] = [8, 16, 32, 64, 128, 256];
const SLAB_CONFIGS: [(usize, usize); 4] = [(64, 32), (128, 24), (256, 16), (512, 8)];
const MIN_BUDDY_MEMORY: usize = 1024;

/// Tunable split between the three sub-engines. Defaults match the allocator
/// this crate was ported from: 30% pool, 30% slab, the remainder buddy,
/// clamped so buddy always keeps at least `MIN_BUDDY_MEMORY` bytes.
#[derive(Debug, Clone, Copy)]
pub struct HybridPolicy {
    pub pool_memory_ratio: f64,
    pub slab_memory_ratio: f64,
    pub pool_max_size: usize,
    pub slab_max_size: usize,
}

impl Default for HybridPolicy {
    fn default() -> Self {
        Self {
            pool_memory_ratio: 0.3,
            slab_memory_ratio: 0.3,
            pool_max_size: 256,
            slab_max_size: 1024,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Route {
    Buddy,
    Pool(usize),
    Slab(usize),
}

struct HybridState {
    routes: HashMap<usize, Route>,
    pool_routed: u64,
    slab_routed: u64,
    buddy_routed: u64,
}

/// Routes allocations across Buddy, Pool and Slab sub-engines by size.
pub struct HybridEngine {
    policy: HybridPolicy,
    buddy: BuddyEngine,
    pools: Vec<PoolEngine>,
    slabs: Vec<SlabEngine>,
    state: Mutex<HybridState>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl HybridEngine {
    /// Construct a Hybrid engine with the default policy and stderr diagnostics.
    pub fn new(capacity: usize) -> std::io::Result<Self> {
        Self::with_policy(capacity, HybridPolicy::default())
    }

    /// Construct a Hybrid engine with an explicit policy.
    pub fn with_policy(capacity: usize, policy: HybridPolicy) -> std::io::Result<Self> {
        Self::with_diagnostics(capacity, policy, default_sink())
    }

    /// Construct a Hybrid engine with an explicit policy and diagnostics sink.
    pub fn with_diagnostics(
        capacity: usize,
        policy: HybridPolicy,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> std::io::Result<Self> {
        if capacity == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "hybrid capacity must be non-zero",
            ));
        }

        let mut pool_memory = (capacity as f64 * policy.pool_memory_ratio) as usize;
        let mut slab_memory = (capacity as f64 * policy.slab_memory_ratio) as usize;
        let mut buddy_memory = capacity.saturating_sub(pool_memory + slab_memory);

        if buddy_memory < MIN_BUDDY_MEMORY {
            buddy_memory = MIN_BUDDY_MEMORY.min(capacity);
            let remaining = capacity.saturating_sub(buddy_memory);
            pool_memory = remaining / 2;
            slab_memory = remaining - pool_memory;
        }

        let buddy = BuddyEngine::with_diagnostics(buddy_memory.max(1), Arc::clone(&diagnostics))?;

        let mut pools = Vec::new();
        if pool_memory > 0 {
            let memory_per_pool = pool_memory / POOL_SIZES.len();
            for &size in &POOL_SIZES {
                let num_blocks = memory_per_pool / size;
                if num_blocks == 0 {
                    continue;
                }
                pools.push(PoolEngine::with_diagnostics(&[size], &[num_blocks], Arc::clone(&diagnostics))?);
            }
        }

        let mut slabs = Vec::new();
        if slab_memory > 0 {
            let memory_per_slab = slab_memory / SLAB_CONFIGS.len();
            for &(object_size, objects_per_slab) in &SLAB_CONFIGS {
                if memory_per_slab < object_size {
                    continue;
                }
                slabs.push(SlabEngine::with_diagnostics(
                    object_size,
                    objects_per_slab,
                    memory_per_slab,
                    Arc::clone(&diagnostics),
                )?);
            }
        }

        Ok(Self {
            policy,
            buddy,
            pools,
            slabs,
            state: Mutex::new(HybridState {
                routes: HashMap::new(),
                pool_routed: 0,
                slab_routed: 0,
                buddy_routed: 0,
            }),
            diagnostics,
        })
    }

    fn select_route(&self, size: usize) -> Route {
        if size <= self.policy.pool_max_size {
            if let Some(idx) = self.pools.iter().position(|p| p.can_allocate(size)) {
                return Route::Pool(idx);
            }
        }
        if size <= self.policy.slab_max_size {
            if let Some(idx) = self.slabs.iter().position(|s| s.object_size() >= size) {
                return Route::Slab(idx);
            }
        }
        Route::Buddy
    }

    /// Allocation counts routed to each sub-engine kind so far: `(pool, slab, buddy)`.
    pub fn route_counts(&self) -> (u64, u64, u64) {
        let state = self.state.lock().unwrap();
        (state.pool_routed, state.slab_routed, state.buddy_routed)
    }

    /// A combined `utilization * (1 - fragmentation)` score in `[0, 1]`.
    pub fn efficiency_score(&self) -> f64 {
        let total = self.total_memory();
        if total == 0 {
            return 0.0;
        }
        let utilization = self.allocated_bytes() as f64 / total as f64;
        let frag = self.fragmentation() as f64 / 100.0;
        utilization * (1.0 - frag)
    }

    /// Bytes currently handed out to callers, summed across every sub-engine.
    pub fn allocated_bytes(&self) -> usize {
        let pool_bytes: usize = self.pools.iter().map(|p| p.allocated_bytes()).sum();
        let slab_bytes: usize = self.slabs.iter().map(|s| s.allocated_bytes()).sum();
        pool_bytes + slab_bytes + self.buddy.allocated_bytes()
    }
}

impl Allocator for HybridEngine {
    fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return std::ptr::null_mut();
        }

        let mut route = self.select_route(size);
        let mut addr = match route {
            Route::Pool(idx) => self.pools[idx].allocate(size),
            Route::Slab(idx) => self.slabs[idx].allocate(size),
            Route::Buddy => self.buddy.allocate(size),
        };
        // A failed POOL/SLAB route falls through to BUDDY as a last resort;
        // a BUDDY failure is final (spec §4.5).
        if addr.is_null() && route != Route::Buddy {
            route = Route::Buddy;
            addr = self.buddy.allocate(size);
        }
        if addr.is_null() {
            return addr;
        }

        let mut state = self.state.lock().unwrap();
        state.routes.insert(addr as usize, route);
        match route {
            Route::Pool(_) => state.pool_routed += 1,
            Route::Slab(_) => state.slab_routed += 1,
            Route::Buddy => state.buddy_routed += 1,
        }
        addr
    }

    fn deallocate(&self, addr: *mut u8) {
        if addr.is_null() {
            return;
        }

        let route = {
            let mut state = self.state.lock().unwrap();
            state.routes.remove(&(addr as usize))
        };

        match route {
            Some(Route::Pool(idx)) => self.pools[idx].deallocate(addr),
            Some(Route::Slab(idx)) => self.slabs[idx].deallocate(addr),
            Some(Route::Buddy) => self.buddy.deallocate(addr),
            // Unrouted address: no-op, per spec §4.5.
            None => {}
        }
    }

    fn reset(&self) {
        self.buddy.reset();
        for pool in &self.pools {
            pool.reset();
        }
        for slab in &self.slabs {
            slab.reset();
        }
        let mut state = self.state.lock().unwrap();
        state.routes.clear();
        state.pool_routed = 0;
        state.slab_routed = 0;
        state.buddy_routed = 0;
    }

    fn stats(&self) -> String {
        let (pool_routed, slab_routed, buddy_routed) = self.route_counts();
        format!(
            "Hybrid Allocator Stats:\n\
             \x20 Pool sub-engines: {} ({} allocations routed)\n\
             \x20 Slab sub-engines: {} ({} allocations routed)\n\
             \x20 Buddy sub-engine: {} bytes ({} allocations routed)\n\
             \x20 Fragmentation: {}%\n\
             \x20 Efficiency score: {:.4}\n",
            self.pools.len(),
            pool_routed,
            self.slabs.len(),
            slab_routed,
            self.buddy.max_block(),
            buddy_routed,
            self.fragmentation(),
            self.efficiency_score(),
        )
    }

    fn layout(&self) -> Vec<LayoutEntry> {
        let mut entries = self.buddy.layout();
        for pool in &self.pools {
            entries.extend(pool.layout());
        }
        for slab in &self.slabs {
            entries.extend(slab.layout());
        }
        entries
    }

    fn fragmentation(&self) -> u8 {
        let mut weighted = 0u64;
        let mut total = 0u64;

        let buddy_mem = self.buddy.total_memory() as u64;
        weighted += self.buddy.fragmentation() as u64 * buddy_mem;
        total += buddy_mem;

        for pool in &self.pools {
            let mem = pool.total_memory() as u64;
            weighted += pool.fragmentation() as u64 * mem;
            total += mem;
        }
        for slab in &self.slabs {
            let mem = slab.total_memory() as u64;
            weighted += slab.fragmentation() as u64 * mem;
            total += mem;
        }

        if total == 0 { 0 } else { (weighted / total) as u8 }
    }

    fn total_memory(&self) -> usize {
        let pool_mem: usize = self.pools.iter().map(|p| p.total_memory()).sum();
        let slab_mem: usize = self.slabs.iter().map(|s| s.total_memory()).sum();
        pool_mem + slab_mem + self.buddy.total_memory()
    }
}
