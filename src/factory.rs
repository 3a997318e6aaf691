// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Port of memory-allocator-project/src/core/memory_allocator.cpp's
// `AllocatorFactory::create_allocator`. The C++ factory dispatches on a
// string and returns a base-class pointer; here the kind is parsed into a
// closed `EngineKind` and the result is a tagged `Engine` enum, so dispatch
// stays static instead of going through a trait object.

use std::str::FromStr;
use std::sync::Arc;

use crate::buddy::BuddyEngine;
use crate::contract::{Allocator, LayoutEntry};
use crate::diagnostics::{default_sink, Diagnostics};
use crate::hybrid::{HybridEngine, HybridPolicy};
use crate::pool::PoolEngine;
use crate::slab::SlabEngine;

/// Default object size for `Factory::create(EngineKind::Slab, ..)`.
pub const DEFAULT_SLAB_OBJECT_SIZE: usize = 64;
/// Default objects-per-slab for `Factory::create(EngineKind::Slab, ..)`.
pub const DEFAULT_SLAB_OBJECTS_PER_SLAB: usize = 32;
/// Default pool block-size classes.
pub const DEFAULT_POOL_SIZES: [usize; 4] = [32, 64, 128, 256];
/// Default pool blocks-per-class, matched index-for-index with `DEFAULT_POOL_SIZES`.
pub const DEFAULT_POOL_BLOCKS: [usize; 4] = [100, 80, 60, 40];

/// Which engine a `Factory` call should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Buddy,
    Slab,
    Pool,
    Hybrid,
}

impl FromStr for EngineKind {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buddy" => Ok(EngineKind::Buddy),
            "slab" => Ok(EngineKind::Slab),
            "pool" => Ok(EngineKind::Pool),
            "hybrid" => Ok(EngineKind::Hybrid),
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unknown allocator kind: {other}"),
            )),
        }
    }
}

/// A constructed allocation engine of one of the four kinds, dispatched
/// statically through `Allocator`.
pub enum Engine {
    Buddy(BuddyEngine),
    Slab(SlabEngine),
    Pool(PoolEngine),
    Hybrid(HybridEngine),
}

impl Allocator for Engine {
    fn allocate(&self, size: usize) -> *mut u8 {
        match self {
            Engine::Buddy(e) => e.allocate(size),
            Engine::Slab(e) => e.allocate(size),
            Engine::Pool(e) => e.allocate(size),
            Engine::Hybrid(e) => e.allocate(size),
        }
    }

    fn deallocate(&self, addr: *mut u8) {
        match self {
            Engine::Buddy(e) => e.deallocate(addr),
            Engine::Slab(e) => e.deallocate(addr),
            Engine::Pool(e) => e.deallocate(addr),
            Engine::Hybrid(e) => e.deallocate(addr),
        }
    }

    fn reset(&self) {
        match self {
            Engine::Buddy(e) => e.reset(),
            Engine::Slab(e) => e.reset(),
            Engine::Pool(e) => e.reset(),
            Engine::Hybrid(e) => e.reset(),
        }
    }

    fn stats(&self) -> String {
        match self {
            Engine::Buddy(e) => e.stats(),
            Engine::Slab(e) => e.stats(),
            Engine::Pool(e) => e.stats(),
            Engine::Hybrid(e) => e.stats(),
        }
    }

    fn layout(&self) -> Vec<LayoutEntry> {
        match self {
            Engine::Buddy(e) => e.layout(),
            Engine::Slab(e) => e.layout(),
            Engine::Pool(e) => e.layout(),
            Engine::Hybrid(e) => e.layout(),
        }
    }

    fn fragmentation(&self) -> u8 {
        match self {
            Engine::Buddy(e) => e.fragmentation(),
            Engine::Slab(e) => e.fragmentation(),
            Engine::Pool(e) => e.fragmentation(),
            Engine::Hybrid(e) => e.fragmentation(),
        }
    }

    fn total_memory(&self) -> usize {
        match self {
            Engine::Buddy(e) => e.total_memory(),
            Engine::Slab(e) => e.total_memory(),
            Engine::Pool(e) => e.total_memory(),
            Engine::Hybrid(e) => e.total_memory(),
        }
    }
}

/// Builds engines with the same defaults the C++ `AllocatorFactory` used.
pub struct Factory;

impl Factory {
    /// Build an engine of `kind` sized to `capacity` bytes, using default
    /// per-kind configuration and the stderr diagnostic sink.
    pub fn create(kind: EngineKind, capacity: usize) -> std::io::Result<Engine> {
        Self::create_with_diagnostics(kind, capacity, default_sink())
    }

    /// Build an engine of `kind` with an explicit diagnostics sink.
    pub fn create_with_diagnostics(
        kind: EngineKind,
        capacity: usize,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> std::io::Result<Engine> {
        match kind {
            EngineKind::Buddy => Ok(Engine::Buddy(BuddyEngine::with_diagnostics(capacity, diagnostics)?)),
            EngineKind::Slab => Ok(Engine::Slab(SlabEngine::with_diagnostics(
                DEFAULT_SLAB_OBJECT_SIZE,
                DEFAULT_SLAB_OBJECTS_PER_SLAB,
                capacity,
                diagnostics,
            )?)),
            EngineKind::Pool => Ok(Engine::Pool(PoolEngine::with_diagnostics(
                &DEFAULT_POOL_SIZES,
                &DEFAULT_POOL_BLOCKS,
                diagnostics,
            )?)),
            EngineKind::Hybrid => Ok(Engine::Hybrid(HybridEngine::with_diagnostics(
                capacity,
                HybridPolicy::default(),
                diagnostics,
            )?)),
        }
    }

    /// Build an engine by kind name (case-insensitive). Returns
    /// `InvalidInput` for an unrecognized name, matching the C++ factory's
    /// `std::invalid_argument`.
    pub fn create_by_name(name: &str, capacity: usize) -> std::io::Result<Engine> {
        Self::create(name.parse()?, capacity)
    }
}
