// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// A small family of in-process memory allocation engines (buddy, slab,
// pool, and a size-routed hybrid of the three) sharing one `Allocator`
// contract, built over heap-backed arenas.

pub mod arena;
pub mod contract;
pub mod diagnostics;

pub mod buddy;
pub mod slab;
pub mod pool;
pub mod hybrid;

pub mod factory;

pub use arena::Arena;
pub use contract::{Allocator, LayoutEntry};
pub use diagnostics::{Diagnostics, NullDiagnostics, StderrDiagnostics};

pub use buddy::BuddyEngine;
pub use slab::SlabEngine;
pub use pool::PoolEngine;
pub use hybrid::{HybridEngine, HybridPolicy};

pub use factory::{Engine, EngineKind, Factory};
