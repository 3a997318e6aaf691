// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The operation set every engine implements (ported from `MemoryAllocator`,
// the abstract base every C++ allocator in this family derived from).

/// One entry of an engine's `layout()` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Byte offset from the engine's arena base.
    pub offset: usize,
    /// Size in bytes of this region.
    pub size: usize,
    /// Whether the region is currently free.
    pub free: bool,
    /// Human-readable label (e.g. "Slab Header", "Pool", "Buddy leaf").
    pub label: String,
}

/// The operation set shared by every allocation engine.
///
/// `allocate`/`deallocate` trade in raw `*mut u8` addresses rather than a
/// typed pointer: the whole point of this crate is handing back addresses
/// into a byte arena whose contents the caller interprets, exactly the way
/// `chunk_storage::acquire_storage` already hands back `*mut u8` payload
/// pointers for the same reason.
pub trait Allocator {
    /// Serve `size` bytes, or return null ("nil") if the request is rejected
    /// or the engine has no room. `allocate(0)` always returns null.
    fn allocate(&self, size: usize) -> *mut u8;

    /// Return a previously-served address to the engine's free structure.
    /// A null `addr` is a silent no-op; an address unknown to this engine
    /// produces a diagnostic and otherwise does nothing.
    fn deallocate(&self, addr: *mut u8);

    /// Return the engine to its just-constructed state.
    fn reset(&self);

    /// A human-readable, multi-line summary of the engine's state.
    fn stats(&self) -> String;

    /// An ordered list of regions covering the engine's arena.
    fn layout(&self) -> Vec<LayoutEntry>;

    /// A coarse fragmentation heuristic in `[0, 100]`.
    fn fragmentation(&self) -> u8;

    /// Total arena capacity in bytes.
    fn total_memory(&self) -> usize;
}
