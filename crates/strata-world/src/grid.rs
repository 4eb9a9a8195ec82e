//! Grid access trait and an in-memory world grid.
//!
//! The grid is long-lived and externally owned; the applier only issues
//! read/write calls through [`GridHandle`]. [`MemoryGrid`] is the server's
//! own sparse block store and doubles as the reference implementation for
//! tests.

use rustc_hash::FxHashMap;

use crate::material::MaterialId;
use crate::region::RegionKey;

/// Absolute block position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockPos {
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
}

impl BlockPos {
    /// Construct a position from its components.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// GridHandle
// ---------------------------------------------------------------------------

/// Write access to one named world's block storage.
pub trait GridHandle {
    /// Whether the named world is backed by this grid.
    fn world_exists(&self, world: &str) -> bool;

    /// Set the material at an absolute block position. Infallible once the
    /// material is resolved.
    fn set_block(&mut self, pos: BlockPos, material: MaterialId);

    /// Request a visibility refresh for one region. The applier calls this
    /// exactly once per distinct region touched by a batch, after all block
    /// writes — never per voxel.
    fn invalidate_region(&mut self, region: RegionKey);
}

// ---------------------------------------------------------------------------
// MemoryGrid
// ---------------------------------------------------------------------------

/// Sparse in-memory grid for a single named world.
pub struct MemoryGrid {
    name: String,
    blocks: FxHashMap<BlockPos, MaterialId>,
    invalidations: u64,
}

impl MemoryGrid {
    /// Create an empty grid for the given world name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: FxHashMap::default(),
            invalidations: 0,
        }
    }

    /// World name this grid backs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Material at a position, if any block was ever written there.
    pub fn block(&self, pos: BlockPos) -> Option<MaterialId> {
        self.blocks.get(&pos).copied()
    }

    /// Number of positions that have been written.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total region invalidations requested over the grid's lifetime.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }
}

impl GridHandle for MemoryGrid {
    fn world_exists(&self, world: &str) -> bool {
        self.name == world
    }

    fn set_block(&mut self, pos: BlockPos, material: MaterialId) {
        self.blocks.insert(pos, material);
    }

    fn invalidate_region(&mut self, region: RegionKey) {
        self.invalidations += 1;
        tracing::trace!(world = %self.name, rx = region.x, rz = region.z, "region invalidated");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
