//! Region coordinates: fixed 16×16 (x, z) spatial tiles used as the
//! invalidation granularity.
//!
//! Regions carry no state of their own — they exist only as invalidation
//! targets, coalesced across a batch so each region is refreshed once no
//! matter how many of its blocks were written.

use rustc_hash::FxHashSet;

/// Region edge length in blocks along x and z.
pub const REGION_SIZE: i32 = 16;

/// log2 of [`REGION_SIZE`]; shifting gives floor division for negatives.
const REGION_SHIFT: i32 = 4;

// ---------------------------------------------------------------------------
// RegionKey
// ---------------------------------------------------------------------------

/// Identifies one 16×16 region in the (x, z) plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionKey {
    /// Region X (block x divided by 16, floored).
    pub x: i32,
    /// Region Z (block z divided by 16, floored).
    pub z: i32,
}

impl RegionKey {
    /// Region containing the given block column.
    ///
    /// Arithmetic shift right floors toward negative infinity, so block
    /// x = -1 lands in region -1, not region 0.
    pub fn containing(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x >> REGION_SHIFT,
            z: block_z >> REGION_SHIFT,
        }
    }
}

// ---------------------------------------------------------------------------
// RegionSet
// ---------------------------------------------------------------------------

/// Deduplicating accumulator of regions touched by a batch.
#[derive(Debug, Default)]
pub struct RegionSet {
    regions: FxHashSet<RegionKey>,
}

impl RegionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the block column (x, z) was written.
    pub fn touch(&mut self, block_x: i32, block_z: i32) {
        self.regions.insert(RegionKey::containing(block_x, block_z));
    }

    /// Number of distinct regions touched.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region was touched.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Whether the given region was touched.
    pub fn contains(&self, key: RegionKey) -> bool {
        self.regions.contains(&key)
    }

    /// Consume the accumulator, yielding the distinct region keys.
    pub fn into_inner(self) -> FxHashSet<RegionKey> {
        self.regions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
