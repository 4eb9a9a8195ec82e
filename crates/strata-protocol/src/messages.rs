//! Typed voxel batch messages.
//!
//! A [`Batch`] is one decoded unit of voxel-update work from a single wire
//! message. It is constructed fresh per message, consumed exactly once by the
//! applier, then dropped — no batch data survives one apply cycle.

// ---------------------------------------------------------------------------
// Voxel
// ---------------------------------------------------------------------------

/// One block update inside a sparse batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voxel {
    /// Absolute block X.
    pub x: i32,
    /// Absolute block Y.
    pub y: i32,
    /// Absolute block Z.
    pub z: i32,
    /// Material name token, resolved at apply time.
    pub material: String,
}

// ---------------------------------------------------------------------------
// Batch variants
// ---------------------------------------------------------------------------

/// Sparse per-voxel update list (`bulkVoxels` on the wire).
///
/// The voxel sequence may be empty. Sequence order is application order:
/// later entries at the same coordinate win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBatch {
    /// Target world name.
    pub world: String,
    /// Updates in application order.
    pub voxels: Vec<Voxel>,
}

/// Dense run-encoded cuboid (`compressedVoxels` on the wire).
///
/// The payload carries one byte per cell in fixed iteration order: x outer,
/// y middle, z inner. A payload shorter than the cuboid volume is valid —
/// application stops at the payload end without touching remaining cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseBatch {
    /// Target world name.
    pub world: String,
    /// Absolute block coordinates of the cuboid corner (startX, startY, startZ).
    pub origin: (i32, i32, i32),
    /// Cuboid extent along each axis (sizeX, sizeY, sizeZ).
    pub size: (u32, u32, u32),
    /// One byte per cell: a palette index if `palette` is present, otherwise
    /// a direct material id.
    pub payload: Vec<u8>,
    /// Optional material name palette translating payload bytes.
    pub palette: Option<Vec<String>>,
}

impl DenseBatch {
    /// Total cell count of the cuboid.
    pub fn volume(&self) -> u64 {
        let (sx, sy, sz) = self.size;
        u64::from(sx) * u64::from(sy) * u64::from(sz)
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// One decoded voxel update batch, tagged by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Sparse per-voxel list.
    Sparse(SparseBatch),
    /// Dense run-encoded cuboid.
    Dense(DenseBatch),
}

impl Batch {
    /// Target world name of this batch.
    pub fn world(&self) -> &str {
        match self {
            Batch::Sparse(b) => &b.world,
            Batch::Dense(b) => &b.world,
        }
    }
}
