//! Batch application: walks a decoded batch, mutates the target grid, and
//! coalesces region invalidations.
//!
//! Application is strictly ordered. Sparse voxels are written in sequence
//! order so later entries at the same coordinate win; dense cuboids are
//! iterated x outer, y middle, z inner to match the payload layout. Region
//! invalidations are issued after all block writes, once per distinct
//! region, and are delivered before `apply` returns.

use rustc_hash::FxHashSet;
use thiserror::Error;

use strata_protocol::{Batch, DenseBatch, SparseBatch};

use crate::grid::{BlockPos, GridHandle};
use crate::material::{MaterialFallback, MaterialRegistry, ResolvedPalette};
use crate::region::{RegionKey, RegionSet};

// ---------------------------------------------------------------------------
// Options / outcome / error
// ---------------------------------------------------------------------------

/// Tuning knobs for batch application.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Skip cells that resolve to air instead of writing them.
    ///
    /// Off by default for wire compatibility: legacy senders expect air to
    /// overwrite like any other material. Skipped air cells count toward
    /// `skipped`.
    pub skip_air: bool,
}

/// Result of applying one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Cells written to the grid.
    pub applied: u32,
    /// Cells visited but not written (unresolved material, or air with the
    /// air filter enabled). Cells past a truncated dense payload are not
    /// counted at all.
    pub skipped: u32,
    /// Distinct regions touched by this batch.
    pub affected_regions: FxHashSet<RegionKey>,
}

/// Errors surfaced by batch application.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    /// The batch names a world this grid does not back.
    #[error("world not found: {0}")]
    WorldNotFound(String),
}

// ---------------------------------------------------------------------------
// GridApplier
// ---------------------------------------------------------------------------

/// Applies decoded batches to a grid using a material registry and the
/// legacy fallback table.
pub struct GridApplier<'a> {
    registry: &'a MaterialRegistry,
    fallback: &'a MaterialFallback,
    options: ApplyOptions,
}

impl<'a> GridApplier<'a> {
    /// Applier with default options (air filter disabled).
    pub fn new(registry: &'a MaterialRegistry, fallback: &'a MaterialFallback) -> Self {
        Self::with_options(registry, fallback, ApplyOptions::default())
    }

    /// Applier with explicit options.
    pub fn with_options(
        registry: &'a MaterialRegistry,
        fallback: &'a MaterialFallback,
        options: ApplyOptions,
    ) -> Self {
        Self {
            registry,
            fallback,
            options,
        }
    }

    /// Apply one batch to the grid.
    ///
    /// # Errors
    ///
    /// [`ApplyError::WorldNotFound`] if the grid does not back the batch's
    /// world — in that case nothing is written and nothing is invalidated.
    pub fn apply<G: GridHandle>(
        &self,
        batch: &Batch,
        grid: &mut G,
    ) -> Result<ApplyOutcome, ApplyError> {
        if !grid.world_exists(batch.world()) {
            return Err(ApplyError::WorldNotFound(batch.world().to_string()));
        }
        match batch {
            Batch::Sparse(sparse) => Ok(self.apply_sparse(sparse, grid)),
            Batch::Dense(dense) => Ok(self.apply_dense(dense, grid)),
        }
    }

    fn apply_sparse<G: GridHandle>(&self, batch: &SparseBatch, grid: &mut G) -> ApplyOutcome {
        let mut applied = 0u32;
        let mut skipped = 0u32;
        let mut regions = RegionSet::new();

        for voxel in &batch.voxels {
            let Some(material) = self.registry.resolve_name(&voxel.material) else {
                skipped += 1;
                continue;
            };
            if self.options.skip_air && material.is_air() {
                skipped += 1;
                continue;
            }
            grid.set_block(BlockPos::new(voxel.x, voxel.y, voxel.z), material);
            regions.touch(voxel.x, voxel.z);
            applied += 1;
        }

        finish(grid, applied, skipped, regions)
    }

    fn apply_dense<G: GridHandle>(&self, batch: &DenseBatch, grid: &mut G) -> ApplyOutcome {
        let palette = batch
            .palette
            .as_deref()
            .map(|names| ResolvedPalette::resolve(self.registry, names));

        let (size_x, size_y, size_z) = batch.size;
        let (origin_x, origin_y, origin_z) = batch.origin;

        let mut applied = 0u32;
        let mut skipped = 0u32;
        let mut regions = RegionSet::new();
        let mut index = 0usize;

        'cells: for x in 0..size_x {
            for y in 0..size_y {
                for z in 0..size_z {
                    if index >= batch.payload.len() {
                        // Truncated payload: remaining cells stay untouched
                        // and uncounted. Silent toward the sender.
                        tracing::debug!(
                            world = %batch.world,
                            payload_len = batch.payload.len(),
                            volume = batch.volume(),
                            "dense payload shorter than cuboid, stopping early"
                        );
                        break 'cells;
                    }
                    let byte = batch.payload[index];
                    index += 1;

                    let material = match &palette {
                        Some(palette) => palette.get(byte),
                        None => Some(self.fallback.resolve(byte)),
                    };
                    let Some(material) = material else {
                        skipped += 1;
                        continue;
                    };
                    if self.options.skip_air && material.is_air() {
                        skipped += 1;
                        continue;
                    }

                    // Coordinates wrap like the legacy 32-bit arithmetic;
                    // a huge origin must not panic the apply.
                    let pos = BlockPos::new(
                        origin_x.wrapping_add(x as i32),
                        origin_y.wrapping_add(y as i32),
                        origin_z.wrapping_add(z as i32),
                    );
                    grid.set_block(pos, material);
                    regions.touch(pos.x, pos.z);
                    applied += 1;
                }
            }
        }

        finish(grid, applied, skipped, regions)
    }
}

/// Issue one invalidation per distinct touched region, then assemble the
/// outcome. Order between regions is not observable; distinctness is.
fn finish<G: GridHandle>(
    grid: &mut G,
    applied: u32,
    skipped: u32,
    regions: RegionSet,
) -> ApplyOutcome {
    let affected_regions = regions.into_inner();
    for region in &affected_regions {
        grid.invalidate_region(*region);
    }
    ApplyOutcome {
        applied,
        skipped,
        affected_regions,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
