//! World grid model: material resolution, region coalescing, and batch application.

pub mod apply;
pub mod grid;
pub mod material;
pub mod region;

pub use apply::{ApplyError, ApplyOptions, ApplyOutcome, GridApplier};
pub use grid::{BlockPos, GridHandle, MemoryGrid};
pub use material::{
    MaterialFallback, MaterialId, MaterialRegistry, RegistryError, ResolvedPalette,
};
pub use region::{REGION_SIZE, RegionKey, RegionSet};
