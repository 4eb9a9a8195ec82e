//! Wire protocol for voxel update batches: typed message model and decoder.

pub mod decode;
pub mod messages;

pub use decode::{DecodeError, TYPE_DENSE, TYPE_SPARSE, decode};
pub use messages::{Batch, DenseBatch, SparseBatch, Voxel};
