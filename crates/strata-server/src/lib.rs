//! Batch ingestion server: per-message pipeline, world registry, and the
//! TCP transport that feeds it.

pub mod framing;
pub mod processor;
pub mod registry;
pub mod server;

pub use framing::{FrameConfig, FrameError, read_message, write_message};
pub use processor::{BatchProcessor, ProcessError};
pub use registry::{SharedGrid, WorldRegistry};
pub use server::{ConnectionId, ConnectionSet, IdGenerator, ServerConfig, VoxelServer};
