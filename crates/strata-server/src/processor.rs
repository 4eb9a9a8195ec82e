//! Per-message pipeline: decode, resolve the target world, apply, report.
//!
//! Decode is pure and runs on any worker. The apply step takes the target
//! world's lock for one full batch; batches for different worlds run in
//! parallel. Errors are structured values for the transport to log — a bad
//! message never aborts processing of later messages.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use strata_protocol::DecodeError;
use strata_world::{
    ApplyError, ApplyOptions, ApplyOutcome, GridApplier, MaterialFallback, MaterialRegistry,
};

use crate::registry::{WorldRegistry, lock_grid};

/// Errors surfaced per message by [`BatchProcessor::handle_message`].
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The message failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The batch names a world this server does not host.
    #[error("world not found: {0}")]
    WorldNotFound(String),
}

/// Owns the per-message pipeline: decode → resolve grid → apply → outcome.
///
/// Apply options sit behind a lock so a config reload can adjust them while
/// the server is running; each message reads a consistent snapshot.
pub struct BatchProcessor {
    worlds: Arc<WorldRegistry>,
    materials: MaterialRegistry,
    fallback: MaterialFallback,
    options: RwLock<ApplyOptions>,
}

impl BatchProcessor {
    /// Create a processor over the given world registry and material tables.
    pub fn new(
        worlds: Arc<WorldRegistry>,
        materials: MaterialRegistry,
        fallback: MaterialFallback,
        options: ApplyOptions,
    ) -> Self {
        Self {
            worlds,
            materials,
            fallback,
            options: RwLock::new(options),
        }
    }

    /// Replace the apply options, e.g. after a config reload. Takes effect
    /// for the next message; in-flight applies keep their snapshot.
    pub fn update_options(&self, options: ApplyOptions) {
        *self
            .options
            .write()
            .unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Process one raw text message end to end.
    ///
    /// # Errors
    ///
    /// [`ProcessError::Decode`] for malformed messages,
    /// [`ProcessError::WorldNotFound`] when the batch targets an unknown
    /// world. Neither is fatal; the caller logs and drops the message.
    pub fn handle_message(&self, raw: &str) -> Result<ApplyOutcome, ProcessError> {
        let batch = strata_protocol::decode(raw)?;

        let grid = self
            .worlds
            .grid(batch.world())
            .ok_or_else(|| ProcessError::WorldNotFound(batch.world().to_string()))?;

        let options = *self
            .options
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let applier = GridApplier::with_options(&self.materials, &self.fallback, options);
        let mut grid = lock_grid(&grid);
        applier.apply(&batch, &mut *grid).map_err(|err| match err {
            ApplyError::WorldNotFound(world) => ProcessError::WorldNotFound(world),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use strata_world::BlockPos;

    fn processor_for(worlds: &[&str]) -> BatchProcessor {
        let registry = Arc::new(WorldRegistry::with_worlds(worlds.iter().copied()));
        let materials = MaterialRegistry::with_defaults();
        let fallback = MaterialFallback::legacy(&materials);
        BatchProcessor::new(registry, materials, fallback, ApplyOptions::default())
    }

    #[test]
    fn test_sparse_message_end_to_end() {
        let processor = processor_for(&["world"]);
        let msg = r#"{
            "type": "bulkVoxels",
            "world": "world",
            "voxels": [
                {"x": 0, "y": 64, "z": 0, "material": "stone"},
                {"x": 100, "y": 64, "z": 100, "material": "dirt"}
            ]
        }"#;

        let outcome = processor.handle_message(msg).unwrap();
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.affected_regions.len(), 2);

        let grid = processor.worlds.grid("world").unwrap();
        let grid = lock_grid(&grid);
        assert!(grid.block(BlockPos::new(0, 64, 0)).is_some());
        assert!(grid.block(BlockPos::new(100, 64, 100)).is_some());
        assert_eq!(grid.invalidation_count(), 2);
    }

    #[test]
    fn test_dense_message_end_to_end() {
        let processor = processor_for(&["world"]);
        let data = BASE64.encode([0u8, 1, 0, 1, 0, 1, 0, 1]);
        let msg = format!(
            r#"{{
                "type": "compressedVoxels",
                "world": "world",
                "startX": 0, "startY": 0, "startZ": 0,
                "sizeX": 2, "sizeY": 2, "sizeZ": 2,
                "data": "{data}",
                "palette": ["stone", "dirt"]
            }}"#
        );

        let outcome = processor.handle_message(&msg).unwrap();
        assert_eq!(outcome.applied, 8);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.affected_regions.len(), 1);
    }

    #[test]
    fn test_unknown_world_is_reported() {
        let processor = processor_for(&["world"]);
        let msg = r#"{"type": "bulkVoxels", "world": "moon", "voxels": []}"#;

        let err = processor.handle_message(msg).unwrap_err();
        assert!(matches!(err, ProcessError::WorldNotFound(w) if w == "moon"));
    }

    #[test]
    fn test_decode_error_is_reported_not_fatal() {
        let processor = processor_for(&["world"]);

        let err = processor.handle_message(r#"{"type": "warp"}"#).unwrap_err();
        assert!(matches!(err, ProcessError::Decode(DecodeError::UnknownType)));

        // The processor keeps working after a bad message.
        let ok = processor
            .handle_message(r#"{"type": "bulkVoxels", "world": "world", "voxels": []}"#)
            .unwrap();
        assert_eq!(ok.applied, 0);
    }

    #[test]
    fn test_updated_options_take_effect_for_later_messages() {
        let processor = processor_for(&["world"]);
        let msg = r#"{"type": "bulkVoxels", "world": "world",
            "voxels": [{"x": 0, "y": 0, "z": 0, "material": "air"}]}"#;

        // Default options write air like any material.
        let before = processor.handle_message(msg).unwrap();
        assert_eq!(before.applied, 1);
        assert_eq!(before.skipped, 0);

        processor.update_options(ApplyOptions { skip_air: true });
        let after = processor.handle_message(msg).unwrap();
        assert_eq!(after.applied, 0);
        assert_eq!(after.skipped, 1);
    }

    #[test]
    fn test_batches_for_different_worlds_run_in_parallel() {
        let processor = Arc::new(processor_for(&["alpha", "beta"]));

        std::thread::scope(|scope| {
            for world in ["alpha", "beta"] {
                let processor = Arc::clone(&processor);
                scope.spawn(move || {
                    for i in 0..100 {
                        let msg = format!(
                            r#"{{"type": "bulkVoxels", "world": "{world}",
                                "voxels": [{{"x": {i}, "y": 0, "z": 0, "material": "stone"}}]}}"#
                        );
                        processor.handle_message(&msg).unwrap();
                    }
                });
            }
        });

        for world in ["alpha", "beta"] {
            let grid = processor.worlds.grid(world).unwrap();
            assert_eq!(lock_grid(&grid).block_count(), 100);
        }
    }

    #[test]
    fn test_same_world_batches_serialize_last_write_wins() {
        let processor = processor_for(&["world"]);
        let a = r#"{"type": "bulkVoxels", "world": "world",
            "voxels": [{"x": 0, "y": 0, "z": 0, "material": "stone"}]}"#;
        let b = r#"{"type": "bulkVoxels", "world": "world",
            "voxels": [{"x": 0, "y": 0, "z": 0, "material": "dirt"}]}"#;

        processor.handle_message(a).unwrap();
        processor.handle_message(b).unwrap();

        let grid = processor.worlds.grid("world").unwrap();
        let grid = lock_grid(&grid);
        let dirt = processor.materials.resolve_name("dirt");
        assert_eq!(grid.block(BlockPos::new(0, 0, 0)), dirt);
    }
}
