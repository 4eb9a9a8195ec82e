//! Named world registry with per-world serialization.
//!
//! Each world's grid sits behind its own mutex, held for the duration of one
//! full batch apply. That makes last-write-wins ordering and the
//! one-invalidation-per-region guarantee atomic to external observers, while
//! batches targeting different worlds proceed fully in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use strata_world::MemoryGrid;

/// Shared handle to one world's grid.
pub type SharedGrid = Arc<Mutex<MemoryGrid>>;

/// Registry of named worlds, fixed after startup.
#[derive(Default)]
pub struct WorldRegistry {
    worlds: HashMap<String, SharedGrid>,
}

impl WorldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the given worlds.
    pub fn with_worlds<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.insert(name.into());
        }
        registry
    }

    /// Add a world. Replaces any existing grid under the same name.
    pub fn insert(&mut self, name: String) {
        let grid = Arc::new(Mutex::new(MemoryGrid::new(name.clone())));
        self.worlds.insert(name, grid);
    }

    /// Shared grid for a named world, if it exists.
    pub fn grid(&self, name: &str) -> Option<SharedGrid> {
        self.worlds.get(name).map(Arc::clone)
    }

    /// Whether the named world exists.
    pub fn contains(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    /// Number of registered worlds.
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Whether no worlds are registered.
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

/// Lock a shared grid, recovering from a poisoned mutex.
///
/// A panic inside an apply can poison the lock; the grid data itself stays
/// structurally valid (every write is a single map insert), so recovery is
/// preferable to wedging the world forever.
pub(crate) fn lock_grid(grid: &SharedGrid) -> std::sync::MutexGuard<'_, MemoryGrid> {
    grid.lock().unwrap_or_else(PoisonError::into_inner)
}
