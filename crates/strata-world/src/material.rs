//! Material registry and resolution.
//!
//! Wire messages carry material name tokens (or raw bytes through a palette
//! or the legacy fallback table); the registry maps them to compact
//! [`MaterialId`] values. Air is always id 0 so zero-filled storage
//! represents empty space.

use std::collections::HashMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// MaterialId
// ---------------------------------------------------------------------------

/// Compact material identifier assigned by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// Air / empty space.
    pub const AIR: Self = Self(0);

    /// Returns `true` if this material is air (id 0).
    pub fn is_air(self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// MaterialRegistry
// ---------------------------------------------------------------------------

/// Errors that can occur during material registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A material with the same normalized name has already been registered.
    #[error("duplicate material name: {0}")]
    DuplicateName(String),
    /// All 65 536 id slots have been consumed.
    #[error("material registry is full (max 65536 materials)")]
    RegistryFull,
}

/// Maps material names to [`MaterialId`] values.
///
/// Name lookups are case-insensitive: names are normalized to lowercase on
/// registration and before every lookup. Air is pre-registered as id 0.
pub struct MaterialRegistry {
    /// Dense array where `index == MaterialId.0`.
    names: Vec<String>,
    /// Reverse lookup: normalized name → id.
    name_to_id: FxHashMap<String, MaterialId>,
}

impl MaterialRegistry {
    /// Creates a registry with only air registered.
    pub fn new() -> Self {
        let mut name_to_id = FxHashMap::default();
        name_to_id.insert("air".to_string(), MaterialId::AIR);
        Self {
            names: vec!["air".to_string()],
            name_to_id,
        }
    }

    /// Creates a registry pre-populated with the common block materials the
    /// legacy wire protocol refers to by name.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for name in [
            "stone",
            "dirt",
            "grass_block",
            "cobblestone",
            "oak_planks",
            "sand",
            "gravel",
            "glass",
            "water",
            "oak_log",
            "oak_leaves",
        ] {
            // Names are distinct literals; registration cannot fail here.
            let _ = registry.register(name);
        }
        registry
    }

    /// Registers a material name and returns its assigned id.
    ///
    /// Ids are assigned sequentially starting from 1 (0 is air).
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the normalized name already
    /// exists, [`RegistryError::RegistryFull`] if all id slots are consumed.
    pub fn register(&mut self, name: &str) -> Result<MaterialId, RegistryError> {
        let normalized = name.to_ascii_lowercase();
        if self.name_to_id.contains_key(&normalized) {
            return Err(RegistryError::DuplicateName(normalized));
        }
        if self.names.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = MaterialId(self.names.len() as u16);
        self.name_to_id.insert(normalized.clone(), id);
        self.names.push(normalized);
        Ok(id)
    }

    /// Resolves a material name token, case-insensitively.
    ///
    /// Returns `None` for unknown names — the caller must skip, never
    /// substitute.
    pub fn resolve_name(&self, token: &str) -> Option<MaterialId> {
        if let Some(id) = self.name_to_id.get(token) {
            return Some(*id);
        }
        self.name_to_id.get(&token.to_ascii_lowercase()).copied()
    }

    /// Returns the normalized name for a given id, if registered.
    pub fn name(&self, id: MaterialId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Total number of registered materials (including air).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ResolvedPalette
// ---------------------------------------------------------------------------

/// A wire palette resolved once per batch.
///
/// Each entry is the registry resolution of the corresponding palette name;
/// unresolved names stay as holes so indexing them yields a skip rather than
/// a substitute material.
pub struct ResolvedPalette {
    entries: Vec<Option<MaterialId>>,
}

impl ResolvedPalette {
    /// Resolve every palette name against the registry.
    pub fn resolve(registry: &MaterialRegistry, names: &[String]) -> Self {
        let entries = names
            .iter()
            .map(|name| registry.resolve_name(name))
            .collect();
        Self { entries }
    }

    /// Material for a payload byte, or `None` if the index is out of range
    /// or the palette entry did not resolve.
    pub fn get(&self, index: u8) -> Option<MaterialId> {
        self.entries.get(usize::from(index)).copied().flatten()
    }

    /// Number of palette entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MaterialFallback
// ---------------------------------------------------------------------------

/// Legacy direct-id table for dense payloads carrying no palette.
///
/// Maps small payload bytes straight to materials; any byte outside the
/// table resolves to the default (stone) for wire compatibility with legacy
/// senders. The table is injectable so deployments can extend or replace
/// the mapping without code changes.
pub struct MaterialFallback {
    entries: FxHashMap<u8, MaterialId>,
    default: MaterialId,
}

impl MaterialFallback {
    /// The builtin legacy table: 0 → air, 1 → stone, 2 → dirt,
    /// 3 → grass_block, 4 → cobblestone, 5 → oak_planks, default stone.
    pub fn legacy(registry: &MaterialRegistry) -> Self {
        let mut entries = FxHashMap::default();
        for (byte, name) in [
            (0u8, "air"),
            (1, "stone"),
            (2, "dirt"),
            (3, "grass_block"),
            (4, "cobblestone"),
            (5, "oak_planks"),
        ] {
            if let Some(id) = registry.resolve_name(name) {
                entries.insert(byte, id);
            }
        }
        let default = registry.resolve_name("stone").unwrap_or(MaterialId::AIR);
        Self { entries, default }
    }

    /// The legacy table with per-byte overrides from configuration.
    ///
    /// Override names that do not resolve against the registry are ignored
    /// with a warning rather than poisoning the table.
    pub fn with_overrides(registry: &MaterialRegistry, overrides: &HashMap<u8, String>) -> Self {
        let mut table = Self::legacy(registry);
        for (byte, name) in overrides {
            match registry.resolve_name(name) {
                Some(id) => {
                    table.entries.insert(*byte, id);
                }
                None => {
                    tracing::warn!(byte, name, "ignoring fallback override for unknown material");
                }
            }
        }
        table
    }

    /// Material for a direct-id payload byte. Never unresolved: bytes outside
    /// the table get the default material.
    pub fn resolve(&self, byte: u8) -> MaterialId {
        self.entries.get(&byte).copied().unwrap_or(self.default)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
