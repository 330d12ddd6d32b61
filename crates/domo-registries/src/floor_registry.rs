//! Floor Registry
//!
//! Tracks floors by name, with slugified ids and an optional level.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{slugify, RegistryError, RegistryResult};

/// A registered floor entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorEntry {
    /// Slugified id derived from the name
    pub id: String,

    /// Floor name (e.g., "Ground Floor", "First Floor")
    pub name: String,

    /// Normalized name for lookups
    pub normalized_name: String,

    /// Floor level (None = unset, 0 = ground, positive = above, negative = below)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,

    /// Floor icon (e.g., "mdi:home-floor-1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl FloorEntry {
    fn new(id: impl Into<String>, name: impl Into<String>, level: Option<i32>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: id.into(),
            normalized_name: normalize_name(&name),
            name,
            level,
            icon: None,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Normalize a name by removing whitespace and case folding
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Floor Registry
///
/// Entries are stored as `Arc<FloorEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct FloorRegistry {
    /// Primary index: floor_id -> FloorEntry (Arc-wrapped)
    by_id: DashMap<String, Arc<FloorEntry>>,

    /// Index: normalized_name -> floor_id
    by_name: DashMap<String, String>,
}

impl FloorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<FloorEntry>) {
        let floor_id = entry.id.clone();
        self.by_name
            .insert(entry.normalized_name.clone(), floor_id.clone());
        self.by_id.insert(floor_id, entry);
    }

    fn unindex_entry(&self, entry: &FloorEntry) {
        self.by_name.remove(&entry.normalized_name);
        self.by_id.remove(&entry.id);
    }

    /// Get floor by ID
    pub fn get(&self, floor_id: &str) -> Option<Arc<FloorEntry>> {
        self.by_id.get(floor_id).map(|r| Arc::clone(r.value()))
    }

    /// Get floor by name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<FloorEntry>> {
        let normalized = normalize_name(name);
        self.by_name
            .get(&normalized)
            .and_then(|floor_id| self.get(&floor_id))
    }

    /// Create a new floor
    ///
    /// A duplicate name is a `NameConflict`.
    pub fn create(&self, name: &str, level: Option<i32>) -> RegistryResult<Arc<FloorEntry>> {
        let normalized = normalize_name(name);
        if self.by_name.contains_key(&normalized) {
            return Err(RegistryError::NameConflict(name.to_string()));
        }

        let id = self.generate_id(name);
        let entry = FloorEntry::new(id, name, level);
        let arc_entry = Arc::new(entry);
        info!(
            "Created floor: {} (level {:?}, {})",
            name, level, arc_entry.id
        );
        self.index_entry(Arc::clone(&arc_entry));
        Ok(arc_entry)
    }

    /// Generate a unique ID from a name (slugified, with suffix for conflicts)
    fn generate_id(&self, name: &str) -> String {
        let base = slugify(name);
        if !self.by_id.contains_key(&base) {
            return base;
        }
        let mut tries = 2;
        loop {
            let candidate = format!("{}_{}", base, tries);
            if !self.by_id.contains_key(&candidate) {
                return candidate;
            }
            tries += 1;
        }
    }

    /// Update a floor
    ///
    /// Renaming onto another floor's name is a `NameConflict`. `modified_at`
    /// only moves when the entry actually changed.
    pub fn update<F>(&self, floor_id: &str, f: F) -> RegistryResult<Arc<FloorEntry>>
    where
        F: FnOnce(&mut FloorEntry),
    {
        // Remove first to avoid deadlock
        if let Some((_, arc_entry)) = self.by_id.remove(floor_id) {
            self.by_name.remove(&arc_entry.normalized_name);

            let mut entry = (*arc_entry).clone();
            let before = entry.clone();
            f(&mut entry);
            entry.normalized_name = normalize_name(&entry.name);

            if entry.name != before.name && self.by_name.contains_key(&entry.normalized_name) {
                // Name conflict - restore the old entry
                self.index_entry(arc_entry);
                return Err(RegistryError::NameConflict(entry.name));
            }

            let changed = entry.name != before.name
                || entry.level != before.level
                || entry.icon != before.icon;
            if changed {
                entry.modified_at = Utc::now();
            }

            let new_arc = Arc::new(entry);
            self.index_entry(Arc::clone(&new_arc));
            Ok(new_arc)
        } else {
            Err(RegistryError::NotFound(floor_id.to_string()))
        }
    }

    /// Remove a floor
    pub fn remove(&self, floor_id: &str) -> Option<Arc<FloorEntry>> {
        if let Some((_, arc_entry)) = self.by_id.remove(floor_id) {
            self.unindex_entry(&arc_entry);
            info!("Removed floor: {}", floor_id);
            Some(arc_entry)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over all floors
    pub fn iter(&self) -> impl Iterator<Item = Arc<FloorEntry>> + '_ {
        self.by_id.iter().map(|r| Arc::clone(r.value()))
    }
}
