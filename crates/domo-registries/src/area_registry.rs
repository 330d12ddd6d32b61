//! Area Registry
//!
//! Tracks areas (rooms, zones) by name. Names are the natural key: an area
//! is upserted by name and never duplicated by recreation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{RegistryError, RegistryResult};

/// A registered area entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaEntry {
    /// Internal ULID
    pub id: String,

    /// Area name (e.g., "Living Room")
    pub name: String,

    /// Normalized name for lookups
    pub normalized_name: String,

    /// Area icon (e.g., "mdi:sofa")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Floor this area belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl AreaEntry {
    fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            normalized_name: normalize_name(&name),
            name,
            icon: None,
            floor_id: None,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Normalize a name for lookups
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .trim()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ', "")
}

/// Area Registry
///
/// Entries are stored as `Arc<AreaEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct AreaRegistry {
    /// Primary index: area_id -> AreaEntry (Arc-wrapped)
    by_id: DashMap<String, Arc<AreaEntry>>,

    /// Index: normalized_name -> area_id
    by_name: DashMap<String, String>,

    /// Index: floor_id -> set of area_ids
    by_floor_id: DashMap<String, HashSet<String>>,
}

impl AreaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<AreaEntry>) {
        let area_id = entry.id.clone();
        self.by_name
            .insert(entry.normalized_name.clone(), area_id.clone());
        if let Some(ref floor_id) = entry.floor_id {
            self.by_floor_id
                .entry(floor_id.clone())
                .or_default()
                .insert(area_id.clone());
        }
        self.by_id.insert(area_id, entry);
    }

    fn unindex_entry(&self, entry: &AreaEntry) {
        self.by_name.remove(&entry.normalized_name);
        if let Some(ref floor_id) = entry.floor_id {
            if let Some(mut ids) = self.by_floor_id.get_mut(floor_id) {
                ids.remove(&entry.id);
            }
        }
        self.by_id.remove(&entry.id);
    }

    /// Get area by ID
    pub fn get(&self, area_id: &str) -> Option<Arc<AreaEntry>> {
        self.by_id.get(area_id).map(|r| Arc::clone(r.value()))
    }

    /// Get area by name (case- and punctuation-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<Arc<AreaEntry>> {
        let normalized = normalize_name(name);
        self.by_name
            .get(&normalized)
            .and_then(|area_id| self.get(&area_id))
    }

    /// Get all areas on a floor
    pub fn get_by_floor_id(&self, floor_id: &str) -> Vec<Arc<AreaEntry>> {
        self.by_floor_id
            .get(floor_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Create a new area
    pub fn create(&self, name: &str) -> Arc<AreaEntry> {
        let entry = AreaEntry::new(name);
        let arc_entry = Arc::new(entry);
        info!("Created area: {} ({})", name, arc_entry.id);
        self.index_entry(Arc::clone(&arc_entry));
        arc_entry
    }

    /// Update an area
    ///
    /// Renaming onto another area's name is a `NameConflict`.
    pub fn update<F>(&self, area_id: &str, f: F) -> RegistryResult<Arc<AreaEntry>>
    where
        F: FnOnce(&mut AreaEntry),
    {
        // Remove first to avoid deadlock
        if let Some((_, arc_entry)) = self.by_id.remove(area_id) {
            self.by_name.remove(&arc_entry.normalized_name);
            if let Some(ref floor_id) = arc_entry.floor_id {
                if let Some(mut ids) = self.by_floor_id.get_mut(floor_id) {
                    ids.remove(&arc_entry.id);
                }
            }

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
                || entry.icon != before.icon
                || entry.floor_id != before.floor_id;
            if changed {
                entry.modified_at = Utc::now();
            }

            let new_arc = Arc::new(entry);
            self.index_entry(Arc::clone(&new_arc));
            Ok(new_arc)
        } else {
            Err(RegistryError::NotFound(area_id.to_string()))
        }
    }

    /// Remove an area
    pub fn remove(&self, area_id: &str) -> Option<Arc<AreaEntry>> {
        if let Some((_, arc_entry)) = self.by_id.remove(area_id) {
            self.unindex_entry(&arc_entry);
            info!("Removed area: {}", area_id);
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

    /// Iterate over all areas
    pub fn iter(&self) -> impl Iterator<Item = Arc<AreaEntry>> + '_ {
        self.by_id.iter().map(|r| Arc::clone(r.value()))
    }
}
