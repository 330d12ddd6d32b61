//! Entity Registry
//!
//! Tracks registered entities with unique-id tracking, device linking, and
//! generated `domain.object_id` entity ids.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{slugify, RegistryError, RegistryResult};

/// A registered entity entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Internal UUID
    pub id: String,

    /// Full entity ID (domain.object_id)
    pub entity_id: String,

    /// Platform-specific unique identifier (the remote resource id)
    pub unique_id: String,

    /// Component/platform that provides this entity
    pub platform: String,

    /// Parent device ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Configuration record that created this entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Assigned area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,

    /// User-set name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Platform default name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl EntityEntry {
    /// Domain part of the entity_id
    pub fn domain(&self) -> &str {
        self.entity_id.split('.').next().unwrap_or("")
    }

    /// Object id part of the entity_id
    pub fn object_id(&self) -> &str {
        self.entity_id.split('.').nth(1).unwrap_or("")
    }
}

/// Entity Registry
///
/// Provides O(1) lookups by:
/// - entity_id (primary)
/// - unique_id
/// - device_id (multi)
/// - record_id (multi)
///
/// Entries are stored as `Arc<EntityEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct EntityRegistry {
    /// Primary index: entity_id -> EntityEntry (Arc-wrapped)
    by_entity_id: DashMap<String, Arc<EntityEntry>>,

    /// Index: unique_id -> entity_id
    by_unique_id: DashMap<String, String>,

    /// Index: device_id -> set of entity_ids
    by_device: DashMap<String, HashSet<String>>,

    /// Index: record_id -> set of entity_ids
    by_record: DashMap<String, HashSet<String>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<EntityEntry>) {
        let entity_id = entry.entity_id.clone();
        self.by_unique_id
            .insert(entry.unique_id.clone(), entity_id.clone());
        if let Some(ref device_id) = entry.device_id {
            self.by_device
                .entry(device_id.clone())
                .or_default()
                .insert(entity_id.clone());
        }
        if let Some(ref record_id) = entry.record_id {
            self.by_record
                .entry(record_id.clone())
                .or_default()
                .insert(entity_id.clone());
        }
        self.by_entity_id.insert(entity_id, entry);
    }

    fn unindex_entry(&self, entry: &EntityEntry) {
        self.by_unique_id.remove(&entry.unique_id);
        if let Some(ref device_id) = entry.device_id {
            if let Some(mut ids) = self.by_device.get_mut(device_id) {
                ids.remove(&entry.entity_id);
            }
        }
        if let Some(ref record_id) = entry.record_id {
            if let Some(mut ids) = self.by_record.get_mut(record_id) {
                ids.remove(&entry.entity_id);
            }
        }
        self.by_entity_id.remove(&entry.entity_id);
    }

    /// Get entity by entity_id
    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.by_entity_id
            .get(entity_id)
            .map(|r| Arc::clone(r.value()))
    }

    /// Get entity by unique_id
    pub fn get_by_unique_id(&self, unique_id: &str) -> Option<Arc<EntityEntry>> {
        self.by_unique_id
            .get(unique_id)
            .and_then(|entity_id| self.get(&entity_id))
    }

    /// Get all entities attached to a device
    pub fn entries_for_device(&self, device_id: &str) -> Vec<Arc<EntityEntry>> {
        self.by_device
            .get(device_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get all entities created by a configuration record
    pub fn entries_for_record(&self, record_id: &str) -> Vec<Arc<EntityEntry>> {
        self.by_record
            .get(record_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Register or fetch the entity bound to a unique id.
    ///
    /// Generates an entity_id of the form `domain.object_id` from the
    /// suggested name, suffixing on collision.
    #[allow(clippy::too_many_arguments)]
    pub fn get_or_create(
        &self,
        platform: &str,
        domain: &str,
        suggested_name: &str,
        unique_id: &str,
        device_id: Option<&str>,
        record_id: Option<&str>,
        original_name: Option<&str>,
    ) -> Arc<EntityEntry> {
        if let Some(existing) = self.get_by_unique_id(unique_id) {
            debug!("Found existing entity by unique_id: {}", existing.entity_id);
            return existing;
        }

        let entity_id = self.generate_entity_id(domain, suggested_name);
        let now = Utc::now();
        let entry = EntityEntry {
            id: uuid::Uuid::new_v4().simple().to_string(),
            entity_id: entity_id.clone(),
            unique_id: unique_id.to_string(),
            platform: platform.to_string(),
            device_id: device_id.map(|s| s.to_string()),
            record_id: record_id.map(|s| s.to_string()),
            area_id: None,
            name: None,
            original_name: original_name.map(|s| s.to_string()),
            created_at: now,
            modified_at: now,
        };

        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));
        info!("Registered new entity: {}", entity_id);
        arc_entry
    }

    /// Generate a free entity_id from a domain and suggested name
    fn generate_entity_id(&self, domain: &str, suggested_name: &str) -> String {
        let object_id = slugify(suggested_name);
        let base = format!("{}.{}", domain, object_id);
        if !self.by_entity_id.contains_key(&base) {
            return base;
        }
        let mut tries = 2;
        loop {
            let candidate = format!("{}_{}", base, tries);
            if !self.by_entity_id.contains_key(&candidate) {
                return candidate;
            }
            tries += 1;
        }
    }

    /// Update an entity entry
    pub fn update<F>(&self, entity_id: &str, f: F) -> RegistryResult<Arc<EntityEntry>>
    where
        F: FnOnce(&mut EntityEntry),
    {
        // Remove first to avoid deadlock
        if let Some((_, arc_entry)) = self.by_entity_id.remove(entity_id) {
            self.by_unique_id.remove(&arc_entry.unique_id);
            if let Some(ref device_id) = arc_entry.device_id {
                if let Some(mut ids) = self.by_device.get_mut(device_id) {
                    ids.remove(&arc_entry.entity_id);
                }
            }
            if let Some(ref record_id) = arc_entry.record_id {
                if let Some(mut ids) = self.by_record.get_mut(record_id) {
                    ids.remove(&arc_entry.entity_id);
                }
            }

            let mut entry = (*arc_entry).clone();
            let before = entry.clone();
            f(&mut entry);
            let changed = entry.area_id != before.area_id
                || entry.name != before.name
                || entry.device_id != before.device_id;
            if changed {
                entry.modified_at = Utc::now();
            }

            let new_arc = Arc::new(entry);
            self.index_entry(Arc::clone(&new_arc));
            Ok(new_arc)
        } else {
            Err(RegistryError::NotFound(entity_id.to_string()))
        }
    }

    /// Remove an entity
    pub fn remove(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        if let Some((_, arc_entry)) = self.by_entity_id.remove(entity_id) {
            self.unindex_entry(&arc_entry);
            info!("Removed entity: {}", entity_id);
            Some(arc_entry)
        } else {
            None
        }
    }

    /// Check whether an entity_id is registered
    pub fn is_registered(&self, entity_id: &str) -> bool {
        self.by_entity_id.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.by_entity_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity_id.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = Arc<EntityEntry>> + '_ {
        self.by_entity_id.iter().map(|r| Arc::clone(r.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_keyed_by_unique_id() {
        let registry = EntityRegistry::new();

        let first = registry.get_or_create("domo", "light", "Hall", "res-1", None, None, None);
        let again = registry.get_or_create("domo", "light", "Hall", "res-1", None, None, None);

        assert_eq!(first.entity_id, again.entity_id);
        assert_eq!(registry.len(), 1);
        assert_eq!(first.entity_id, "light.hall");
    }

    #[test]
    fn test_entity_id_collision_gets_suffix() {
        let registry = EntityRegistry::new();

        let a = registry.get_or_create("domo", "light", "Hall", "res-1", None, None, None);
        let b = registry.get_or_create("domo", "light", "Hall", "res-2", None, None, None);

        assert_eq!(a.entity_id, "light.hall");
        assert_eq!(b.entity_id, "light.hall_2");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_area_assignment_update() {
        let registry = EntityRegistry::new();
        let entry = registry.get_or_create("domo", "switch", "Pump", "res-9", None, None, None);

        let updated = registry
            .update(&entry.entity_id, |e| e.area_id = Some("area-1".to_string()))
            .unwrap();
        assert_eq!(updated.area_id.as_deref(), Some("area-1"));
    }

    #[test]
    fn test_remove_clears_unique_id_index() {
        let registry = EntityRegistry::new();
        let entry = registry.get_or_create("domo", "sensor", "Temp", "res-3", None, None, None);

        registry.remove(&entry.entity_id);
        assert!(registry.get_by_unique_id("res-3").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_device_index() {
        let registry = EntityRegistry::new();
        registry.get_or_create("domo", "light", "A", "res-a", Some("dev-1"), None, None);
        registry.get_or_create("domo", "light", "B", "res-b", Some("dev-1"), None, None);
        registry.get_or_create("domo", "light", "C", "res-c", Some("dev-2"), None, None);

        assert_eq!(registry.entries_for_device("dev-1").len(), 2);
        assert_eq!(registry.entries_for_device("dev-2").len(), 1);
    }
}
