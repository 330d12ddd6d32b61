//! Device Registry
//!
//! Tracks the local projections of remote device resources, keyed by a
//! stable `(namespace, remote id)` identifier and indexed by the
//! configuration record that owns them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{RegistryError, RegistryResult};

/// A device identifier (namespace, remote id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifier(pub String, pub String);

impl DeviceIdentifier {
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self(namespace.into(), id.into())
    }

    pub fn namespace(&self) -> &str {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.1
    }

    /// Create a key for indexing.
    pub fn key(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

/// Fields merged into a device entry on upsert.
///
/// `Some` fields overwrite; `None` descriptive fields are left untouched.
/// The area binding is the exception: it is assigned unconditionally, so an
/// upsert without a resolved area clears a stale binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFields {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub model_id: Option<String>,
    pub sw_version: Option<String>,
    pub hw_version: Option<String>,
    pub serial_number: Option<String>,
    pub area_id: Option<String>,
}

/// A registered device entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Internal UUID
    pub id: String,

    /// Stable identifier of the remote device
    pub identifier: DeviceIdentifier,

    /// Configuration record this device belongs to
    pub record_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    /// Assigned area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl DeviceEntry {
    fn new(record_id: &str, identifier: DeviceIdentifier) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            identifier,
            record_id: record_id.to_string(),
            name: None,
            manufacturer: None,
            model: None,
            model_id: None,
            sw_version: None,
            hw_version: None,
            serial_number: None,
            area_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    fn apply(&mut self, fields: DeviceFields) {
        if fields.name.is_some() {
            self.name = fields.name;
        }
        if fields.manufacturer.is_some() {
            self.manufacturer = fields.manufacturer;
        }
        if fields.model.is_some() {
            self.model = fields.model;
        }
        if fields.model_id.is_some() {
            self.model_id = fields.model_id;
        }
        if fields.sw_version.is_some() {
            self.sw_version = fields.sw_version;
        }
        if fields.hw_version.is_some() {
            self.hw_version = fields.hw_version;
        }
        if fields.serial_number.is_some() {
            self.serial_number = fields.serial_number;
        }
        self.area_id = fields.area_id;
    }

    /// Display name, falling back to the remote id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.identifier.id())
    }
}

/// Device Registry
///
/// Provides O(1) lookups by:
/// - id (primary)
/// - identifier key
/// - record_id (multi)
///
/// Entries are stored as `Arc<DeviceEntry>` to avoid cloning on reads.
#[derive(Default)]
pub struct DeviceRegistry {
    /// Primary index: device_id -> DeviceEntry (Arc-wrapped)
    by_id: DashMap<String, Arc<DeviceEntry>>,

    /// Index: identifier key -> device_id
    by_identifier: DashMap<String, String>,

    /// Index: record_id -> set of device_ids
    by_record: DashMap<String, HashSet<String>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_entry(&self, entry: Arc<DeviceEntry>) {
        let device_id = entry.id.clone();
        self.by_identifier
            .insert(entry.identifier.key(), device_id.clone());
        self.by_record
            .entry(entry.record_id.clone())
            .or_default()
            .insert(device_id.clone());
        self.by_id.insert(device_id, entry);
    }

    fn unindex_entry(&self, entry: &DeviceEntry) {
        self.by_identifier.remove(&entry.identifier.key());
        if let Some(mut ids) = self.by_record.get_mut(&entry.record_id) {
            ids.remove(&entry.id);
        }
        self.by_id.remove(&entry.id);
    }

    /// Get device by ID
    ///
    /// Returns an `Arc<DeviceEntry>` - cheap to clone.
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        self.by_id.get(device_id).map(|r| Arc::clone(r.value()))
    }

    /// Get device by identifier
    pub fn get_by_identifier(&self, namespace: &str, id: &str) -> Option<Arc<DeviceEntry>> {
        let key = format!("{}:{}", namespace, id);
        self.by_identifier
            .get(&key)
            .and_then(|device_id| self.get(&device_id))
    }

    /// Get all devices owned by a configuration record
    pub fn entries_for_record(&self, record_id: &str) -> Vec<Arc<DeviceEntry>> {
        self.by_record
            .get(record_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Create or update a device by its identifier, merging fields.
    ///
    /// Returns the resulting entry as `Arc<DeviceEntry>`. `modified_at` only
    /// moves when a field actually changed.
    pub fn upsert(
        &self,
        record_id: &str,
        identifier: DeviceIdentifier,
        fields: DeviceFields,
    ) -> Arc<DeviceEntry> {
        if let Some(existing) = self.get_by_identifier(identifier.namespace(), identifier.id()) {
            // Remove first, then re-index the updated entry
            self.unindex_entry(&existing);
            let mut entry = (*existing).clone();
            let before = entry.clone();
            entry.apply(fields);
            if entry.name != before.name
                || entry.manufacturer != before.manufacturer
                || entry.model != before.model
                || entry.model_id != before.model_id
                || entry.sw_version != before.sw_version
                || entry.hw_version != before.hw_version
                || entry.serial_number != before.serial_number
                || entry.area_id != before.area_id
            {
                entry.modified_at = Utc::now();
            }
            let arc_entry = Arc::new(entry);
            self.index_entry(Arc::clone(&arc_entry));
            debug!(device_id = %arc_entry.id, "Updated device");
            return arc_entry;
        }

        let mut entry = DeviceEntry::new(record_id, identifier);
        entry.apply(fields);
        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));
        info!(
            "Registered new device: {:?} ({})",
            arc_entry.name, arc_entry.id
        );
        arc_entry
    }

    /// Update a device entry
    pub fn update<F>(&self, device_id: &str, f: F) -> RegistryResult<Arc<DeviceEntry>>
    where
        F: FnOnce(&mut DeviceEntry),
    {
        if let Some((_, arc_entry)) = self.by_id.remove(device_id) {
            self.by_identifier.remove(&arc_entry.identifier.key());
            if let Some(mut ids) = self.by_record.get_mut(&arc_entry.record_id) {
                ids.remove(&arc_entry.id);
            }

            let mut entry = (*arc_entry).clone();
            let before = entry.clone();
            f(&mut entry);
            if entry.area_id != before.area_id
                || entry.name != before.name
                || entry.identifier != before.identifier
            {
                entry.modified_at = Utc::now();
            }

            let new_arc = Arc::new(entry);
            self.index_entry(Arc::clone(&new_arc));
            Ok(new_arc)
        } else {
            Err(RegistryError::NotFound(device_id.to_string()))
        }
    }

    /// Remove a device
    pub fn remove(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        if let Some((_, arc_entry)) = self.by_id.remove(device_id) {
            self.unindex_entry(&arc_entry);
            info!("Removed device: {}", device_id);
            Some(arc_entry)
        } else {
            None
        }
    }

    /// Remove a device by its identifier
    pub fn remove_by_identifier(&self, namespace: &str, id: &str) -> Option<Arc<DeviceEntry>> {
        let device_id = self
            .get_by_identifier(namespace, id)
            .map(|entry| entry.id.clone())?;
        self.remove(&device_id)
    }

    /// Remove every device owned by a configuration record.
    ///
    /// Returns the removed device ids.
    pub fn clear_record(&self, record_id: &str) -> Vec<String> {
        let device_ids: Vec<String> = self
            .entries_for_record(record_id)
            .iter()
            .map(|d| d.id.clone())
            .collect();

        for device_id in &device_ids {
            self.remove(device_id);
        }
        device_ids
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = Arc<DeviceEntry>> + '_ {
        self.by_id.iter().map(|r| Arc::clone(r.value()))
    }
}
