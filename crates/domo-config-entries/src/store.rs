//! Configuration record store

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::record::{ConfigRecord, RecordState};

/// Config record errors
#[derive(Debug, Error)]
pub enum ConfigRecordsError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("a record already exists with identity {unique_id}")]
    AlreadyExists { unique_id: String },
}

pub type ConfigRecordsResult<T> = Result<T, ConfigRecordsError>;

/// Store of configuration records with a unique-identity index.
///
/// Persistence of records is the host platform's concern; the store itself
/// is the in-process view the reconciliation core works against.
#[derive(Default)]
pub struct ConfigRecords {
    /// Primary index: record_id -> ConfigRecord
    records: DashMap<String, ConfigRecord>,

    /// Index: unique_id -> record_id
    by_unique_id: DashMap<String, String>,
}

impl ConfigRecords {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_record(&self, record: &ConfigRecord) {
        if let Some(ref unique_id) = record.unique_id {
            self.by_unique_id
                .insert(unique_id.clone(), record.record_id.clone());
        }
        self.records
            .insert(record.record_id.clone(), record.clone());
    }

    fn unindex_record(&self, record: &ConfigRecord) {
        if let Some(ref unique_id) = record.unique_id {
            self.by_unique_id.remove(unique_id);
        }
        self.records.remove(&record.record_id);
    }

    /// Add a new record
    ///
    /// A record whose identity is already claimed is rejected.
    pub fn add(&self, record: ConfigRecord) -> ConfigRecordsResult<ConfigRecord> {
        if let Some(ref unique_id) = record.unique_id {
            if self.get_by_unique_id(unique_id).is_some() {
                return Err(ConfigRecordsError::AlreadyExists {
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_record(&record);
        info!(
            "Added config record: {} [{}]",
            record.title, record.record_id
        );
        Ok(record)
    }

    /// Get a record by id
    pub fn get(&self, record_id: &str) -> Option<ConfigRecord> {
        self.records.get(record_id).map(|r| r.value().clone())
    }

    /// Get a record by endpoint identity
    pub fn get_by_unique_id(&self, unique_id: &str) -> Option<ConfigRecord> {
        self.by_unique_id
            .get(unique_id)
            .and_then(|record_id| self.get(&record_id))
    }

    /// Assign a record's endpoint identity, reindexing it.
    pub fn set_unique_id(
        &self,
        record_id: &str,
        unique_id: &str,
    ) -> ConfigRecordsResult<ConfigRecord> {
        let record = self
            .get(record_id)
            .ok_or_else(|| ConfigRecordsError::NotFound(record_id.to_string()))?;

        self.unindex_record(&record);

        let mut updated = record;
        updated.unique_id = Some(unique_id.to_string());
        updated.modified_at = chrono::Utc::now();

        self.index_record(&updated);
        debug!("Record {} identity set to {}", record_id, unique_id);
        Ok(updated)
    }

    /// Set a record's runtime state.
    ///
    /// Invalid transitions are logged and ignored rather than applied.
    pub fn set_state(&self, record_id: &str, state: RecordState) {
        if let Some(mut record) = self.records.get_mut(record_id) {
            if let Err(err) = record.try_set_state(state) {
                warn!("Record {}: {}", record_id, err);
            } else {
                debug!("Record {} state changed to {:?}", record_id, state);
            }
        }
    }

    /// Remove a record
    pub fn remove(&self, record_id: &str) -> ConfigRecordsResult<ConfigRecord> {
        let record = self
            .get(record_id)
            .ok_or_else(|| ConfigRecordsError::NotFound(record_id.to_string()))?;

        self.unindex_record(&record);
        info!(
            "Removed config record: {} [{}]",
            record.title, record_id
        );
        Ok(record)
    }

    /// All record ids
    pub fn record_ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = ConfigRecord> + '_ {
        self.records.iter().map(|r| r.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;

    #[test]
    fn test_add_and_get() {
        let store = ConfigRecords::new();
        let record = store
            .add(ConfigRecord::new("10.0.0.5", 2000))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&record.record_id).unwrap().host, "10.0.0.5");
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let store = ConfigRecords::new();
        store
            .add(ConfigRecord::new("a", 1).with_unique_id("a:1"))
            .unwrap();

        let result = store.add(ConfigRecord::new("a", 1).with_unique_id("a:1"));
        assert!(matches!(
            result,
            Err(ConfigRecordsError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_set_unique_id_reindexes() {
        let store = ConfigRecords::new();
        let record = store
            .add(ConfigRecord::new("a", 1).with_unique_id("old"))
            .unwrap();

        store.set_unique_id(&record.record_id, "new").unwrap();

        assert!(store.get_by_unique_id("old").is_none());
        assert_eq!(
            store.get_by_unique_id("new").unwrap().record_id,
            record.record_id
        );
    }

    #[test]
    fn test_remove_clears_identity_index() {
        let store = ConfigRecords::new();
        let record = store
            .add(ConfigRecord::new("a", 1).with_unique_id("a:1"))
            .unwrap();

        store.remove(&record.record_id).unwrap();
        assert!(store.get_by_unique_id("a:1").is_none());
        assert!(store.is_empty());

        let err = store.remove(&record.record_id).unwrap_err();
        assert!(matches!(err, ConfigRecordsError::NotFound(_)));
    }

    #[test]
    fn test_set_state_ignores_invalid_transition() {
        let store = ConfigRecords::new();
        let record = store
            .add(ConfigRecord::new("a", 1).with_source(RecordSource::Import))
            .unwrap();

        // NotLoaded -> Loaded is invalid and must be ignored
        store.set_state(&record.record_id, RecordState::Loaded);
        assert_eq!(
            store.get(&record.record_id).unwrap().state,
            RecordState::NotLoaded
        );

        store.set_state(&record.record_id, RecordState::SetupInProgress);
        store.set_state(&record.record_id, RecordState::Loaded);
        assert_eq!(
            store.get(&record.record_id).unwrap().state,
            RecordState::Loaded
        );
    }
}
