//! Configuration record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provisioning source of a configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Configured by the user
    #[default]
    User,
    /// Imported from an existing configuration
    Import,
    /// Placeholder created when the user ignored a discovered endpoint
    Ignore,
}

/// Runtime lifecycle state of a record (not persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Currently being set up
    SetupInProgress,
    /// Successfully set up
    Loaded,
    /// Setup failed; safe to retry
    SetupError,
    /// Currently unloading
    UnloadInProgress,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid state transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: RecordState,
    pub to: RecordState,
}

impl RecordState {
    /// Check if the record can be unloaded/reloaded from this state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecordState::NotLoaded | RecordState::Loaded | RecordState::SetupError
        )
    }

    /// Attempt a transition to a new state.
    pub fn try_transition(self, to: RecordState) -> Result<RecordState, InvalidTransition> {
        use RecordState::*;

        let valid = matches!(
            (self, to),
            (NotLoaded, SetupInProgress)
                | (SetupInProgress, Loaded)
                | (SetupInProgress, SetupError)
                | (SetupError, SetupInProgress)
                | (SetupError, UnloadInProgress)
                | (Loaded, UnloadInProgress)
                | (UnloadInProgress, NotLoaded)
        );

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

/// A configuration record binding one bridge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Unique identifier (ULID)
    pub record_id: String,

    /// Human-readable display name
    pub title: String,

    /// Bridge host
    pub host: String,

    /// Bridge port
    pub port: u16,

    /// Opaque remote config payload; only the bridge client interprets it
    #[serde(default)]
    pub config: serde_json::Value,

    /// Stable endpoint identity, assigned once a connection succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Origin type
    #[serde(default)]
    pub source: RecordSource,

    /// Current lifecycle state (not persisted)
    #[serde(skip, default)]
    pub state: RecordState,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl ConfigRecord {
    /// Create a new record for an endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let now = Utc::now();
        Self {
            record_id: ulid::Ulid::new().to_string(),
            title: format!("{}:{}", host, port),
            host,
            port,
            config: serde_json::Value::Null,
            unique_id: None,
            source: RecordSource::User,
            state: RecordState::NotLoaded,
            created_at: now,
            modified_at: now,
        }
    }

    /// Set the config payload
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Set the endpoint identity
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: RecordSource) -> Self {
        self.source = source;
        self
    }

    /// Whether this record is an ignored placeholder
    pub fn is_ignored(&self) -> bool {
        self.source == RecordSource::Ignore
    }

    /// Whether the record is loaded
    pub fn is_loaded(&self) -> bool {
        self.state == RecordState::Loaded
    }

    /// Attempt to transition to a new state with validation.
    pub fn try_set_state(&mut self, new_state: RecordState) -> Result<(), InvalidTransition> {
        self.state = self.state.try_transition(new_state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_new() {
        let record = ConfigRecord::new("10.0.0.5", 2000);
        assert_eq!(record.title, "10.0.0.5:2000");
        assert_eq!(record.state, RecordState::NotLoaded);
        assert_eq!(record.source, RecordSource::User);
        assert!(record.unique_id.is_none());
        assert!(!record.record_id.is_empty());
    }

    #[test]
    fn test_record_builder() {
        let record = ConfigRecord::new("10.0.0.5", 2000)
            .with_config(json!({"lights": []}))
            .with_unique_id("10.0.0.5:2000")
            .with_source(RecordSource::Ignore);

        assert!(record.is_ignored());
        assert_eq!(record.unique_id.as_deref(), Some("10.0.0.5:2000"));
        assert_eq!(record.config["lights"], json!([]));
    }

    #[test]
    fn test_state_transitions() {
        use RecordState::*;

        let mut record = ConfigRecord::new("h", 1);
        record.try_set_state(SetupInProgress).unwrap();
        record.try_set_state(Loaded).unwrap();
        record.try_set_state(UnloadInProgress).unwrap();
        record.try_set_state(NotLoaded).unwrap();

        // Cannot jump straight to Loaded
        let err = record.try_set_state(Loaded).unwrap_err();
        assert_eq!(err.from, NotLoaded);
        assert_eq!(err.to, Loaded);
    }

    #[test]
    fn test_recoverable_states() {
        assert!(RecordState::NotLoaded.is_recoverable());
        assert!(RecordState::Loaded.is_recoverable());
        assert!(RecordState::SetupError.is_recoverable());
        assert!(!RecordState::SetupInProgress.is_recoverable());
        assert!(!RecordState::UnloadInProgress.is_recoverable());
    }

    #[test]
    fn test_serde_skips_runtime_state() {
        let mut record = ConfigRecord::new("h", 1);
        record.state = RecordState::Loaded;

        let json = serde_json::to_string(&record).unwrap();
        let parsed: ConfigRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.state, RecordState::NotLoaded);
    }
}
