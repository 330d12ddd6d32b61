//! Resource event vocabulary for the bridge event feed

use serde::{Deserialize, Serialize};

/// Event delivered by a resource event feed.
///
/// Delivery is FIFO per resource id; no ordering is guaranteed across
/// different ids, so consumers derive state from the event's payload rather
/// than from incremental deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceEventType {
    ResourceAdded,
    ResourceUpdated,
    ResourceDeleted,
}

impl ResourceEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceEventType::ResourceAdded => "resource_added",
            ResourceEventType::ResourceUpdated => "resource_updated",
            ResourceEventType::ResourceDeleted => "resource_deleted",
        }
    }
}

impl std::fmt::Display for ResourceEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
