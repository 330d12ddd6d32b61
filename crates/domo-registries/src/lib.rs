//! Domo registries
//!
//! In-memory registries for the local projections of the remote bridge
//! graph:
//! - Devices (DeviceRegistry)
//! - Areas (AreaRegistry)
//! - Floors (FloorRegistry)
//! - Entities (EntityRegistry)
//!
//! Registries are the host platform's durable store from the reconciliation
//! core's point of view; the core itself persists nothing. All registries
//! are mutated from a single reconciliation task sequence per connection,
//! so the concurrent maps here are about safe sharing, not about multiple
//! writers.

pub mod area_registry;
pub mod device_registry;
pub mod entity_registry;
pub mod floor_registry;

pub use area_registry::{AreaEntry, AreaRegistry};
pub use device_registry::{DeviceEntry, DeviceFields, DeviceIdentifier, DeviceRegistry};
pub use entity_registry::{EntityEntry, EntityRegistry};
pub use floor_registry::{FloorEntry, FloorRegistry};

use thiserror::Error;

/// Errors raised by registry writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("the name {0} is already in use")]
    NameConflict(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Slugify a name for use as an id.
pub(crate) fn slugify(name: &str) -> String {
    let mut result = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }
    result.trim_end_matches('_').to_string()
}

/// All registries bundled together.
#[derive(Default)]
pub struct Registries {
    pub devices: DeviceRegistry,
    pub areas: AreaRegistry,
    pub floors: FloorRegistry,
    pub entities: EntityRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registries_bundle() {
        let registries = Registries::new();

        let floor = registries.floors.create("Ground Floor", Some(0)).unwrap();
        let area = registries.areas.create("Living Room");
        registries
            .areas
            .update(&area.id, |a| a.floor_id = Some(floor.id.clone()))
            .unwrap();

        let device = registries.devices.upsert(
            "record-1",
            DeviceIdentifier::new("domo", "dev-1"),
            DeviceFields {
                name: Some("Relay Module".to_string()),
                area_id: Some(area.id.clone()),
                ..Default::default()
            },
        );

        let entity = registries.entities.get_or_create(
            "domo",
            "light",
            "Relay Light",
            "light-1",
            Some(device.id.as_str()),
            Some("record-1"),
            Some("Relay Light"),
        );

        assert_eq!(registries.floors.len(), 1);
        assert_eq!(registries.areas.len(), 1);
        assert_eq!(registries.devices.len(), 1);
        assert_eq!(registries.entities.len(), 1);
        assert_eq!(entity.device_id.as_deref(), Some(device.id.as_str()));
        assert_eq!(
            registries.areas.get_by_name("living room").unwrap().floor_id,
            Some(floor.id.clone())
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Ground Floor"), "ground_floor");
        assert_eq!(slugify("  Weird -- name! "), "weird_name");
        assert_eq!(slugify("ÜberZone"), "überzone");
    }
}
