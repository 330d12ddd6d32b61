//! Device/area/floor graph synchronization
//!
//! One reconciliation cycle upserts every floor, area, and device the
//! bridge currently knows, then prunes device records no longer present.
//! Upserts fully settle before pruning is evaluated, so removal can never
//! race ahead of addition within one cycle. A standing subscription on the
//! device feed keeps the graph live afterwards.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use domo_client::{BridgeClient, Subscription};
use domo_core::{DeviceMeta, Resource, ResourceEventType, ResourceMeta};
use domo_registries::{DeviceEntry, DeviceFields, DeviceIdentifier, Registries, RegistryResult};

use crate::error::SetupResult;
use crate::DOMAIN;

/// Run the one-shot structural sync, then install the standing device
/// subscription for the rest of the connection's life.
///
/// Registry-write failures abort the cycle; upserts already committed in
/// the same cycle stay committed. A missing area or floor reference
/// resolves to "no binding" rather than failing the cycle.
pub fn sync_structure(
    client: &Arc<BridgeClient>,
    record_id: &str,
    registries: &Arc<Registries>,
) -> SetupResult<Subscription> {
    sync_floors(client, registries)?;
    sync_areas(client, registries)?;

    let mut touched: HashSet<String> = HashSet::new();
    for resource in client.devices().resources() {
        let entry = upsert_device(registries, record_id, &resource);
        touched.insert(entry.id.clone());
    }

    // Prune pass, after all upserts have settled.
    for entry in registries.devices.entries_for_record(record_id) {
        if !touched.contains(&entry.id) {
            info!(device_id = %entry.id, "Pruning device no longer present on the bridge");
            registries.devices.remove(&entry.id);
        }
    }
    debug!(
        record_id,
        devices = touched.len(),
        "Structural sync complete"
    );

    let registries = Arc::clone(registries);
    let record_id = record_id.to_string();
    let subscription = client.devices().subscribe(
        Arc::new(move |event, resource| {
            if event == ResourceEventType::ResourceDeleted {
                registries
                    .devices
                    .remove_by_identifier(DOMAIN, resource.id.as_str());
            } else {
                upsert_device(&registries, &record_id, resource);
            }
        }),
        None,
        None,
    );
    Ok(subscription)
}

/// Upsert floors by name: create when absent, otherwise update level and
/// icon in place. Names are the stable key; floors are never duplicated by
/// recreation.
fn sync_floors(client: &BridgeClient, registries: &Registries) -> RegistryResult<()> {
    for resource in client.floors().resources() {
        let name = resource.display_name();
        let (level, icon) = match &resource.meta {
            ResourceMeta::Floor(meta) => (meta.level, meta.icon.clone()),
            _ => (None, None),
        };

        let floor_id = match registries.floors.get_by_name(name) {
            Some(floor) => floor.id.clone(),
            None => registries.floors.create(name, level)?.id.clone(),
        };
        registries.floors.update(&floor_id, |f| {
            f.level = level;
            f.icon = icon;
        })?;
    }
    Ok(())
}

/// Upsert areas by name and resolve their floor binding. An area without a
/// declared floor, or with a floor name that does not resolve, ends up
/// unbound.
fn sync_areas(client: &BridgeClient, registries: &Registries) -> RegistryResult<()> {
    for resource in client.areas().resources() {
        let name = resource.display_name();
        let (icon, floor_name) = match &resource.meta {
            ResourceMeta::Area(meta) => (meta.icon.clone(), meta.floor.clone()),
            _ => (None, None),
        };
        let floor_id = floor_name
            .as_deref()
            .and_then(|n| registries.floors.get_by_name(n))
            .map(|f| f.id.clone());

        let area_id = match registries.areas.get_by_name(name) {
            Some(area) => area.id.clone(),
            None => registries.areas.create(name).id.clone(),
        };
        registries.areas.update(&area_id, |a| {
            a.icon = icon;
            a.floor_id = floor_id;
        })?;
    }
    Ok(())
}

/// Upsert one device record, binding its area when the name resolves.
pub(crate) fn upsert_device(
    registries: &Registries,
    record_id: &str,
    resource: &Resource,
) -> Arc<DeviceEntry> {
    let meta = match &resource.meta {
        ResourceMeta::Device(meta) => meta.clone(),
        _ => DeviceMeta::default(),
    };
    let area_id = resource
        .area
        .as_deref()
        .and_then(|name| registries.areas.get_by_name(name))
        .map(|a| a.id.clone());

    registries.devices.upsert(
        record_id,
        DeviceIdentifier::new(DOMAIN, resource.id.as_str()),
        DeviceFields {
            name: Some(resource.display_name().to_string()),
            manufacturer: meta.manufacturer,
            model: meta.model,
            model_id: meta.model_id,
            sw_version: meta.sw_version,
            hw_version: meta.hw_version,
            serial_number: meta.serial_number,
            area_id,
        },
    )
}
