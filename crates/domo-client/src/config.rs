//! Bridge configuration payload
//!
//! The configuration record carries an opaque payload downloaded during
//! provisioning. The client is the only component that interprets it: at
//! initialize time the payload is parsed into the resource graph that seeds
//! the controllers. Later bus traffic updates resources through the feed.

use serde::{Deserialize, Serialize};

use domo_core::{
    AreaMeta, BinarySensorMeta, CoverMeta, DeviceMeta, FloorMeta, LightMeta, Resource, ResourceKind,
    ResourceMeta, SensorMeta,
};

use crate::client::{ClientError, ClientResult};

/// The bridge's own device declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDevice {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One floor declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One area declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
}

/// One device module declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDef {
    pub id: String,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

/// One entity declaration. Capability fields only apply to the kinds that
/// use them (dimming/color for lights, classes and units for sensors).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default)]
    pub dimming: bool,
    #[serde(default)]
    pub color: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

/// Parsed bridge configuration payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<BridgeDevice>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floors: Vec<FloorDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<AreaDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alarm_panels: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub binary_sensors: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensors: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub switches: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valves: Vec<EntityDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub climates: Vec<EntityDef>,
}

impl BridgeConfig {
    /// Parse a payload stored on a configuration record.
    pub fn from_value(value: &serde_json::Value) -> ClientResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Parse a raw YAML payload.
    pub fn from_yaml(text: &str) -> ClientResult<Self> {
        serde_yaml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Flatten the declarations into the seed resource list, structure
    /// first (floors, areas, devices), then entities.
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources = Vec::new();

        for floor in &self.floors {
            resources.push(
                Resource::new(floor.name.clone(), ResourceKind::Floor)
                    .with_name(floor.name.clone())
                    .with_meta(ResourceMeta::Floor(FloorMeta {
                        level: floor.level,
                        icon: floor.icon.clone(),
                    })),
            );
        }

        for area in &self.areas {
            resources.push(
                Resource::new(area.name.clone(), ResourceKind::Area)
                    .with_name(area.name.clone())
                    .with_meta(ResourceMeta::Area(AreaMeta {
                        icon: area.icon.clone(),
                        floor: area.floor.clone(),
                    })),
            );
        }

        for device in &self.devices {
            let mut resource = Resource::new(device.id.clone(), ResourceKind::Device)
                .with_meta(ResourceMeta::Device(DeviceMeta {
                    manufacturer: device.manufacturer.clone(),
                    model: device.model.clone(),
                    model_id: device.model_id.clone(),
                    sw_version: device.sw_version.clone(),
                    hw_version: device.hw_version.clone(),
                    serial_number: device.serial_number.clone(),
                }));
            if let Some(ref name) = device.name {
                resource = resource.with_name(name.clone());
            }
            if let Some(ref area) = device.area {
                resource = resource.with_area(area.clone());
            }
            resources.push(resource);
        }

        let entity_groups: [(&Vec<EntityDef>, ResourceKind); 9] = [
            (&self.lights, ResourceKind::Light),
            (&self.alarm_panels, ResourceKind::AlarmPanel),
            (&self.texts, ResourceKind::Text),
            (&self.binary_sensors, ResourceKind::BinarySensor),
            (&self.sensors, ResourceKind::Sensor),
            (&self.switches, ResourceKind::Switch),
            (&self.covers, ResourceKind::Cover),
            (&self.valves, ResourceKind::Valve),
            (&self.climates, ResourceKind::Climate),
        ];
        for (defs, kind) in entity_groups {
            for def in defs {
                resources.push(entity_resource(def, kind));
            }
        }

        resources
    }
}

fn entity_resource(def: &EntityDef, kind: ResourceKind) -> Resource {
    let mut resource = Resource::new(def.id.clone(), kind);
    if let Some(ref name) = def.name {
        resource = resource.with_name(name.clone());
    }
    if let Some(ref area) = def.area {
        resource = resource.with_area(area.clone());
    }
    if let Some(ref device) = def.device {
        resource = resource.with_device(device.clone());
    }

    let meta = match kind {
        ResourceKind::Light => ResourceMeta::Light(LightMeta {
            dimming: def.dimming,
            color: def.color,
        }),
        ResourceKind::Sensor => ResourceMeta::Sensor(SensorMeta {
            device_class: def.device_class.clone(),
            unit_of_measurement: def.unit_of_measurement.clone(),
        }),
        ResourceKind::BinarySensor => ResourceMeta::BinarySensor(BinarySensorMeta {
            device_class: def.device_class.clone(),
        }),
        ResourceKind::Cover | ResourceKind::Valve => ResourceMeta::Cover(CoverMeta {
            device_class: def.device_class.clone(),
        }),
        _ => ResourceMeta::Empty,
    };
    resource.with_meta(meta)
}
