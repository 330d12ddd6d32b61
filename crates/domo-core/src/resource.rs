//! Remote resource model
//!
//! A `Resource` is one unit owned by the remote bridge: a device, an area
//! or floor descriptor, or a controllable entity such as a light. The core
//! treats resources as read-mostly snapshots; commands flow back through
//! controller operations, never by mutating a resource locally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stable, opaque identifier of a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Device,
    Area,
    Floor,
    Light,
    AlarmPanel,
    Text,
    BinarySensor,
    Sensor,
    Switch,
    Cover,
    Valve,
    Climate,
}

impl ResourceKind {
    /// Entity kinds, in the order their platforms are attached.
    pub const ENTITY_KINDS: [ResourceKind; 9] = [
        ResourceKind::Light,
        ResourceKind::AlarmPanel,
        ResourceKind::Text,
        ResourceKind::BinarySensor,
        ResourceKind::Sensor,
        ResourceKind::Switch,
        ResourceKind::Cover,
        ResourceKind::Valve,
        ResourceKind::Climate,
    ];

    /// Host-platform domain this kind renders into.
    pub fn domain(&self) -> &'static str {
        match self {
            ResourceKind::Device => "device",
            ResourceKind::Area => "area",
            ResourceKind::Floor => "floor",
            ResourceKind::Light => "light",
            ResourceKind::AlarmPanel => "alarm_control_panel",
            ResourceKind::Text => "text",
            ResourceKind::BinarySensor => "binary_sensor",
            ResourceKind::Sensor => "sensor",
            ResourceKind::Switch => "switch",
            ResourceKind::Cover => "cover",
            ResourceKind::Valve => "valve",
            ResourceKind::Climate => "climate",
        }
    }

    /// Whether this kind is projected as a live entity (rather than a
    /// structural device/area/floor record).
    pub fn is_entity(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Device | ResourceKind::Area | ResourceKind::Floor
        )
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.domain())
    }
}

/// Kind-specific key/value state of a remote resource.
///
/// Values are opaque JSON; accessors apply the flag truthiness rule used by
/// the state-derivation code: `true`, a non-zero number, or a non-empty
/// string count as set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap(HashMap<String, serde_json::Value>);

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Truthiness of a flag; absent keys read as false.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).map(is_truthy).unwrap_or(false)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }
}

impl FromIterator<(String, serde_json::Value)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flag truthiness: `true`, a non-zero number, or a non-empty string.
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Descriptor of a device resource (manufacturer data and versions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMeta {
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
}

/// Descriptor of an area resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Name of the parent floor, if the area declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
}

/// Descriptor of a floor resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Capabilities of a light resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightMeta {
    #[serde(default)]
    pub dimming: bool,
    #[serde(default)]
    pub color: bool,
}

/// Capabilities of a sensor resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

/// Capabilities of a binary sensor resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinarySensorMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
}

/// Capabilities of a cover or valve resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
}

/// Kind-specific descriptor carried alongside a resource's live state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMeta {
    Device(DeviceMeta),
    Area(AreaMeta),
    Floor(FloorMeta),
    Light(LightMeta),
    Sensor(SensorMeta),
    BinarySensor(BinarySensorMeta),
    Cover(CoverMeta),
    #[default]
    Empty,
}

/// A resource owned by the remote bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Declared area name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    /// Back-reference to the owning device resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<ResourceId>,

    #[serde(default)]
    pub state: StateMap,

    #[serde(default)]
    pub meta: ResourceMeta,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            area: None,
            device: None,
            state: StateMap::new(),
            meta: ResourceMeta::Empty,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_device(mut self, device: impl Into<ResourceId>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.state.insert(key, value);
        self
    }

    pub fn with_meta(mut self, meta: ResourceMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Display name, falling back to the resource id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}
