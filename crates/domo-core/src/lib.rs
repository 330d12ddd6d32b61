//! Core types shared across the Domo workspace
//!
//! This crate defines the remote resource model (`Resource`, `ResourceId`,
//! `ResourceKind`, `StateMap`), the resource event vocabulary, and the
//! displayed projection (`RenderedState`) that entity renderers produce.

pub mod event;
pub mod rendered;
pub mod resource;

pub use event::ResourceEventType;
pub use rendered::{RenderedState, STATE_OFF, STATE_ON, STATE_UNKNOWN};
pub use resource::{
    AreaMeta, BinarySensorMeta, CoverMeta, DeviceMeta, FloorMeta, LightMeta, Resource, ResourceId,
    ResourceKind, ResourceMeta, SensorMeta, StateMap,
};
