//! Domo bridge client
//!
//! The client owns one `ResourceController` per resource kind on top of a
//! `BridgeTransport`. Controllers hold the live resource snapshots, fan
//! resource events out to subscribers, and forward commands verbatim to the
//! transport. The wire protocol itself lives behind the transport trait and
//! is out of scope here.

pub mod client;
pub mod config;
pub mod controller;
pub mod event;

pub use client::{BridgeClient, BridgeTransport, ClientError, ClientResult, Command};
pub use config::{AreaDef, BridgeConfig, BridgeDevice, DeviceDef, EntityDef, FloorDef};
pub use controller::ResourceController;
pub use event::{EventHandler, Subscription};
