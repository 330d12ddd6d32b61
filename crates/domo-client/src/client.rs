//! Bridge client and transport seam
//!
//! `BridgeClient` owns the wire transport and one resource controller per
//! kind. Its lifecycle is initialize → start → stop; initialize seeds the
//! controllers from the parsed config payload, start opens the feed, and
//! stop releases the wire resources. The client never retries on its own;
//! lifecycle failures surface to the connection manager.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use domo_core::{ResourceId, ResourceKind};

use crate::config::BridgeConfig;
use crate::controller::ResourceController;

/// Errors surfaced by the bridge client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid bridge config: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Command forwarded verbatim to a kind-specific controller operation.
///
/// Commands never mutate local state; the authoritative change arrives
/// later as a `RESOURCE_UPDATED` event.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetState {
        on: bool,
        brightness: Option<u8>,
        color: Option<[u8; 4]>,
    },
    SetPosition {
        position: Option<u8>,
        tilt_position: Option<u8>,
    },
    Open,
    Close,
    StopMotion,
    ArmAway {
        code: String,
    },
    Disarm {
        code: String,
    },
    SetTargetTemperature {
        value: f64,
    },
    SetText {
        value: String,
    },
}

/// Wire-level lifecycle of a bridge connection.
///
/// Implementations own the actual bus protocol. `stop` must be safe to call
/// on a transport that never finished starting.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn initialize(&self) -> ClientResult<()>;
    async fn start(&self) -> ClientResult<()>;
    async fn stop(&self) -> ClientResult<()>;
    async fn send_command(&self, id: &ResourceId, command: Command) -> ClientResult<()>;
}

/// Client for one remote bridge.
pub struct BridgeClient {
    host: String,
    port: u16,
    config: BridgeConfig,
    transport: Arc<dyn BridgeTransport>,

    devices: ResourceController,
    areas: ResourceController,
    floors: ResourceController,
    lights: ResourceController,
    alarm_panels: ResourceController,
    texts: ResourceController,
    binary_sensors: ResourceController,
    sensors: ResourceController,
    switches: ResourceController,
    covers: ResourceController,
    valves: ResourceController,
    climates: ResourceController,
}

impl BridgeClient {
    pub fn new(
        config: BridgeConfig,
        host: impl Into<String>,
        port: u16,
        transport: Arc<dyn BridgeTransport>,
    ) -> Self {
        let controller = |kind| ResourceController::new(kind, Arc::clone(&transport));
        Self {
            host: host.into(),
            port,
            config,
            devices: controller(ResourceKind::Device),
            areas: controller(ResourceKind::Area),
            floors: controller(ResourceKind::Floor),
            lights: controller(ResourceKind::Light),
            alarm_panels: controller(ResourceKind::AlarmPanel),
            texts: controller(ResourceKind::Text),
            binary_sensors: controller(ResourceKind::BinarySensor),
            sensors: controller(ResourceKind::Sensor),
            switches: controller(ResourceKind::Switch),
            covers: controller(ResourceKind::Cover),
            valves: controller(ResourceKind::Valve),
            climates: controller(ResourceKind::Climate),
            transport,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Identity of the synthetic device representing the bridge itself.
    ///
    /// Device-less resources attach to this device. Falls back to the
    /// endpoint when the config does not declare a bridge device.
    pub fn bridge_device_id(&self) -> ResourceId {
        self.config
            .device
            .as_ref()
            .map(|d| ResourceId::new(d.id.clone()))
            .unwrap_or_else(|| ResourceId::new(format!("{}:{}", self.host, self.port)))
    }

    /// Initialize the transport and seed the controllers from the config
    /// payload.
    pub async fn initialize(&self) -> ClientResult<()> {
        self.transport.initialize().await?;

        let mut seeded = 0usize;
        for resource in self.config.resources() {
            self.controller(resource.kind).upsert(resource);
            seeded += 1;
        }
        info!(host = %self.host, port = self.port, seeded, "Bridge client initialized");
        Ok(())
    }

    /// Open the event feed.
    pub async fn start(&self) -> ClientResult<()> {
        self.transport.start().await
    }

    /// Release wire resources. Safe to call repeatedly or after a failed
    /// start.
    pub async fn stop(&self) -> ClientResult<()> {
        debug!(host = %self.host, port = self.port, "Stopping bridge client");
        self.transport.stop().await
    }

    /// Controller for a resource kind.
    pub fn controller(&self, kind: ResourceKind) -> &ResourceController {
        match kind {
            ResourceKind::Device => &self.devices,
            ResourceKind::Area => &self.areas,
            ResourceKind::Floor => &self.floors,
            ResourceKind::Light => &self.lights,
            ResourceKind::AlarmPanel => &self.alarm_panels,
            ResourceKind::Text => &self.texts,
            ResourceKind::BinarySensor => &self.binary_sensors,
            ResourceKind::Sensor => &self.sensors,
            ResourceKind::Switch => &self.switches,
            ResourceKind::Cover => &self.covers,
            ResourceKind::Valve => &self.valves,
            ResourceKind::Climate => &self.climates,
        }
    }

    pub fn devices(&self) -> &ResourceController {
        &self.devices
    }

    pub fn areas(&self) -> &ResourceController {
        &self.areas
    }

    pub fn floors(&self) -> &ResourceController {
        &self.floors
    }

    pub fn lights(&self) -> &ResourceController {
        &self.lights
    }

    /// Total active subscriptions across all controllers.
    pub fn subscriber_count(&self) -> usize {
        let all = [
            &self.devices,
            &self.areas,
            &self.floors,
            &self.lights,
            &self.alarm_panels,
            &self.texts,
            &self.binary_sensors,
            &self.sensors,
            &self.switches,
            &self.covers,
            &self.valves,
            &self.climates,
        ];
        all.iter().map(|c| c.subscriber_count()).sum()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Transport that accepts everything and records commands.
    #[derive(Default)]
    pub struct NullTransport {
        pub commands: Mutex<Vec<(ResourceId, Command)>>,
    }

    #[async_trait]
    impl BridgeTransport for NullTransport {
        async fn initialize(&self) -> ClientResult<()> {
            Ok(())
        }

        async fn start(&self) -> ClientResult<()> {
            Ok(())
        }

        async fn stop(&self) -> ClientResult<()> {
            Ok(())
        }

        async fn send_command(&self, id: &ResourceId, command: Command) -> ClientResult<()> {
            self.commands.lock().unwrap().push((id.clone(), command));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::NullTransport;
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
device:
  id: bridge-1
  name: CAN Bridge
floors:
  - name: Ground Floor
    level: 0
areas:
  - name: Kitchen
    floor: Ground Floor
devices:
  - id: dev-1
    name: Relay Module
lights:
  - id: light-1
    name: Kitchen Light
    area: Kitchen
    device: dev-1
    dimming: true
"#
    }

    #[tokio::test]
    async fn test_initialize_seeds_controllers() {
        let config = BridgeConfig::from_yaml(sample_yaml()).unwrap();
        let client = BridgeClient::new(config, "10.0.0.5", 2000, Arc::new(NullTransport::default()));

        client.initialize().await.unwrap();

        assert_eq!(client.floors().len(), 1);
        assert_eq!(client.areas().len(), 1);
        assert_eq!(client.devices().len(), 1);
        assert_eq!(client.lights().len(), 1);
        assert_eq!(client.controller(ResourceKind::Switch).len(), 0);

        let light = client
            .lights()
            .get(&ResourceId::new("light-1"))
            .unwrap();
        assert_eq!(light.area.as_deref(), Some("Kitchen"));
        assert_eq!(light.device, Some(ResourceId::new("dev-1")));
    }

    #[tokio::test]
    async fn test_bridge_device_id_prefers_config() {
        let config = BridgeConfig::from_yaml(sample_yaml()).unwrap();
        let client = BridgeClient::new(config, "10.0.0.5", 2000, Arc::new(NullTransport::default()));
        assert_eq!(client.bridge_device_id(), ResourceId::new("bridge-1"));

        let bare = BridgeClient::new(
            BridgeConfig::default(),
            "10.0.0.5",
            2000,
            Arc::new(NullTransport::default()),
        );
        assert_eq!(bare.bridge_device_id(), ResourceId::new("10.0.0.5:2000"));
    }
}
