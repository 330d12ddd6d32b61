//! Shared fixtures for bridge integration tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use domo_client::{BridgeTransport, ClientError, ClientResult, Command};
use domo_config_entries::{ConfigRecord, ConfigRecords};
use domo_core::ResourceId;
use domo_registries::Registries;

/// Hook invoked when the transport observes `stop`.
pub type StopHook = Box<dyn Fn() + Send + Sync>;

/// Transport double: records lifecycle calls and commands, with
/// injectable failures and delays.
#[derive(Default)]
pub struct MockTransport {
    pub initialize_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub commands: Mutex<Vec<(ResourceId, Command)>>,
    pub fail_initialize: AtomicBool,
    pub start_delay: Mutex<Option<Duration>>,
    pub on_stop: Mutex<Option<StopHook>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_initialize() -> Arc<Self> {
        let transport = Self::default();
        transport.fail_initialize.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    pub fn slow_start(delay: Duration) -> Arc<Self> {
        let transport = Self::default();
        *transport.start_delay.lock().unwrap() = Some(delay);
        Arc::new(transport)
    }

    pub fn set_on_stop(&self, hook: StopHook) {
        *self.on_stop.lock().unwrap() = Some(hook);
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BridgeTransport for MockTransport {
    async fn initialize(&self) -> ClientResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("bus unreachable".to_string()));
        }
        Ok(())
    }

    async fn start(&self) -> ClientResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.start_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn stop(&self) -> ClientResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_stop.lock().unwrap().as_ref() {
            hook();
        }
        Ok(())
    }

    async fn send_command(&self, id: &ResourceId, command: Command) -> ClientResult<()> {
        self.commands.lock().unwrap().push((id.clone(), command));
        Ok(())
    }
}

/// A config payload covering floors, areas, devices, and a few entity
/// kinds, including a device-less alarm panel.
pub fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "device": { "id": "bridge-1", "name": "House Bridge" },
        "floors": [
            { "name": "Ground Floor", "level": 0, "icon": "mdi:home-floor-0" }
        ],
        "areas": [
            { "name": "Kitchen", "floor": "Ground Floor" },
            { "name": "Garage" }
        ],
        "devices": [
            {
                "id": "dev-1",
                "name": "Relay Module",
                "model": "REL-8",
                "sw_version": "2.4",
                "serial_number": "0000A1B2",
                "area": "Kitchen"
            },
            { "id": "dev-2", "name": "Sensor Module", "area": "Garage" }
        ],
        "lights": [
            {
                "id": "light-1",
                "name": "Kitchen Light",
                "area": "Kitchen",
                "device": "dev-1",
                "dimming": true
            }
        ],
        "sensors": [
            {
                "id": "temp-1",
                "name": "Garage Temp",
                "area": "Garage",
                "device": "dev-2",
                "device_class": "temperature",
                "unit_of_measurement": "°C"
            }
        ],
        "alarm_panels": [
            { "id": "panel-1", "name": "House Alarm" }
        ]
    })
}

/// A fresh store with one record holding the sample payload.
pub fn stores_with_record() -> (Arc<ConfigRecords>, Arc<Registries>, ConfigRecord) {
    let records = Arc::new(ConfigRecords::new());
    let registries = Arc::new(Registries::new());
    let record = records
        .add(ConfigRecord::new("10.0.0.5", 2000).with_config(sample_payload()))
        .expect("fresh store accepts the record");
    (records, registries, record)
}
