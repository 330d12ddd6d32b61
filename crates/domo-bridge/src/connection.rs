//! Bridge connection lifecycle
//!
//! One `BridgeConnection` manages a single bridge: it brings the client up
//! within a bounded startup window, claims the endpoint identity, runs the
//! structural and entity syncs, and tears everything down in order on
//! unload: every subscription is cancelled before the client stops, so no
//! handler ever observes a stopped client.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info, warn};

use domo_client::{BridgeClient, BridgeConfig, BridgeTransport, Subscription};
use domo_config_entries::{ConfigRecord, ConfigRecords, RecordState};
use domo_core::ResourceKind;
use domo_registries::{DeviceFields, DeviceIdentifier, Registries};

use crate::entities::EntityManager;
use crate::error::{SetupError, SetupResult};
use crate::{graph, identity, DOMAIN};

/// Upper bound on client initialize + start.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Manages a single bridge connection for one configuration record.
pub struct BridgeConnection {
    record_id: String,
    client: Arc<BridgeClient>,
    registries: Arc<Registries>,
    records: Arc<ConfigRecords>,
    entities: Arc<EntityManager>,
    reset_jobs: Mutex<Vec<Subscription>>,
}

impl BridgeConnection {
    /// Build a connection from a configuration record.
    ///
    /// The record's opaque config payload is parsed here; a malformed
    /// payload is a setup failure before any wire activity.
    pub fn new(
        record: &ConfigRecord,
        transport: Arc<dyn BridgeTransport>,
        registries: Arc<Registries>,
        records: Arc<ConfigRecords>,
    ) -> SetupResult<Self> {
        let config = BridgeConfig::from_value(&record.config)?;
        let client = Arc::new(BridgeClient::new(
            config,
            record.host.clone(),
            record.port,
            transport,
        ));
        let entities = Arc::new(EntityManager::new(
            Arc::clone(&client),
            Arc::clone(&registries),
            record.record_id.clone(),
        ));

        Ok(Self {
            record_id: record.record_id.clone(),
            client,
            registries,
            records,
            entities,
            reset_jobs: Mutex::new(Vec::new()),
        })
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    pub fn port(&self) -> u16 {
        self.client.port()
    }

    pub fn config(&self) -> &BridgeConfig {
        self.client.config()
    }

    pub fn client(&self) -> &Arc<BridgeClient> {
        &self.client
    }

    pub fn entities(&self) -> &Arc<EntityManager> {
        &self.entities
    }

    /// Bring the connection up with the default startup bound.
    pub async fn initialize_and_start(&self) -> SetupResult<()> {
        self.initialize_and_start_with_timeout(STARTUP_TIMEOUT).await
    }

    /// Bring the connection up: bounded client start, identity claim,
    /// structural sync, then per-kind entity sync.
    ///
    /// On any failure after the client was constructed, `stop()` is still
    /// invoked before the error surfaces; client resources never leak on
    /// partial initialization.
    pub async fn initialize_and_start_with_timeout(&self, bound: Duration) -> SetupResult<()> {
        self.records
            .set_state(&self.record_id, RecordState::SetupInProgress);

        match self.startup(bound).await {
            Ok(()) => {
                self.records.set_state(&self.record_id, RecordState::Loaded);
                info!(host = %self.host(), port = self.port(), "Bridge connection up");
                Ok(())
            }
            Err(err) => {
                self.records
                    .set_state(&self.record_id, RecordState::SetupError);
                Err(err)
            }
        }
    }

    async fn startup(&self, bound: Duration) -> SetupResult<()> {
        self.start_client(bound).await?;

        if let Err(err) = self.setup_after_start().await {
            // The client is running; do not leak it on a partial setup.
            self.cancel_subscriptions().await;
            let _ = self.client.stop().await;
            return Err(err);
        }
        Ok(())
    }

    /// Cancel standing subscriptions and live entities, in that order,
    /// ahead of any client stop.
    async fn cancel_subscriptions(&self) {
        let jobs = {
            let mut guard = self.reset_jobs.lock().await;
            std::mem::take(&mut *guard)
        };
        for job in jobs {
            job.cancel();
        }
        self.entities.shutdown();
    }

    /// Initialize and start the client within the bound, stopping it on
    /// any failure path.
    async fn start_client(&self, bound: Duration) -> SetupResult<()> {
        let started = timeout(bound, async {
            self.client.initialize().await?;
            self.client.start().await
        })
        .await;

        match started {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(host = %self.host(), "Error connecting to the bridge: {err}");
                let _ = self.client.stop().await;
                Err(SetupError::Connect(err))
            }
            Err(_) => {
                warn!(host = %self.host(), "Bridge startup exceeded {:?}", bound);
                let _ = self.client.stop().await;
                Err(SetupError::ConnectTimeout)
            }
        }
    }

    async fn setup_after_start(&self) -> SetupResult<()> {
        let identity = identity::derive_identity(self.host(), self.port());
        identity::claim_identity(&self.records, &self.record_id, &identity)?;

        let mut jobs = self.reset_jobs.lock().await;
        jobs.push(graph::sync_structure(
            &self.client,
            &self.record_id,
            &self.registries,
        )?);

        // After the prune pass, so the bridge's own record is never
        // evaluated for pruning.
        self.register_bridge_device();

        for kind in ResourceKind::ENTITY_KINDS {
            jobs.push(self.entities.sync_entities(kind)?);
        }
        Ok(())
    }

    /// Register the bridge itself as a device, so device-less resources
    /// have a parent.
    fn register_bridge_device(&self) {
        let bridge_id = self.client.bridge_device_id();
        let name = self
            .config()
            .device
            .as_ref()
            .and_then(|d| d.name.clone())
            .unwrap_or_else(|| "Domo Bridge".to_string());

        self.registries.devices.upsert(
            &self.record_id,
            DeviceIdentifier::new(DOMAIN, bridge_id.as_str()),
            DeviceFields {
                name: Some(name),
                manufacturer: Some("Domo".to_string()),
                model: Some("CAN Bridge".to_string()),
                ..Default::default()
            },
        );
    }

    /// Tear the connection down. Idempotent: resetting a connection that
    /// never started succeeds trivially.
    ///
    /// Standing subscriptions and live entities are cancelled before the
    /// client stops.
    pub async fn reset(&self) -> SetupResult<()> {
        self.cancel_subscriptions().await;

        self.client.stop().await?;

        if let Some(record) = self.records.get(&self.record_id) {
            if record.state.is_recoverable() && record.state != RecordState::NotLoaded {
                self.records
                    .set_state(&self.record_id, RecordState::UnloadInProgress);
                self.records
                    .set_state(&self.record_id, RecordState::NotLoaded);
            }
        }
        info!(host = %self.host(), port = self.port(), "Bridge connection reset");
        Ok(())
    }
}
