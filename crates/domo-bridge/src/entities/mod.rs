//! Live entities
//!
//! A `LiveEntity` is the local stateful projection of one remote resource
//! for the life of a connection. The `EntityManager` constructs entities
//! for resources present at sync time and for each `RESOURCE_ADDED` event,
//! re-renders on `RESOURCE_UPDATED`, and destroys on `RESOURCE_DELETED`.
//! A resource id maps to at most one live entity at any time.
//!
//! State derivation is a pure function per kind: rendering from identical
//! resource state always produces identical output. Commands are forwarded
//! verbatim to the kind's controller operation and never applied locally;
//! the authoritative change arrives later through the feed.

mod alarm_panel;
mod binary_sensor;
mod climate;
mod cover;
mod light;
mod sensor;
mod switch;
mod text;
mod valve;

pub use alarm_panel::{
    STATE_ARMED_AWAY, STATE_ARMING, STATE_DISARMED, STATE_PENDING, STATE_TRIGGERED,
};

use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use domo_client::{BridgeClient, ClientResult, Command, Subscription};
use domo_core::{
    RenderedState, Resource, ResourceEventType, ResourceId, ResourceKind, STATE_UNKNOWN,
};
use domo_registries::Registries;

use crate::error::SetupResult;
use crate::DOMAIN;

/// Derive the displayed state for a resource of the given kind.
pub fn render(kind: ResourceKind, resource: &Resource) -> RenderedState {
    match kind {
        ResourceKind::Light => light::render(resource),
        ResourceKind::AlarmPanel => alarm_panel::render(resource),
        ResourceKind::Text => text::render(resource),
        ResourceKind::BinarySensor => binary_sensor::render(resource),
        ResourceKind::Sensor => sensor::render(resource),
        ResourceKind::Switch => switch::render(resource),
        ResourceKind::Cover => cover::render(resource),
        ResourceKind::Valve => valve::render(resource),
        ResourceKind::Climate => climate::render(resource),
        // Structural kinds are not rendered as entities.
        ResourceKind::Device | ResourceKind::Area | ResourceKind::Floor => {
            RenderedState::new(STATE_UNKNOWN)
        }
    }
}

/// Notification that a live entity re-rendered its state.
#[derive(Debug, Clone)]
pub struct StateChanged {
    pub entity_id: String,
    pub state: RenderedState,
}

/// Lifecycle phase of a live entity: unbound → active → removed.
/// Removed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityPhase {
    Unbound,
    Active,
    Removed,
}

/// Creates and tracks live entities for every resource kind.
pub struct EntityManager {
    client: Arc<BridgeClient>,
    registries: Arc<Registries>,
    record_id: String,
    entities: DashMap<ResourceId, Arc<LiveEntity>>,
    state_tx: broadcast::Sender<StateChanged>,
}

impl EntityManager {
    pub fn new(
        client: Arc<BridgeClient>,
        registries: Arc<Registries>,
        record_id: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = broadcast::channel(256);
        Self {
            client,
            registries,
            record_id: record_id.into(),
            entities: DashMap::new(),
            state_tx,
        }
    }

    /// Subscribe to re-render notifications.
    pub fn subscribe_state_changes(&self) -> broadcast::Receiver<StateChanged> {
        self.state_tx.subscribe()
    }

    /// One-shot entity sync for a kind, then the standing `RESOURCE_ADDED`
    /// subscription that keeps constructing entities as they appear.
    pub fn sync_entities(self: &Arc<Self>, kind: ResourceKind) -> SetupResult<Subscription> {
        debug_assert!(kind.is_entity(), "structural kinds are synced by the graph");
        let controller = self.client.controller(kind);
        for resource in controller.resources() {
            self.add_entity(kind, resource)?;
        }
        debug!(kind = %kind, total = self.entities.len(), "Entity sync complete");

        let manager = Arc::clone(self);
        let subscription = controller.subscribe(
            Arc::new(move |_event, resource| {
                if let Err(err) = manager.add_entity(kind, Arc::clone(resource)) {
                    // One failed resource must not stall the feed.
                    warn!(kind = %kind, id = %resource.id, "Failed to add entity: {err}");
                }
            }),
            None,
            Some(&[ResourceEventType::ResourceAdded]),
        );
        Ok(subscription)
    }

    fn add_entity(self: &Arc<Self>, kind: ResourceKind, resource: Arc<Resource>) -> SetupResult<()> {
        if self.entities.contains_key(&resource.id) {
            debug!(id = %resource.id, "Resource already has a live entity");
            return Ok(());
        }
        let entity = LiveEntity::attach(self, kind, resource)?;
        self.entities.insert(entity.resource_id.clone(), entity);
        Ok(())
    }

    /// Live entity for a resource id, if any.
    pub fn get(&self, id: &ResourceId) -> Option<Arc<LiveEntity>> {
        self.entities.get(id).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Destroy all live entities, cancelling their feed subscriptions.
    ///
    /// Registry entries are left in place; they belong to the host
    /// platform across connection unloads.
    pub fn shutdown(&self) {
        let ids: Vec<ResourceId> = self.entities.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, entity)) = self.entities.remove(&id) {
                entity.detach();
            }
        }
    }

    fn notify(&self, entity_id: &str, state: RenderedState) {
        // Send errors just mean nobody is listening.
        let _ = self.state_tx.send(StateChanged {
            entity_id: entity_id.to_string(),
            state,
        });
    }
}

struct EntityInner {
    phase: EntityPhase,
    resource: Arc<Resource>,
    rendered: RenderedState,
}

/// Local stateful projection bound to one remote resource id.
pub struct LiveEntity {
    resource_id: ResourceId,
    kind: ResourceKind,
    entity_id: String,
    device_id: Option<String>,
    client: Arc<BridgeClient>,
    inner: RwLock<EntityInner>,
    subscription: Mutex<Option<Subscription>>,
}

impl LiveEntity {
    /// Construct the entity, register it with the host registries, bind
    /// its area, and install the id-scoped update/delete subscription.
    fn attach(
        manager: &Arc<EntityManager>,
        kind: ResourceKind,
        resource: Arc<Resource>,
    ) -> SetupResult<Arc<LiveEntity>> {
        let registries = &manager.registries;

        // Device-less resources attach to the bridge device itself.
        let device_key = resource
            .device
            .clone()
            .unwrap_or_else(|| manager.client.bridge_device_id());
        let device_id = registries
            .devices
            .get_by_identifier(DOMAIN, device_key.as_str())
            .map(|d| d.id.clone());

        let entry = registries.entities.get_or_create(
            DOMAIN,
            kind.domain(),
            resource.display_name(),
            resource.id.as_str(),
            device_id.as_deref(),
            Some(manager.record_id.as_str()),
            resource.name.as_deref(),
        );

        // Bind the declared area when it resolves; an unresolved name
        // leaves the entity unassigned.
        if let Some(area_name) = resource.area.as_deref() {
            if let Some(area) = registries.areas.get_by_name(area_name) {
                registries
                    .entities
                    .update(&entry.entity_id, |e| e.area_id = Some(area.id.clone()))?;
            }
        }

        let entity = Arc::new(LiveEntity {
            resource_id: resource.id.clone(),
            kind,
            entity_id: entry.entity_id.clone(),
            device_id,
            client: Arc::clone(&manager.client),
            inner: RwLock::new(EntityInner {
                phase: EntityPhase::Unbound,
                rendered: render(kind, &resource),
                resource: Arc::clone(&resource),
            }),
            subscription: Mutex::new(None),
        });

        let weak_entity = Arc::downgrade(&entity);
        let weak_manager = Arc::downgrade(manager);
        let subscription = manager.client.controller(kind).subscribe(
            Arc::new(move |event, resource| {
                if let (Some(entity), Some(manager)) =
                    (weak_entity.upgrade(), weak_manager.upgrade())
                {
                    entity.handle_event(&manager, event, resource);
                }
            }),
            Some(resource.id.clone()),
            Some(&[
                ResourceEventType::ResourceUpdated,
                ResourceEventType::ResourceDeleted,
            ]),
        );
        if let Ok(mut slot) = entity.subscription.lock() {
            *slot = Some(subscription);
        }
        if let Ok(mut inner) = entity.inner.write() {
            inner.phase = EntityPhase::Active;
        }

        info!(entity_id = %entity.entity_id, resource = %entity.resource_id, "Entity attached");
        Ok(entity)
    }

    fn handle_event(
        &self,
        manager: &Arc<EntityManager>,
        event: ResourceEventType,
        resource: &Arc<Resource>,
    ) {
        match event {
            ResourceEventType::ResourceDeleted => self.handle_deleted(manager),
            _ => self.handle_updated(manager, resource),
        }
    }

    /// Re-render from the event's resource payload and notify the host.
    fn handle_updated(&self, manager: &EntityManager, resource: &Arc<Resource>) {
        let rendered = render(self.kind, resource);
        {
            let Ok(mut inner) = self.inner.write() else {
                return;
            };
            if inner.phase == EntityPhase::Removed {
                return;
            }
            inner.resource = Arc::clone(resource);
            inner.rendered = rendered.clone();
        }
        manager.notify(&self.entity_id, rendered);
    }

    /// Deregister from the host registry and stop listening. Further
    /// events for this id are inert.
    fn handle_deleted(&self, manager: &EntityManager) {
        {
            let Ok(mut inner) = self.inner.write() else {
                return;
            };
            if inner.phase == EntityPhase::Removed {
                return;
            }
            inner.phase = EntityPhase::Removed;
        }
        if let Ok(mut slot) = self.subscription.lock() {
            slot.take();
        }
        manager.registries.entities.remove(&self.entity_id);
        manager.entities.remove(&self.resource_id);
        info!(entity_id = %self.entity_id, "Entity removed");
    }

    /// Host-initiated unload: stop listening without touching the
    /// registry entry.
    fn detach(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.phase = EntityPhase::Removed;
        }
        if let Ok(mut slot) = self.subscription.lock() {
            slot.take();
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Entity id in the host registry (domain.object_id).
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Owning device record id, if one resolved at construction.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn phase(&self) -> EntityPhase {
        self.inner
            .read()
            .map(|i| i.phase)
            .unwrap_or(EntityPhase::Removed)
    }

    /// Last rendered state.
    pub fn rendered(&self) -> RenderedState {
        self.inner
            .read()
            .map(|i| i.rendered.clone())
            .unwrap_or_default()
    }

    /// Last seen resource payload.
    pub fn resource(&self) -> Option<Arc<Resource>> {
        self.inner.read().map(|i| Arc::clone(&i.resource)).ok()
    }

    /// Forward a command verbatim to the kind's controller operation.
    ///
    /// Local state is never mutated here; the authoritative change comes
    /// back through `RESOURCE_UPDATED`.
    pub async fn send_command(&self, command: Command) -> ClientResult<()> {
        self.client
            .controller(self.kind)
            .command(&self.resource_id, command)
            .await
    }
}
