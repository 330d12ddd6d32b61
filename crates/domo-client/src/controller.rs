//! Per-kind resource controllers
//!
//! A controller holds the live resources of one kind, fans resource events
//! out to subscribers, and forwards commands verbatim to the transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::{debug, trace};

use domo_core::{Resource, ResourceEventType, ResourceId, ResourceKind};

use crate::client::{BridgeTransport, ClientResult, Command};
use crate::event::{EventHandler, Subscriber, Subscription};

/// Controller for all resources of one kind.
///
/// Resources are kept in insertion order so snapshot enumeration is
/// deterministic. Event dispatch collects the matching handlers before
/// invoking them, so a handler may cancel subscriptions or feed in new
/// resources without deadlocking the feed.
pub struct ResourceController {
    kind: ResourceKind,
    resources: RwLock<IndexMap<ResourceId, Arc<Resource>>>,
    subscribers: Arc<DashMap<u64, Subscriber>>,
    next_subscriber_id: AtomicU64,
    transport: Arc<dyn BridgeTransport>,
}

impl ResourceController {
    pub(crate) fn new(kind: ResourceKind, transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            kind,
            resources: RwLock::new(IndexMap::new()),
            subscribers: Arc::new(DashMap::new()),
            next_subscriber_id: AtomicU64::new(1),
            transport,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Get a resource by id
    pub fn get(&self, id: &ResourceId) -> Option<Arc<Resource>> {
        self.resources
            .read()
            .ok()
            .and_then(|map| map.get(id).map(Arc::clone))
    }

    /// Snapshot of the current resources, in insertion order.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.resources
            .read()
            .map(|map| map.values().map(Arc::clone).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.resources.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of active subscriptions on this controller.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Subscribe to this controller's events.
    ///
    /// `id_filter` scopes delivery to one resource id; `event_filter` to a
    /// set of event types. `None` means no filtering on that axis.
    pub fn subscribe(
        &self,
        handler: EventHandler,
        id_filter: Option<ResourceId>,
        event_filter: Option<&[ResourceEventType]>,
    ) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        trace!(kind = %self.kind, subscriber = id, "Subscribing to resource events");
        self.subscribers.insert(
            id,
            Subscriber {
                handler,
                id_filter,
                event_filter: event_filter.map(|e| e.to_vec()),
            },
        );
        Subscription::new(id, &self.subscribers)
    }

    /// Ingest a resource from the feed, emitting added or updated.
    pub fn upsert(&self, resource: Resource) {
        let resource = Arc::new(resource);
        let existed = if let Ok(mut map) = self.resources.write() {
            map.insert(resource.id.clone(), Arc::clone(&resource))
                .is_some()
        } else {
            return;
        };

        let event = if existed {
            ResourceEventType::ResourceUpdated
        } else {
            ResourceEventType::ResourceAdded
        };
        self.emit(event, &resource);
    }

    /// Drop a resource from the feed, emitting deleted with its last
    /// known payload.
    pub fn remove(&self, id: &ResourceId) {
        let removed = if let Ok(mut map) = self.resources.write() {
            map.shift_remove(id)
        } else {
            None
        };

        if let Some(resource) = removed {
            self.emit(ResourceEventType::ResourceDeleted, &resource);
        }
    }

    fn emit(&self, event: ResourceEventType, resource: &Arc<Resource>) {
        debug!(kind = %self.kind, id = %resource.id, event = %event, "Dispatching resource event");

        // Collect matching handlers first; handlers are free to mutate
        // the subscriber table while running.
        let handlers: Vec<EventHandler> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().matches(event, &resource.id))
            .map(|entry| Arc::clone(&entry.value().handler))
            .collect();

        for handler in handlers {
            handler(event, resource);
        }
    }

    /// Forward a command verbatim to the transport.
    pub async fn command(&self, id: &ResourceId, command: Command) -> ClientResult<()> {
        debug!(kind = %self.kind, id = %id, ?command, "Forwarding command");
        self.transport.send_command(id, command).await
    }

    /// Turn a resource on or off, optionally with brightness and color.
    pub async fn set_state(
        &self,
        id: &ResourceId,
        on: bool,
        brightness: Option<u8>,
        color: Option<[u8; 4]>,
    ) -> ClientResult<()> {
        self.command(
            id,
            Command::SetState {
                on,
                brightness,
                color,
            },
        )
        .await
    }

    /// Move to a position (covers, valves) and/or tilt position (covers).
    pub async fn set_position(
        &self,
        id: &ResourceId,
        position: Option<u8>,
        tilt_position: Option<u8>,
    ) -> ClientResult<()> {
        self.command(
            id,
            Command::SetPosition {
                position,
                tilt_position,
            },
        )
        .await
    }

    pub async fn open(&self, id: &ResourceId) -> ClientResult<()> {
        self.command(id, Command::Open).await
    }

    pub async fn close(&self, id: &ResourceId) -> ClientResult<()> {
        self.command(id, Command::Close).await
    }

    pub async fn stop_motion(&self, id: &ResourceId) -> ClientResult<()> {
        self.command(id, Command::StopMotion).await
    }

    /// Arm an alarm panel in mode 0 (away).
    pub async fn arm_in_mode0(&self, id: &ResourceId, code: &str) -> ClientResult<()> {
        self.command(
            id,
            Command::ArmAway {
                code: code.to_string(),
            },
        )
        .await
    }

    pub async fn disarm(&self, id: &ResourceId, code: &str) -> ClientResult<()> {
        self.command(
            id,
            Command::Disarm {
                code: code.to_string(),
            },
        )
        .await
    }

    pub async fn set_target_temperature(&self, id: &ResourceId, value: f64) -> ClientResult<()> {
        self.command(id, Command::SetTargetTemperature { value })
            .await
    }

    pub async fn set_text(&self, id: &ResourceId, value: &str) -> ClientResult<()> {
        self.command(
            id,
            Command::SetText {
                value: value.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::NullTransport;
    use std::sync::Mutex;

    fn controller(kind: ResourceKind) -> ResourceController {
        ResourceController::new(kind, Arc::new(NullTransport::default()))
    }

    fn light(id: &str) -> Resource {
        Resource::new(id, ResourceKind::Light).with_state("state", true)
    }

    #[test]
    fn test_upsert_emits_added_then_updated() {
        let ctrl = controller(ResourceKind::Light);
        let seen: Arc<Mutex<Vec<ResourceEventType>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_in = Arc::clone(&seen);
        let _sub = ctrl.subscribe(
            Arc::new(move |event, _| seen_in.lock().unwrap().push(event)),
            None,
            None,
        );

        ctrl.upsert(light("l1"));
        ctrl.upsert(light("l1"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ResourceEventType::ResourceAdded,
                ResourceEventType::ResourceUpdated
            ]
        );
        assert_eq!(ctrl.len(), 1);
    }

    #[test]
    fn test_id_and_event_filters() {
        let ctrl = controller(ResourceKind::Light);
        let seen: Arc<Mutex<Vec<(ResourceEventType, String)>>> = Arc::new(Mutex::new(Vec::new()));

        let seen_in = Arc::clone(&seen);
        let _sub = ctrl.subscribe(
            Arc::new(move |event, resource| {
                seen_in
                    .lock()
                    .unwrap()
                    .push((event, resource.id.to_string()));
            }),
            Some(ResourceId::new("l1")),
            Some(&[
                ResourceEventType::ResourceUpdated,
                ResourceEventType::ResourceDeleted,
            ]),
        );

        ctrl.upsert(light("l1")); // added: filtered out
        ctrl.upsert(light("l2")); // other id: filtered out
        ctrl.upsert(light("l1")); // updated: delivered
        ctrl.remove(&ResourceId::new("l2")); // other id: filtered out
        ctrl.remove(&ResourceId::new("l1")); // deleted: delivered

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (ResourceEventType::ResourceUpdated, "l1".to_string()),
                (ResourceEventType::ResourceDeleted, "l1".to_string()),
            ]
        );
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let ctrl = controller(ResourceKind::Switch);
        let seen: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));

        let seen_in = Arc::clone(&seen);
        let sub = ctrl.subscribe(
            Arc::new(move |_, _| *seen_in.lock().unwrap() += 1),
            None,
            None,
        );
        assert_eq!(ctrl.subscriber_count(), 1);

        ctrl.upsert(light("s1"));
        sub.cancel();
        ctrl.upsert(light("s1"));

        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(ctrl.subscriber_count(), 0);
    }

    #[test]
    fn test_handler_may_cancel_its_own_subscription() {
        let ctrl = Arc::new(controller(ResourceKind::Sensor));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot_in = Arc::clone(&slot);
        let sub = ctrl.subscribe(
            Arc::new(move |_, _| {
                // One-shot: drop the handle from inside the handler.
                slot_in.lock().unwrap().take();
            }),
            None,
            None,
        );
        *slot.lock().unwrap() = Some(sub);

        ctrl.upsert(light("t1"));
        assert_eq!(ctrl.subscriber_count(), 0);
    }

    #[test]
    fn test_remove_emits_last_known_payload() {
        let ctrl = controller(ResourceKind::Light);
        let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        ctrl.upsert(light("l9").with_name("Porch"));

        let seen_in = Arc::clone(&seen);
        let _sub = ctrl.subscribe(
            Arc::new(move |_, resource| {
                *seen_in.lock().unwrap() = resource.name.clone();
            }),
            None,
            Some(&[ResourceEventType::ResourceDeleted]),
        );

        ctrl.remove(&ResourceId::new("l9"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("Porch"));
        assert!(ctrl.is_empty());
    }

    #[tokio::test]
    async fn test_commands_reach_the_transport() {
        let transport = Arc::new(NullTransport::default());
        let ctrl = ResourceController::new(ResourceKind::AlarmPanel, transport.clone());
        let id = ResourceId::new("panel-1");

        ctrl.arm_in_mode0(&id, "1234").await.unwrap();
        ctrl.disarm(&id, "1234").await.unwrap();

        let commands = transport.commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            (
                id.clone(),
                Command::ArmAway {
                    code: "1234".to_string()
                }
            )
        );
    }
}
