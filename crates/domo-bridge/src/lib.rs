//! Domo bridge reconciliation core
//!
//! Mirrors the live state of one remote bridge into the local registries
//! and keeps it live for the duration of a connection:
//!
//! - `connection`: bridge client lifecycle with bounded startup and
//!   guaranteed cleanup on partial failure
//! - `graph`: one-shot device/area/floor sync with pruning, plus the
//!   standing device-graph subscription
//! - `entities`: live entities bound 1:1 to remote resource ids, driven by
//!   the typed event feed
//! - `identity`: endpoint identity deduplication across configuration
//!   records
//!
//! All reconciliation work for a connection runs on one logical task
//! sequence; registries are only written from that sequence.

pub mod connection;
pub mod entities;
pub mod error;
pub mod graph;
pub mod identity;

/// Namespace for registry identifiers owned by this integration.
pub const DOMAIN: &str = "domo";

pub use connection::{BridgeConnection, STARTUP_TIMEOUT};
pub use entities::{EntityManager, EntityPhase, LiveEntity, StateChanged};
pub use error::{SetupError, SetupResult};
pub use identity::{claim_identity, derive_identity, IdentityClaim};
