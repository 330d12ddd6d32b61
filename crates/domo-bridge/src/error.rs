//! Setup error taxonomy
//!
//! Lifecycle and connection errors are never retried inside the core; they
//! surface as setup failures so the host platform is free to retry.

use thiserror::Error;

use domo_client::ClientError;
use domo_config_entries::ConfigRecordsError;
use domo_registries::RegistryError;

/// Errors surfaced while setting up or tearing down a bridge connection.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Startup exceeded its bound. Recoverable; safe to retry later.
    #[error("timed out waiting for the bridge to start")]
    ConnectTimeout,

    /// Any other client failure during initialization.
    #[error("failed to connect to the bridge: {0}")]
    Connect(#[from] ClientError),

    /// The endpoint identity is owned by another active configuration
    /// record; this record has been removed.
    #[error("endpoint identity {identity} belongs to another record")]
    IdentityConflict { identity: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Records(#[from] ConfigRecordsError),
}

pub type SetupResult<T> = Result<T, SetupError>;
