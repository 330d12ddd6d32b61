//! Configuration records
//!
//! A `ConfigRecord` binds one bridge endpoint (host + port) together with
//! its opaque remote config payload and, once a connection has succeeded,
//! a stable endpoint identity used for deduplication. The `ConfigRecords`
//! store owns the records and the unique-identity index.

pub mod record;
pub mod store;

pub use record::{ConfigRecord, InvalidTransition, RecordSource, RecordState};
pub use store::{ConfigRecords, ConfigRecordsError, ConfigRecordsResult};
