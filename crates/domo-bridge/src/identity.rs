//! Endpoint identity resolution
//!
//! At most one configuration record may be bound to a given physical
//! endpoint. When a connection succeeds, the record claims the identity
//! derived from its endpoint; collisions resolve deterministically: an
//! active record always wins identity ownership, an ignored placeholder
//! always yields.

use tracing::{debug, info, warn};

use domo_config_entries::ConfigRecords;

use crate::error::{SetupError, SetupResult};

/// Stable identity string for an endpoint.
pub fn derive_identity(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Outcome of claiming an endpoint identity for a configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityClaim {
    /// Identity assigned for the first time.
    Assigned,
    /// The record already owned this identity.
    Unchanged,
    /// The record's stale identity was replaced.
    Reassigned,
    /// An ignored placeholder held the identity and was removed.
    ReplacedIgnored { removed_record: String },
}

/// Claim `identity` for the record.
///
/// On conflict with another active record, this record is removed and
/// setup fails with `IdentityConflict`.
pub fn claim_identity(
    records: &ConfigRecords,
    record_id: &str,
    identity: &str,
) -> SetupResult<IdentityClaim> {
    let record = records
        .get(record_id)
        .ok_or_else(|| domo_config_entries::ConfigRecordsError::NotFound(record_id.to_string()))?;

    if record.unique_id.as_deref() == Some(identity) {
        return Ok(IdentityClaim::Unchanged);
    }
    let previous = record.unique_id.clone();

    // The endpoint resolves to an identity this record does not own yet;
    // check whether anyone else does.
    match records.get_by_unique_id(identity) {
        None => {
            records.set_unique_id(record_id, identity)?;
            if let Some(previous) = previous {
                info!(
                    record_id,
                    old = %previous,
                    new = %identity,
                    "Endpoint identity reassigned"
                );
                Ok(IdentityClaim::Reassigned)
            } else {
                debug!(record_id, identity, "Endpoint identity assigned");
                Ok(IdentityClaim::Assigned)
            }
        }
        Some(other) if other.is_ignored() => {
            // An ignored placeholder yields its identity.
            records.remove(&other.record_id)?;
            records.set_unique_id(record_id, identity)?;
            info!(
                record_id,
                removed = %other.record_id,
                identity,
                "Removed ignored placeholder holding the endpoint identity"
            );
            Ok(IdentityClaim::ReplacedIgnored {
                removed_record: other.record_id,
            })
        }
        Some(other) => {
            // An active record owns the identity; this record loses.
            warn!(
                record_id,
                owner = %other.record_id,
                identity,
                "Endpoint identity already owned by an active record"
            );
            records.remove(record_id)?;
            Err(SetupError::IdentityConflict {
                identity: identity.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domo_config_entries::{ConfigRecord, RecordSource};

    #[test]
    fn test_first_connection_assigns_identity() {
        let records = ConfigRecords::new();
        let record = records.add(ConfigRecord::new("10.0.0.5", 2000)).unwrap();

        let claim = claim_identity(&records, &record.record_id, "10.0.0.5:2000").unwrap();
        assert_eq!(claim, IdentityClaim::Assigned);
        assert_eq!(
            records.get(&record.record_id).unwrap().unique_id.as_deref(),
            Some("10.0.0.5:2000")
        );
    }

    #[test]
    fn test_matching_identity_is_a_no_op() {
        let records = ConfigRecords::new();
        let record = records
            .add(ConfigRecord::new("10.0.0.5", 2000).with_unique_id("10.0.0.5:2000"))
            .unwrap();

        let claim = claim_identity(&records, &record.record_id, "10.0.0.5:2000").unwrap();
        assert_eq!(claim, IdentityClaim::Unchanged);
    }

    #[test]
    fn test_unclaimed_identity_is_reassigned() {
        let records = ConfigRecords::new();
        let record = records
            .add(ConfigRecord::new("10.0.0.9", 2000).with_unique_id("10.0.0.5:2000"))
            .unwrap();

        let claim = claim_identity(&records, &record.record_id, "10.0.0.9:2000").unwrap();
        assert_eq!(claim, IdentityClaim::Reassigned);
        assert!(records.get_by_unique_id("10.0.0.5:2000").is_none());
        assert_eq!(
            records.get_by_unique_id("10.0.0.9:2000").unwrap().record_id,
            record.record_id
        );
    }

    #[test]
    fn test_ignored_placeholder_yields() {
        let records = ConfigRecords::new();
        let ignored = records
            .add(
                ConfigRecord::new("10.0.0.9", 2000)
                    .with_unique_id("10.0.0.9:2000")
                    .with_source(RecordSource::Ignore),
            )
            .unwrap();
        let record = records
            .add(ConfigRecord::new("10.0.0.9", 2000).with_unique_id("stale"))
            .unwrap();

        let claim = claim_identity(&records, &record.record_id, "10.0.0.9:2000").unwrap();
        assert_eq!(
            claim,
            IdentityClaim::ReplacedIgnored {
                removed_record: ignored.record_id.clone()
            }
        );
        assert!(records.get(&ignored.record_id).is_none());
        assert_eq!(
            records.get_by_unique_id("10.0.0.9:2000").unwrap().record_id,
            record.record_id
        );
    }

    #[test]
    fn test_fresh_record_yields_to_active_owner() {
        // The claimant has no identity yet; an active record owns it.
        let records = ConfigRecords::new();
        let owner = records
            .add(ConfigRecord::new("10.0.0.5", 2000).with_unique_id("10.0.0.5:2000"))
            .unwrap();
        let later = records.add(ConfigRecord::new("10.0.0.5", 2000)).unwrap();

        let err = claim_identity(&records, &later.record_id, "10.0.0.5:2000").unwrap_err();
        assert!(matches!(err, SetupError::IdentityConflict { .. }));
        assert!(records.get(&later.record_id).is_none());
        assert!(records.get(&owner.record_id).is_some());
    }

    #[test]
    fn test_active_owner_wins_and_claimant_is_removed() {
        let records = ConfigRecords::new();
        let owner = records
            .add(ConfigRecord::new("10.0.0.9", 2000).with_unique_id("10.0.0.9:2000"))
            .unwrap();
        let later = records
            .add(ConfigRecord::new("10.0.0.9", 2000).with_unique_id("stale"))
            .unwrap();

        let err = claim_identity(&records, &later.record_id, "10.0.0.9:2000").unwrap_err();
        assert!(matches!(err, SetupError::IdentityConflict { .. }));
        // The later record is gone; the active owner keeps the identity.
        assert!(records.get(&later.record_id).is_none());
        assert_eq!(
            records.get_by_unique_id("10.0.0.9:2000").unwrap().record_id,
            owner.record_id
        );
    }
}
