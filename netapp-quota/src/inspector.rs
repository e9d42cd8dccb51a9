//! Quota state inspection
//!
//! Observes a volume's enforcement status and whether a quota entry exists
//! for it. Observations are taken fresh on every cycle and never cached.

use std::fmt;
use std::str::FromStr;

use crate::client::{QuotaQuery, StorageClient, Volume};
use crate::error::{FailureCause, QuotaError, Result};

/// At most this many quota entries are fetched when checking for existence
pub const QUOTA_LOOKUP_MAX_RECORDS: u32 = 2;

/// Quota enforcement status of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaStatus {
    On,
    Off,
}

impl QuotaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaStatus::On => "on",
            QuotaStatus::Off => "off",
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotaStatus {
    type Err = FailureCause;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "on" => Ok(QuotaStatus::On),
            "off" => Ok(QuotaStatus::Off),
            other => Err(FailureCause::UnexpectedStatus(other.to_string())),
        }
    }
}

/// A volume's quota state at one inspection moment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaObservation {
    pub volume: Volume,
    pub has_quota_object: bool,
    pub current_status: QuotaStatus,
}

/// Inspect a volume's quota status and whether it has a quota entry
pub async fn inspect(
    client: &dyn StorageClient,
    svm: &str,
    volume: &Volume,
) -> Result<QuotaObservation> {
    let current_status = quota_status(client, svm, &volume.name).await?;
    let has_quota_object = has_quota_object(client, svm, &volume.name).await?;

    Ok(QuotaObservation {
        volume: volume.clone(),
        has_quota_object,
        current_status,
    })
}

/// Query the enforcement status of a volume
pub async fn quota_status(client: &dyn StorageClient, svm: &str, volume: &str) -> Result<QuotaStatus> {
    let status_error = |cause| QuotaError::StatusQuery {
        volume: volume.to_string(),
        cause,
    };

    let record = client
        .quota_status(svm, volume)
        .await
        .map_err(|e| status_error(FailureCause::Transport(e)))?
        .into_passed()
        .map_err(status_error)?;

    record.status.parse().map_err(status_error)
}

/// Check whether a quota entry exists for exactly this volume
pub async fn has_quota_object(client: &dyn StorageClient, svm: &str, volume: &str) -> Result<bool> {
    let lookup_error = |cause| QuotaError::QuotaLookup {
        volume: volume.to_string(),
        cause,
    };

    let query = QuotaQuery {
        svm: svm.to_string(),
        volume: volume.to_string(),
        max_records: QUOTA_LOOKUP_MAX_RECORDS,
    };

    let entries = client
        .list_quota_entries(&query)
        .await
        .map_err(|e| lookup_error(FailureCause::Transport(e)))?
        .into_passed()
        .map_err(lookup_error)?;

    Ok(entries.iter().any(|entry| entry.volume == volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockStorageClient, Operation};

    #[test]
    fn test_parse_status() {
        assert_eq!("on".parse::<QuotaStatus>().unwrap(), QuotaStatus::On);
        assert_eq!("off".parse::<QuotaStatus>().unwrap(), QuotaStatus::Off);
        assert!(matches!(
            "resizing".parse::<QuotaStatus>(),
            Err(FailureCause::UnexpectedStatus(s)) if s == "resizing"
        ));
        assert!("ON".parse::<QuotaStatus>().is_err());
    }

    #[tokio::test]
    async fn test_inspect_volume_with_quota() {
        let client = MockStorageClient::new().with_volume("vol_a", "off", true);

        let observation = inspect(&client, "svm1", &Volume::new("vol_a")).await.unwrap();
        assert_eq!(
            observation,
            QuotaObservation {
                volume: Volume::new("vol_a"),
                has_quota_object: true,
                current_status: QuotaStatus::Off,
            }
        );
    }

    #[tokio::test]
    async fn test_inspect_volume_without_quota() {
        let client = MockStorageClient::new().with_volume("vol_b", "on", false);

        let observation = inspect(&client, "svm1", &Volume::new("vol_b")).await.unwrap();
        assert!(!observation.has_quota_object);
        assert_eq!(observation.current_status, QuotaStatus::On);
    }

    #[tokio::test]
    async fn test_lookup_is_bounded_and_exact() {
        // Entries for other volumes do not count as a quota object
        let client = MockStorageClient::new()
            .with_volume("vol_a", "on", true)
            .with_volume("vol_b", "on", false)
            .with_stray_quota_entry("vol_bb");

        assert!(!has_quota_object(&client, "svm1", "vol_b").await.unwrap());

        // Only two records are fetched, so the real entry is cut off behind two strays
        let client = MockStorageClient::new()
            .with_volume("vol_a", "on", true)
            .with_stray_quota_entry("vol_a1")
            .with_stray_quota_entry("vol_a2");
        assert!(!has_quota_object(&client, "svm1", "vol_a").await.unwrap());
    }

    #[tokio::test]
    async fn test_status_rejection_carries_reason() {
        let client = MockStorageClient::new().with_volume("vol_a", "on", true);
        client
            .reject(Operation::QuotaStatus, "vol_a", "Volume is offline")
            .await;

        let err = inspect(&client, "svm1", &Volume::new("vol_a")).await.unwrap_err();
        assert!(matches!(err, QuotaError::StatusQuery { ref volume, .. } if volume == "vol_a"));
        assert_eq!(err.reason(), Some("Volume is offline"));
    }

    #[tokio::test]
    async fn test_status_transport_failure() {
        let client = MockStorageClient::new().with_volume("vol_a", "on", true);
        client
            .break_operation(Operation::QuotaStatus, "vol_a", "connection reset")
            .await;

        let err = inspect(&client, "svm1", &Volume::new("vol_a")).await.unwrap_err();
        assert!(matches!(
            err,
            QuotaError::StatusQuery {
                cause: FailureCause::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unexpected_status_is_a_status_error() {
        let client = MockStorageClient::new().with_volume("vol_a", "initializing", true);

        let err = inspect(&client, "svm1", &Volume::new("vol_a")).await.unwrap_err();
        assert!(matches!(
            err,
            QuotaError::StatusQuery {
                cause: FailureCause::UnexpectedStatus(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_lookup_rejection_is_a_lookup_error() {
        let client = MockStorageClient::new().with_volume("vol_a", "on", true);
        client
            .reject(Operation::ListQuotaEntries, "vol_a", "insufficient privileges")
            .await;

        let err = inspect(&client, "svm1", &Volume::new("vol_a")).await.unwrap_err();
        assert!(matches!(err, QuotaError::QuotaLookup { .. }));
        assert_eq!(err.reason(), Some("insufficient privileges"));
    }
}
