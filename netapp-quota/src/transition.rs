//! Quota on/off transitions

use std::fmt;
use tracing::info;

use crate::client::StorageClient;
use crate::error::{FailureCause, QuotaError, Result};
use crate::inspector::QuotaStatus;

/// State a scheduling cycle pushes volumes toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionTarget {
    On,
    Off,
}

impl TransitionTarget {
    /// Status a volume must currently have for this target to act on it
    pub fn required_status(&self) -> QuotaStatus {
        match self {
            TransitionTarget::On => QuotaStatus::Off,
            TransitionTarget::Off => QuotaStatus::On,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionTarget::On => "on",
            TransitionTarget::Off => "off",
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switch quota enforcement for a single volume, one attempt
pub async fn transition(
    client: &dyn StorageClient,
    svm: &str,
    volume: &str,
    target: TransitionTarget,
) -> Result<()> {
    info!("switch quota to {} vserver={} volume={}", target, svm, volume);

    let response = match target {
        TransitionTarget::On => client.quota_on(svm, volume).await,
        TransitionTarget::Off => client.quota_off(svm, volume).await,
    };

    let transition_error = |cause| QuotaError::Transition {
        volume: volume.to_string(),
        target,
        cause,
    };

    response
        .map_err(|e| transition_error(FailureCause::Transport(e)))?
        .into_passed()
        .map_err(transition_error)
}
