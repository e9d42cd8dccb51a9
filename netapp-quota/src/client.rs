//! Storage controller abstraction
//!
//! The scheduler only talks to the controller through [`StorageClient`].
//! Every call returns an [`ApiResults`] record so that a controller-side
//! rejection (`passed = false`) is distinguishable from a transport failure.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, FailureCause};

/// Result of a storage client call at the transport level
pub type ClientResult<T> = std::result::Result<ApiResults<T>, ClientError>;

/// Volume as listed in the controller inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name
    pub name: String,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Quota status as reported by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatusRecord {
    /// Raw status string (`on`, `off`, or a transitional state)
    pub status: String,
}

/// A quota configuration entry attached to a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    /// Scope server owning the entry
    pub svm: String,
    /// Volume the entry applies to
    pub volume: String,
}

/// Bounded quota entry lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaQuery {
    pub svm: String,
    pub volume: String,
    pub max_records: u32,
}

/// Explicit success/failure record for a controller response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResults<T> {
    /// Whether the controller accepted the request
    pub passed: bool,
    /// Server-supplied reason when `passed` is false
    pub reason: Option<String>,
    /// Response payload (default value when the call did not pass)
    pub data: T,
}

impl<T> ApiResults<T> {
    /// Successful response carrying `data`
    pub fn passed(data: T) -> Self {
        Self {
            passed: true,
            reason: None,
            data,
        }
    }

    /// Convert into the payload, or the server-supplied reason
    pub fn into_passed(self) -> std::result::Result<T, FailureCause> {
        if self.passed {
            Ok(self.data)
        } else {
            Err(FailureCause::Rejected(
                self.reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            ))
        }
    }
}

impl<T: Default> ApiResults<T> {
    /// Rejected response with a server-supplied reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            data: T::default(),
        }
    }
}

/// Authenticated capability against a storage controller
///
/// Shared by both scheduling loops, so implementations must be safe to call
/// concurrently and keep no state between calls.
#[async_trait::async_trait]
pub trait StorageClient: Send + Sync {
    /// List every volume in the controller inventory
    async fn list_volumes(&self) -> ClientResult<Vec<Volume>>;

    /// Get the quota enforcement status of a volume
    async fn quota_status(&self, svm: &str, volume: &str) -> ClientResult<QuotaStatusRecord>;

    /// Look up quota entries matching a query
    async fn list_quota_entries(&self, query: &QuotaQuery) -> ClientResult<Vec<QuotaEntry>>;

    /// Turn quota enforcement on
    async fn quota_on(&self, svm: &str, volume: &str) -> ClientResult<()>;

    /// Turn quota enforcement off
    async fn quota_off(&self, svm: &str, volume: &str) -> ClientResult<()>;
}
