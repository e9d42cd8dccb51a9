//! In-memory storage controller for testing
//!
//! Keeps a small volume inventory, records every call it receives and can be
//! scripted to fail individual operations. Switching quota on or off updates
//! the stored status, so consecutive cycles observe the new state.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::{
    ApiResults, ClientResult, QuotaEntry, QuotaQuery, QuotaStatusRecord, StorageClient, Volume,
};
use crate::error::ClientError;

/// Storage client operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListVolumes,
    QuotaStatus,
    ListQuotaEntries,
    QuotaOn,
    QuotaOff,
}

/// A call received by the mock controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: Operation,
    pub svm: String,
    pub volume: String,
}

#[derive(Debug, Clone)]
enum Failure {
    Rejected(String),
    Transport(String),
}

impl Failure {
    fn into_result<T: Default>(self) -> ClientResult<T> {
        match self {
            Failure::Rejected(reason) => Ok(ApiResults::failed(reason)),
            Failure::Transport(message) => Err(ClientError::Status {
                status: 503,
                message,
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct MockVolume {
    name: String,
    status: String,
    has_quota: bool,
}

#[derive(Debug, Default)]
struct MockState {
    volumes: Vec<MockVolume>,
    stray_entries: Vec<String>,
    inventory_failure: Option<Failure>,
    failures: HashMap<(Operation, String), Failure>,
    calls: Vec<MockCall>,
}

/// Mock storage controller
pub struct MockStorageClient {
    svm: String,
    state: Mutex<MockState>,
}

impl MockStorageClient {
    /// Create an empty controller serving the `svm1` scope server
    pub fn new() -> Self {
        Self::with_svm("svm1")
    }

    /// Create an empty controller serving the given scope server
    pub fn with_svm(svm: impl Into<String>) -> Self {
        Self {
            svm: svm.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Add a volume with a quota status and optional quota entry
    pub fn with_volume(mut self, name: &str, status: &str, has_quota: bool) -> Self {
        self.state.get_mut().volumes.push(MockVolume {
            name: name.to_string(),
            status: status.to_string(),
            has_quota,
        });
        self
    }

    /// Add a quota entry returned by every lookup regardless of the queried volume
    pub fn with_stray_quota_entry(mut self, volume: &str) -> Self {
        self.state.get_mut().stray_entries.push(volume.to_string());
        self
    }

    /// Make the inventory listing report `passed = false`
    pub async fn reject_inventory(&self, reason: &str) {
        self.state.lock().await.inventory_failure = Some(Failure::Rejected(reason.to_string()));
    }

    /// Make the inventory listing fail at the transport level
    pub async fn break_inventory(&self, message: &str) {
        self.state.lock().await.inventory_failure = Some(Failure::Transport(message.to_string()));
    }

    /// Make an operation on a volume report `passed = false`
    pub async fn reject(&self, operation: Operation, volume: &str, reason: &str) {
        self.state.lock().await.failures.insert(
            (operation, volume.to_string()),
            Failure::Rejected(reason.to_string()),
        );
    }

    /// Make an operation on a volume fail at the transport level
    pub async fn break_operation(&self, operation: Operation, volume: &str, message: &str) {
        self.state.lock().await.failures.insert(
            (operation, volume.to_string()),
            Failure::Transport(message.to_string()),
        );
    }

    /// Remove every scripted failure
    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.inventory_failure = None;
        state.failures.clear();
    }

    /// Change the stored status of a volume
    pub async fn set_status(&self, volume: &str, status: &str) {
        let mut state = self.state.lock().await;
        if let Some(v) = state.volumes.iter_mut().find(|v| v.name == volume) {
            v.status = status.to_string();
        }
    }

    /// Current stored status of a volume
    pub async fn status_of(&self, volume: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .volumes
            .iter()
            .find(|v| v.name == volume)
            .map(|v| v.status.clone())
    }

    /// Every call received so far
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that switched quota on or off
    pub async fn transition_calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c.operation, Operation::QuotaOn | Operation::QuotaOff))
            .cloned()
            .collect()
    }

    /// Number of calls made for an operation
    pub async fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Forget recorded calls
    pub async fn reset_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    fn record(state: &mut MockState, operation: Operation, svm: &str, volume: &str) {
        state.calls.push(MockCall {
            operation,
            svm: svm.to_string(),
            volume: volume.to_string(),
        });
    }

    async fn switch(&self, operation: Operation, svm: &str, volume: &str) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, operation, svm, volume);

        if let Some(failure) = state.failures.get(&(operation, volume.to_string())) {
            return failure.clone().into_result();
        }
        if svm != self.svm {
            return Ok(ApiResults::failed(format!("Vserver {} not found", svm)));
        }

        let status = if operation == Operation::QuotaOn { "on" } else { "off" };
        match state.volumes.iter_mut().find(|v| v.name == volume) {
            Some(v) => {
                debug!("Mock: quota {} for {}", status, volume);
                v.status = status.to_string();
                Ok(ApiResults::passed(()))
            }
            None => Ok(ApiResults::failed(format!("Volume {} not found", volume))),
        }
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StorageClient for MockStorageClient {
    async fn list_volumes(&self) -> ClientResult<Vec<Volume>> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, Operation::ListVolumes, "", "");

        if let Some(failure) = state.inventory_failure.clone() {
            return failure.into_result();
        }

        Ok(ApiResults::passed(
            state.volumes.iter().map(|v| Volume::new(&v.name)).collect(),
        ))
    }

    async fn quota_status(&self, svm: &str, volume: &str) -> ClientResult<QuotaStatusRecord> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, Operation::QuotaStatus, svm, volume);

        if let Some(failure) = state.failures.get(&(Operation::QuotaStatus, volume.to_string())) {
            return failure.clone().into_result();
        }
        if svm != self.svm {
            return Ok(ApiResults::failed(format!("Vserver {} not found", svm)));
        }

        match state.volumes.iter().find(|v| v.name == volume) {
            Some(v) => Ok(ApiResults::passed(QuotaStatusRecord {
                status: v.status.clone(),
            })),
            None => Ok(ApiResults::failed(format!("Volume {} not found", volume))),
        }
    }

    async fn list_quota_entries(&self, query: &QuotaQuery) -> ClientResult<Vec<QuotaEntry>> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, Operation::ListQuotaEntries, &query.svm, &query.volume);

        if let Some(failure) = state
            .failures
            .get(&(Operation::ListQuotaEntries, query.volume.clone()))
        {
            return failure.clone().into_result();
        }
        if query.svm != self.svm {
            return Ok(ApiResults::passed(Vec::new()));
        }

        let entries = state
            .stray_entries
            .iter()
            .cloned()
            .chain(
                state
                    .volumes
                    .iter()
                    .filter(|v| v.has_quota && v.name == query.volume)
                    .map(|v| v.name.clone()),
            )
            .take(query.max_records as usize)
            .map(|volume| QuotaEntry {
                svm: self.svm.clone(),
                volume,
            })
            .collect();

        Ok(ApiResults::passed(entries))
    }

    async fn quota_on(&self, svm: &str, volume: &str) -> ClientResult<()> {
        self.switch(Operation::QuotaOn, svm, volume).await
    }

    async fn quota_off(&self, svm: &str, volume: &str) -> ClientResult<()> {
        self.switch(Operation::QuotaOff, svm, volume).await
    }
}
