//! Dual interval quota scheduler
//!
//! Runs two independent loops against one shared [`StorageClient`]:
//!
//! - the "enforce off" loop switches quota off on volumes currently `on`,
//!   every `off_interval`
//! - the "enforce on" loop switches quota on for volumes currently `off`,
//!   every `on_interval`
//!
//! Each tick runs one cycle: select volumes, read each one's status, and
//! switch those that are in the required state and already have a quota
//! entry. The quota entry lookup only runs for volumes in the required state.
//! Errors are logged at the smallest scope (volume or cycle) and never stop
//! a loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::client::{StorageClient, Volume};
use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::inspector::{has_quota_object, quota_status};
use crate::selector::VolumeSelector;
use crate::transition::{transition, TransitionTarget};

/// Outcome of processing a single volume in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeOutcome {
    Switched,
    AlreadyInState,
    NoQuotaEntry,
}

/// Per-cycle counters, logged at the end of each cycle
#[derive(Debug, Default)]
struct CycleSummary {
    selected: usize,
    switched: usize,
    skipped: usize,
    failed: usize,
}

/// Orchestrates the "enforce off" and "enforce on" loops
pub struct DualIntervalScheduler {
    client: Arc<dyn StorageClient>,
    selector: VolumeSelector,
    svm: String,
    on_interval: Duration,
    off_interval: Duration,
}

impl DualIntervalScheduler {
    /// Create a scheduler from schedule configuration
    pub fn new(client: Arc<dyn StorageClient>, schedule: &ScheduleConfig) -> Self {
        Self {
            client,
            selector: VolumeSelector::new(schedule.prefix.clone()),
            svm: schedule.svm.clone(),
            on_interval: schedule.on_interval(),
            off_interval: schedule.off_interval(),
        }
    }

    /// Interval between two cycles for a target
    pub fn interval(&self, target: TransitionTarget) -> Duration {
        match target {
            TransitionTarget::On => self.on_interval,
            TransitionTarget::Off => self.off_interval,
        }
    }

    /// Run one cycle pushing every eligible volume toward `target`
    pub async fn run_cycle(&self, target: TransitionTarget) {
        let volumes = match self.selector.discover(self.client.as_ref()).await {
            Ok(volumes) => volumes,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };

        let mut summary = CycleSummary {
            selected: volumes.len(),
            ..Default::default()
        };

        for volume in &volumes {
            match self.process_volume(volume, target).await {
                Ok(VolumeOutcome::Switched) => summary.switched += 1,
                Ok(VolumeOutcome::AlreadyInState | VolumeOutcome::NoQuotaEntry) => {
                    summary.skipped += 1
                }
                Err(e) => {
                    error!("{}", e);
                    summary.failed += 1;
                }
            }
        }

        debug!(
            "Quota {} cycle done: {} selected, {} switched, {} skipped, {} failed",
            target, summary.selected, summary.switched, summary.skipped, summary.failed
        );
    }

    async fn process_volume(&self, volume: &Volume, target: TransitionTarget) -> Result<VolumeOutcome> {
        let client = self.client.as_ref();

        if quota_status(client, &self.svm, &volume.name).await? != target.required_status() {
            return Ok(VolumeOutcome::AlreadyInState);
        }

        // Quota entries are never created, only toggled
        if !has_quota_object(client, &self.svm, &volume.name).await? {
            debug!("Volume {} has no quota entry, skipping", volume.name);
            return Ok(VolumeOutcome::NoQuotaEntry);
        }

        transition(client, &self.svm, &volume.name, target).await?;
        Ok(VolumeOutcome::Switched)
    }

    async fn run_loop(self: Arc<Self>, target: TransitionTarget) {
        let interval = self.interval(target);
        info!("Starting quota {} loop (every {}s)", target, interval.as_secs());

        loop {
            self.run_cycle(target).await;
            tokio::time::sleep(interval).await;
        }
    }

    /// Start both loops as background tasks
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let off = tokio::spawn(self.clone().run_loop(TransitionTarget::Off));
        let on = tokio::spawn(self.run_loop(TransitionTarget::On));

        SchedulerHandle { off, on }
    }

    /// Run both loops until the process is terminated
    pub async fn run(self: Arc<Self>) {
        self.spawn().join().await;
    }
}

/// Handles to the two running loops
pub struct SchedulerHandle {
    off: JoinHandle<()>,
    on: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop both loops
    pub fn abort(&self) {
        self.off.abort();
        self.on.abort();
    }

    /// Wait for both loops to end
    pub async fn join(self) {
        let (off, on) = tokio::join!(self.off, self.on);

        for (target, result) in [(TransitionTarget::Off, off), (TransitionTarget::On, on)] {
            match result {
                Ok(()) => info!("Quota {} loop exited", target),
                Err(e) if e.is_cancelled() => debug!("Quota {} loop stopped", target),
                Err(e) => error!("Quota {} loop panicked: {}", target, e),
            }
        }
    }
}
