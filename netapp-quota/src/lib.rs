//! netapp-quota: scheduled quota enforcement for NetApp volumes
//!
//! Toggles quota enforcement on a fleet of volumes using two alternating
//! intervals instead of a cron expression: a short "enforce on" interval
//! and a long "enforce off" interval.
//!
//! # Features
//!
//! - Volume selection by name prefix, re-evaluated on every cycle
//! - Only volumes with an existing quota entry are switched
//! - Per-volume fault isolation: one failing volume never stalls the batch
//! - ONTAP REST API transport with basic auth
//! - Optional Slack alerts for error records
//!
//! # Example Configuration
//!
//! ```toml
//! [ontap]
//! url = "https://cluster1.example.com"
//! user = "admin"
//! password = "secret"
//!
//! [schedule]
//! svm = "svm1"
//! prefix = "vol_"
//! on_interval_seconds = 10
//! off_interval_seconds = 300
//!
//! [alert]
//! slack_url = "https://hooks.slack.com/services/T000/B000/XXXX"
//! slack_channel = "#storage"
//! ```

pub mod alert;
pub mod client;
pub mod config;
pub mod error;
pub mod inspector;
pub mod mock;
pub mod ontap;
pub mod scheduler;
pub mod selector;
#[cfg(test)]
mod test_support;
pub mod transition;

pub use client::{StorageClient, Volume};
pub use config::QuotaConfig;
pub use error::{QuotaError, Result};
pub use inspector::{QuotaObservation, QuotaStatus};
pub use ontap::OntapClient;
pub use scheduler::DualIntervalScheduler;
pub use selector::VolumeSelector;
pub use transition::TransitionTarget;
