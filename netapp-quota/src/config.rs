//! Configuration for netapp-quota

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{QuotaError, Result};

/// Main daemon configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Storage controller connection
    pub ontap: OntapConfig,
    /// Volume scope and intervals
    pub schedule: ScheduleConfig,
    /// Slack alerting for error records (optional)
    pub alert: Option<AlertConfig>,
}

/// Storage controller connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OntapConfig {
    /// API endpoint (e.g., "https://cluster1.example.com")
    pub url: String,
    /// Basic auth user
    #[serde(default)]
    pub user: String,
    /// Basic auth password
    #[serde(default)]
    pub password: String,
    /// Verify the controller's TLS certificate
    #[serde(default)]
    pub verify_tls: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Volume scope and intervals
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// Volume name prefix; empty selects every volume
    #[serde(default)]
    pub prefix: String,
    /// Scope server (SVM) the quotas live in
    pub svm: String,
    /// Seconds between "enforce on" cycles
    #[serde(default = "default_on_interval")]
    pub on_interval_seconds: u64,
    /// Seconds between "enforce off" cycles
    #[serde(default = "default_off_interval")]
    pub off_interval_seconds: u64,
}

/// Slack alerting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertConfig {
    /// Incoming webhook URL
    pub slack_url: String,
    /// Channel to post to
    pub slack_channel: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_icon_emoji")]
    pub icon_emoji: String,
    /// Webhook request timeout in seconds
    #[serde(default = "default_alert_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    30
}

fn default_on_interval() -> u64 {
    10
}

fn default_off_interval() -> u64 {
    300
}

fn default_username() -> String {
    "netapp-quota".to_string()
}

fn default_icon_emoji() -> String {
    ":ghost:".to_string()
}

fn default_alert_timeout() -> u64 {
    10
}

impl ScheduleConfig {
    pub fn on_interval(&self) -> Duration {
        Duration::from_secs(self.on_interval_seconds)
    }

    pub fn off_interval(&self) -> Duration {
        Duration::from_secs(self.off_interval_seconds)
    }
}

impl AlertConfig {
    pub fn new(slack_url: String, slack_channel: String) -> Self {
        Self {
            slack_url,
            slack_channel,
            username: default_username(),
            icon_emoji: default_icon_emoji(),
            timeout_seconds: default_alert_timeout(),
        }
    }
}

impl QuotaConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuotaError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| QuotaError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Create a default development configuration
    pub fn development() -> Self {
        Self {
            ontap: OntapConfig {
                url: "https://127.0.0.1".to_string(),
                user: "admin".to_string(),
                password: String::new(),
                verify_tls: false,
                timeout_seconds: default_timeout(),
            },
            schedule: ScheduleConfig {
                prefix: String::new(),
                svm: "svm1".to_string(),
                on_interval_seconds: default_on_interval(),
                off_interval_seconds: default_off_interval(),
            },
            alert: None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.ontap.url).map_err(|e| {
            QuotaError::Config(format!("Invalid controller URL '{}': {}", self.ontap.url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(QuotaError::Config(format!(
                "Unsupported controller URL scheme '{}'",
                url.scheme()
            )));
        }

        if self.schedule.svm.is_empty() {
            return Err(QuotaError::Config("No svm configured".to_string()));
        }

        if self.schedule.on_interval_seconds == 0 || self.schedule.off_interval_seconds == 0 {
            return Err(QuotaError::Config(
                "Intervals must be at least one second".to_string(),
            ));
        }

        if let Some(alert) = &self.alert {
            if alert.timeout_seconds == 0 {
                return Err(QuotaError::Config(
                    "Slack timeout must be at least one second".to_string(),
                ));
            }
            url::Url::parse(&alert.slack_url).map_err(|e| {
                QuotaError::Config(format!("Invalid Slack webhook URL '{}': {}", alert.slack_url, e))
            })?;
        }

        Ok(())
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self::development()
    }
}
