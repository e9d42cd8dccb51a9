//! netapp-quota: NetApp quota enforcement daemon
//!
//! Switches quota enforcement off on a long interval and back on on a
//! short interval for every volume matching a prefix.

use clap::Parser;
use netapp_quota::alert::SlackAlertLayer;
use netapp_quota::config::AlertConfig;
use netapp_quota::{DualIntervalScheduler, OntapClient, QuotaConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "netapp-quota", version)]
#[command(about = "Toggle NetApp volume quota enforcement on two intervals", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// NetApp API endpoint (required without --config)
    #[arg(long, required_unless_present = "config")]
    url: Option<String>,

    /// NetApp API basic auth user
    #[arg(long)]
    user: Option<String>,

    /// NetApp API basic auth password
    #[arg(long, env = "NETAPP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Volume name prefix
    #[arg(long)]
    prefix: Option<String>,

    /// SVM server name
    #[arg(long)]
    svm: Option<String>,

    /// Seconds between quota on cycles
    #[arg(long)]
    on_interval: Option<u64>,

    /// Seconds between quota off cycles
    #[arg(long)]
    off_interval: Option<u64>,

    /// Slack webhook URL
    #[arg(long, requires = "slack_channel")]
    slack_url: Option<String>,

    /// Slack channel
    #[arg(long, requires = "slack_url")]
    slack_channel: Option<String>,
}

impl Cli {
    /// Apply command line values on top of the file configuration
    fn apply(self, config: &mut QuotaConfig) {
        if let Some(url) = self.url {
            config.ontap.url = url;
        }
        if let Some(user) = self.user {
            config.ontap.user = user;
        }
        if let Some(password) = self.password {
            config.ontap.password = password;
        }
        if let Some(prefix) = self.prefix {
            config.schedule.prefix = prefix;
        }
        if let Some(svm) = self.svm {
            config.schedule.svm = svm;
        }
        if let Some(secs) = self.on_interval {
            config.schedule.on_interval_seconds = secs;
        }
        if let Some(secs) = self.off_interval {
            config.schedule.off_interval_seconds = secs;
        }
        if let (Some(url), Some(channel)) = (self.slack_url, self.slack_channel) {
            config.alert = Some(AlertConfig::new(url, channel));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_source) = match &cli.config {
        Some(path) => (QuotaConfig::from_file(path)?, path.display().to_string()),
        None => (QuotaConfig::development(), "command line".to_string()),
    };
    cli.apply(&mut config);
    config.validate()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netapp_quota=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(config.alert.clone().map(SlackAlertLayer::spawn))
        .init();

    info!("Starting netapp-quota v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_source);
    info!("  Controller: {}", config.ontap.url);
    info!("  SVM: {}", config.schedule.svm);
    info!("  Volume prefix: '{}'", config.schedule.prefix);
    if config.alert.is_some() {
        info!("  Slack alerts enabled");
    }

    let client = Arc::new(OntapClient::new(&config.ontap)?);
    let scheduler = Arc::new(DualIntervalScheduler::new(client, &config.schedule));
    let handle = scheduler.spawn();

    shutdown_signal().await;
    info!("Shutdown signal received, stopping");
    handle.abort();
    handle.join().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
