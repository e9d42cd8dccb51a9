//! Slack alerting for error log records
//!
//! [`SlackAlertLayer`] captures ERROR-level tracing events and hands them to
//! a background task that posts them to a Slack incoming webhook. The queue
//! is bounded: when delivery falls behind, new alerts are dropped and
//! counted. Delivery failures are logged at WARN so they never loop back
//! into the layer.

use serde::Serialize;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{warn, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::AlertConfig;

/// Slack webhook payload
#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    channel: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
    text: String,
}

/// Collects the message and fields of an event into one line
#[derive(Default)]
struct AlertVisitor {
    message: String,
    fields: String,
}

impl Visit for AlertVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Alerts waiting for delivery before new ones are dropped
pub const ALERT_QUEUE_CAPACITY: usize = 64;

/// Render an event as alert text
pub(crate) fn render(event: &Event<'_>) -> String {
    let mut visitor = AlertVisitor::default();
    event.record(&mut visitor);
    format!("{}{}", visitor.message, visitor.fields)
}

/// Tracing layer forwarding ERROR events to a bounded channel
pub struct SlackAlertLayer {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

impl SlackAlertLayer {
    /// Create a layer sending alert text into `tx`
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a layer and spawn the task delivering alerts to Slack
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: AlertConfig) -> Self {
        let (tx, rx) = mpsc::channel(ALERT_QUEUE_CAPACITY);
        let layer = Self::new(tx);
        tokio::spawn(deliver(config, rx, layer.dropped.clone()));
        layer
    }

    /// Number of alerts dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<S: Subscriber> Layer<S> for SlackAlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        match self.tx.try_send(render(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // Delivery task ended; nothing to do
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

async fn deliver(config: AlertConfig, mut rx: mpsc::Receiver<String>, dropped: Arc<AtomicU64>) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Slack alerts disabled, failed to create HTTP client: {}", e);
            return;
        }
    };

    let mut reported_drops = 0;
    while let Some(text) = rx.recv().await {
        let drops = dropped.load(Ordering::Relaxed);
        if drops > reported_drops {
            warn!("{} Slack alerts dropped, queue full", drops - reported_drops);
            reported_drops = drops;
        }

        let message = SlackMessage {
            channel: &config.slack_channel,
            username: &config.username,
            icon_emoji: &config.icon_emoji,
            text,
        };

        match client.post(&config.slack_url).json(&message).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!("Slack webhook returned HTTP {}", response.status()),
            Err(e) => warn!("Failed to post alert to Slack: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tracing::{error, info};
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(16);
        let subscriber = tracing_subscriber::registry().with(SlackAlertLayer::new(tx));
        tracing::subscriber::with_default(subscriber, f);

        let mut alerts = Vec::new();
        while let Ok(text) = rx.try_recv() {
            alerts.push(text);
        }
        alerts
    }

    #[test]
    fn test_only_errors_are_forwarded() {
        let alerts = capture(|| {
            info!("switch quota to on vserver=svm1 volume=vol_a");
            warn!("slow response");
            error!("getQuotaStatus failed for volume vol_a");
        });

        assert_eq!(alerts, vec!["getQuotaStatus failed for volume vol_a".to_string()]);
    }

    #[test]
    fn test_fields_are_appended() {
        let alerts = capture(|| {
            error!(volume = "vol_b", attempt = 3, "switchQuota failed");
        });

        assert_eq!(alerts, vec!["switchQuota failed volume=vol_b attempt=3".to_string()]);
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (tx, mut rx) = mpsc::channel(2);
        let layer = SlackAlertLayer::new(tx);
        let dropped = layer.dropped.clone();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            for i in 0..5 {
                error!("quota lookup failed for volume vol_{}", i);
            }
        });

        assert_eq!(dropped.load(Ordering::Relaxed), 3);
        assert_eq!(rx.try_recv().unwrap(), "quota lookup failed for volume vol_0");
        assert_eq!(rx.try_recv().unwrap(), "quota lookup failed for volume vol_1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unresponsive_webhook_does_not_stall_delivery() {
        // Accepts connections but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut config = AlertConfig::new(format!("http://{}/hook", addr), "#storage".to_string());
        config.timeout_seconds = 1;

        let (tx, rx) = mpsc::channel(ALERT_QUEUE_CAPACITY);
        let delivery = tokio::spawn(deliver(config, rx, Arc::new(AtomicU64::new(0))));
        for i in 0..3 {
            tx.send(format!("alert {}", i)).await.unwrap();
        }
        drop(tx);

        let finished = tokio::time::timeout(Duration::from_secs(15), delivery).await;
        assert!(finished.is_ok(), "delivery should time out each post and drain the queue");
    }

    #[test]
    fn test_payload_shape() {
        let message = SlackMessage {
            channel: "#storage",
            username: "netapp-quota",
            icon_emoji: ":ghost:",
            text: "boom".to_string(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["channel"], "#storage");
        assert_eq!(value["icon_emoji"], ":ghost:");
        assert_eq!(value["text"], "boom");
    }
}
