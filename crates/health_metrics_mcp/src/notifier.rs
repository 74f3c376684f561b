use async_trait::async_trait;
use tracing::info;

use health_metrics_core::{MetricsError, NotificationDispatcher};

/// Server-side stand-in for a device notification: the message goes to the
/// log, where the host can pick it up.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn schedule(&self, title: &str, body: &str) -> Result<(), MetricsError> {
        info!(title, body, "achievement notification");
        Ok(())
    }
}
