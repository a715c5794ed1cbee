use async_trait::async_trait;
use tracing::info;

use common::{NotificationChannel, Result};

/// Writes notifications to the log instead of sending them. Used for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, text: &str) -> Result<()> {
        info!(message = %text, "Notification");
        Ok(())
    }
}
