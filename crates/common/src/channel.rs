use async_trait::async_trait;

use crate::Result;

/// Outbound message sink. `Ok(())` means the message was accepted for delivery.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<()>;
}
