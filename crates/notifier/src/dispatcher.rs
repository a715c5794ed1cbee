use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use common::{NotificationChannel, Notice, NotifySettings};

use crate::format;

/// Delivers notices through a channel with bounded exponential backoff.
///
/// A failed delivery is logged and dropped; callers never see an error.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    max_attempts: u32,
    backoff_base: Duration,
    display_offset: FixedOffset,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, settings: &NotifySettings) -> Self {
        let display_offset = settings
            .display_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self {
            channel,
            max_attempts: settings.max_attempts.max(1),
            backoff_base: settings.backoff_base(),
            display_offset,
        }
    }

    /// Try up to `max_attempts` times. Returns whether the message went out.
    pub async fn send(&self, message: &str) -> bool {
        for attempt in 0..self.max_attempts {
            match self.channel.deliver(message).await {
                Ok(()) => {
                    info!(attempt = attempt + 1, "Notification delivered");
                    return true;
                }
                Err(e) => {
                    let backoff = self.backoff_base.mul_f64(2f64.powi(attempt as i32));
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Notification attempt failed"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        error!(
            max_attempts = self.max_attempts,
            "Notification dropped after all attempts failed"
        );
        false
    }

    pub fn render(&self, notice: &Notice) -> String {
        format::render(notice, self.display_offset)
    }

    /// Drain notices one at a time until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<Notice>) {
        info!("Notification dispatcher running");
        while let Some(notice) = rx.recv().await {
            let text = self.render(&notice);
            self.send(&text).await;
        }
        info!("Notice channel closed, dispatcher stopping");
    }
}
