use async_trait::async_trait;
use teloxide::{
    payloads::SendMessageSetters,
    requests::Requester,
    types::{ChatId, ParseMode},
    Bot,
};
use tracing::info;

use common::{Error, NotificationChannel, Result};

/// Delivers HTML-formatted messages to one Telegram chat.
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Self {
        info!(chat_id, "Telegram channel configured");
        Self {
            bot: Bot::new(token),
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn deliver(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| Error::Notification(e.to_string()))
    }
}
