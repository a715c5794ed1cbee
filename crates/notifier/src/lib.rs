pub mod dispatcher;
pub mod format;
pub mod log_channel;
pub mod telegram;

pub use dispatcher::NotificationDispatcher;
pub use log_channel::LogChannel;
pub use telegram::TelegramChannel;
