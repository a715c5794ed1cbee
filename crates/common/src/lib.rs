pub mod channel;
pub mod config;
pub mod error;
pub mod exchange;
pub mod settings;
pub mod types;

pub use channel::NotificationChannel;
pub use config::Config;
pub use error::{Error, Result};
pub use exchange::MarketDataProvider;
pub use settings::{
    DetectionSettings, FetchSettings, MonitorSettings, NotifySettings, ScheduleSettings,
    UniverseSettings,
};
pub use types::*;
