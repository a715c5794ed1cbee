use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{Config, MarketDataProvider, MonitorSettings, NotificationChannel, Notice, NotifyMode};
use engine::{BinanceFuturesClient, Engine, SymbolUniverse};
use notifier::{LogChannel, NotificationDispatcher, TelegramChannel};

const STARTUP_MESSAGE: &str = "✅ wickwatch online. Notifications are working.";

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(notify = ?cfg.notify_mode, "wickwatch starting");

    let settings = MonitorSettings::load(&cfg.monitor_config_path).unwrap_or_else(|e| {
        panic!("Failed to load monitor settings from '{}': {e}", cfg.monitor_config_path)
    });

    // ── Market data ───────────────────────────────────────────────────────────
    let provider: Arc<dyn MarketDataProvider> = Arc::new(
        BinanceFuturesClient::new(&cfg.binance_futures_url)
            .unwrap_or_else(|e| panic!("Failed to build Binance client: {e}")),
    );
    info!(url = %cfg.binance_futures_url, "Binance futures client ready");

    // ── Notifications (injected based on NOTIFY_MODE) ─────────────────────────
    let channel: Arc<dyn NotificationChannel> = match (cfg.notify_mode, &cfg.telegram) {
        (NotifyMode::Telegram, Some(tg)) => {
            info!(chat_id = tg.chat_id, "Telegram mode — using TelegramChannel");
            Arc::new(TelegramChannel::new(&tg.token, tg.chat_id))
        }
        (NotifyMode::Telegram, None) => {
            panic!("NOTIFY_MODE=telegram but Telegram credentials were not loaded")
        }
        (NotifyMode::Log, _) => {
            info!("Log mode — notifications go to the log only");
            Arc::new(LogChannel)
        }
    };
    let dispatcher = NotificationDispatcher::new(channel, &settings.notify);
    dispatcher.send(STARTUP_MESSAGE).await;

    // ── Symbol universe ───────────────────────────────────────────────────────
    let universe = Arc::new(SymbolUniverse::new(settings.symbols.clone()));
    match universe.refresh(provider.as_ref()).await {
        Ok(report) if report.missing.is_empty() => {
            dispatcher
                .send("All watchlist symbols are listed on Binance futures.")
                .await;
        }
        Ok(report) => {
            dispatcher
                .send(&format!(
                    "These symbols are not listed on Binance futures: {}",
                    report.missing.join(", ")
                ))
                .await;
        }
        Err(e) => {
            error!(error = %e, "Initial universe refresh failed, polling the full watchlist");
        }
    }

    // ── Channels ──────────────────────────────────────────────────────────────
    let (notice_tx, notice_rx) = mpsc::channel::<Notice>(256);

    // ── Engine ────────────────────────────────────────────────────────────────
    let engine = Engine::new(provider.clone(), universe.clone(), &settings, notice_tx);

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    tokio::spawn(
        universe
            .clone()
            .run_refresh(provider.clone(), settings.universe.refresh_interval()),
    );
    tokio::spawn(dispatcher.run(notice_rx));
    tokio::spawn(engine.run());

    // Keep main alive
    info!("All subsystems started. Waiting for shutdown signal.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received. Exiting.");
}
