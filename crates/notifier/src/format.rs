//! Telegram HTML rendering of notices.

use chrono::FixedOffset;

use common::{Alert, CloseCheck, Notice};

pub fn render(notice: &Notice, display_offset: FixedOffset) -> String {
    match notice {
        Notice::Alert(alert) => alert_message(alert, display_offset),
        Notice::UpcomingClose(check) => upcoming_close_message(check),
        Notice::Text(text) => text.clone(),
    }
}

pub fn alert_message(alert: &Alert, display_offset: FixedOffset) -> String {
    let observed = alert
        .observed_at
        .with_timezone(&display_offset)
        .format("%Y-%m-%d %H:%M:%S");
    format!(
        "📊 <b>Candle Alert!</b>\n\
         📅 Date: <code>{observed}</code>\n\
         🕒 Timeframe: <b>{}</b>\n\
         💰 Coin: <b>{}</b>\n\
         🧠 Pattern: <b>{}</b>\n\
         💥 Wick: <b>{}</b>\n\
         💵 Price: <code>{}</code>\n",
        alert.timeframe, alert.symbol, alert.pattern, alert.wick_side, alert.price
    )
}

pub fn upcoming_close_message(check: &CloseCheck) -> String {
    let minutes = (check.seconds_to_close / 60.0) as u64;
    format!(
        "⏰ <b>{} candles closing in ~{minutes} minutes!</b>",
        check.timeframe.name
    )
}
