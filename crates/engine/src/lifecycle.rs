use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use common::{MarketDataProvider, MonitorSettings, Notice, Result, Timeframe};
use pattern::PatternClassifier;

use crate::orchestrator::{FetchOrchestrator, TickReport};
use crate::scheduler::{self, CloseBands};
use crate::universe::SymbolUniverse;

/// What one tick did, mostly for logging and tests.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub now: DateTime<Utc>,
    pub announced: usize,
    pub due_timeframes: usize,
    pub alerts_sent: usize,
    pub report: TickReport,
    /// How long the loop sleeps before the next tick.
    pub sleep: Duration,
}

/// The main loop: schedules, fans out, and hands results to the dispatcher.
///
/// Owns the de-duplication state so two ticks landing in the same close
/// window announce and alert only once per bar.
pub struct Engine {
    provider: Arc<dyn MarketDataProvider>,
    universe: Arc<SymbolUniverse>,
    orchestrator: FetchOrchestrator,
    timeframes: Arc<[Timeframe]>,
    bands: CloseBands,
    polling_floor: Duration,
    notice_tx: mpsc::Sender<Notice>,
    announced: HashMap<String, DateTime<Utc>>,
    alerted: HashMap<(String, String), DateTime<Utc>>,
}

impl Engine {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        universe: Arc<SymbolUniverse>,
        settings: &MonitorSettings,
        notice_tx: mpsc::Sender<Notice>,
    ) -> Self {
        let bands = CloseBands::from_settings(&settings.schedule);
        let orchestrator = FetchOrchestrator::new(
            provider.clone(),
            PatternClassifier::new(&settings.detection),
            &bands,
            settings.fetch,
        );
        Self {
            provider,
            universe,
            orchestrator,
            timeframes: settings.timeframes.clone().into(),
            bands,
            polling_floor: settings.schedule.polling_floor(),
            notice_tx,
            announced: HashMap::new(),
            alerted: HashMap::new(),
        }
    }

    /// Run the loop forever. Call from `tokio::spawn`.
    ///
    /// Sleeps are measured from the start of each tick, so tick latency does
    /// not push later ticks past a close window.
    pub async fn run(mut self) {
        info!(
            timeframes = self.timeframes.len(),
            floor_secs = self.polling_floor.as_secs(),
            "Engine running"
        );
        loop {
            let started = tokio::time::Instant::now();
            let sleep = match self.tick().await {
                Ok(summary) => summary.sleep,
                Err(e) => {
                    error!(error = %e, "Tick aborted: no server time");
                    self.polling_floor
                }
            };
            tokio::time::sleep_until(started + sleep).await;
        }
    }

    /// One scheduling pass. Fails only when the exchange clock is unavailable.
    pub async fn tick(&mut self) -> Result<TickSummary> {
        let now = self.provider.server_time().await?;
        info!(%now, "Heartbeat");

        let plan = scheduler::plan(now, &self.timeframes, &self.bands, self.polling_floor);

        let mut announced = 0;
        for check in &plan.announce {
            if self.announced.get(&check.timeframe.name) == Some(&check.closes_at) {
                continue;
            }
            info!(
                timeframe = %check.timeframe,
                seconds_to_close = check.seconds_to_close,
                "Upcoming close"
            );
            if self.notify(Notice::UpcomingClose(check.clone())) {
                self.announced
                    .insert(check.timeframe.name.clone(), check.closes_at);
                announced += 1;
            }
        }

        let report = if plan.due.is_empty() {
            TickReport::default()
        } else {
            let symbols = self.universe.snapshot().await;
            self.orchestrator.run_tick(&symbols, &plan.due).await
        };

        self.alerted.retain(|_, closes_at| *closes_at > now);
        let mut alerts_sent = 0;
        for alert in &report.alerts {
            let key = (alert.symbol.clone(), alert.timeframe.clone());
            if self.alerted.get(&key) == Some(&alert.closes_at) {
                continue;
            }
            if self.notify(Notice::Alert(alert.clone())) {
                self.alerted.insert(key, alert.closes_at);
                alerts_sent += 1;
            }
        }

        if !plan.due.is_empty() {
            info!(
                due = plan.due.len(),
                evaluated = report.evaluated,
                alerts = alerts_sent,
                degraded = report.degraded,
                failed = report.failed,
                timed_out = report.timed_out,
                "Tick complete"
            );
        }

        Ok(TickSummary {
            now,
            announced,
            due_timeframes: plan.due.len(),
            alerts_sent,
            report,
            sleep: plan.min_sleep,
        })
    }

    /// Queue a notice without waiting. A dropped notice is not marked as
    /// sent, so a later tick in the same window offers it again.
    fn notify(&self, notice: Notice) -> bool {
        match self.notice_tx.try_send(notice) {
            Ok(()) => true,
            Err(TrySendError::Full(notice)) => {
                warn!(?notice, "Notice queue full, dropping notification");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Notice channel closed, dropping notification");
                false
            }
        }
    }
}
