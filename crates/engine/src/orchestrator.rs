use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use common::{Alert, CloseCheck, Error, FetchSettings, MarketDataProvider, Result, Timeframe};
use pattern::PatternClassifier;

use crate::scheduler::{CloseBand, CloseBands};

/// What happened to one (symbol, timeframe) pair during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Alert(Alert),
    NoPattern,
    /// The exchange clock put the bar outside the check band.
    OutsideWindow { seconds_to_close: f64 },
    Degraded(String),
    Failed(String),
    TimedOut,
}

/// Tally of a tick's fan-out.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub evaluated: usize,
    pub alerts: Vec<Alert>,
    pub no_pattern: usize,
    pub outside_window: usize,
    pub degraded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl TickReport {
    fn record(&mut self, outcome: PairOutcome) {
        self.evaluated += 1;
        match outcome {
            PairOutcome::Alert(alert) => self.alerts.push(alert),
            PairOutcome::NoPattern => self.no_pattern += 1,
            PairOutcome::OutsideWindow { .. } => self.outside_window += 1,
            PairOutcome::Degraded(_) => self.degraded += 1,
            PairOutcome::Failed(_) => self.failed += 1,
            PairOutcome::TimedOut => self.timed_out += 1,
        }
    }
}

/// Fetches and classifies every due (symbol, timeframe) pair of a tick.
///
/// Each pair runs as its own task; a semaphore bounds in-flight attempts and
/// every attempt has a deadline. One pair's failure never touches another.
#[derive(Clone)]
pub struct FetchOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    classifier: PatternClassifier,
    check_band: CloseBand,
    settings: FetchSettings,
    limiter: Arc<Semaphore>,
}

impl FetchOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        classifier: PatternClassifier,
        bands: &CloseBands,
        settings: FetchSettings,
    ) -> Self {
        Self {
            provider,
            classifier,
            check_band: bands.check,
            limiter: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            settings,
        }
    }

    /// Inspect `symbols × due` and wait for every task before returning.
    pub async fn run_tick(&self, symbols: &[String], due: &[CloseCheck]) -> TickReport {
        let mut tasks = JoinSet::new();
        for symbol in symbols {
            for check in due {
                let job = self.clone();
                let symbol = symbol.clone();
                let timeframe = check.timeframe.clone();
                tasks.spawn(async move { job.process_pair(&symbol, &timeframe).await });
            }
        }

        let mut report = TickReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(error = %e, "Pair task aborted");
                    report.record(PairOutcome::Failed(e.to_string()));
                }
            }
        }
        report
    }

    /// Inspect one pair with bounded retry on transient errors.
    pub async fn process_pair(&self, symbol: &str, timeframe: &Timeframe) -> PairOutcome {
        let mut retries = 0;
        loop {
            let attempt = {
                let _permit = match self.limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return PairOutcome::Failed(e.to_string()),
                };
                let deadline = self.settings.task_deadline();
                match tokio::time::timeout(deadline, self.inspect(symbol, timeframe)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(format!(
                        "no response within {}s",
                        deadline.as_secs()
                    ))),
                }
            };

            match attempt {
                Ok(outcome) => return outcome,
                Err(Error::DegradedData(reason)) => {
                    warn!(symbol, timeframe = %timeframe, reason = %reason, "Skipping pair on degraded data");
                    return PairOutcome::Degraded(reason);
                }
                Err(e) if e.is_transient() && retries < self.settings.retry_attempts => {
                    retries += 1;
                    warn!(
                        symbol,
                        timeframe = %timeframe,
                        error = %e,
                        retry = retries,
                        delay_secs = self.settings.retry_delay_secs,
                        "Transient provider error, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay()).await;
                }
                Err(e) => {
                    error!(symbol, timeframe = %timeframe, error = %e, "Dropping pair for this tick");
                    return match e {
                        Error::Timeout(_) => PairOutcome::TimedOut,
                        other => PairOutcome::Failed(other.to_string()),
                    };
                }
            }
        }
    }

    async fn inspect(&self, symbol: &str, timeframe: &Timeframe) -> Result<PairOutcome> {
        let price = self.provider.current_price(symbol).await?;
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::DegradedData(format!("unusable price {price}")));
        }

        let bars = self
            .provider
            .recent_bars(symbol, timeframe, self.settings.bar_count)
            .await?;
        let forming = match bars.last() {
            Some(bar) if bars.len() >= 2 => bar,
            _ => {
                return Err(Error::DegradedData(format!(
                    "need 2 bars, got {}",
                    bars.len()
                )))
            }
        };

        // Exchange clock, not local: a skewed host must not shift the window.
        let now = self.provider.server_time().await?;
        let seconds_to_close = (forming.close_time - now).num_milliseconds() as f64 / 1000.0;
        if !self.check_band.contains(seconds_to_close) {
            debug!(symbol, timeframe = %timeframe, seconds_to_close, "Bar outside check window");
            return Ok(PairOutcome::OutsideWindow { seconds_to_close });
        }

        let result = self
            .classifier
            .classify(forming.open, forming.high, forming.low, price);
        debug!(
            symbol,
            timeframe = %timeframe,
            pattern = %result.pattern,
            wick = %result.wick_side,
            "Bar classified"
        );
        if result.pattern.is_none() {
            return Ok(PairOutcome::NoPattern);
        }

        let alert = Alert {
            symbol: symbol.to_string(),
            timeframe: timeframe.name.clone(),
            pattern: result.pattern,
            wick_side: result.wick_side,
            price,
            closes_at: forming.close_time,
            observed_at: now,
        };
        info!(
            symbol,
            timeframe = %timeframe,
            pattern = %alert.pattern,
            wick = %alert.wick_side,
            price,
            seconds_to_close,
            "Candle pattern detected"
        );
        Ok(PairOutcome::Alert(alert))
    }
}
