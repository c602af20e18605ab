//! Historical replay of the pair strategy.
//!
//! Mirrors the live cadence over a [`PriceFrame`]:
//! - recalibration at 00:00 on the first bar of every ISO week, and on the
//!   first bar with enough history
//! - evaluation at the close of every bar
//!
//! Fills happen at the close through [`PaperExecutor`] and equity is marked
//! after every bar.

use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PairConfig;
use crate::data::PriceFrame;
use crate::error::{DataError, PairError};
use crate::exchange::paper::decimal_to_f64;
use crate::exchange::{HistoricalFeed, PaperExecutor};
use crate::logging::SignalRecorder;
use crate::strategy::{DailyOutcome, PairOrchestrator, RecalibrationOutcome};

/// Backtest settings
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(1_000_000),
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(capital: f64) -> Result<Self, PairError> {
        let initial_capital = Decimal::from_f64(capital)
            .filter(|c| *c > Decimal::ZERO)
            .ok_or_else(|| PairError::Configuration(format!("invalid initial capital {}", capital)))?;
        Ok(Self { initial_capital })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Summary of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub pair: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub bars: usize,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub return_pct: f64,
    pub max_drawdown_pct: f64,
    pub recalibrations_accepted: usize,
    pub recalibrations_rejected: usize,
    pub recalibrations_failed: usize,
    pub evaluations: usize,
    pub evaluation_errors: usize,
    pub position_changes: usize,
    pub fills: usize,
    pub equity_curve: Vec<EquityPoint>,
}

/// Drives a [`PairOrchestrator`] through a price frame.
pub struct ReplayScheduler {
    frame: Arc<PriceFrame>,
    feed: Arc<HistoricalFeed>,
    executor: Arc<PaperExecutor>,
    orchestrator: PairOrchestrator,
    min_history: usize,
}

impl ReplayScheduler {
    pub fn new(frame: PriceFrame, pair: PairConfig, backtest: &BacktestConfig) -> Result<Self, PairError> {
        for asset in &pair.assets {
            if frame.closes(asset).is_none() {
                return Err(DataError::MissingAsset(asset.clone()).into());
            }
        }
        let frame = Arc::new(frame);
        let feed = Arc::new(HistoricalFeed::new(Arc::clone(&frame)));
        let executor = Arc::new(PaperExecutor::new(backtest.initial_capital));
        let min_history = pair.min_observations;
        let orchestrator = PairOrchestrator::new(pair, feed.clone(), executor.clone())?;
        Ok(Self {
            frame,
            feed,
            executor,
            orchestrator,
            min_history,
        })
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn SignalRecorder>) -> Self {
        self.orchestrator = self.orchestrator.with_recorder(recorder);
        self
    }

    pub fn orchestrator(&self) -> &PairOrchestrator {
        &self.orchestrator
    }

    pub async fn run(mut self) -> Result<BacktestReport, PairError> {
        let dates = self.frame.dates().to_vec();
        let assets = self.orchestrator.config().assets.clone();
        let open = NaiveTime::MIN;
        let close = NaiveTime::from_hms_opt(16, 0, 0)
            .ok_or_else(|| PairError::Configuration("invalid close time".to_string()))?;

        let mut report = BacktestReport {
            pair: self.orchestrator.config().pair_label(),
            start: dates.first().copied(),
            end: dates.last().copied(),
            bars: dates.len(),
            initial_capital: decimal_to_f64(self.executor.initial_capital()),
            final_equity: 0.0,
            return_pct: 0.0,
            max_drawdown_pct: 0.0,
            recalibrations_accepted: 0,
            recalibrations_rejected: 0,
            recalibrations_failed: 0,
            evaluations: 0,
            evaluation_errors: 0,
            position_changes: 0,
            fills: 0,
            equity_curve: Vec::with_capacity(dates.len()),
        };

        let mut calibrated_once = false;
        for (i, date) in dates.iter().enumerate() {
            self.feed.seek(i);
            let marks: HashMap<String, f64> = assets
                .iter()
                .map(|a| Ok((a.clone(), self.frame.close_at(a, i)?)))
                .collect::<Result<_, DataError>>()?;
            self.executor.mark(*date, &marks).await?;

            if i >= self.min_history {
                let week_start = i > 0 && is_new_week(dates[i - 1], *date);
                if !calibrated_once || week_start {
                    calibrated_once = true;
                    match self.orchestrator.recalibrate_at(date.and_time(open).and_utc()).await {
                        Ok(RecalibrationOutcome::Accepted { .. }) => report.recalibrations_accepted += 1,
                        Ok(RecalibrationOutcome::Rejected { .. }) => report.recalibrations_rejected += 1,
                        Err(e) => {
                            warn!(date = %date, error = %e, "Recalibration failed");
                            report.recalibrations_failed += 1;
                        }
                    }
                }

                match self.orchestrator.daily_evaluate_at(date.and_time(close).and_utc()).await {
                    Ok(DailyOutcome::Skipped) => {}
                    Ok(DailyOutcome::Held { .. }) => report.evaluations += 1,
                    Ok(DailyOutcome::Changed { .. }) => {
                        report.evaluations += 1;
                        report.position_changes += 1;
                    }
                    Err(e) => {
                        warn!(date = %date, error = %e, "Daily evaluation failed");
                        report.evaluation_errors += 1;
                    }
                }
            }

            let equity = decimal_to_f64(self.executor.equity().await?);
            report.equity_curve.push(EquityPoint { date: *date, equity });
        }

        report.fills = self.executor.fills().await.len();
        report.final_equity = report
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(report.initial_capital);
        report.return_pct = (report.final_equity / report.initial_capital - 1.0) * 100.0;
        report.max_drawdown_pct = max_drawdown(&report.equity_curve) * 100.0;

        info!(
            pair = %report.pair,
            bars = report.bars,
            final_equity = report.final_equity,
            return_pct = report.return_pct,
            max_drawdown_pct = report.max_drawdown_pct,
            accepted = report.recalibrations_accepted,
            rejected = report.recalibrations_rejected,
            position_changes = report.position_changes,
            "Backtest complete"
        );
        Ok(report)
    }
}

/// `true` when `current` falls in a later ISO week than `previous`
pub fn is_new_week(previous: NaiveDate, current: NaiveDate) -> bool {
    let (p, c) = (previous.iso_week(), current.iso_week());
    (c.year(), c.week()) != (p.year(), p.week())
}

/// Largest peak-to-trough fall as a fraction of the peak
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak);
        }
    }
    worst
}
