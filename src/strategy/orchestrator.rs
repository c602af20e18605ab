//! Drives one pair through recalibration and daily evaluation.
//!
//! The orchestrator owns the current [`PairModel`] (if any) and the signal
//! state machine. Any failed or rejected recalibration drops the model,
//! forces the position flat and liquidates, so the pair never trades on a
//! stale or partially built model.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::PairConfig;
use crate::error::{DataError, PairError};
use crate::exchange::{Executor, Granularity, MarketDataProvider};
use crate::logging::{SignalRecord, SignalRecorder};
use crate::strategy::pair_model::{Calibration, PairModel};
use crate::strategy::signal::{SignalStateMachine, Transition};
use crate::types::{PositionState, TargetWeight};

/// Result of a successful call to [`PairOrchestrator::recalibrate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecalibrationOutcome {
    Accepted { p_value: f64, threshold: f64 },
    Rejected { p_value: f64, statistic: f64 },
}

/// Result of a successful call to [`PairOrchestrator::daily_evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DailyOutcome {
    /// No calibrated model; nothing evaluated
    Skipped,
    /// Model evaluated, position unchanged
    Held {
        normalized_spread: f64,
        state: PositionState,
    },
    /// Model evaluated and the executor was asked to change position
    Changed {
        normalized_spread: f64,
        transition: Transition,
    },
}

pub struct PairOrchestrator {
    config: PairConfig,
    market_data: Arc<dyn MarketDataProvider>,
    executor: Arc<dyn Executor>,
    recorder: Option<Arc<dyn SignalRecorder>>,
    model: Option<PairModel>,
    signals: SignalStateMachine,
}

impl PairOrchestrator {
    /// # Errors
    /// `Configuration` when the config does not validate.
    pub fn new(
        config: PairConfig,
        market_data: Arc<dyn MarketDataProvider>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, PairError> {
        config.validate()?;
        let signals = SignalStateMachine::new(config.exit_rule);
        Ok(Self {
            config,
            market_data,
            executor,
            recorder: None,
            model: None,
            signals,
        })
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn SignalRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&PairModel> {
        self.model.as_ref()
    }

    pub fn position(&self) -> PositionState {
        self.signals.state()
    }

    pub async fn recalibrate(&mut self) -> Result<RecalibrationOutcome, PairError> {
        self.recalibrate_at(Utc::now()).await
    }

    /// Refit the pair on fresh history.
    ///
    /// The new model replaces the old one only when it is fully built and
    /// accepted. Rejection returns `Ok(Rejected)`, errors are returned after
    /// the pair has been flattened.
    #[instrument(skip(self), fields(pair = %self.config.pair_label()))]
    pub async fn recalibrate_at(&mut self, now: DateTime<Utc>) -> Result<RecalibrationOutcome, PairError> {
        match self.fit().await {
            Ok(Calibration::Accepted(model)) => {
                let outcome = RecalibrationOutcome::Accepted {
                    p_value: model.p_value(),
                    threshold: model.threshold(),
                };
                info!(
                    p_value = model.p_value(),
                    threshold = model.threshold(),
                    position = %self.signals.state(),
                    "Recalibration accepted"
                );
                self.model = Some(model);
                Ok(outcome)
            }
            Ok(Calibration::Rejected { p_value, statistic }) => {
                warn!(
                    p_value,
                    max_p_value = self.config.max_p_value,
                    "Cointegration test did not pass. Recalibration aborted, liquidating"
                );
                self.degrade(now, "rejected").await?;
                Ok(RecalibrationOutcome::Rejected { p_value, statistic })
            }
            Err(e) => {
                warn!(error = %e, "Recalibration failed, liquidating");
                if let Err(liquidation) = self.degrade(now, "degraded").await {
                    warn!(error = %liquidation, "Liquidation after failed recalibration also failed");
                }
                Err(e)
            }
        }
    }

    async fn fit(&self) -> Result<Calibration, PairError> {
        let history = self
            .market_data
            .get_history(&self.config.assets, self.config.lookback, Granularity::OneDay)
            .await
            .map_err(|e| DataError::Unavailable(e.to_string()))?;
        PairModel::fit(&history, &self.config)
    }

    /// Drop the model, go flat and liquidate.
    async fn degrade(&mut self, now: DateTime<Utc>, reason: &str) -> Result<(), PairError> {
        self.model = None;
        let transition = self.signals.force_flat();
        let liquidation = self
            .executor
            .liquidate_all()
            .await
            .map_err(|e| PairError::Execution(e.to_string()));

        if transition.changed() {
            let record = SignalRecord::new(
                now,
                self.config.pair_label(),
                transition.from,
                transition.to,
                reason,
            );
            self.record(&record).await;
        }
        liquidation
    }

    pub async fn daily_evaluate(&mut self) -> Result<DailyOutcome, PairError> {
        self.daily_evaluate_at(Utc::now()).await
    }

    /// Update the filter with the latest prices and act on the signal.
    ///
    /// Skipped when there is no model. A failed price fetch leaves the
    /// model and position untouched.
    #[instrument(skip(self), fields(pair = %self.config.pair_label()))]
    pub async fn daily_evaluate_at(&mut self, now: DateTime<Utc>) -> Result<DailyOutcome, PairError> {
        if self.model.is_none() {
            debug!("No calibrated model, skipping evaluation");
            return Ok(DailyOutcome::Skipped);
        }

        let prices = self.latest_prices().await?;

        let Some(model) = self.model.as_mut() else {
            return Ok(DailyOutcome::Skipped);
        };
        let normalized_spread = model.observe(prices)?;
        let threshold = model.threshold();
        let transition = self.signals.evaluate(normalized_spread, threshold);

        if !transition.changed() {
            debug!(
                normalized_spread,
                threshold,
                position = %transition.to,
                "Holding position"
            );
            return Ok(DailyOutcome::Held {
                normalized_spread,
                state: transition.to,
            });
        }

        let targets: Vec<TargetWeight> = model.targets(transition.to);
        info!(
            from = %transition.from,
            to = %transition.to,
            normalized_spread,
            threshold,
            "Position change"
        );

        let executed = if transition.to.is_flat() {
            self.executor.liquidate_all().await
        } else {
            self.executor.set_target_positions(&targets).await
        };

        let record = SignalRecord::new(
            now,
            self.config.pair_label(),
            transition.from,
            transition.to,
            "signal",
        )
        .with_signal(normalized_spread, threshold)
        .with_targets(targets);
        self.record(&record).await;

        executed.map_err(|e| PairError::Execution(e.to_string()))?;

        Ok(DailyOutcome::Changed {
            normalized_spread,
            transition,
        })
    }

    async fn latest_prices(&self) -> Result<[f64; 2], PairError> {
        let mut prices = [0.0; 2];
        for (slot, asset) in prices.iter_mut().zip(self.config.assets.iter()) {
            *slot = self
                .market_data
                .get_latest_price(asset)
                .await
                .map_err(|e| DataError::Unavailable(format!("{}: {}", asset, e)))?;
        }
        Ok(prices)
    }

    async fn record(&self, record: &SignalRecord) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(record).await {
                warn!(error = %e, "Failed to record signal");
            }
        }
    }
}
