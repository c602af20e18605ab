//! Signal Recording System
//!
//! Every position change the orchestrator makes is described by a
//! `SignalRecord` and handed to a `SignalRecorder`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use thiserror::Error;

use crate::types::{PositionState, TargetWeight};

/// Error type for signal recording operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// One position change
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    /// Unique record identifier
    pub record_id: String,
    /// Time of the evaluation that produced the change
    pub timestamp: DateTime<Utc>,
    /// Pair label, e.g. "XLK/XLU"
    pub pair: String,
    pub from: PositionState,
    pub to: PositionState,
    /// Normalized spread at the evaluation, `None` for forced exits
    pub normalized_spread: Option<f64>,
    /// Threshold in force, `None` when no model was available
    pub threshold: Option<f64>,
    /// Targets sent to the executor; empty on liquidation
    pub targets: Vec<TargetWeight>,
    /// Why the change happened ("signal", "rejected", "degraded")
    pub reason: String,
}

impl SignalRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        pair: impl Into<String>,
        from: PositionState,
        to: PositionState,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            pair: pair.into(),
            from,
            to,
            normalized_spread: None,
            threshold: None,
            targets: Vec::new(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn with_signal(mut self, normalized_spread: f64, threshold: f64) -> Self {
        self.normalized_spread = Some(normalized_spread);
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<TargetWeight>) -> Self {
        self.targets = targets;
        self
    }

    /// Targets as `asset:weight` joined by `;`
    pub fn targets_field(&self) -> String {
        let mut out = String::new();
        for (i, t) in self.targets.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            // Writing to a String cannot fail
            let _ = write!(out, "{}:{:.6}", t.asset, t.weight);
        }
        out
    }

    /// Format as CSV line
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.record_id,
            self.timestamp.to_rfc3339(),
            self.pair,
            self.from,
            self.to,
            self.normalized_spread.map(|z| z.to_string()).unwrap_or_default(),
            self.threshold.map(|t| t.to_string()).unwrap_or_default(),
            self.targets_field(),
            self.reason,
        )
    }

    /// CSV header
    pub fn csv_header() -> &'static str {
        "record_id,timestamp,pair,from,to,normalized_spread,threshold,targets,reason"
    }
}

/// Trait for recording position changes to various backends
#[async_trait]
pub trait SignalRecorder: Send + Sync {
    async fn record(&self, record: &SignalRecord) -> Result<(), RecordError>;

    /// Flush any buffered records (optional, default no-op)
    async fn flush(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// A recorder that fans out to multiple backends
pub struct MultiRecorder {
    recorders: Vec<Box<dyn SignalRecorder>>,
}

impl MultiRecorder {
    pub fn new(recorders: Vec<Box<dyn SignalRecorder>>) -> Self {
        Self { recorders }
    }

    pub fn add(&mut self, recorder: Box<dyn SignalRecorder>) {
        self.recorders.push(recorder);
    }
}

#[async_trait]
impl SignalRecorder for MultiRecorder {
    async fn record(&self, record: &SignalRecord) -> Result<(), RecordError> {
        let mut error_count = 0;
        let mut last_error = None;

        for recorder in &self.recorders {
            if let Err(e) = recorder.record(record).await {
                tracing::error!(error = %e, "Failed to record signal to backend");
                last_error = Some(e);
                error_count += 1;
            }
        }

        // Only fail when every backend failed
        if error_count > 0 && error_count == self.recorders.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), RecordError> {
        for recorder in &self.recorders {
            recorder.flush().await?;
        }
        Ok(())
    }
}
