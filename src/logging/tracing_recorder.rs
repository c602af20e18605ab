//! Tracing-based Signal Recorder
//!
//! Emits one structured log line per position change. With the JSON
//! formatter enabled these lines can be shipped to any log pipeline.

use super::recorder::{RecordError, SignalRecord, SignalRecorder};
use async_trait::async_trait;
use tracing::info;

/// Recorder that emits structured tracing logs
pub struct TracingRecorder;

impl TracingRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalRecorder for TracingRecorder {
    async fn record(&self, record: &SignalRecord) -> Result<(), RecordError> {
        info!(
            target: "signals",
            record_id = %record.record_id,
            timestamp = %record.timestamp.to_rfc3339(),
            pair = %record.pair,
            from = %record.from,
            to = %record.to,
            normalized_spread = record.normalized_spread,
            threshold = record.threshold,
            targets = %record.targets_field(),
            reason = %record.reason,
            "Position changed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionState;
    use chrono::Utc;

    #[tokio::test]
    async fn test_tracing_recorder_does_not_error() {
        let recorder = TracingRecorder::new();
        let record = SignalRecord::new(
            Utc::now(),
            "GLD/GDX",
            PositionState::Short,
            PositionState::Flat,
            "rejected",
        );
        recorder.record(&record).await.unwrap();
    }
}
