//! Calibrate command handler.
//!
//! Fits the pair once on the most recent `lookback` bars and writes the
//! resulting model (or the rejection) as JSON.

use serde::Serialize;
use std::fs;
use std::io::Write;
use tracing::info;

use crate::cli::CalibrateCliConfig;
use crate::strategy::{Calibration, PairModel};

/// Calibration result in JSON-serializable format.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum CalibrationOutput {
    Accepted { pair: String, model: PairModel },
    Rejected { pair: String, p_value: f64, statistic: f64 },
}

/// Run a one-shot calibration.
///
/// # Errors
/// Returns error if data loading, estimation or writing the output fails.
pub fn run_calibrate(config: CalibrateCliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        pair = %config.pair.pair_label(),
        source = ?config.source,
        lookback = config.pair.lookback,
        "--- Calibrating pair ---"
    );

    let frame = config.source.load(&config.pair.assets)?;
    let history = frame.window(&config.pair.assets, frame.len(), config.pair.lookback)?;
    info!(rows = frame.len(), used = history.values().map(Vec::len).max().unwrap_or(0), "Data loaded");

    let pair = config.pair.pair_label();
    let output = match PairModel::fit(&history, &config.pair)? {
        Calibration::Accepted(model) => CalibrationOutput::Accepted { pair, model },
        Calibration::Rejected { p_value, statistic } => CalibrationOutput::Rejected {
            pair,
            p_value,
            statistic,
        },
    };

    let json = serde_json::to_string_pretty(&output)?;
    match &config.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(path)?;
            file.write_all(json.as_bytes())?;
            info!(path = %path.display(), "Model written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
