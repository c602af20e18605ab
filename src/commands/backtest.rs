//! Backtest command handler.
//!
//! Implements the `backtest` subcommand: replay the pair strategy over
//! CSV or synthetic history and write `results.json`.

use std::fs::{self, File};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::backtest::ReplayScheduler;
use crate::cli::BacktestCliConfig;
use crate::logging::{CsvRecorder, MultiRecorder, SignalRecorder, TracingRecorder};

/// Run a backtest with the provided CLI configuration.
///
/// # Errors
/// Returns error if data loading, the replay or writing results fails.
pub async fn run_backtest(config: BacktestCliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("--- Running Backtest ---");
    info!(
        pair = %config.pair.pair_label(),
        source = ?config.source,
        initial_capital = %config.backtest.initial_capital,
        exit_rule = ?config.pair.exit_rule,
        "Backtest configuration"
    );

    let frame = config.source.load(&config.pair.assets)?;
    info!(rows = frame.len(), "Data loaded");

    let mut recorders: Vec<Box<dyn SignalRecorder>> = vec![Box::new(TracingRecorder::new())];
    if let Some(path) = &config.signals_csv {
        recorders.push(Box::new(CsvRecorder::new(path.clone())));
    }
    let recorder: Arc<dyn SignalRecorder> = Arc::new(MultiRecorder::new(recorders));

    let scheduler = ReplayScheduler::new(frame, config.pair.clone(), &config.backtest)?
        .with_recorder(recorder);
    let report = scheduler.run().await?;

    info!("--- Backtest Results ---");
    info!("Initial Capital:   ${:.2}", report.initial_capital);
    info!("Final Equity:      ${:.2}", report.final_equity);
    info!("Return:            {:.2}%", report.return_pct);
    info!("Max Drawdown:      {:.2}%", report.max_drawdown_pct);
    info!(
        "Recalibrations:    {} accepted, {} rejected, {} failed",
        report.recalibrations_accepted, report.recalibrations_rejected, report.recalibrations_failed
    );
    info!("Position Changes:  {}", report.position_changes);
    info!("------------------------");

    fs::create_dir_all(&config.output_dir)?;
    let output_path = config.output_dir.join("results.json");
    let mut file = File::create(&output_path)?;
    let json = serde_json::to_string_pretty(&report)?;
    file.write_all(json.as_bytes())?;
    info!(path = %output_path.display(), "Results written");

    Ok(())
}
