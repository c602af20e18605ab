//! CLI argument parsing using clap.
//!
//! This module defines the command-line interface for kalmanpairs,
//! including all subcommands and their arguments.

mod config;

pub use config::{
    load_pair_config, BacktestCliConfig, CalibrateCliConfig, ConfigError, DataSource,
};

use clap::{Args, Parser, Subcommand};

/// kalmanpairs - cointegrated pairs with a Kalman-filtered spread
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

/// Options shared by every command that fits a pair
#[derive(Args, Debug, Clone)]
pub struct PairArgs {
    /// Path to a JSON pair configuration file
    #[arg(long)]
    pub config: Option<String>,
    /// Dependent asset (overrides the config file)
    #[arg(long)]
    pub asset_a: Option<String>,
    /// Hedge asset (overrides the config file)
    #[arg(long)]
    pub asset_b: Option<String>,
    /// Wide CSV of daily closes: date,<asset>,<asset>
    #[arg(long, conflicts_with = "synthetic")]
    pub data: Option<String>,
    /// Use a seeded synthetic cointegrated pair (no CSV required)
    #[arg(long, default_value_t = false)]
    pub synthetic: bool,
    /// Rows of synthetic data
    #[arg(long, default_value_t = 756)]
    pub rows: usize,
    /// Seed for synthetic data
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fit the pair once on the most recent history and print the model
    Calibrate {
        #[command(flatten)]
        pair: PairArgs,
        /// Write the model JSON here instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Replay the strategy over historical data
    Backtest {
        #[command(flatten)]
        pair: PairArgs,
        /// Initial capital in USD
        #[arg(long, default_value_t = 1_000_000.0)]
        initial_capital: f64,
        /// Output directory for results
        #[arg(long, default_value = "backtest_results")]
        output_dir: String,
        /// Also append position changes to this CSV file
        #[arg(long)]
        signals_csv: Option<String>,
    },
}
