use clap::Parser;
use dotenv::dotenv;
use tracing::error;

use kalmanpairs::cli::{BacktestCliConfig, CalibrateCliConfig, Cli, Commands};
use kalmanpairs::commands::{run_backtest, run_calibrate};
use kalmanpairs::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from the .env file
    dotenv().ok();

    let cli = Cli::parse();

    logging::init(&cli.verbose, cli.json_logs).map_err(|e| e as Box<dyn std::error::Error>)?;

    let result = match cli.command {
        Commands::Calibrate { pair, output } => {
            let config = CalibrateCliConfig::from_args(&pair, output)?;
            run_calibrate(config)
        }
        Commands::Backtest {
            pair,
            initial_capital,
            output_dir,
            signals_csv,
        } => {
            let config = BacktestCliConfig::from_args(&pair, initial_capital, output_dir, signals_csv)?;
            run_backtest(config).await
        }
    };

    if let Err(e) = &result {
        error!(error = %e, "Command failed");
    }
    result
}
