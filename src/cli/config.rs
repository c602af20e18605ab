//! CLI configuration structs bridging CLI arguments to domain types.

use std::path::PathBuf;
use thiserror::Error;

use super::PairArgs;
use crate::backtest::BacktestConfig;
use crate::config::PairConfig;
use crate::data::PriceFrame;
use crate::error::{DataError, PairError};

/// Errors that can occur when assembling a command's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, std::io::Error),

    #[error("Failed to parse config file '{0}': {1}")]
    Parse(String, serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] PairError),

    #[error("No price data: pass --data <csv> or --synthetic")]
    NoDataSource,
}

/// Where price history comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv(PathBuf),
    Synthetic { rows: usize, seed: u64 },
}

impl DataSource {
    pub fn from_args(args: &PairArgs) -> Result<Self, ConfigError> {
        match (&args.data, args.synthetic) {
            (Some(path), _) => Ok(Self::Csv(PathBuf::from(path))),
            (None, true) => Ok(Self::Synthetic {
                rows: args.rows,
                seed: args.seed,
            }),
            (None, false) => Err(ConfigError::NoDataSource),
        }
    }

    pub fn load(&self, assets: &[String]) -> Result<PriceFrame, DataError> {
        match self {
            Self::Csv(path) => PriceFrame::from_csv(path, assets),
            Self::Synthetic { rows, seed } => PriceFrame::synthetic(assets, *rows, *seed),
        }
    }
}

/// Read the pair config (or defaults) and apply asset overrides.
pub fn load_pair_config(
    path: Option<&str>,
    asset_a: Option<&str>,
    asset_b: Option<&str>,
) -> Result<PairConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_string(), e))?;
            serde_json::from_str::<PairConfig>(&raw)
                .map_err(|e| ConfigError::Parse(path.to_string(), e))?
        }
        None => PairConfig::default(),
    };
    if (asset_a.is_some() || asset_b.is_some()) && config.assets.len() < 2 {
        config.assets.resize(2, String::new());
    }
    if let Some(a) = asset_a {
        config.assets[0] = a.to_string();
    }
    if let Some(b) = asset_b {
        config.assets[1] = b.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// CLI configuration for one-shot calibration.
#[derive(Debug, Clone)]
pub struct CalibrateCliConfig {
    pub pair: PairConfig,
    pub source: DataSource,
    pub output: Option<PathBuf>,
}

impl CalibrateCliConfig {
    pub fn from_args(args: &PairArgs, output: Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            pair: pair_from_args(args)?,
            source: DataSource::from_args(args)?,
            output: output.map(PathBuf::from),
        })
    }
}

/// CLI configuration for backtesting.
#[derive(Debug, Clone)]
pub struct BacktestCliConfig {
    pub pair: PairConfig,
    pub source: DataSource,
    pub backtest: BacktestConfig,
    /// Output directory for results
    pub output_dir: PathBuf,
    pub signals_csv: Option<PathBuf>,
}

impl BacktestCliConfig {
    pub fn from_args(
        args: &PairArgs,
        initial_capital: f64,
        output_dir: String,
        signals_csv: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            pair: pair_from_args(args)?,
            source: DataSource::from_args(args)?,
            backtest: BacktestConfig::with_capital(initial_capital)?,
            output_dir: PathBuf::from(output_dir),
            signals_csv: signals_csv.map(PathBuf::from),
        })
    }
}

fn pair_from_args(args: &PairArgs) -> Result<PairConfig, ConfigError> {
    load_pair_config(
        args.config.as_deref(),
        args.asset_a.as_deref(),
        args.asset_b.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args() -> PairArgs {
        PairArgs {
            config: None,
            asset_a: None,
            asset_b: None,
            data: None,
            synthetic: false,
            rows: 756,
            seed: 42,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_pair_config(None, None, Some("SPY")).unwrap();
        assert_eq!(config.assets, vec!["XLK".to_string(), "SPY".to_string()]);
    }

    #[test]
    fn test_config_file_with_override() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "assets": ["GLD", "GDX"], "lookback": 400 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = load_pair_config(Some(&path), Some("SLV"), None).unwrap();
        assert_eq!(config.assets, vec!["SLV".to_string(), "GDX".to_string()]);
        assert_eq!(config.lookback, 400);
    }

    #[test]
    fn test_invalid_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert!(matches!(
            load_pair_config(Some(&path), None, None),
            Err(ConfigError::Parse(_, _))
        ));
    }

    #[test]
    fn test_override_to_duplicate_asset_fails_validation() {
        assert!(matches!(
            load_pair_config(None, Some("XLU"), None),
            Err(ConfigError::Invalid(PairError::Configuration(_)))
        ));
    }

    #[test]
    fn test_data_source_required() {
        assert!(matches!(
            DataSource::from_args(&args()),
            Err(ConfigError::NoDataSource)
        ));
        let synthetic = PairArgs {
            synthetic: true,
            ..args()
        };
        assert_eq!(
            DataSource::from_args(&synthetic).unwrap(),
            DataSource::Synthetic { rows: 756, seed: 42 }
        );
    }
}
