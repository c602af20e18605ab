//! Historical price data for calibration and replay.
//!
//! Prices are held in a wide frame: one `date` column plus one close column
//! per asset, all rows aligned. Loading never gap-fills; a row with a missing
//! or non-positive price is rejected.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::Normal;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::DataError;

/// Name of the date column in price CSV files
pub const DATE_COLUMN: &str = "date";

/// Aligned daily close prices for a set of assets.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFrame {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    closes: HashMap<String, Vec<f64>>,
}

impl PriceFrame {
    /// Build a frame from already aligned columns.
    pub fn new(
        dates: Vec<NaiveDate>,
        closes: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, DataError> {
        let mut assets = Vec::with_capacity(closes.len());
        let mut map = HashMap::with_capacity(closes.len());
        for (asset, column) in closes {
            if column.len() != dates.len() {
                return Err(DataError::Misaligned(format!(
                    "{} has {} rows, expected {}",
                    asset,
                    column.len(),
                    dates.len()
                )));
            }
            if let Some((index, price)) = column
                .iter()
                .enumerate()
                .find(|(_, p)| !(p.is_finite() && **p > 0.0))
            {
                return Err(DataError::InvalidPrice {
                    asset,
                    index,
                    price: *price,
                });
            }
            assets.push(asset.clone());
            map.insert(asset, column);
        }
        if dates.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DataError::Misaligned(
                "dates must be strictly increasing".to_string(),
            ));
        }
        Ok(Self {
            dates,
            assets,
            closes: map,
        })
    }

    /// Load a wide CSV file: `date,<asset>,<asset>,...`.
    ///
    /// Only the requested assets are kept.
    pub fn from_csv(path: impl AsRef<Path>, assets: &[String]) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DataError::Load(format!("{}: {}", path.display(), e)))?;
        let df = CsvReader::new(file)
            .finish()
            .map_err(|e| DataError::Load(format!("{}: {}", path.display(), e)))?;

        let dates = read_dates(&df)?;
        let mut closes = Vec::with_capacity(assets.len());
        for asset in assets {
            closes.push((asset.clone(), read_closes(&df, asset)?));
        }

        info!(path = %path.display(), rows = dates.len(), assets = ?assets, "Price data loaded");
        Self::new(dates, closes)
    }

    /// Seeded synthetic cointegrated pair over business days.
    pub fn synthetic(assets: &[String], rows: usize, seed: u64) -> Result<Self, DataError> {
        if assets.len() != 2 {
            return Err(DataError::Load(format!(
                "synthetic data needs exactly two assets, got {}",
                assets.len()
            )));
        }
        let [a, b] = SyntheticPair::default().generate(rows, seed)?;
        let start = NaiveDate::from_ymd_opt(2019, 1, 1)
            .ok_or_else(|| DataError::Load("invalid start date".to_string()))?;
        Self::new(
            business_days(start, rows),
            vec![(assets[0].clone(), a), (assets[1].clone(), b)],
        )
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn closes(&self, asset: &str) -> Option<&[f64]> {
        self.closes.get(asset).map(|v| v.as_slice())
    }

    /// Close of `asset` at row `index`
    pub fn close_at(&self, asset: &str, index: usize) -> Result<f64, DataError> {
        self.closes
            .get(asset)
            .ok_or_else(|| DataError::MissingAsset(asset.to_string()))?
            .get(index)
            .copied()
            .ok_or(DataError::InsufficientData {
                expected: index + 1,
                actual: self.len(),
            })
    }

    /// Up to `lookback` rows ending just before `end`, for each asset
    pub fn window(&self, assets: &[String], end: usize, lookback: usize) -> Result<HashMap<String, Vec<f64>>, DataError> {
        let end = end.min(self.len());
        let start = end.saturating_sub(lookback);
        assets
            .iter()
            .map(|asset| {
                let column = self
                    .closes
                    .get(asset)
                    .ok_or_else(|| DataError::MissingAsset(asset.clone()))?;
                Ok((asset.clone(), column[start..end].to_vec()))
            })
            .collect()
    }
}

fn read_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, DataError> {
    let column = df
        .column(DATE_COLUMN)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(|e| DataError::Load(format!("date column: {}", e)))?;
    let values = column
        .str()
        .map_err(|e| DataError::Load(format!("date column: {}", e)))?;

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let raw = value.ok_or_else(|| DataError::Load(format!("missing date at row {}", i)))?;
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|e| DataError::Load(format!("bad date '{}' at row {}: {}", raw, i, e)))
        })
        .collect()
}

fn read_closes(df: &DataFrame, asset: &str) -> Result<Vec<f64>, DataError> {
    let column = df
        .column(asset)
        .map_err(|_| DataError::MissingAsset(asset.to_string()))?
        .cast(&DataType::Float64)
        .map_err(|e| DataError::Load(format!("{}: {}", asset, e)))?;
    let values = column
        .f64()
        .map_err(|e| DataError::Load(format!("{}: {}", asset, e)))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            value.ok_or(DataError::InvalidPrice {
                asset: asset.to_string(),
                index,
                price: f64::NAN,
            })
        })
        .collect()
}

/// `count` consecutive weekdays starting at `start` (or the next weekday)
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut day = start;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(day);
        }
        day += Duration::days(1);
    }
    out
}

/// Generator for a cointegrated price pair.
///
/// ```text
/// ln B[t] = ln B[t-1] + σ_walk·ε
/// ln A[t] = α + β·ln B[t] + u[t],   u[t] = φ·u[t-1] + σ_noise·η
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyntheticPair {
    pub beta: f64,
    pub alpha: f64,
    pub start_price: f64,
    pub walk_sigma: f64,
    /// AR(1) coefficient of the spread; below 1 keeps it stationary
    pub persistence: f64,
    pub noise_sigma: f64,
}

impl Default for SyntheticPair {
    fn default() -> Self {
        Self {
            beta: 0.8,
            alpha: 1.0,
            start_price: 100.0,
            walk_sigma: 0.01,
            persistence: 0.9,
            noise_sigma: 0.005,
        }
    }
}

impl SyntheticPair {
    /// Prices `[A, B]`, `rows` long each.
    pub fn generate(&self, rows: usize, seed: u64) -> Result<[Vec<f64>; 2], DataError> {
        let walk = Normal::new(0.0, self.walk_sigma)
            .map_err(|e| DataError::Load(format!("walk sigma: {}", e)))?;
        let noise = Normal::new(0.0, self.noise_sigma)
            .map_err(|e| DataError::Load(format!("noise sigma: {}", e)))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut log_b = self.start_price.ln();
        let mut spread = 0.0;
        let mut a = Vec::with_capacity(rows);
        let mut b = Vec::with_capacity(rows);
        for _ in 0..rows {
            log_b += rng.sample(walk);
            spread = self.persistence * spread + rng.sample(noise);
            a.push((self.alpha + self.beta * log_b + spread).exp());
            b.push(log_b.exp());
        }
        Ok([a, b])
    }
}
