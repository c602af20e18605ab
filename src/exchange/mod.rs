//! Collaborator interfaces for market data and execution.
//!
//! The pair engine only talks to these traits. Historical replay and paper
//! execution ship in this module; live venues can be added by implementing
//! the same traits without touching the strategy code.

pub mod historical;
pub mod paper;

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;

pub use crate::types::TargetWeight;
pub use historical::HistoricalFeed;
pub use paper::PaperExecutor;

/// Bar size requested from a data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    OneMinute,
    OneHour,
    OneDay,
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Granularity::OneMinute => write!(f, "1m"),
            Granularity::OneHour => write!(f, "1h"),
            Granularity::OneDay => write!(f, "1d"),
        }
    }
}

/// Source of close prices
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Up to `lookback` aligned closes per asset, oldest first
    async fn get_history(
        &self,
        assets: &[String],
        lookback: usize,
        granularity: Granularity,
    ) -> Result<HashMap<String, Vec<f64>>, Box<dyn Error + Send + Sync>>;

    /// Most recent close for one asset
    async fn get_latest_price(&self, asset: &str) -> Result<f64, Box<dyn Error + Send + Sync>>;
}

/// Core trait for position execution
#[async_trait]
pub trait Executor: Send + Sync {
    /// Rebalance the listed assets to signed fractions of equity
    async fn set_target_positions(
        &self,
        targets: &[TargetWeight],
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Close every open position
    async fn liquidate_all(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}
