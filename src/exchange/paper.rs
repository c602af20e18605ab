//! Paper execution against marked prices.
//!
//! Positions are held as signed quantities and valued with `rust_decimal`.
//! `set_target_positions` has set-holdings semantics: each listed asset is
//! resized to `weight × equity / price`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Executor, TargetWeight};
use crate::error::PairError;

/// One simulated fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub date: Option<NaiveDate>,
    pub asset: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Default)]
struct Book {
    cash: Decimal,
    holdings: HashMap<String, Decimal>,
    marks: HashMap<String, Decimal>,
    date: Option<NaiveDate>,
    fills: Vec<Fill>,
}

impl Book {
    fn equity(&self) -> Result<Decimal, PairError> {
        let mut equity = self.cash;
        for (asset, qty) in &self.holdings {
            if qty.is_zero() {
                continue;
            }
            let price = self.marks.get(asset).ok_or_else(|| {
                PairError::Execution(format!("no mark price for held asset {}", asset))
            })?;
            equity += qty * price;
        }
        Ok(equity)
    }

    fn trade(&mut self, asset: &str, target_qty: Decimal) -> Result<(), PairError> {
        let price = *self
            .marks
            .get(asset)
            .ok_or_else(|| PairError::Execution(format!("no mark price for {}", asset)))?;
        let current = self.holdings.get(asset).copied().unwrap_or_default();
        let delta = target_qty - current;
        if delta.is_zero() {
            return Ok(());
        }
        self.cash -= delta * price;
        self.holdings.insert(asset.to_string(), target_qty);
        self.fills.push(Fill {
            date: self.date,
            asset: asset.to_string(),
            quantity: delta,
            price,
        });
        debug!(asset, quantity = %delta, price = %price, "Paper fill");
        Ok(())
    }
}

#[derive(Debug)]
pub struct PaperExecutor {
    initial_capital: Decimal,
    book: Mutex<Book>,
}

impl PaperExecutor {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            book: Mutex::new(Book {
                cash: initial_capital,
                ..Default::default()
            }),
        }
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    /// Update mark prices and the date stamped on subsequent fills
    pub async fn mark(&self, date: NaiveDate, prices: &HashMap<String, f64>) -> Result<(), PairError> {
        let mut book = self.book.lock().await;
        for (asset, price) in prices {
            book.marks.insert(asset.clone(), to_decimal(*price)?);
        }
        book.date = Some(date);
        Ok(())
    }

    /// Cash plus marked value of all holdings
    pub async fn equity(&self) -> Result<Decimal, PairError> {
        self.book.lock().await.equity()
    }

    pub async fn position(&self, asset: &str) -> Decimal {
        self.book
            .lock()
            .await
            .holdings
            .get(asset)
            .copied()
            .unwrap_or_default()
    }

    pub async fn fills(&self) -> Vec<Fill> {
        self.book.lock().await.fills.clone()
    }
}

fn to_decimal(value: f64) -> Result<Decimal, PairError> {
    Decimal::from_f64(value)
        .ok_or_else(|| PairError::Execution(format!("cannot represent {} as a decimal", value)))
}

#[async_trait]
impl Executor for PaperExecutor {
    async fn set_target_positions(
        &self,
        targets: &[TargetWeight],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut book = self.book.lock().await;
        let equity = book.equity()?;

        // Size every leg before trading any of them
        let mut orders = Vec::with_capacity(targets.len());
        for target in targets {
            let price = book
                .marks
                .get(&target.asset)
                .copied()
                .ok_or_else(|| PairError::Execution(format!("no mark price for {}", target.asset)))?;
            if price.is_zero() {
                return Err(Box::new(PairError::Execution(format!(
                    "zero mark price for {}",
                    target.asset
                ))));
            }
            orders.push((target.asset.as_str(), equity * to_decimal(target.weight)? / price));
        }
        for (asset, quantity) in orders {
            book.trade(asset, quantity)?;
        }
        Ok(())
    }

    async fn liquidate_all(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut book = self.book.lock().await;
        let mut held: Vec<String> = book
            .holdings
            .iter()
            .filter(|(_, q)| !q.is_zero())
            .map(|(a, _)| a.clone())
            .collect();
        held.sort();
        for asset in held {
            book.trade(&asset, Decimal::ZERO)?;
        }
        Ok(())
    }
}

/// Equity as `f64` for reporting
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    fn prices(a: f64, b: f64) -> HashMap<String, f64> {
        HashMap::from([("A".to_string(), a), ("B".to_string(), b)])
    }

    #[tokio::test]
    async fn test_set_targets_sizes_by_equity() {
        let exec = PaperExecutor::new(dec!(10000));
        exec.mark(day(1), &prices(100.0, 50.0)).await.unwrap();
        exec.set_target_positions(&[TargetWeight::new("A", 0.5), TargetWeight::new("B", -0.5)])
            .await
            .unwrap();

        assert_eq!(exec.position("A").await, dec!(50));
        assert_eq!(exec.position("B").await, dec!(-100));
        assert_eq!(exec.equity().await.unwrap(), dec!(10000));
    }

    #[tokio::test]
    async fn test_pnl_and_liquidation() {
        let exec = PaperExecutor::new(dec!(10000));
        exec.mark(day(1), &prices(100.0, 50.0)).await.unwrap();
        exec.set_target_positions(&[TargetWeight::new("A", 0.5), TargetWeight::new("B", -0.5)])
            .await
            .unwrap();

        // A up 10%, B flat: +500 on the long leg
        exec.mark(day(2), &prices(110.0, 50.0)).await.unwrap();
        assert_eq!(exec.equity().await.unwrap(), dec!(10500));

        exec.liquidate_all().await.unwrap();
        assert!(exec.position("A").await.is_zero());
        assert!(exec.position("B").await.is_zero());
        assert_eq!(exec.equity().await.unwrap(), dec!(10500));
        assert_eq!(exec.fills().await.len(), 4);
    }

    #[tokio::test]
    async fn test_unmarked_asset_fails() {
        let exec = PaperExecutor::new(dec!(1000));
        let result = exec.set_target_positions(&[TargetWeight::new("Z", 1.0)]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unmarked_second_leg_leaves_book_untouched() {
        let exec = PaperExecutor::new(dec!(10000));
        exec.mark(day(1), &HashMap::from([("A".to_string(), 100.0)]))
            .await
            .unwrap();
        let result = exec
            .set_target_positions(&[TargetWeight::new("A", 0.5), TargetWeight::new("Z", -0.5)])
            .await;

        assert!(result.is_err());
        assert!(exec.position("A").await.is_zero());
        assert!(exec.fills().await.is_empty());
        assert_eq!(exec.equity().await.unwrap(), dec!(10000));
    }

    #[tokio::test]
    async fn test_liquidate_when_flat_is_noop() {
        let exec = PaperExecutor::new(dec!(1000));
        exec.liquidate_all().await.unwrap();
        assert!(exec.fills().await.is_empty());
    }
}
