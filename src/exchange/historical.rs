//! Market data replayed from a [`PriceFrame`].
//!
//! A cursor marks the bar being "traded". History requests return the bars
//! strictly before the cursor; latest-price requests return the cursor bar.

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Granularity, MarketDataProvider};
use crate::data::PriceFrame;
use crate::error::DataError;

#[derive(Debug)]
pub struct HistoricalFeed {
    frame: Arc<PriceFrame>,
    cursor: AtomicUsize,
}

impl HistoricalFeed {
    pub fn new(frame: Arc<PriceFrame>) -> Self {
        Self {
            frame,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Move the cursor to bar `index`
    pub fn seek(&self, index: usize) {
        self.cursor.store(index, Ordering::SeqCst);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn frame(&self) -> &PriceFrame {
        &self.frame
    }
}

#[async_trait]
impl MarketDataProvider for HistoricalFeed {
    async fn get_history(
        &self,
        assets: &[String],
        lookback: usize,
        granularity: Granularity,
    ) -> Result<HashMap<String, Vec<f64>>, Box<dyn Error + Send + Sync>> {
        if granularity != Granularity::OneDay {
            return Err(Box::new(DataError::Unavailable(format!(
                "historical feed only holds daily bars, requested {}",
                granularity
            ))));
        }
        Ok(self.frame.window(assets, self.cursor(), lookback)?)
    }

    async fn get_latest_price(&self, asset: &str) -> Result<f64, Box<dyn Error + Send + Sync>> {
        Ok(self.frame.close_at(asset, self.cursor())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> HistoricalFeed {
        let assets = vec!["A".to_string(), "B".to_string()];
        HistoricalFeed::new(Arc::new(PriceFrame::synthetic(&assets, 50, 7).unwrap()))
    }

    #[tokio::test]
    async fn test_history_excludes_cursor_bar() {
        let feed = feed();
        feed.seek(30);
        let assets = vec!["A".to_string(), "B".to_string()];
        let history = feed.get_history(&assets, 10, Granularity::OneDay).await.unwrap();
        let latest = feed.get_latest_price("A").await.unwrap();

        assert_eq!(history["A"].len(), 10);
        assert_eq!(history["A"][9], feed.frame().close_at("A", 29).unwrap());
        assert_eq!(latest, feed.frame().close_at("A", 30).unwrap());
    }

    #[tokio::test]
    async fn test_intraday_granularity_unavailable() {
        let feed = feed();
        let assets = vec!["A".to_string()];
        assert!(feed
            .get_history(&assets, 10, Granularity::OneHour)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unknown_asset() {
        let feed = feed();
        assert!(feed.get_latest_price("ZZZ").await.is_err());
    }
}
