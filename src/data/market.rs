use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::repository::MarketDataRepository;
use super::{validation, DataError, DataResult, PriceSample};
use crate::config::Config;

/// Quote as delivered by the price source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Percent change reported by the source, if any
    pub change_percent: Option<f64>,
}

/// Volume growth (percent over the previous sample) that marks a quote as a
/// significant movement on its own
pub const MOVEMENT_VOLUME_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    SignificantIncrease,
    SignificantDecrease,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::SignificantIncrease => "significant_increase",
            MovementType::SignificantDecrease => "significant_decrease",
        }
    }
}

/// A recorded quote that moved past the price threshold or the volume limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMovement {
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Percent change of the new quote
    pub price_change: f64,
    /// Volume growth over the previous sample in percent
    pub volume_change: f64,
    /// |price_change| relative to the threshold, capped at 1.0
    pub confidence: f64,
}

impl PriceMovement {
    /// Classify `current` against the sample recorded before it.
    ///
    /// Either condition is enough: |change| strictly above `threshold_percent`
    /// or volume growth strictly above `MOVEMENT_VOLUME_PERCENT`. A flat quote
    /// counts as a decrease.
    pub fn detect(
        current: &PriceSample,
        previous: &PriceSample,
        threshold_percent: f64,
    ) -> Option<Self> {
        let price_change = current.change_percent.abs();
        let volume_change = if previous.volume > 0 {
            (current.volume - previous.volume) as f64 / previous.volume as f64 * 100.0
        } else {
            0.0
        };

        if price_change <= threshold_percent && volume_change <= MOVEMENT_VOLUME_PERCENT {
            return None;
        }

        let movement_type = if current.change_percent > 0.0 {
            MovementType::SignificantIncrease
        } else {
            MovementType::SignificantDecrease
        };
        let confidence = if threshold_percent > 0.0 {
            (price_change / threshold_percent).min(1.0)
        } else {
            1.0
        };

        Some(Self {
            movement_type,
            price_change: current.change_percent,
            volume_change,
            confidence,
        })
    }
}

/// Result of recording one quote
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuote {
    pub sample: PriceSample,
    /// Set when the quote moved significantly against the previous sample
    pub movement: Option<PriceMovement>,
}

/// Appends quotes for the tracked symbol, keeping per-symbol ordering intact
pub struct PriceRecorder {
    repo: Arc<dyn MarketDataRepository>,
    symbol: String,
    threshold_percent: f64,
}

impl PriceRecorder {
    pub fn new(
        repo: Arc<dyn MarketDataRepository>,
        symbol: impl Into<String>,
        threshold_percent: f64,
    ) -> Self {
        Self {
            repo,
            symbol: symbol.into(),
            threshold_percent,
        }
    }

    pub fn from_config(repo: Arc<dyn MarketDataRepository>, config: &Config) -> Self {
        Self::new(
            repo,
            config.tracking.symbol.clone(),
            config.tracking.price_change_threshold_percent(),
        )
    }

    /// Record a quote. When the source gives no change percent it is derived
    /// from the previous stored sample (0 for the first sample). Quotes must be
    /// strictly newer than the latest stored sample.
    pub async fn record(&self, quote: PriceQuote) -> DataResult<RecordedQuote> {
        let previous = self.repo.latest_prices(&self.symbol, 1).await?.into_iter().next();

        if let Some(prev) = &previous {
            if quote.timestamp <= prev.timestamp {
                return Err(DataError::validation_error(
                    "timestamp".to_string(),
                    format!(
                        "quote at {} is not newer than latest stored sample at {}",
                        quote.timestamp, prev.timestamp
                    ),
                ));
            }
        }

        let change_percent = quote.change_percent.unwrap_or_else(|| match &previous {
            Some(prev) if prev.price > 0.0 => (quote.price - prev.price) / prev.price * 100.0,
            _ => 0.0,
        });

        let sample = PriceSample {
            timestamp: quote.timestamp,
            symbol: self.symbol.clone(),
            price: quote.price,
            volume: quote.volume,
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            change_percent,
        };

        validation::validate_price_sample(&sample)?;
        self.repo.record_price(&sample).await?;

        tracing::info!(
            symbol = %sample.symbol,
            price = sample.price,
            change_percent = sample.change_percent,
            "Saved stock data"
        );

        let movement = previous
            .as_ref()
            .and_then(|prev| PriceMovement::detect(&sample, prev, self.threshold_percent));
        if let Some(m) = &movement {
            tracing::warn!(
                symbol = %sample.symbol,
                movement = m.movement_type.as_str(),
                price_change = m.price_change,
                volume_change = m.volume_change,
                confidence = m.confidence,
                "Significant price movement detected"
            );
        }

        Ok(RecordedQuote { sample, movement })
    }
}

/// Price statistics over a span of days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub current_price: f64,
    pub start_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub avg_volume: f64,
    /// Percent change from first to last sample
    pub total_change: f64,
    pub data_points: usize,
}

impl PriceSummary {
    /// Summarize samples given oldest first
    pub fn from_samples(samples: &[PriceSample]) -> Option<Self> {
        let first = samples.first()?;
        let last = samples.last()?;

        let highest_price = samples.iter().map(|s| s.price).fold(f64::MIN, f64::max);
        let lowest_price = samples.iter().map(|s| s.price).fold(f64::MAX, f64::min);
        let avg_volume = samples.iter().map(|s| s.volume as f64).sum::<f64>() / samples.len() as f64;
        let total_change = if first.price > 0.0 {
            (last.price - first.price) / first.price * 100.0
        } else {
            0.0
        };

        Some(Self {
            current_price: last.price,
            start_price: first.price,
            highest_price,
            lowest_price,
            avg_volume,
            total_change,
            data_points: samples.len(),
        })
    }

    pub async fn load(
        repo: &dyn MarketDataRepository,
        symbol: &str,
        now: DateTime<Utc>,
        days: i64,
    ) -> DataResult<Option<Self>> {
        let samples = repo
            .prices_between(symbol, validation::days_before(now, days)?, now)
            .await?;
        Ok(Self::from_samples(&samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::data::fixtures::price;
    use crate::data::MemoryStore;

    fn quote(at: DateTime<Utc>, price: f64, change_percent: Option<f64>) -> PriceQuote {
        PriceQuote {
            timestamp: at,
            price,
            volume: 1_000,
            open: price,
            high: price,
            low: price,
            close: price,
            change_percent,
        }
    }

    fn recorder(store: Arc<MemoryStore>) -> PriceRecorder {
        PriceRecorder::new(store, "BIF.CO", 5.0)
    }

    #[tokio::test]
    async fn test_record_derives_change_percent() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());
        let now = Utc::now();

        let first = recorder.record(quote(now - Duration::minutes(10), 2.0, None)).await.unwrap();
        assert_eq!(first.sample.change_percent, 0.0);
        assert!(first.movement.is_none());

        let second = recorder.record(quote(now - Duration::minutes(5), 2.2, None)).await.unwrap();
        assert!((second.sample.change_percent - 10.0).abs() < 1e-9);

        let reported = recorder.record(quote(now, 2.2, Some(-1.5))).await.unwrap();
        assert_eq!(reported.sample.change_percent, -1.5);
    }

    #[tokio::test]
    async fn test_record_rejects_out_of_order_quote() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store);
        let now = Utc::now();

        recorder.record(quote(now, 2.0, None)).await.unwrap();
        let err = recorder
            .record(quote(now - Duration::minutes(5), 2.0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_record_rejects_duplicate_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store.clone());
        let now = Utc::now();

        recorder.record(quote(now, 2.0, None)).await.unwrap();
        let err = recorder.record(quote(now, 2.1, None)).await.unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));
        assert_eq!(store.latest_prices("BIF.CO", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_reports_significant_movement() {
        let store = Arc::new(MemoryStore::new());
        let recorder = recorder(store);
        let now = Utc::now();

        recorder.record(quote(now - Duration::hours(2), 2.0, None)).await.unwrap();

        // 2.0 -> 2.2 is +10%: twice the threshold, confidence capped
        let up = recorder.record(quote(now - Duration::hours(1), 2.2, None)).await.unwrap();
        let movement = up.movement.unwrap();
        assert_eq!(movement.movement_type, MovementType::SignificantIncrease);
        assert!((movement.price_change - 10.0).abs() < 1e-9);
        assert_eq!(movement.volume_change, 0.0);
        assert_eq!(movement.confidence, 1.0);

        let quiet = recorder.record(quote(now, 2.2, Some(0.5))).await.unwrap();
        assert!(quiet.movement.is_none());
    }

    #[test]
    fn test_movement_price_threshold() {
        let now = Utc::now();
        let previous = price(now - Duration::hours(1), 0.0, 1000);

        assert!(PriceMovement::detect(&price(now, 5.0, 1000), &previous, 5.0).is_none());
        assert!(PriceMovement::detect(&price(now, -5.0, 1000), &previous, 5.0).is_none());

        let down = PriceMovement::detect(&price(now, -6.0, 1000), &previous, 5.0).unwrap();
        assert_eq!(down.movement_type, MovementType::SignificantDecrease);
        assert_eq!(down.price_change, -6.0);
        assert_eq!(down.confidence, 1.0);
    }

    #[test]
    fn test_movement_volume_threshold() {
        let now = Utc::now();
        let previous = price(now - Duration::hours(1), 0.0, 1000);

        assert!(PriceMovement::detect(&price(now, 1.0, 1500), &previous, 5.0).is_none());

        let surge = PriceMovement::detect(&price(now, 2.0, 1600), &previous, 5.0).unwrap();
        assert_eq!(surge.movement_type, MovementType::SignificantIncrease);
        assert!((surge.volume_change - 60.0).abs() < 1e-9);
        assert!((surge.confidence - 0.4).abs() < 1e-9);

        // a flat quote on heavy volume is classed as a decrease
        let flat = PriceMovement::detect(&price(now, 0.0, 3000), &previous, 5.0).unwrap();
        assert_eq!(flat.movement_type, MovementType::SignificantDecrease);
        assert_eq!(flat.confidence, 0.0);

        let no_history = price(now - Duration::hours(1), 0.0, 0);
        assert!(PriceMovement::detect(&price(now, 1.0, 5000), &no_history, 5.0).is_none());
    }

    #[test]
    fn test_price_summary() {
        let now = Utc::now();
        let mut samples = vec![
            price(now - Duration::hours(2), 0.0, 100),
            price(now - Duration::hours(1), 0.0, 300),
            price(now, 0.0, 200),
        ];
        samples[0].price = 2.0;
        samples[1].price = 2.5;
        samples[2].price = 2.2;

        let summary = PriceSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.current_price, 2.2);
        assert_eq!(summary.start_price, 2.0);
        assert_eq!(summary.highest_price, 2.5);
        assert_eq!(summary.lowest_price, 2.0);
        assert_eq!(summary.avg_volume, 200.0);
        assert!((summary.total_change - 10.0).abs() < 1e-9);
        assert_eq!(summary.data_points, 3);
        assert!(PriceSummary::from_samples(&[]).is_none());
    }

    #[tokio::test]
    async fn test_price_summary_load_rejects_oversized_span() {
        let store = MemoryStore::new();
        let err = PriceSummary::load(&store, "BIF.CO", Utc::now(), 1_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation { .. }));
    }
}
