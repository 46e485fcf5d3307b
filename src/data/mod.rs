//! Data layer: price and news records, scoring of news text, storage seams
//! and ingestion of freshly fetched articles and quotes

pub mod demo;
pub mod errors;
pub mod market;
pub mod memory;
pub mod news;
pub mod relevance;
pub mod repository;
pub mod sentiment;

// Re-export commonly used types
pub use errors::{DataError, DataResult};
pub use market::{
    MovementType, PriceMovement, PriceQuote, PriceRecorder, PriceSummary, RecordedQuote,
};
pub use memory::MemoryStore;
pub use news::{NewsIngestor, NewsSentimentBreakdown, RawArticle};
pub use relevance::RelevanceScorer;
pub use repository::{AlertStore, MarketDataRepository, PgRepository};
pub use sentiment::{LexiconSentimentScorer, SentimentLabel, SentimentScore, SentimentScorer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One quote of the tracked stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub price: f64,
    pub volume: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Percent change (5.0 = +5%)
    pub change_percent: f64,
}

/// Scored news article about the club
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Time the article was ingested; analyses key on this
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment_score: f64, // -1.0 to 1.0
    pub sentiment_label: SentimentLabel,
    pub relevance_score: f64, // 0.0 to 1.0
}

/// Validation helpers
pub mod validation {
    use super::*;
    use chrono::Duration;

    /// Start of the window covering the last `hours` before `now`
    pub fn hours_before(now: DateTime<Utc>, hours: i64) -> DataResult<DateTime<Utc>> {
        span_before(now, hours, "hours", Duration::try_hours)
    }

    /// Start of the window covering the last `days` before `now`
    pub fn days_before(now: DateTime<Utc>, days: i64) -> DataResult<DateTime<Utc>> {
        span_before(now, days, "days", Duration::try_days)
    }

    fn span_before(
        now: DateTime<Utc>,
        amount: i64,
        unit: &str,
        to_span: fn(i64) -> Option<Duration>,
    ) -> DataResult<DateTime<Utc>> {
        if amount <= 0 {
            return Err(DataError::validation_error(
                format!("lookback_{}", unit),
                format!("lookback must be positive, got {}", amount),
            ));
        }
        to_span(amount)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                DataError::validation_error(
                    format!("lookback_{}", unit),
                    format!("lookback of {} {} is out of range", amount, unit),
                )
            })
    }

    /// Validate a quote before it is recorded
    pub fn validate_price_sample(sample: &PriceSample) -> DataResult<()> {
        if sample.symbol.trim().is_empty() {
            return Err(DataError::validation_error("symbol", "Symbol cannot be empty"));
        }

        if !sample.price.is_finite() || sample.price <= 0.0 {
            return Err(DataError::validation_error("price", "Price must be positive"));
        }

        if sample.volume < 0 {
            return Err(DataError::validation_error("volume", "Volume cannot be negative"));
        }

        if !sample.change_percent.is_finite() {
            return Err(DataError::validation_error(
                "change_percent",
                "Change percent must be a finite number",
            ));
        }

        if sample.high < sample.low {
            return Err(DataError::validation_error(
                "high_low",
                "High price cannot be less than low price",
            ));
        }

        Ok(())
    }

    /// Validate a scored news item before it is stored
    pub fn validate_news_item(item: &NewsItem) -> DataResult<()> {
        if item.url.trim().is_empty() {
            return Err(DataError::validation_error("url", "URL cannot be empty"));
        }

        if !(-1.0..=1.0).contains(&item.sentiment_score) {
            return Err(DataError::validation_error(
                "sentiment_score",
                "Sentiment score must be between -1.0 and 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&item.relevance_score) {
            return Err(DataError::validation_error(
                "relevance_score",
                "Relevance score must be between 0.0 and 1.0",
            ));
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::validation::*;
    use chrono::Utc;

    #[test]
    fn test_validate_price_sample() {
        let now = Utc::now();
        assert!(validate_price_sample(&price(now, 1.0, 100)).is_ok());

        let mut bad = price(now, 1.0, 100);
        bad.volume = -1;
        assert!(validate_price_sample(&bad).is_err());

        let mut bad = price(now, 1.0, 100);
        bad.change_percent = f64::NAN;
        assert!(validate_price_sample(&bad).is_err());
    }

    #[test]
    fn test_validate_news_item() {
        let now = Utc::now();
        assert!(validate_news_item(&news(now, 0.02, 0.3)).is_ok());

        let mut bad = news(now, 0.02, 0.3);
        bad.relevance_score = 1.5;
        assert!(validate_news_item(&bad).is_err());

        let mut bad = news(now, 0.02, 0.3);
        bad.url = "  ".to_string();
        assert!(validate_news_item(&bad).is_err());
    }

    #[test]
    fn test_lookback_window_start() {
        let now = Utc::now();
        assert_eq!(hours_before(now, 6).unwrap(), now - chrono::Duration::hours(6));
        assert_eq!(days_before(now, 7).unwrap(), now - chrono::Duration::days(7));

        assert!(hours_before(now, 0).is_err());
        assert!(days_before(now, -1).is_err());
    }

    #[test]
    fn test_lookback_out_of_range_is_an_error() {
        let now = Utc::now();
        let err = hours_before(now, 3_000_000_000).unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(hours_before(now, i64::MAX).is_err());
        assert!(days_before(now, 100_000_000).is_err());
    }
}
