//! Sentiment/price analytics: joining, correlation, pattern detection,
//! weighted market sentiment and insight composition

pub mod correlation;
pub mod insights;
pub mod joiner;
pub mod market_sentiment;
pub mod patterns;

// Re-export commonly used types
pub use correlation::{CorrelationEngine, ImpactBucket, ImpactReport};
pub use insights::{Insight, InsightGenerator, InsightKind};
pub use joiner::{CorrelationWindow, TimeSeriesJoiner};
pub use market_sentiment::{MarketSentiment, MarketSentimentAggregator, SentimentSummary};
pub use patterns::{Pattern, PatternDetector, PatternType};

use chrono::{DateTime, Duration, Utc};

use crate::data::validation::hours_before;
use crate::data::{DataResult, MarketDataRepository, NewsItem, PriceSample};

/// Quotes and news read for one analysis call, both oldest first
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesSnapshot {
    pub prices: Vec<PriceSample>,
    pub news: Vec<NewsItem>,
}

impl TimeSeriesSnapshot {
    /// Read quotes in `[now - lookback, now]` and news in
    /// `[now - lookback, now + news_lead]`
    pub async fn load(
        repo: &dyn MarketDataRepository,
        symbol: &str,
        now: DateTime<Utc>,
        lookback_hours: i64,
        news_lead: Duration,
    ) -> DataResult<Self> {
        let start = hours_before(now, lookback_hours)?;
        let prices = repo.prices_between(symbol, start, now).await?;
        if prices.is_empty() {
            return Ok(Self::default());
        }
        let news = repo.news_between(start, now + news_lead).await?;
        Ok(Self { prices, news })
    }
}
