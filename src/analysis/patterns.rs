use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::joiner::{mean, news_between};
use super::TimeSeriesSnapshot;
use crate::config::Config;
use crate::data::{DataResult, MarketDataRepository, NewsItem, PriceSample};

/// News published this long before a spike is considered related
pub const NEWS_LOOKBEHIND_HOURS: i64 = 4;
/// News reported up to this long after a spike is also considered related
pub const NEWS_LOOKAHEAD_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    PriceSpikeWithNews,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::PriceSpikeWithNews => "price_spike_with_news",
        }
    }
}

/// Significant price move that coincided with news coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub timestamp: DateTime<Utc>,
    pub price_change: f64,
    pub volume: i64,
    pub news_count: usize,
    pub avg_sentiment: f64,
    pub pattern_type: PatternType,
    /// Move size relative to the threshold, capped at 1.0
    pub confidence: f64,
}

/// Find samples (after the first) moving more than `threshold_percent` that have
/// news in `[timestamp - 4h, timestamp + 2h]`. Inputs sorted oldest first.
pub fn detect_patterns(
    prices: &[PriceSample],
    news: &[NewsItem],
    threshold_percent: f64,
) -> Vec<Pattern> {
    prices
        .iter()
        .skip(1)
        .filter(|sample| sample.change_percent.abs() > threshold_percent)
        .filter_map(|sample| {
            let related = news_between(
                news,
                sample.timestamp - Duration::hours(NEWS_LOOKBEHIND_HOURS),
                sample.timestamp + Duration::hours(NEWS_LOOKAHEAD_HOURS),
            );
            let avg_sentiment = mean(related.iter().map(|n| n.sentiment_score))?;

            Some(Pattern {
                timestamp: sample.timestamp,
                price_change: sample.change_percent,
                volume: sample.volume,
                news_count: related.len(),
                avg_sentiment,
                pattern_type: PatternType::PriceSpikeWithNews,
                confidence: (sample.change_percent.abs() / threshold_percent).min(1.0),
            })
        })
        .collect()
}

pub struct PatternDetector {
    repo: Arc<dyn MarketDataRepository>,
    symbol: String,
    threshold_percent: f64,
}

impl PatternDetector {
    pub fn new(repo: Arc<dyn MarketDataRepository>, config: &Config) -> Self {
        Self {
            repo,
            symbol: config.tracking.symbol.clone(),
            threshold_percent: config.tracking.price_change_threshold_percent(),
        }
    }

    pub async fn identify_patterns(&self, lookback_hours: i64) -> DataResult<Option<Vec<Pattern>>> {
        self.identify_patterns_at(Utc::now(), lookback_hours).await
    }

    /// `Ok(None)` when no quotes exist in the lookback; an empty list when
    /// quotes exist but no spike had related news.
    pub async fn identify_patterns_at(
        &self,
        now: DateTime<Utc>,
        lookback_hours: i64,
    ) -> DataResult<Option<Vec<Pattern>>> {
        let snapshot = TimeSeriesSnapshot::load(
            self.repo.as_ref(),
            &self.symbol,
            now,
            lookback_hours,
            Duration::hours(NEWS_LOOKAHEAD_HOURS),
        )
        .await?;

        if snapshot.prices.is_empty() {
            debug!(symbol = %self.symbol, lookback_hours, "No price samples for pattern detection");
            return Ok(None);
        }

        let patterns = detect_patterns(&snapshot.prices, &snapshot.news, self.threshold_percent);
        info!(
            patterns = patterns.len(),
            samples = snapshot.prices.len(),
            "Pattern detection complete"
        );
        Ok(Some(patterns))
    }
}
