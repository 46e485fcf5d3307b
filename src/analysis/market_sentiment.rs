//! Recency- and relevance-weighted market sentiment
//!
//! Each article is weighted by `time_weight * relevance`, where the time weight
//! falls linearly from 1.0 (published now) to 0.0 (at the edge of the lookback).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::data::validation::hours_before;
use crate::data::{DataResult, MarketDataRepository, NewsItem};

/// Score above which the market reads as bullish (below the negation: bearish)
pub const CATEGORY_THRESHOLD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl MarketSentiment {
    pub fn from_score(score: f64) -> Self {
        if score > CATEGORY_THRESHOLD {
            MarketSentiment::Bullish
        } else if score < -CATEGORY_THRESHOLD {
            MarketSentiment::Bearish
        } else {
            MarketSentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSentiment::Bullish => "bullish",
            MarketSentiment::Neutral => "neutral",
            MarketSentiment::Bearish => "bearish",
        }
    }
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub score: f64,
    pub category: MarketSentiment,
    pub total_articles: usize,
    pub confidence: f64,
}

impl SentimentSummary {
    /// Weighted aggregate of `items` as seen at `now`; `None` for no items.
    ///
    /// Time weights are not clamped, so an item slightly older than the
    /// lookback contributes a small negative weight.
    pub fn from_items(items: &[NewsItem], now: DateTime<Utc>, lookback_hours: i64) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let span_seconds = lookback_hours as f64 * 3600.0;
        let (weighted_sentiment, total_weight) =
            items.iter().fold((0.0, 0.0), |(weighted, total), item| {
                let age_seconds = (now - item.timestamp).num_milliseconds() as f64 / 1000.0;
                let time_weight = 1.0 - age_seconds / span_seconds;
                let weight = time_weight * item.relevance_score;
                (weighted + item.sentiment_score * weight, total + weight)
            });

        let score = if total_weight > 0.0 {
            weighted_sentiment / total_weight
        } else {
            0.0
        };

        Some(Self {
            score,
            category: MarketSentiment::from_score(score),
            total_articles: items.len(),
            confidence: (total_weight / items.len() as f64).min(1.0),
        })
    }
}

pub struct MarketSentimentAggregator {
    repo: Arc<dyn MarketDataRepository>,
}

impl MarketSentimentAggregator {
    pub fn new(repo: Arc<dyn MarketDataRepository>) -> Self {
        Self { repo }
    }

    pub async fn score(&self, lookback_hours: i64) -> DataResult<Option<SentimentSummary>> {
        self.score_at(Utc::now(), lookback_hours).await
    }

    /// Sentiment over news stored in `[now - lookback, now]`; `Ok(None)` when empty
    pub async fn score_at(
        &self,
        now: DateTime<Utc>,
        lookback_hours: i64,
    ) -> DataResult<Option<SentimentSummary>> {
        let start = hours_before(now, lookback_hours)?;
        let items = self.repo.news_between(start, now).await?;

        let summary = SentimentSummary::from_items(&items, now, lookback_hours);
        match &summary {
            Some(s) => info!(
                score = s.score,
                category = %s.category,
                articles = s.total_articles,
                confidence = s.confidence,
                "Market sentiment calculated"
            ),
            None => debug!(lookback_hours, "No news in lookback window"),
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::news;
    use crate::data::MemoryStore;
    use chrono::Duration;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(MarketSentiment::from_score(0.2), MarketSentiment::Neutral);
        assert_eq!(MarketSentiment::from_score(0.2000001), MarketSentiment::Bullish);
        assert_eq!(MarketSentiment::from_score(-0.2), MarketSentiment::Neutral);
        assert_eq!(MarketSentiment::from_score(-0.2000001), MarketSentiment::Bearish);
    }

    #[test]
    fn test_single_fresh_item() {
        let now = Utc::now();
        let summary = SentimentSummary::from_items(&[news(now, 0.6, 1.0)], now, 24).unwrap();
        assert!((summary.score - 0.6).abs() < 1e-12);
        assert_eq!(summary.category, MarketSentiment::Bullish);
        assert_eq!(summary.total_articles, 1);
        // weight = 1.0 * 1.0
        assert_eq!(summary.confidence, 1.0);

        let summary = SentimentSummary::from_items(&[news(now, 0.2, 1.0)], now, 24).unwrap();
        assert_eq!(summary.category, MarketSentiment::Neutral);
    }

    #[test]
    fn test_recency_weighting() {
        let now = Utc::now();
        // 18h old in a 24h lookback => time weight 0.25
        let items = vec![news(now - Duration::hours(18), -1.0, 1.0), news(now, 0.5, 1.0)];
        let summary = SentimentSummary::from_items(&items, now, 24).unwrap();
        let expected = (-1.0 * 0.25 + 0.5 * 1.0) / 1.25;
        assert!((summary.score - expected).abs() < 1e-9);
        assert!((summary.confidence - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_relevance_scales_weight() {
        let now = Utc::now();
        let items = vec![news(now, 0.8, 0.5)];
        let summary = SentimentSummary::from_items(&items, now, 6).unwrap();
        assert!((summary.score - 0.8).abs() < 1e-12);
        assert!((summary.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_total_weight_scores_zero() {
        let now = Utc::now();
        let items = vec![news(now, 0.9, 0.0), news(now - Duration::hours(1), -0.9, 0.0)];
        let summary = SentimentSummary::from_items(&items, now, 24).unwrap();
        assert_eq!(summary.score, 0.0);
        assert_eq!(summary.category, MarketSentiment::Neutral);
        assert_eq!(summary.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_score_absent_without_news() {
        let aggregator = MarketSentimentAggregator::new(Arc::new(MemoryStore::new()));
        assert!(aggregator.score_at(Utc::now(), 24).await.unwrap().is_none());
        assert!(aggregator.score_at(Utc::now(), i64::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_score_only_reads_lookback_window() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_data(
            vec![],
            vec![news(now - Duration::hours(30), -0.9, 1.0), news(now - Duration::hours(1), 0.4, 1.0)],
        ));
        let aggregator = MarketSentimentAggregator::new(store);
        let summary = aggregator.score_at(now, 24).await.unwrap().unwrap();
        assert_eq!(summary.total_articles, 1);
        assert!((summary.score - 0.4).abs() < 1e-12);
    }
}
