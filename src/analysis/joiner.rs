//! Pairs each price sample with the news that preceded it

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{NewsItem, PriceSample};

/// Default trailing window in hours
pub const DEFAULT_WINDOW_HOURS: i64 = 2;

/// One price sample joined with the news in its trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationWindow {
    pub timestamp: DateTime<Utc>,
    pub price_change: f64,
    pub avg_sentiment: f64,
    pub news_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesJoiner {
    window: Duration,
}

impl Default for TimeSeriesJoiner {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_HOURS)
    }
}

impl TimeSeriesJoiner {
    pub fn new(window_hours: i64) -> Self {
        Self {
            window: Duration::hours(window_hours),
        }
    }

    /// Lazily yield a window for every sample after the first whose trailing
    /// `[timestamp - window, timestamp]` range contains at least one news item.
    ///
    /// Both inputs must be sorted by timestamp, oldest first. Nothing is cached;
    /// calling again recomputes from the slices.
    pub fn join<'a>(
        &self,
        prices: &'a [PriceSample],
        news: &'a [NewsItem],
    ) -> impl Iterator<Item = CorrelationWindow> + 'a {
        let window = self.window;
        prices.iter().skip(1).filter_map(move |sample| {
            let in_window = news_between(news, sample.timestamp - window, sample.timestamp);
            let avg_sentiment = mean(in_window.iter().map(|n| n.sentiment_score))?;
            Some(CorrelationWindow {
                timestamp: sample.timestamp,
                price_change: sample.change_percent,
                avg_sentiment,
                news_count: in_window.len(),
            })
        })
    }
}

/// Sub-slice of time-sorted news with `start <= timestamp <= end`
pub(crate) fn news_between(
    news: &[NewsItem],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> &[NewsItem] {
    let lo = news.partition_point(|n| n.timestamp < start);
    let hi = news.partition_point(|n| n.timestamp <= end);
    if lo >= hi {
        &[]
    } else {
        &news[lo..hi]
    }
}

/// Arithmetic mean, `None` for an empty sequence
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
