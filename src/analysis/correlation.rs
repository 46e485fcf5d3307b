//! News-sentiment vs price-change correlation
//!
//! Every analysis reads a fresh snapshot from the repository and derives its
//! result in memory; nothing computed here is persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::joiner::{mean, CorrelationWindow, TimeSeriesJoiner};
use super::TimeSeriesSnapshot;
use crate::config::Config;
use crate::data::{DataResult, MarketDataRepository};

/// Average sentiment above which a window counts as positive news
pub const POSITIVE_NEWS_THRESHOLD: f64 = 0.1;
/// Average sentiment below which a window counts as negative news
pub const NEGATIVE_NEWS_THRESHOLD: f64 = -0.1;

/// Windows sharing a sentiment direction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactBucket {
    pub count: usize,
    pub avg_price_change: f64,
    pub avg_sentiment: f64,
}

impl ImpactBucket {
    fn from_windows<'a>(windows: impl Iterator<Item = &'a CorrelationWindow> + Clone) -> Self {
        Self {
            count: windows.clone().count(),
            avg_price_change: mean(windows.clone().map(|w| w.price_change)).unwrap_or(0.0),
            avg_sentiment: mean(windows.map(|w| w.avg_sentiment)).unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// Pearson coefficient between price change and average sentiment
    pub overall_correlation: f64,
    pub total_data_points: usize,
    pub positive_impact: ImpactBucket,
    pub negative_impact: ImpactBucket,
    pub neutral_impact: ImpactBucket,
}

impl ImpactReport {
    /// Build the report from joined windows; `None` when there are none
    pub fn from_windows(windows: &[CorrelationWindow]) -> Option<Self> {
        if windows.is_empty() {
            return None;
        }

        let price_changes: Vec<f64> = windows.iter().map(|w| w.price_change).collect();
        let sentiments: Vec<f64> = windows.iter().map(|w| w.avg_sentiment).collect();

        Some(Self {
            overall_correlation: pearson(&price_changes, &sentiments),
            total_data_points: windows.len(),
            positive_impact: ImpactBucket::from_windows(
                windows.iter().filter(|w| w.avg_sentiment > POSITIVE_NEWS_THRESHOLD),
            ),
            negative_impact: ImpactBucket::from_windows(
                windows.iter().filter(|w| w.avg_sentiment < NEGATIVE_NEWS_THRESHOLD),
            ),
            neutral_impact: ImpactBucket::from_windows(windows.iter().filter(|w| {
                (NEGATIVE_NEWS_THRESHOLD..=POSITIVE_NEWS_THRESHOLD).contains(&w.avg_sentiment)
            })),
        })
    }
}

/// Pearson correlation coefficient.
///
/// Returns 0.0 for fewer than two points, mismatched lengths, or when either
/// series has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return 0.0;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub struct CorrelationEngine {
    repo: Arc<dyn MarketDataRepository>,
    symbol: String,
    joiner: TimeSeriesJoiner,
}

impl CorrelationEngine {
    pub fn new(repo: Arc<dyn MarketDataRepository>, config: &Config) -> Self {
        Self {
            repo,
            symbol: config.tracking.symbol.clone(),
            joiner: TimeSeriesJoiner::new(config.analysis.join_window_hours),
        }
    }

    pub async fn analyze_impact(&self, lookback_hours: i64) -> DataResult<Option<ImpactReport>> {
        self.analyze_impact_at(Utc::now(), lookback_hours).await
    }

    /// Correlate news sentiment with price changes over the last `lookback_hours`.
    /// `Ok(None)` when there are no quotes or no quote has news in its window.
    pub async fn analyze_impact_at(
        &self,
        now: DateTime<Utc>,
        lookback_hours: i64,
    ) -> DataResult<Option<ImpactReport>> {
        let snapshot = TimeSeriesSnapshot::load(
            self.repo.as_ref(),
            &self.symbol,
            now,
            lookback_hours,
            Duration::zero(),
        )
        .await?;

        if snapshot.prices.is_empty() {
            debug!(symbol = %self.symbol, lookback_hours, "No price samples for impact analysis");
            return Ok(None);
        }

        let windows: Vec<CorrelationWindow> =
            self.joiner.join(&snapshot.prices, &snapshot.news).collect();
        let report = ImpactReport::from_windows(&windows);

        match &report {
            Some(report) => info!(
                correlation = report.overall_correlation,
                data_points = report.total_data_points,
                "News impact analysis complete"
            ),
            None => debug!(lookback_hours, "No price sample had news in its window"),
        }

        Ok(report)
    }
}
