use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::correlation::{CorrelationEngine, ImpactReport};
use super::market_sentiment::{MarketSentiment, MarketSentimentAggregator, SentimentSummary};
use super::patterns::{Pattern, PatternDetector};
use crate::config::Config;
use crate::data::{DataResult, MarketDataRepository};

/// |r| above which a correlation is worth reporting
pub const CORRELATION_INSIGHT_THRESHOLD: f64 = 0.3;
/// Patterns below this confidence do not count toward the pattern insight
pub const PATTERN_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    SentimentAnalysis,
    CorrelationAnalysis,
    PatternAnalysis,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::SentimentAnalysis => "sentiment_analysis",
            InsightKind::CorrelationAnalysis => "correlation_analysis",
            InsightKind::PatternAnalysis => "pattern_analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub message: String,
    pub confidence: f64,
    pub recommendation: String,
}

fn sentiment_insight(summary: &SentimentSummary) -> Option<Insight> {
    let recommendation = match summary.category {
        MarketSentiment::Bullish => "Consider monitoring for positive price movements",
        MarketSentiment::Bearish => "Monitor for potential price declines",
        MarketSentiment::Neutral => return None,
    };

    Some(Insight {
        kind: InsightKind::SentimentAnalysis,
        message: format!(
            "Market sentiment is {} ({:.2}) with {} recent articles",
            summary.category, summary.score, summary.total_articles
        ),
        confidence: summary.confidence,
        recommendation: recommendation.to_string(),
    })
}

fn correlation_insight(report: &ImpactReport) -> Option<Insight> {
    let r = report.overall_correlation;
    if r.abs() <= CORRELATION_INSIGHT_THRESHOLD {
        return None;
    }

    Some(Insight {
        kind: InsightKind::CorrelationAnalysis,
        message: format!(
            "Strong correlation ({:.2}) between news sentiment and price movements",
            r
        ),
        confidence: r.abs(),
        recommendation: "News sentiment appears to significantly impact stock price".to_string(),
    })
}

fn pattern_insight(patterns: &[Pattern]) -> Option<Insight> {
    let confident: Vec<f64> = patterns
        .iter()
        .map(|p| p.confidence)
        .filter(|c| *c > PATTERN_CONFIDENCE_THRESHOLD)
        .collect();
    if confident.is_empty() {
        return None;
    }

    Some(Insight {
        kind: InsightKind::PatternAnalysis,
        message: format!(
            "Found {} significant price movement patterns",
            confident.len()
        ),
        confidence: confident.iter().sum::<f64>() / confident.len() as f64,
        recommendation: "Monitor for similar patterns in future".to_string(),
    })
}

/// Turn whichever sub-analyses produced a result into insights, in the order
/// sentiment, correlation, patterns
pub fn compose_insights(
    sentiment: Option<&SentimentSummary>,
    impact: Option<&ImpactReport>,
    patterns: Option<&[Pattern]>,
) -> Vec<Insight> {
    [
        sentiment.and_then(sentiment_insight),
        impact.and_then(correlation_insight),
        patterns.and_then(pattern_insight),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Collapse a failed sub-analysis into "absent" after logging it
fn absent_on_error<T>(analysis: &str, result: DataResult<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(analysis, error = %e, "Sub-analysis failed, skipping its insight");
            None
        }
    }
}

pub struct InsightGenerator {
    aggregator: MarketSentimentAggregator,
    engine: CorrelationEngine,
    detector: PatternDetector,
    sentiment_hours: i64,
    correlation_hours: i64,
    pattern_hours: i64,
}

impl InsightGenerator {
    pub fn new(repo: Arc<dyn MarketDataRepository>, config: &Config) -> Self {
        Self {
            aggregator: MarketSentimentAggregator::new(repo.clone()),
            engine: CorrelationEngine::new(repo.clone(), config),
            detector: PatternDetector::new(repo, config),
            sentiment_hours: config.analysis.sentiment_lookback_hours,
            correlation_hours: config.analysis.correlation_lookback_hours,
            pattern_hours: config.analysis.pattern_lookback_hours,
        }
    }

    pub async fn generate(&self) -> Vec<Insight> {
        self.generate_at(Utc::now()).await
    }

    /// Run each sub-analysis independently. Never fails: a sub-analysis that
    /// errors is logged and contributes nothing.
    pub async fn generate_at(&self, now: DateTime<Utc>) -> Vec<Insight> {
        let sentiment = absent_on_error(
            "market_sentiment",
            self.aggregator.score_at(now, self.sentiment_hours).await,
        );
        let impact = absent_on_error(
            "correlation",
            self.engine.analyze_impact_at(now, self.correlation_hours).await,
        );
        let patterns = absent_on_error(
            "patterns",
            self.detector.identify_patterns_at(now, self.pattern_hours).await,
        );

        let insights = compose_insights(sentiment.as_ref(), impact.as_ref(), patterns.as_deref());
        info!(count = insights.len(), "Generated market insights");
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::correlation::ImpactBucket;
    use crate::analysis::patterns::PatternType;

    fn summary(score: f64, total_articles: usize) -> SentimentSummary {
        SentimentSummary {
            score,
            category: MarketSentiment::from_score(score),
            total_articles,
            confidence: 0.8,
        }
    }

    fn report(r: f64) -> ImpactReport {
        ImpactReport {
            overall_correlation: r,
            total_data_points: 4,
            positive_impact: ImpactBucket::default(),
            negative_impact: ImpactBucket::default(),
            neutral_impact: ImpactBucket::default(),
        }
    }

    fn pattern(confidence: f64) -> Pattern {
        Pattern {
            timestamp: Utc::now(),
            price_change: 6.0,
            volume: 100,
            news_count: 1,
            avg_sentiment: 0.2,
            pattern_type: PatternType::PriceSpikeWithNews,
            confidence,
        }
    }

    #[test]
    fn test_nothing_in_nothing_out() {
        assert!(compose_insights(None, None, None).is_empty());
    }

    #[test]
    fn test_neutral_sentiment_is_silent() {
        assert!(compose_insights(Some(&summary(0.1, 5)), None, None).is_empty());
    }

    #[test]
    fn test_sentiment_direction_picks_recommendation() {
        let bullish = compose_insights(Some(&summary(0.45, 4)), None, None);
        assert_eq!(bullish.len(), 1);
        assert_eq!(bullish[0].kind, InsightKind::SentimentAnalysis);
        assert_eq!(
            bullish[0].message,
            "Market sentiment is bullish (0.45) with 4 recent articles"
        );
        assert_eq!(
            bullish[0].recommendation,
            "Consider monitoring for positive price movements"
        );

        let bearish = compose_insights(Some(&summary(-0.3, 3)), None, None);
        assert_eq!(bearish[0].recommendation, "Monitor for potential price declines");
    }

    #[test]
    fn test_correlation_threshold() {
        assert!(compose_insights(None, Some(&report(0.3)), None).is_empty());

        let insights = compose_insights(None, Some(&report(-0.55)), None);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::CorrelationAnalysis);
        assert!((insights[0].confidence - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_pattern_insight_counts_confident_patterns_only() {
        let patterns = vec![pattern(1.0), pattern(0.7), pattern(0.8)];
        let insights = compose_insights(None, None, Some(patterns.as_slice()));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].message, "Found 2 significant price movement patterns");
        assert!((insights[0].confidence - 0.9).abs() < 1e-12);

        assert!(compose_insights(None, None, Some(&[pattern(0.5)][..])).is_empty());
        assert!(compose_insights(None, None, Some(&[][..])).is_empty());
    }

    #[test]
    fn test_insight_serializes_kind_as_type() {
        let insights = compose_insights(None, Some(&report(0.9)), None);
        let json = serde_json::to_value(&insights[0]).unwrap();
        assert_eq!(json["type"], "correlation_analysis");
    }
}
