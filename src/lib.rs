// Brøndby IF Tracker - news sentiment vs. stock price correlation and alerting
// Scores Danish football news, joins it with BIF.CO quotes, derives correlation,
// patterns and market sentiment, and raises Telegram alerts on significant moves.

#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod data;
pub mod db;
pub mod report;

// Re-export commonly used items
pub use alerts::{AlertCycleReport, AlertEvaluator, AlertRecord, AlertType, NewAlert, Severity};
pub use analysis::{
    CorrelationEngine, ImpactReport, Insight, InsightGenerator, MarketSentimentAggregator, Pattern,
    PatternDetector, SentimentSummary,
};
pub use config::Config;
pub use data::{DataError, DataResult, NewsItem, PriceSample};
pub use report::{DailyReport, DailyReporter};
