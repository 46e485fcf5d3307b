use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::env;

use crate::data::relevance::TOPICAL_KEYWORDS;
use crate::data::sentiment::{NEGATIVE_KEYWORDS, POSITIVE_KEYWORDS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub notifications: NotificationConfig,
    pub tracking: TrackingConfig,
    pub lexicon: LexiconConfig,
    pub analysis: AnalysisConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    /// Fraction, e.g. 0.05 = 5% move
    pub price_change_threshold: f64,
    pub sentiment_threshold: f64,
}

impl TrackingConfig {
    /// Threshold in the same unit as `PriceSample::change_percent`
    pub fn price_change_threshold_percent(&self) -> f64 {
        self.price_change_threshold * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconConfig {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub topical: Vec<String>,
}

/// Lookback defaults, all in hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub join_window_hours: i64,
    pub correlation_lookback_hours: i64,
    pub pattern_lookback_hours: i64,
    pub sentiment_lookback_hours: i64,
    pub alert_sentiment_lookback_hours: i64,
    pub alert_correlation_lookback_hours: i64,
}

/// Job intervals. Enforced by the external scheduler, informational here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub stock_update_secs: u64,
    pub news_update_secs: u64,
    pub analysis_secs: u64,
    pub alert_check_secs: u64,
    pub daily_report_at: NaiveTime,
}

fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {} value", key))
}

fn keywords(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(|s| s.to_string()).collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file - this sets env vars that aren't already set
        dotenv::dotenv().ok();

        // Database configuration - DATABASE_URL is required
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required but not set")?;

        let defaults = Config::default();

        let topical = match env::var("NEWS_KEYWORDS") {
            Ok(list) if !list.trim().is_empty() => list
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            _ => defaults.lexicon.topical,
        };

        let config = Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env("DB_MAX_CONNECTIONS", "5")?,
                min_connections: parse_env("DB_MIN_CONNECTIONS", "1")?,
            },
            notifications: NotificationConfig {
                telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
                telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
                timeout_seconds: parse_env("NOTIFY_TIMEOUT_SECONDS", "10")?,
            },
            tracking: TrackingConfig {
                symbol: env::var("STOCK_SYMBOL").unwrap_or(defaults.tracking.symbol),
                name: env::var("STOCK_NAME").unwrap_or(defaults.tracking.name),
                currency: env::var("CURRENCY").unwrap_or(defaults.tracking.currency),
                price_change_threshold: parse_env("PRICE_CHANGE_THRESHOLD", "0.05")?,
                sentiment_threshold: parse_env("SENTIMENT_THRESHOLD", "0.3")?,
            },
            lexicon: LexiconConfig {
                positive: defaults.lexicon.positive,
                negative: defaults.lexicon.negative,
                topical,
            },
            analysis: defaults.analysis,
            schedule: ScheduleConfig {
                stock_update_secs: parse_env("STOCK_UPDATE_INTERVAL", "300")?,
                news_update_secs: parse_env("NEWS_UPDATE_INTERVAL", "1800")?,
                analysis_secs: parse_env("SENTIMENT_UPDATE_INTERVAL", "3600")?,
                alert_check_secs: parse_env("ALERT_CHECK_INTERVAL", "600")?,
                daily_report_at: defaults.schedule.daily_report_at,
            },
        };

        let threshold = config.tracking.price_change_threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            anyhow::bail!(
                "PRICE_CHANGE_THRESHOLD must be positive, got {}",
                threshold
            );
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/brondby_tracker".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            notifications: NotificationConfig {
                telegram_bot_token: None,
                telegram_chat_id: None,
                timeout_seconds: 10,
            },
            tracking: TrackingConfig {
                symbol: "BIF.CO".to_string(),
                name: "Brøndby IF".to_string(),
                currency: "DKK".to_string(),
                price_change_threshold: 0.05,
                sentiment_threshold: 0.3,
            },
            lexicon: LexiconConfig {
                positive: keywords(POSITIVE_KEYWORDS),
                negative: keywords(NEGATIVE_KEYWORDS),
                topical: keywords(TOPICAL_KEYWORDS),
            },
            analysis: AnalysisConfig {
                join_window_hours: 2,
                correlation_lookback_hours: 24,
                pattern_lookback_hours: 48,
                sentiment_lookback_hours: 24,
                alert_sentiment_lookback_hours: 6,
                alert_correlation_lookback_hours: 12,
            },
            schedule: ScheduleConfig {
                stock_update_secs: 300,
                news_update_secs: 1800,
                analysis_secs: 3600,
                alert_check_secs: 600,
                daily_report_at: NaiveTime::from_hms_opt(18, 0, 0)
                    .expect("Invalid hardcoded time 18:00:00 - this is a bug"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert_eq!(config.tracking.symbol, "BIF.CO");
        assert!((config.tracking.price_change_threshold_percent() - 5.0).abs() < 1e-12);
        assert_eq!(config.analysis.join_window_hours, 2);
        assert!(!config.lexicon.topical.is_empty());
    }
}
