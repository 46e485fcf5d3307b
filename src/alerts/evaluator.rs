//! Alert detectors and the persist → dispatch → mark-sent cycle
//!
//! The detectors are pure functions over already loaded data; `AlertEvaluator`
//! loads that data, runs them, and walks every raised alert through delivery.
//! A failing detector or delivery never stops the rest of the cycle.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::notifier::Notifier;
use super::{AlertCycleReport, AlertOutcome, AlertType, DeliveryState, NewAlert, Severity};
use crate::analysis::{CorrelationEngine, ImpactReport, MarketSentimentAggregator, SentimentSummary};
use crate::config::Config;
use crate::data::news::truncate_chars;
use crate::data::{AlertStore, DataResult, MarketDataRepository, NewsItem, PriceSample};

/// Moves beyond this percentage escalate a price spike to `high`
pub const HIGH_SEVERITY_CHANGE_PERCENT: f64 = 10.0;
/// Volume growth (percent over the previous sample) that counts as a surge
pub const VOLUME_SURGE_PERCENT: f64 = 100.0;
pub const SENTIMENT_ALERT_SCORE: f64 = 0.5;
/// Fewer articles than this never raise a sentiment alert
pub const SENTIMENT_MIN_ARTICLES: usize = 3;
pub const CORRELATION_ALERT_THRESHOLD: f64 = 0.6;
/// News published this long before a spike is listed in its message
pub const SPIKE_NEWS_LOOKBEHIND_HOURS: i64 = 4;
pub const SPIKE_NEWS_LIMIT: usize = 3;
const NEWS_TITLE_CHARS: usize = 50;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Naming and thresholds shared by the detectors
#[derive(Debug, Clone)]
pub struct AlertRules {
    pub stock_name: String,
    pub currency: String,
    pub price_change_threshold_percent: f64,
}

impl AlertRules {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stock_name: config.tracking.name.clone(),
            currency: config.tracking.currency.clone(),
            price_change_threshold_percent: config.tracking.price_change_threshold_percent(),
        }
    }

    pub fn is_price_spike(&self, change_percent: f64) -> bool {
        change_percent.abs() > self.price_change_threshold_percent
    }
}

/// Volume growth of `latest` over `previous` in percent; 0 when the previous
/// volume is not positive
pub fn volume_change_percent(latest: &PriceSample, previous: &PriceSample) -> f64 {
    if previous.volume > 0 {
        (latest.volume - previous.volume) as f64 / previous.volume as f64 * 100.0
    } else {
        0.0
    }
}

/// 1234567 -> "1,234,567"
pub(crate) fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Price-spike and volume-surge checks over the two most recent samples.
///
/// `recent_news` is listed in the spike message as given (newest first,
/// at most `SPIKE_NEWS_LIMIT` entries are used). Alerts are stamped with
/// `now`; the sample time only appears in the message.
pub fn price_alerts(
    latest: &PriceSample,
    previous: &PriceSample,
    recent_news: &[NewsItem],
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Vec<NewAlert> {
    let mut alerts = Vec::new();
    let time = latest.timestamp.format(TIME_FORMAT);

    if rules.is_price_spike(latest.change_percent) {
        let severity = if latest.change_percent.abs() > HIGH_SEVERITY_CHANGE_PERCENT {
            Severity::High
        } else {
            Severity::Medium
        };

        let mut message = format!(
            "🚨 <b>Price Alert: {}</b>\n\nPrice: {:.2} {}\nChange: {:+.2}%\nVolume: {}\nTime: {}",
            rules.stock_name,
            latest.price,
            rules.currency,
            latest.change_percent,
            group_thousands(latest.volume),
            time
        );

        if !recent_news.is_empty() {
            message.push_str("\n\n📰 <b>Recent News:</b>\n");
            for item in recent_news.iter().take(SPIKE_NEWS_LIMIT) {
                message.push_str(&format!(
                    "{} {}\n",
                    item.sentiment_label.glyph(),
                    truncate_chars(&item.title, NEWS_TITLE_CHARS)
                ));
            }
        }

        alerts.push(NewAlert {
            alert_type: AlertType::PriceSpike,
            message,
            severity,
            timestamp: now,
        });
    }

    let volume_change = volume_change_percent(latest, previous);
    if volume_change >= VOLUME_SURGE_PERCENT {
        alerts.push(NewAlert {
            alert_type: AlertType::VolumeSurge,
            message: format!(
                "📊 <b>Volume Alert: {}</b>\n\nVolume: {}\nVolume Change: {:+.1}%\nPrice: {:.2} {}\nTime: {}",
                rules.stock_name,
                group_thousands(latest.volume),
                volume_change,
                latest.price,
                rules.currency,
                time
            ),
            severity: Severity::Medium,
            timestamp: now,
        });
    }

    alerts
}

/// Extreme sentiment backed by enough articles
pub fn sentiment_alert(
    summary: &SentimentSummary,
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Option<NewAlert> {
    if summary.score.abs() <= SENTIMENT_ALERT_SCORE || summary.total_articles < SENTIMENT_MIN_ARTICLES {
        return None;
    }

    let (glyph, mood) = if summary.score > 0.0 {
        ("🟢", "Bullish")
    } else {
        ("🔴", "Bearish")
    };

    Some(NewAlert {
        alert_type: AlertType::SentimentExtreme,
        message: format!(
            "{} <b>{} Sentiment Alert: {}</b>\n\nSentiment Score: {:.2}\nArticles: {}\nConfidence: {:.2}",
            glyph, mood, rules.stock_name, summary.score, summary.total_articles, summary.confidence
        ),
        severity: Severity::Medium,
        timestamp: now,
    })
}

/// Strong news/price correlation
pub fn correlation_alert(
    report: &ImpactReport,
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Option<NewAlert> {
    if report.overall_correlation.abs() <= CORRELATION_ALERT_THRESHOLD {
        return None;
    }

    let mut message = format!(
        "📈 <b>Correlation Alert: {}</b>\n\nNews-Price Correlation: {:.2}\nData Points: {}\n\n",
        rules.stock_name, report.overall_correlation, report.total_data_points
    );
    if report.positive_impact.count > 0 {
        message.push_str(&format!(
            "Positive News Impact: {:.2}%\n",
            report.positive_impact.avg_price_change
        ));
    }
    if report.negative_impact.count > 0 {
        message.push_str(&format!(
            "Negative News Impact: {:.2}%",
            report.negative_impact.avg_price_change
        ));
    }

    Some(NewAlert {
        alert_type: AlertType::CorrelationPattern,
        message,
        severity: Severity::Low,
        timestamp: now,
    })
}

pub struct AlertEvaluator {
    repo: Arc<dyn MarketDataRepository>,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    aggregator: MarketSentimentAggregator,
    engine: CorrelationEngine,
    rules: AlertRules,
    symbol: String,
    sentiment_hours: i64,
    correlation_hours: i64,
}

impl AlertEvaluator {
    pub fn new(
        repo: Arc<dyn MarketDataRepository>,
        store: Arc<dyn AlertStore>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            aggregator: MarketSentimentAggregator::new(repo.clone()),
            engine: CorrelationEngine::new(repo.clone(), config),
            repo,
            store,
            notifier,
            rules: AlertRules::from_config(config),
            symbol: config.tracking.symbol.clone(),
            sentiment_hours: config.analysis.alert_sentiment_lookback_hours,
            correlation_hours: config.analysis.alert_correlation_lookback_hours,
        }
    }

    pub async fn run_cycle(&self) -> AlertCycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run all detectors, then persist and dispatch every raised alert in order
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> AlertCycleReport {
        let mut raised = Vec::new();
        collect("price", self.check_price(now).await, &mut raised);
        collect("sentiment", self.check_sentiment(now).await, &mut raised);
        collect("correlation", self.check_correlation(now).await, &mut raised);

        let mut report = AlertCycleReport::default();
        for alert in &raised {
            report.record_raised(alert);
            if let Some(outcome) = self.deliver(alert, now).await {
                report.record_outcome(outcome);
            }
        }

        info!(
            raised = report.raised,
            persisted = report.persisted,
            sent = report.sent,
            failed = report.failed,
            "Alert check cycle complete"
        );
        report
    }

    async fn check_price(&self, now: DateTime<Utc>) -> DataResult<Vec<NewAlert>> {
        let samples = self.repo.latest_prices(&self.symbol, 2).await?;
        let (latest, previous) = match samples.as_slice() {
            [latest, previous, ..] => (latest, previous),
            _ => {
                debug!(symbol = %self.symbol, "Fewer than two samples, skipping price checks");
                return Ok(Vec::new());
            }
        };

        let recent_news = if self.rules.is_price_spike(latest.change_percent) {
            let mut news = self
                .repo
                .news_between(
                    latest.timestamp - Duration::hours(SPIKE_NEWS_LOOKBEHIND_HOURS),
                    latest.timestamp,
                )
                .await?;
            news.reverse();
            news.truncate(SPIKE_NEWS_LIMIT);
            news
        } else {
            Vec::new()
        };

        Ok(price_alerts(latest, previous, &recent_news, &self.rules, now))
    }

    async fn check_sentiment(&self, now: DateTime<Utc>) -> DataResult<Vec<NewAlert>> {
        let summary = self.aggregator.score_at(now, self.sentiment_hours).await?;
        Ok(summary
            .and_then(|s| sentiment_alert(&s, &self.rules, now))
            .into_iter()
            .collect())
    }

    async fn check_correlation(&self, now: DateTime<Utc>) -> DataResult<Vec<NewAlert>> {
        let report = self.engine.analyze_impact_at(now, self.correlation_hours).await?;
        Ok(report
            .and_then(|r| correlation_alert(&r, &self.rules, now))
            .into_iter()
            .collect())
    }

    /// Persist, dispatch, mark sent. `None` when the alert could not be persisted.
    async fn deliver(&self, alert: &NewAlert, now: DateTime<Utc>) -> Option<AlertOutcome> {
        let id = match self.store.save_alert(alert).await {
            Ok(id) => id,
            Err(e) => {
                error!(alert_type = %alert.alert_type, error = %e, "Failed to save alert, skipping dispatch");
                return None;
            }
        };

        let state = match self.notifier.dispatch(&alert.message).await {
            Ok(()) => match self.store.mark_alert_sent(id, now).await {
                Ok(()) => {
                    info!(%id, alert_type = %alert.alert_type, "Alert sent");
                    DeliveryState::Sent
                }
                Err(e) => {
                    warn!(%id, error = %e, "Alert dispatched but could not be marked sent");
                    DeliveryState::Saved
                }
            },
            Err(e) => {
                error!(%id, alert_type = %alert.alert_type, error = %e, "Failed to send alert");
                DeliveryState::SendFailed
            }
        };

        Some(AlertOutcome {
            id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            state,
        })
    }
}

fn collect(detector: &str, result: DataResult<Vec<NewAlert>>, raised: &mut Vec<NewAlert>) {
    match result {
        Ok(alerts) => raised.extend(alerts),
        Err(e) => error!(detector, error = %e, "Alert detector failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ImpactBucket, MarketSentiment};
    use crate::data::fixtures::{news, price};

    fn rules() -> AlertRules {
        AlertRules::from_config(&Config::default())
    }

    fn summary(score: f64, total_articles: usize) -> SentimentSummary {
        SentimentSummary {
            score,
            category: MarketSentiment::from_score(score),
            total_articles,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_price_spike_severity() {
        let now = Utc::now();
        let previous = price(now - Duration::hours(1), 0.0, 1000);

        let alerts = price_alerts(&price(now, 6.0, 1000), &previous, &[], &rules(), now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::PriceSpike);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[0].timestamp, now);

        let alerts = price_alerts(&price(now, 11.0, 1000), &previous, &[], &rules(), now);
        assert_eq!(alerts[0].severity, Severity::High);

        let alerts = price_alerts(&price(now, -11.0, 1000), &previous, &[], &rules(), now);
        assert_eq!(alerts[0].severity, Severity::High);

        assert!(price_alerts(&price(now, 5.0, 1000), &previous, &[], &rules(), now).is_empty());
    }

    #[test]
    fn test_price_spike_message() {
        let now = Utc::now();
        let mut latest = price(now, 6.0, 1234567);
        latest.price = 7.25;
        let previous = price(now - Duration::hours(1), 0.0, 1234567);
        let mut item = news(now - Duration::hours(1), 0.4, 1.0);
        item.title = "Brøndby henter ny angriber efter stor sejr i weekendens Superliga-kamp".to_string();

        let alerts = price_alerts(&latest, &previous, &[item], &rules(), now);
        let message = &alerts[0].message;
        assert!(message.starts_with("🚨 <b>Price Alert: Brøndby IF</b>"));
        assert!(message.contains("Price: 7.25 DKK"));
        assert!(message.contains("Change: +6.00%"));
        assert!(message.contains("Volume: 1,234,567"));
        assert!(message.contains("📰 <b>Recent News:</b>"));
        assert!(message.contains("🟢 Brøndby henter ny angriber efter stor sejr i weeke...\n"));
    }

    #[test]
    fn test_spike_message_lists_at_most_three_news() {
        let now = Utc::now();
        let items: Vec<_> = (1..=5)
            .map(|i| news(now - Duration::minutes(i * 10), -0.2, 1.0))
            .collect();
        let alerts = price_alerts(
            &price(now, 7.0, 100),
            &price(now - Duration::hours(1), 0.0, 100),
            &items,
            &rules(),
            now,
        );
        assert_eq!(alerts[0].message.matches("🔴").count(), 3);
    }

    #[test]
    fn test_volume_surge() {
        let now = Utc::now();
        let previous = price(now - Duration::hours(1), 0.0, 1000);

        let alerts = price_alerts(&price(now, 1.0, 2000), &previous, &[], &rules(), now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::VolumeSurge);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert!(alerts[0].message.contains("Volume Change: +100.0%"));

        assert!(price_alerts(&price(now, 1.0, 1999), &previous, &[], &rules(), now).is_empty());
    }

    #[test]
    fn test_zero_previous_volume_is_no_surge() {
        let now = Utc::now();
        let previous = price(now - Duration::hours(1), 0.0, 0);
        assert_eq!(volume_change_percent(&price(now, 0.0, 5000), &previous), 0.0);
        assert!(price_alerts(&price(now, 0.0, 5000), &previous, &[], &rules(), now).is_empty());
    }

    #[test]
    fn test_spike_and_surge_fire_together() {
        let now = Utc::now();
        let alerts = price_alerts(
            &price(now, -8.0, 3000),
            &price(now - Duration::hours(1), 0.0, 1000),
            &[],
            &rules(),
            now,
        );
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::PriceSpike, AlertType::VolumeSurge]);
    }

    #[test]
    fn test_sentiment_alert_requires_three_articles() {
        let now = Utc::now();
        assert!(sentiment_alert(&summary(0.6, 2), &rules(), now).is_none());

        let alert = sentiment_alert(&summary(0.6, 3), &rules(), now).unwrap();
        assert_eq!(alert.alert_type, AlertType::SentimentExtreme);
        assert_eq!(alert.severity, Severity::Medium);
        assert!(alert.message.starts_with("🟢 <b>Bullish Sentiment Alert"));

        let alert = sentiment_alert(&summary(-0.7, 4), &rules(), now).unwrap();
        assert!(alert.message.starts_with("🔴 <b>Bearish Sentiment Alert"));

        assert!(sentiment_alert(&summary(0.5, 10), &rules(), now).is_none());
    }

    #[test]
    fn test_correlation_alert() {
        let now = Utc::now();
        let mut report = ImpactReport {
            overall_correlation: 0.6,
            total_data_points: 6,
            positive_impact: ImpactBucket {
                count: 2,
                avg_price_change: 3.5,
                avg_sentiment: 0.4,
            },
            negative_impact: ImpactBucket::default(),
            neutral_impact: ImpactBucket::default(),
        };
        assert!(correlation_alert(&report, &rules(), now).is_none());

        report.overall_correlation = -0.75;
        let alert = correlation_alert(&report, &rules(), now).unwrap();
        assert_eq!(alert.severity, Severity::Low);
        assert!(alert.message.contains("News-Price Correlation: -0.75"));
        assert!(alert.message.contains("Positive News Impact: 3.50%"));
        assert!(!alert.message.contains("Negative News Impact"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(-1234567), "-1,234,567");
    }
}
