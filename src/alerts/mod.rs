//! Alert raising, persistence and delivery

pub mod evaluator;
pub mod notifier;

pub use evaluator::AlertEvaluator;
pub use notifier::{Notifier, RecordingNotifier, TelegramNotifier};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum AlertType {
    PriceSpike,
    VolumeSurge,
    SentimentExtreme,
    CorrelationPattern,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceSpike => "price_spike",
            AlertType::VolumeSurge => "volume_surge",
            AlertType::SentimentExtreme => "sentiment_extreme",
            AlertType::CorrelationPattern => "correlation_pattern",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alert raised by a detector, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub alert_type: AlertType,
    /// Rendered HTML message, ready for dispatch
    pub message: String,
    pub severity: Severity,
    /// When the alert was raised, not the time of the data behind it
    pub timestamp: DateTime<Utc>,
}

/// A persisted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AlertRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Where an alert ended up within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Persisted, but marking it sent failed after a successful dispatch
    Saved,
    Sent,
    SendFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertOutcome {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub state: DeliveryState,
}

/// Counters for one alert-check cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertCycleReport {
    pub raised: usize,
    pub persisted: usize,
    pub sent: usize,
    pub failed: usize,
    pub by_type: BTreeMap<String, usize>,
    pub outcomes: Vec<AlertOutcome>,
}

impl AlertCycleReport {
    pub fn count(&self, alert_type: AlertType) -> usize {
        self.by_type.get(alert_type.as_str()).copied().unwrap_or(0)
    }

    pub(crate) fn record_raised(&mut self, alert: &NewAlert) {
        self.raised += 1;
        *self
            .by_type
            .entry(alert.alert_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn record_outcome(&mut self, outcome: AlertOutcome) {
        self.persisted += 1;
        match outcome.state {
            DeliveryState::Sent => self.sent += 1,
            DeliveryState::SendFailed => self.failed += 1,
            DeliveryState::Saved => {}
        }
        self.outcomes.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_and_severity_names() {
        assert_eq!(AlertType::CorrelationPattern.to_string(), "correlation_pattern");
        assert_eq!(
            serde_json::to_value(AlertType::VolumeSurge).unwrap(),
            "volume_surge"
        );
        assert_eq!(serde_json::to_value(Severity::High).unwrap(), "high");
        assert!(Severity::High > Severity::Medium);
    }

    #[test]
    fn test_report_counters() {
        let mut report = AlertCycleReport::default();
        let alert = NewAlert {
            alert_type: AlertType::PriceSpike,
            message: "m".to_string(),
            severity: Severity::Medium,
            timestamp: Utc::now(),
        };
        report.record_raised(&alert);
        report.record_raised(&alert);
        report.record_outcome(AlertOutcome {
            id: Uuid::new_v4(),
            alert_type: AlertType::PriceSpike,
            severity: Severity::Medium,
            state: DeliveryState::Sent,
        });
        report.record_outcome(AlertOutcome {
            id: Uuid::new_v4(),
            alert_type: AlertType::PriceSpike,
            severity: Severity::Medium,
            state: DeliveryState::SendFailed,
        });

        assert_eq!(report.raised, 2);
        assert_eq!(report.persisted, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.count(AlertType::PriceSpike), 2);
        assert_eq!(report.count(AlertType::VolumeSurge), 0);
    }
}
