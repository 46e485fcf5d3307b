//! In-process store used by the demo command and the test suite

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::repository::{AlertStore, MarketDataRepository};
use super::{DataError, DataResult, NewsItem, PriceSample};
use crate::alerts::{AlertRecord, NewAlert};

#[derive(Default)]
struct Inner {
    prices: Vec<PriceSample>,
    news: Vec<NewsItem>,
    alerts: Vec<AlertRecord>,
}

/// Mutex-guarded vectors; the lock is never held across an await point
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed quotes and news in one go (test and demo setup)
    pub fn with_data(prices: Vec<PriceSample>, news: Vec<NewsItem>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.prices = prices;
            inner.prices.sort_by_key(|p| p.timestamp);
            inner.news = news;
            inner.news.sort_by_key(|n| n.timestamp);
        }
        store
    }

    /// Snapshot of stored alerts, in insertion order
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.lock().map(|inner| inner.alerts.clone()).unwrap_or_default()
    }

    fn lock(&self) -> DataResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DataError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MarketDataRepository for MemoryStore {
    async fn prices_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<PriceSample>> {
        let inner = self.lock()?;
        Ok(inner
            .prices
            .iter()
            .filter(|p| p.symbol == symbol && p.timestamp >= start && p.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn latest_prices(&self, symbol: &str, limit: usize) -> DataResult<Vec<PriceSample>> {
        let inner = self.lock()?;
        Ok(inner
            .prices
            .iter()
            .rev()
            .filter(|p| p.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn news_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<NewsItem>> {
        let inner = self.lock()?;
        Ok(inner
            .news
            .iter()
            .filter(|n| n.timestamp >= start && n.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn recent_news(&self, since: DateTime<Utc>, limit: usize) -> DataResult<Vec<NewsItem>> {
        let inner = self.lock()?;
        Ok(inner
            .news
            .iter()
            .rev()
            .filter(|n| n.timestamp >= since)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_price(&self, sample: &PriceSample) -> DataResult<()> {
        let mut inner = self.lock()?;
        let pos = inner
            .prices
            .partition_point(|p| p.timestamp <= sample.timestamp);
        inner.prices.insert(pos, sample.clone());
        Ok(())
    }

    async fn record_news(&self, item: &NewsItem) -> DataResult<bool> {
        let mut inner = self.lock()?;
        if inner.news.iter().any(|n| n.url == item.url) {
            return Ok(false);
        }
        let pos = inner.news.partition_point(|n| n.timestamp <= item.timestamp);
        inner.news.insert(pos, item.clone());
        Ok(true)
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn save_alert(&self, alert: &NewAlert) -> DataResult<Uuid> {
        let mut inner = self.lock()?;
        let id = Uuid::new_v4();
        inner.alerts.push(AlertRecord {
            id,
            timestamp: alert.timestamp,
            alert_type: alert.alert_type,
            message: alert.message.clone(),
            severity: alert.severity,
            is_sent: false,
            sent_at: None,
        });
        Ok(id)
    }

    async fn mark_alert_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> DataResult<()> {
        let mut inner = self.lock()?;
        let alert = inner
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DataError::NotFound(format!("alert {}", id)))?;
        alert.is_sent = true;
        alert.sent_at = Some(sent_at);
        Ok(())
    }

    async fn alerts_since(&self, since: DateTime<Utc>) -> DataResult<Vec<AlertRecord>> {
        let inner = self.lock()?;
        let mut alerts: Vec<AlertRecord> = inner
            .alerts
            .iter()
            .filter(|a| a.timestamp >= since)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{news, price};
    use chrono::Duration;

    #[tokio::test]
    async fn test_record_news_is_idempotent_on_url() {
        let store = MemoryStore::new();
        let item = news(Utc::now(), 0.01, 0.2);
        assert!(store.record_news(&item).await.unwrap());
        assert!(!store.record_news(&item).await.unwrap());

        let all = store
            .news_between(Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_latest_prices_newest_first() {
        let now = Utc::now();
        let store = MemoryStore::with_data(
            vec![
                price(now - Duration::minutes(10), 1.0, 100),
                price(now - Duration::minutes(5), 2.0, 100),
                price(now, 3.0, 100),
            ],
            vec![],
        );
        let latest = store.latest_prices("BIF.CO", 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].change_percent, 3.0);
        assert_eq!(latest[1].change_percent, 2.0);
        assert!(store.latest_prices("OTHER", 2).await.unwrap().is_empty());
    }
}
