//! Storage seams consumed by the analytical core, plus the PostgreSQL adapter
//!
//! The analyzers never open connections themselves: they receive an
//! `Arc<dyn MarketDataRepository>` / `Arc<dyn AlertStore>` at construction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DataError, DataResult, NewsItem, PriceSample, SentimentLabel};
use crate::alerts::{AlertRecord, NewAlert};

/// Read/write access to recorded quotes and scored news
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// Quotes for `symbol` with `start <= timestamp <= end`, oldest first
    async fn prices_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<PriceSample>>;

    /// The `limit` most recent quotes for `symbol`, newest first
    async fn latest_prices(&self, symbol: &str, limit: usize) -> DataResult<Vec<PriceSample>>;

    /// News with `start <= timestamp <= end`, oldest first
    async fn news_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<NewsItem>>;

    /// Up to `limit` news items with `timestamp >= since`, newest first
    async fn recent_news(&self, since: DateTime<Utc>, limit: usize) -> DataResult<Vec<NewsItem>>;

    async fn record_price(&self, sample: &PriceSample) -> DataResult<()>;

    /// Store a news item; returns false when an item with the same url exists
    async fn record_news(&self, item: &NewsItem) -> DataResult<bool>;
}

/// Persistence of raised alerts
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a raised alert and return its identity
    async fn save_alert(&self, alert: &NewAlert) -> DataResult<Uuid>;

    async fn mark_alert_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> DataResult<()>;

    /// Alerts with `timestamp >= since`, newest first
    async fn alerts_since(&self, since: DateTime<Utc>) -> DataResult<Vec<AlertRecord>>;
}

#[derive(sqlx::FromRow)]
struct NewsRow {
    timestamp: DateTime<Utc>,
    title: String,
    description: String,
    content: String,
    url: String,
    source: String,
    published_at: Option<DateTime<Utc>>,
    sentiment_score: f64,
    sentiment_label: String,
    relevance_score: f64,
}

impl TryFrom<NewsRow> for NewsItem {
    type Error = DataError;

    fn try_from(row: NewsRow) -> Result<Self, Self::Error> {
        Ok(NewsItem {
            timestamp: row.timestamp,
            title: row.title,
            description: row.description,
            content: row.content,
            url: row.url,
            source: row.source,
            published_at: row.published_at,
            sentiment_score: row.sentiment_score,
            sentiment_label: row.sentiment_label.parse::<SentimentLabel>()?,
            relevance_score: row.relevance_score,
        })
    }
}

const PRICE_COLUMNS: &str = r#"
    timestamp, symbol, price, volume,
    open_price AS open, high_price AS high, low_price AS low, close_price AS close,
    change_percent
"#;

const NEWS_COLUMNS: &str = r#"
    timestamp, title, description, content, url, source, published_at,
    sentiment_score, sentiment_label, relevance_score
"#;

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketDataRepository for PgRepository {
    async fn prices_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<PriceSample>> {
        let sql = format!(
            "SELECT {} FROM stock_data WHERE symbol = $1 AND timestamp >= $2 AND timestamp <= $3 ORDER BY timestamp ASC",
            PRICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, PriceSample>(&sql)
            .bind(symbol)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn latest_prices(&self, symbol: &str, limit: usize) -> DataResult<Vec<PriceSample>> {
        let sql = format!(
            "SELECT {} FROM stock_data WHERE symbol = $1 ORDER BY timestamp DESC, id DESC LIMIT $2",
            PRICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, PriceSample>(&sql)
            .bind(symbol)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn news_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DataResult<Vec<NewsItem>> {
        let sql = format!(
            "SELECT {} FROM news_articles WHERE timestamp >= $1 AND timestamp <= $2 ORDER BY timestamp ASC",
            NEWS_COLUMNS
        );
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(NewsItem::try_from)
            .collect()
    }

    async fn recent_news(&self, since: DateTime<Utc>, limit: usize) -> DataResult<Vec<NewsItem>> {
        let sql = format!(
            "SELECT {} FROM news_articles WHERE timestamp >= $1 ORDER BY timestamp DESC LIMIT $2",
            NEWS_COLUMNS
        );
        sqlx::query_as::<_, NewsRow>(&sql)
            .bind(since)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(NewsItem::try_from)
            .collect()
    }

    async fn record_price(&self, sample: &PriceSample) -> DataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_data (
                timestamp, symbol, price, volume,
                open_price, high_price, low_price, close_price, change_percent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(sample.timestamp)
        .bind(&sample.symbol)
        .bind(sample.price)
        .bind(sample.volume)
        .bind(sample.open)
        .bind(sample.high)
        .bind(sample.low)
        .bind(sample.close)
        .bind(sample.change_percent)
        .execute(&self.pool)
        .await?;

        tracing::debug!(symbol = %sample.symbol, price = sample.price, "Price sample persisted");
        Ok(())
    }

    async fn record_news(&self, item: &NewsItem) -> DataResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO news_articles (
                timestamp, title, description, content, url, source, published_at,
                sentiment_score, sentiment_label, relevance_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(item.timestamp)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.content)
        .bind(&item.url)
        .bind(&item.source)
        .bind(item.published_at)
        .bind(item.sentiment_score)
        .bind(item.sentiment_label.as_str())
        .bind(item.relevance_score)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AlertStore for PgRepository {
    async fn save_alert(&self, alert: &NewAlert) -> DataResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO alerts (id, timestamp, alert_type, message, severity, is_sent)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            "#,
        )
        .bind(id)
        .bind(alert.timestamp)
        .bind(alert.alert_type)
        .bind(&alert.message)
        .bind(alert.severity)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn mark_alert_sent(&self, id: Uuid, sent_at: DateTime<Utc>) -> DataResult<()> {
        let result = sqlx::query("UPDATE alerts SET is_sent = TRUE, sent_at = $2 WHERE id = $1")
            .bind(id)
            .bind(sent_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataError::NotFound(format!("alert {}", id)));
        }
        Ok(())
    }

    async fn alerts_since(&self, since: DateTime<Utc>) -> DataResult<Vec<AlertRecord>> {
        let rows = sqlx::query_as::<_, AlertRecord>(
            r#"
            SELECT id, timestamp, alert_type, message, severity, is_sent, sent_at
            FROM alerts
            WHERE timestamp >= $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
