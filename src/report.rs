//! End-of-day summary combining price, news and market sentiment

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::alerts::evaluator::group_thousands;
use crate::alerts::Notifier;
use crate::analysis::{MarketSentiment, MarketSentimentAggregator, SentimentSummary};
use crate::config::Config;
use crate::data::{DataResult, MarketDataRepository, NewsSentimentBreakdown, PriceSummary};

const PRICE_DAYS: i64 = 1;
const NEWS_HOURS: i64 = 24;
const SENTIMENT_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub stock_name: String,
    pub currency: String,
    pub price: Option<PriceSummary>,
    pub news: Option<NewsSentimentBreakdown>,
    pub sentiment: Option<SentimentSummary>,
}

fn title_case(sentiment: MarketSentiment) -> &'static str {
    match sentiment {
        MarketSentiment::Bullish => "Bullish",
        MarketSentiment::Neutral => "Neutral",
        MarketSentiment::Bearish => "Bearish",
    }
}

impl DailyReport {
    /// HTML message with one section per available summary
    pub fn render(&self) -> String {
        let mut out = format!(
            "📊 <b>Daily Report: {}</b>\nDate: {}\n\n",
            self.stock_name,
            self.date.format("%Y-%m-%d")
        );

        if let Some(price) = &self.price {
            out.push_str("💰 <b>Stock Performance:</b>\n");
            out.push_str(&format!("Current Price: {:.2} {}\n", price.current_price, self.currency));
            out.push_str(&format!("Daily Change: {:+.2}%\n", price.total_change));
            out.push_str(&format!("High: {:.2} {}\n", price.highest_price, self.currency));
            out.push_str(&format!("Low: {:.2} {}\n", price.lowest_price, self.currency));
            out.push_str(&format!(
                "Avg Volume: {}\n\n",
                group_thousands(price.avg_volume.round() as i64)
            ));
        }

        if let Some(news) = &self.news {
            out.push_str("📰 <b>News Sentiment:</b>\n");
            out.push_str(&format!("Total Articles: {}\n", news.total_articles));
            out.push_str(&format!("Positive: {}\n", news.positive_articles));
            out.push_str(&format!("Negative: {}\n", news.negative_articles));
            out.push_str(&format!("Neutral: {}\n", news.neutral_articles));
            out.push_str(&format!("Avg Sentiment: {:.2}\n\n", news.avg_sentiment));
        }

        if let Some(sentiment) = &self.sentiment {
            out.push_str("🎯 <b>Market Sentiment:</b>\n");
            out.push_str(&format!("Score: {:.2}\n", sentiment.score));
            out.push_str(&format!("Category: {}\n", title_case(sentiment.category)));
            out.push_str(&format!("Confidence: {:.2}\n\n", sentiment.confidence));
        }

        out
    }
}

pub struct DailyReporter {
    repo: Arc<dyn MarketDataRepository>,
    notifier: Arc<dyn Notifier>,
    aggregator: MarketSentimentAggregator,
    symbol: String,
    stock_name: String,
    currency: String,
}

impl DailyReporter {
    pub fn new(
        repo: Arc<dyn MarketDataRepository>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            aggregator: MarketSentimentAggregator::new(repo.clone()),
            repo,
            notifier,
            symbol: config.tracking.symbol.clone(),
            stock_name: config.tracking.name.clone(),
            currency: config.tracking.currency.clone(),
        }
    }

    pub async fn build_at(&self, now: DateTime<Utc>) -> DataResult<DailyReport> {
        let price = PriceSummary::load(self.repo.as_ref(), &self.symbol, now, PRICE_DAYS).await?;
        let news = NewsSentimentBreakdown::load(self.repo.as_ref(), now, NEWS_HOURS).await?;
        let sentiment = self.aggregator.score_at(now, SENTIMENT_HOURS).await?;

        Ok(DailyReport {
            date: now.date_naive(),
            stock_name: self.stock_name.clone(),
            currency: self.currency.clone(),
            price,
            news,
            sentiment,
        })
    }

    pub async fn send(&self) -> DataResult<DailyReport> {
        self.send_at(Utc::now()).await
    }

    /// Build the report and dispatch it through the notifier
    pub async fn send_at(&self, now: DateTime<Utc>) -> DataResult<DailyReport> {
        let report = self.build_at(now).await?;
        self.notifier.dispatch(&report.render()).await?;
        info!(date = %report.date, "Daily report generated and sent");
        Ok(report)
    }
}
