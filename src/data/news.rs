use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::relevance::RelevanceScorer;
use super::repository::MarketDataRepository;
use super::sentiment::{SentimentLabel, SentimentScorer};
use super::{validation, DataResult, NewsItem};

/// Article as delivered by a fetcher (API, RSS or scraper), before scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Scores fetched articles and stores the relevant ones
pub struct NewsIngestor {
    repo: Arc<dyn MarketDataRepository>,
    sentiment: Arc<dyn SentimentScorer>,
    relevance: RelevanceScorer,
}

impl NewsIngestor {
    pub fn new(
        repo: Arc<dyn MarketDataRepository>,
        sentiment: Arc<dyn SentimentScorer>,
        relevance: RelevanceScorer,
    ) -> Self {
        Self {
            repo,
            sentiment,
            relevance,
        }
    }

    /// Score one article. Sentiment is taken from title and description only,
    /// relevance from all three text fields.
    pub fn score_article(&self, article: &RawArticle, now: DateTime<Utc>) -> NewsItem {
        let description = article.description.clone().unwrap_or_default();
        let content = article.content.clone().unwrap_or_default();

        let sentiment = self
            .sentiment
            .score(&format!("{} {}", article.title, description));
        let score = sentiment.score.clamp(-1.0, 1.0);
        let relevance = self.relevance.score(&article.title, &description, &content);

        NewsItem {
            timestamp: now,
            title: article.title.clone(),
            description,
            content,
            url: article.url.clone(),
            source: article.source.clone(),
            published_at: article.published_at,
            sentiment_score: score,
            sentiment_label: sentiment.label,
            relevance_score: relevance.clamp(0.0, 1.0),
        }
    }

    pub async fn ingest(&self, articles: Vec<RawArticle>) -> DataResult<usize> {
        self.ingest_at(articles, Utc::now()).await
    }

    /// Dedupe by url, drop irrelevant articles, score and store the rest.
    /// Returns the number of newly stored items.
    pub async fn ingest_at(&self, articles: Vec<RawArticle>, now: DateTime<Utc>) -> DataResult<usize> {
        let fetched = articles.len();
        let mut seen_urls = HashSet::new();
        let mut saved = 0;

        for article in articles {
            if !seen_urls.insert(article.url.clone()) {
                continue;
            }

            let headline = format!(
                "{} {}",
                article.title,
                article.description.as_deref().unwrap_or("")
            );
            if !self.relevance.is_relevant(&headline) {
                tracing::debug!(url = %article.url, "Skipping irrelevant article");
                continue;
            }

            let item = self.score_article(&article, now);
            if let Err(e) = validation::validate_news_item(&item) {
                tracing::warn!(url = %article.url, "Skipping invalid article: {}", e);
                continue;
            }

            if self.repo.record_news(&item).await? {
                tracing::info!(
                    "Saved news article: {} ({})",
                    truncate_chars(&item.title, 50),
                    item.sentiment_label
                );
                saved += 1;
            }
        }

        tracing::info!(fetched, saved, "News ingestion complete");
        Ok(saved)
    }
}

/// Label counts and average score over recent news
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSentimentBreakdown {
    pub total_articles: usize,
    pub positive_articles: usize,
    pub negative_articles: usize,
    pub neutral_articles: usize,
    pub avg_sentiment: f64,
    pub positive_share: f64,
    pub negative_share: f64,
    pub neutral_share: f64,
}

impl NewsSentimentBreakdown {
    pub fn from_items(items: &[NewsItem]) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let total = items.len();
        let count = |label: SentimentLabel| items.iter().filter(|i| i.sentiment_label == label).count();
        let positive = count(SentimentLabel::Positive);
        let negative = count(SentimentLabel::Negative);
        let neutral = count(SentimentLabel::Neutral);
        let avg_sentiment = items.iter().map(|i| i.sentiment_score).sum::<f64>() / total as f64;

        Some(Self {
            total_articles: total,
            positive_articles: positive,
            negative_articles: negative,
            neutral_articles: neutral,
            avg_sentiment,
            positive_share: positive as f64 / total as f64,
            negative_share: negative as f64 / total as f64,
            neutral_share: neutral as f64 / total as f64,
        })
    }

    /// Breakdown of the news stored during the last `hours`
    pub async fn load(
        repo: &dyn MarketDataRepository,
        now: DateTime<Utc>,
        hours: i64,
    ) -> DataResult<Option<Self>> {
        let items = repo.news_between(validation::hours_before(now, hours)?, now).await?;
        Ok(Self::from_items(&items))
    }
}

/// Truncate to at most `max` characters, appending "..." when shortened
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}
