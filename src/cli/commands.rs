use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use brondby_tracker::alerts::{AlertCycleReport, AlertEvaluator, Notifier, RecordingNotifier};
use brondby_tracker::analysis::{
    CorrelationEngine, ImpactReport, Insight, InsightGenerator, MarketSentimentAggregator, Pattern,
    PatternDetector, SentimentSummary,
};
use brondby_tracker::config::Config;
use brondby_tracker::data::demo::{demo_articles, demo_quotes};
use brondby_tracker::data::news::truncate_chars;
use brondby_tracker::data::{
    AlertStore, LexiconSentimentScorer, MarketDataRepository, MemoryStore, NewsIngestor,
    NewsSentimentBreakdown, PriceRecorder, PriceSummary, RelevanceScorer,
};
use brondby_tracker::data::validation;
use brondby_tracker::report::DailyReporter;

/// Hours of hourly quotes generated for the demo run
const DEMO_HOURS: i64 = 48;

fn print_impact(report: Option<&ImpactReport>, hours: i64) {
    let Some(report) = report else {
        println!("No correlated price/news data in the last {}h", hours);
        return;
    };

    println!("\n📈 News Impact ({}h)", hours);
    println!("   Correlation:  {:.3}", report.overall_correlation);
    println!("   Data points:  {}", report.total_data_points);
    for (name, bucket) in [
        ("Positive", &report.positive_impact),
        ("Negative", &report.negative_impact),
        ("Neutral", &report.neutral_impact),
    ] {
        println!(
            "   {:<9} news: {} windows, avg change {:+.2}%, avg sentiment {:+.3}",
            name, bucket.count, bucket.avg_price_change, bucket.avg_sentiment
        );
    }
}

fn print_patterns(patterns: Option<&[Pattern]>, hours: i64) {
    let Some(patterns) = patterns else {
        println!("No price data in the last {}h", hours);
        return;
    };

    println!("\n🔎 Patterns ({}h): {}", hours, patterns.len());
    for p in patterns {
        println!(
            "   {} {:+.2}% vol {} | {} news, avg sentiment {:+.3} | confidence {:.2}",
            p.timestamp.format("%Y-%m-%d %H:%M"),
            p.price_change,
            p.volume,
            p.news_count,
            p.avg_sentiment,
            p.confidence
        );
    }
}

fn print_sentiment(summary: Option<&SentimentSummary>, hours: i64) {
    let Some(summary) = summary else {
        println!("No news in the last {}h", hours);
        return;
    };

    println!("\n🎯 Market Sentiment ({}h)", hours);
    println!("   Score:       {:+.3}", summary.score);
    println!("   Category:    {}", summary.category);
    println!("   Articles:    {}", summary.total_articles);
    println!("   Confidence:  {:.2}", summary.confidence);
}

fn print_cycle(report: &AlertCycleReport) {
    println!("\n🚨 Alert check");
    println!(
        "   Raised {} | persisted {} | sent {} | failed {}",
        report.raised, report.persisted, report.sent, report.failed
    );
    for (alert_type, count) in &report.by_type {
        println!("   {}: {}", alert_type, count);
    }
}

fn print_insights(insights: &[Insight]) {
    if insights.is_empty() {
        println!("No insights - not enough data or nothing significant");
        return;
    }

    println!("\n💡 Insights");
    for insight in insights {
        println!(
            "   [{}] {} (confidence {:.2})",
            insight.kind.as_str(),
            insight.message,
            insight.confidence
        );
        println!("      → {}", insight.recommendation);
    }
}

/// Generate market insights
pub async fn insights(repo: Arc<dyn MarketDataRepository>, config: &Config) -> Result<()> {
    let generator = InsightGenerator::new(repo, config);
    print_insights(&generator.generate().await);
    Ok(())
}

pub async fn impact(repo: Arc<dyn MarketDataRepository>, config: &Config, hours: i64) -> Result<()> {
    let engine = CorrelationEngine::new(repo, config);
    let report = engine.analyze_impact(hours).await.context("News impact analysis failed")?;
    print_impact(report.as_ref(), hours);
    Ok(())
}

pub async fn patterns(repo: Arc<dyn MarketDataRepository>, config: &Config, hours: i64) -> Result<()> {
    let detector = PatternDetector::new(repo, config);
    let patterns = detector
        .identify_patterns(hours)
        .await
        .context("Pattern detection failed")?;
    print_patterns(patterns.as_deref(), hours);
    Ok(())
}

pub async fn sentiment(repo: Arc<dyn MarketDataRepository>, hours: i64) -> Result<()> {
    let aggregator = MarketSentimentAggregator::new(repo);
    let summary = aggregator
        .score(hours)
        .await
        .context("Market sentiment calculation failed")?;
    print_sentiment(summary.as_ref(), hours);
    Ok(())
}

pub async fn check_alerts(
    repo: Arc<dyn MarketDataRepository>,
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
    config: &Config,
) -> Result<()> {
    let evaluator = AlertEvaluator::new(repo, store, notifier, config);
    let report = evaluator.run_cycle().await;
    print_cycle(&report);
    Ok(())
}

pub async fn daily_report(
    repo: Arc<dyn MarketDataRepository>,
    notifier: Arc<dyn Notifier>,
    config: &Config,
    dry_run: bool,
) -> Result<()> {
    let reporter = DailyReporter::new(repo, notifier, config);

    if dry_run {
        let report = reporter.build_at(Utc::now()).await.context("Failed to build daily report")?;
        println!("{}", report.render());
        return Ok(());
    }

    reporter.send().await.context("Failed to send daily report")?;
    println!("✅ Daily report sent");
    Ok(())
}

pub async fn recent_alerts(store: Arc<dyn AlertStore>, hours: i64) -> Result<()> {
    let since = validation::hours_before(Utc::now(), hours)?;
    let alerts = store
        .alerts_since(since)
        .await
        .context("Failed to load recent alerts")?;

    if alerts.is_empty() {
        println!("No alerts in the last {}h", hours);
        return Ok(());
    }

    println!("\n🔔 Alerts in the last {}h: {}", hours, alerts.len());
    for alert in &alerts {
        let status = match alert.sent_at {
            Some(at) => format!("sent {}", at.format("%H:%M:%S")),
            None => "unsent".to_string(),
        };
        println!(
            "   {} [{}] {} ({}) {}",
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            alert.severity,
            alert.alert_type,
            status,
            alert.id
        );
    }
    Ok(())
}

pub async fn news_summary(repo: Arc<dyn MarketDataRepository>, hours: i64, limit: usize) -> Result<()> {
    let now = Utc::now();
    let breakdown = NewsSentimentBreakdown::load(repo.as_ref(), now, hours)
        .await
        .context("Failed to load news sentiment")?;

    let Some(breakdown) = breakdown else {
        println!("No news in the last {}h", hours);
        return Ok(());
    };

    println!("\n📰 News ({}h): {} articles", hours, breakdown.total_articles);
    println!(
        "   Positive {} ({:.0}%) | Negative {} ({:.0}%) | Neutral {} ({:.0}%)",
        breakdown.positive_articles,
        breakdown.positive_share * 100.0,
        breakdown.negative_articles,
        breakdown.negative_share * 100.0,
        breakdown.neutral_articles,
        breakdown.neutral_share * 100.0
    );
    println!("   Avg sentiment: {:+.3}", breakdown.avg_sentiment);

    let headlines = repo
        .recent_news(validation::hours_before(now, hours)?, limit)
        .await
        .context("Failed to load headlines")?;
    for item in &headlines {
        println!(
            "   {} {} ({})",
            item.sentiment_label.glyph(),
            truncate_chars(&item.title, 70),
            item.source
        );
    }
    Ok(())
}

pub async fn price_summary(repo: Arc<dyn MarketDataRepository>, config: &Config, days: i64) -> Result<()> {
    let summary = PriceSummary::load(repo.as_ref(), &config.tracking.symbol, Utc::now(), days)
        .await
        .context("Failed to load price data")?;

    let Some(s) = summary else {
        println!("No price data for {} in the last {} days", config.tracking.symbol, days);
        return Ok(());
    };

    let currency = &config.tracking.currency;
    println!("\n💰 {} ({}), last {} days", config.tracking.name, config.tracking.symbol, days);
    println!("   Current:  {:.2} {}", s.current_price, currency);
    println!("   Start:    {:.2} {}", s.start_price, currency);
    println!("   High/Low: {:.2} / {:.2} {}", s.highest_price, s.lowest_price, currency);
    println!("   Change:   {:+.2}%", s.total_change);
    println!("   Avg vol:  {:.0}", s.avg_volume);
    println!("   Samples:  {}", s.data_points);
    Ok(())
}

/// Ingest the demo dataset into an in-memory store and run every analysis on it
pub async fn demo(config: Config) -> Result<()> {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());

    let recorder = PriceRecorder::from_config(store.clone(), &config);
    let mut movements = 0;
    for quote in demo_quotes(now, DEMO_HOURS) {
        let recorded = recorder.record(quote).await.context("Failed to record demo quote")?;
        if recorded.movement.is_some() {
            movements += 1;
        }
    }

    let ingestor = NewsIngestor::new(
        store.clone(),
        Arc::new(LexiconSentimentScorer::new(
            config.lexicon.positive.clone(),
            config.lexicon.negative.clone(),
        )),
        RelevanceScorer::new(config.lexicon.topical.clone()),
    );
    let mut saved = 0;
    for article in demo_articles(now) {
        // stamp each article at its publication time so it spreads over the window
        let at = article.published_at.unwrap_or(now);
        saved += ingestor.ingest_at(vec![article], at).await?;
    }
    info!(saved, "Demo news ingested");
    println!(
        "📥 Demo data: {} quotes ({} significant moves), {} articles",
        DEMO_HOURS, movements, saved
    );

    let repo: Arc<dyn MarketDataRepository> = store.clone();
    let analysis = &config.analysis;

    let impact = CorrelationEngine::new(repo.clone(), &config)
        .analyze_impact_at(now, analysis.correlation_lookback_hours)
        .await?;
    print_impact(impact.as_ref(), analysis.correlation_lookback_hours);

    let patterns = PatternDetector::new(repo.clone(), &config)
        .identify_patterns_at(now, analysis.pattern_lookback_hours)
        .await?;
    print_patterns(patterns.as_deref(), analysis.pattern_lookback_hours);

    let sentiment = MarketSentimentAggregator::new(repo.clone())
        .score_at(now, analysis.sentiment_lookback_hours)
        .await?;
    print_sentiment(sentiment.as_ref(), analysis.sentiment_lookback_hours);

    let insights = InsightGenerator::new(repo.clone(), &config).generate_at(now).await;
    print_insights(&insights);

    let notifier = Arc::new(RecordingNotifier::new());
    let evaluator = AlertEvaluator::new(repo.clone(), store.clone(), notifier.clone(), &config);
    let cycle = evaluator.run_cycle_at(now).await;
    print_cycle(&cycle);

    let reporter = DailyReporter::new(repo, notifier.clone(), &config);
    if let Err(e) = reporter.send_at(now).await {
        warn!(error = %e, "Demo daily report failed");
    }

    println!("\n✉️  Messages that would be sent:");
    for message in notifier.messages() {
        println!("\n{}", message);
    }
    Ok(())
}
