use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use brondby_tracker::alerts::TelegramNotifier;
use brondby_tracker::config::Config;
use brondby_tracker::data::PgRepository;
use brondby_tracker::db::Database;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "brondby-tracker",
    about = "Brøndby IF news sentiment and stock price correlation tracker",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate market insights from sentiment, correlation and patterns
    Insights,

    /// Correlate news sentiment with price changes
    Impact {
        /// Lookback in hours (default from configuration: 24)
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Find significant price moves that coincided with news
    Patterns {
        /// Lookback in hours (default from configuration: 48)
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Recency- and relevance-weighted market sentiment
    Sentiment {
        /// Lookback in hours (default from configuration: 24)
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Run one alert-check cycle and dispatch raised alerts
    CheckAlerts,

    /// Build the daily report and send it
    DailyReport {
        /// Print the report instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// List recently raised alerts
    Alerts {
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// News sentiment breakdown and latest headlines
    NewsSummary {
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Number of headlines to list
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Price statistics for the tracked stock
    PriceSummary {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Run database migrations
    Migrate,

    /// Run the whole pipeline on the built-in demo dataset (no database needed)
    Demo,
}

/// Execute a CLI command. Every command except `demo` connects to PostgreSQL.
pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Demo = cli.command {
        info!("Running demo pipeline on in-memory data");
        return commands::demo(Config::default()).await;
    }

    let config = Config::load()?;
    let db = Database::new(&config.database).await?;

    if let Commands::Migrate = cli.command {
        db.run_migrations().await?;
        println!("Database migrations completed successfully");
        return Ok(());
    }

    db.health_check().await?;
    info!("{}", db.pool_stats());

    let repo = Arc::new(PgRepository::new(db.pool.clone()));

    match cli.command {
        Commands::Insights => {
            info!("Generating insights");
            commands::insights(repo, &config).await?;
        }
        Commands::Impact { hours } => {
            let hours = hours.unwrap_or(config.analysis.correlation_lookback_hours);
            info!("Analyzing news impact over {}h", hours);
            commands::impact(repo, &config, hours).await?;
        }
        Commands::Patterns { hours } => {
            let hours = hours.unwrap_or(config.analysis.pattern_lookback_hours);
            info!("Identifying patterns over {}h", hours);
            commands::patterns(repo, &config, hours).await?;
        }
        Commands::Sentiment { hours } => {
            let hours = hours.unwrap_or(config.analysis.sentiment_lookback_hours);
            info!("Scoring market sentiment over {}h", hours);
            commands::sentiment(repo, hours).await?;
        }
        Commands::CheckAlerts => {
            let notifier = Arc::new(TelegramNotifier::new(&config.notifications)?);
            commands::check_alerts(repo.clone(), repo, notifier, &config).await?;
        }
        Commands::DailyReport { dry_run } => {
            let notifier = Arc::new(TelegramNotifier::new(&config.notifications)?);
            commands::daily_report(repo, notifier, &config, dry_run).await?;
        }
        Commands::Alerts { hours } => {
            commands::recent_alerts(repo, hours).await?;
        }
        Commands::NewsSummary { hours, limit } => {
            commands::news_summary(repo, hours, limit).await?;
        }
        Commands::PriceSummary { days } => {
            commands::price_summary(repo, &config, days).await?;
        }
        Commands::Migrate | Commands::Demo => {}
    }

    db.close().await;
    Ok(())
}
