//! Operator CLI for snowlink.
//!
//! Runs maintenance against the same database and cache as the server,
//! without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Delete expired links now (asks first)
//! cargo run --bin admin -- sweep
//!
//! # Click analytics for one link
//! cargo run --bin admin -- stats promo --days 7
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Inspect or mint snowflake codes
//! cargo run --bin admin -- code decode 0001Xk3bT9a
//! cargo run --bin admin -- code mint --node 3 --count 5
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; see [`snowlink::config`]. `code` commands need none.

use snowlink::application::services::AnalyticsService;
use snowlink::application::services::analytics_service::window_days;
use snowlink::config::{CacheBackend, Config};
use snowlink::domain::expiry_sweeper::sweep_expired;
use snowlink::domain::repositories::LinkRepository;
use snowlink::infrastructure::cache::{CacheService, NullCache, RedisCache};
use snowlink::infrastructure::persistence::PgLinkRepository;
use snowlink::utils::snowflake::{IdGenerator, SnowflakeId};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for operating snowlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete expired links and evict them from the cache
    Sweep {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show click analytics for a short code
    Stats {
        code: String,

        /// Window size in days (1-365)
        #[arg(short, long, default_value_t = 30)]
        days: i64,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Snowflake code tools
    Code {
        #[command(subcommand)]
        action: CodeAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[derive(Subcommand)]
enum CodeAction {
    /// Show the timestamp, node and sequence inside a minted code
    Decode { code: String },

    /// Mint codes locally without touching the database
    Mint {
        /// Node id (0-1023)
        #[arg(short, long, default_value_t = 0)]
        node: i64,

        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Code { action } => handle_code_action(action),
        Commands::Sweep { yes } => {
            let config = Config::from_env()?;
            let links = connect_links(&config).await?;
            let cache = connect_cache(&config).await;
            handle_sweep(links.as_ref(), cache.as_ref(), yes).await
        }
        Commands::Stats { code, days } => {
            let config = Config::from_env()?;
            let links = connect_links(&config).await?;
            handle_stats(links, &code, days).await
        }
        Commands::Db { action } => {
            let config = Config::from_env()?;
            handle_db_action(action, &config).await
        }
    }
}

async fn connect_pool(config: &Config) -> Result<PgPool> {
    PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn connect_links(config: &Config) -> Result<Arc<dyn LinkRepository>> {
    let pool = connect_pool(config).await?;
    Ok(Arc::new(PgLinkRepository::new(Arc::new(pool))))
}

/// Redis when the server would use it, so sweeps also evict; otherwise nothing.
async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    if config.cache_backend == CacheBackend::Redis
        && let Some(url) = &config.redis_url
    {
        match RedisCache::connect(url, config.store_timeout()).await {
            Ok(redis) => return Arc::new(redis),
            Err(e) => println!(
                "{} {}",
                "⚠️  Redis unavailable, cache entries will expire on their own:".yellow(),
                e
            ),
        }
    }
    Arc::new(NullCache::new())
}

/// Deletes expired links after confirmation.
async fn handle_sweep(
    links: &dyn LinkRepository,
    cache: &dyn CacheService,
    yes: bool,
) -> Result<()> {
    println!("{}", "🧹 Sweep expired links".bright_blue().bold());
    println!();

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt("Delete every expired link and its click history?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let removed = sweep_expired(links, cache)
        .await
        .map_err(|e| anyhow::anyhow!("Sweep failed: {}", e))?;

    if removed.is_empty() {
        println!("{}", "  Nothing to sweep".yellow());
        return Ok(());
    }

    for link in &removed {
        let expired_at = link
            .expires_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {:<32} {:<18} {}",
            link.code.cyan(),
            expired_at.bright_black(),
            link.original_url
        );
    }

    println!();
    println!(
        "{} {}",
        "✅ Removed".green().bold(),
        removed.len().to_string().bright_white().bold()
    );

    Ok(())
}

/// Prints analytics read straight from the database.
///
/// # Output Format
///
/// ```text
/// 📊 promo -> https://example.com
///
///   Total clicks:   42
///   Last 7 days:    9
///
///   2025-01-01  ███ 3
/// ```
async fn handle_stats(links: Arc<dyn LinkRepository>, code: &str, days: i64) -> Result<()> {
    let service = AnalyticsService::new(links, Arc::new(NullCache::new()));

    let analytics = service
        .get_analytics(code, window_days(Some(days)))
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!(
        "{} {} -> {}",
        "📊".bright_blue(),
        analytics.code.cyan().bold(),
        analytics.original_url
    );
    println!();
    println!(
        "  Total clicks:   {}",
        analytics.total_clicks.to_string().bright_green().bold()
    );
    println!(
        "  Last {:<3} days: {}",
        analytics.days,
        analytics.window_clicks.to_string().bright_green().bold()
    );
    if let Some(at) = analytics.last_accessed_at {
        println!(
            "  Last accessed:  {}",
            at.format("%Y-%m-%d %H:%M:%S UTC").to_string().bright_black()
        );
    }
    println!();

    let peak = analytics.daily.iter().map(|d| d.clicks).max().unwrap_or(0).max(1);
    for day in &analytics.daily {
        let bar_len = usize::try_from(day.clicks * 40 / peak).unwrap_or(0);
        println!(
            "  {}  {} {}",
            day.day.to_string().bright_black(),
            "█".repeat(bar_len).green(),
            day.clicks
        );
    }
    println!();

    Ok(())
}

async fn handle_db_action(action: DbAction, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            let pool = connect_pool(config).await?;
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(&pool)
                .await?;
            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_links")
                .fetch_one(&pool)
                .await
                .context("short_links table missing; start the server once to migrate")?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Links:      {}", links.to_string().bright_green().bold());
        }
    }

    Ok(())
}

fn handle_code_action(action: CodeAction) -> Result<()> {
    match action {
        CodeAction::Decode { code } => {
            let id = SnowflakeId::from_code(&code)
                .with_context(|| format!("'{code}' is not a minted code"))?;

            let created_at = id
                .created_at()
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "out of range".to_string());

            println!("  Code:      {}", code.cyan().bold());
            println!("  Id:        {}", id.to_string().bright_white());
            println!("  Minted at: {}", created_at.bright_white());
            println!("  Node:      {}", id.node_id().to_string().bright_green());
            println!("  Sequence:  {}", id.sequence().to_string().bright_green());
        }
        CodeAction::Mint { node, count } => {
            let generator = IdGenerator::new(node).context("Invalid node id")?;

            for _ in 0..count {
                let id = generator.generate().context("Failed to mint")?;
                println!("{}  {}", id.to_code().cyan(), id.to_string().bright_black());
            }
        }
    }

    Ok(())
}
