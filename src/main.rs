//! Media-Crawler main entry point
//!
//! This is the command-line interface for the Media-Crawler keyword crawler.

use anyhow::Context;
use clap::Parser;
use media_crawler::config::{apply_overrides, load_config_with_hash, Config, Overrides};
use media_crawler::crawler::{Platform, PlatformSpider, Spider};
use media_crawler::storage::{open_storage, shared};
use media_crawler::LoginMode;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Media-Crawler: keyword crawler for notes and their comment trees
///
/// Logs a browser session in, searches notes by keyword, stores note detail
/// and full comment trees, and optionally replies to every note.
#[derive(Parser, Debug)]
#[command(name = "media-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Keyword crawler for notes and comment trees", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Platform to crawl
    #[arg(long, value_enum, default_value_t = Platform::Xhs)]
    platform: Platform,

    /// Comma separated search keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Option<Vec<String>>,

    /// Login type
    #[arg(long = "lt", value_enum)]
    login_type: Option<LoginMode>,

    /// Phone number for SMS login
    #[arg(long)]
    phone: Option<String>,

    /// Preset web_session cookie for cookie login
    #[arg(long)]
    web_session: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), "defaults".to_string())
        }
    };

    apply_overrides(
        &mut config,
        Overrides {
            keywords: cli.keywords,
            login_mode: cli.login_type,
            phone: cli.phone,
            web_session: cli.web_session,
        },
    )
    .context("invalid command line options")?;

    tracing::info!(
        "Keywords: {:?}, login: {}, max notes per keyword: {}",
        config.keywords,
        config.login.mode,
        config.crawler.max_notes
    );

    let storage = open_storage(std::path::Path::new(&config.output.database_path))
        .with_context(|| format!("failed to open {}", config.output.database_path))?;
    let sink = shared(storage);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current requests");
            on_signal.cancel();
        }
    });

    let mut spider = match PlatformSpider::new(cli.platform, config, &config_hash, sink) {
        PlatformSpider::Xhs(spider) => PlatformSpider::Xhs(spider.with_cancellation(cancel)),
    };

    match spider.run().await {
        Ok(reports) => {
            for report in &reports {
                tracing::info!("{}", report);
            }
            tracing::info!("Crawl completed ({} keyword(s))", reports.len());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("media_crawler=info,warn"),
            1 => EnvFilter::new("media_crawler=debug,info"),
            2 => EnvFilter::new("media_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
