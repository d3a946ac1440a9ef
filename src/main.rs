//! Repair Price Crawler main entry point
//!
//! This is the command-line interface for the repair price crawler.

use anyhow::{Context, Result};
use clap::Parser;
use repair_price_crawler::browser::find_browser_executable;
use repair_price_crawler::config::{load_config_with_hash, Config};
use repair_price_crawler::crawler::run_crawl;
use repair_price_crawler::logging::init_logging;
use repair_price_crawler::output::{load_statistics, print_statistics};
use repair_price_crawler::storage::{import_parts_file, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Repair Price Crawler: a polite price-history collector
///
/// Walks a repair-price calculator's manufacturer, device and repair action
/// selects in a headless browser and appends every observed price to a
/// SQLite history.
#[derive(Parser, Debug)]
#[command(name = "repair-price-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite repair price crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Only walk the first N manufacturers (overrides the config)
    #[arg(long, value_name = "N", value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_manufacturers: Option<usize>,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with_all = ["stats", "import_parts"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "import_parts"])]
    stats: bool,

    /// Import a parts catalog CSV (sku,name,manufacturer,device,price) and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats"])]
    import_parts: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!(
                "Failed to load configuration from {}: {}",
                cli.config.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    if let Some(max) = cli.max_manufacturers {
        config.crawler.max_manufacturers = Some(max);
    }

    // Held until exit so the file log is flushed
    let _log_guard = match init_logging(
        Path::new(&config.output.log_directory),
        cli.verbose,
        cli.quiet,
    ) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    let result = if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(path) = &cli.import_parts {
        handle_import(&config, path)
    } else {
        handle_crawl(config, config_hash).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Repair Price Crawler Dry Run ===\n");

    println!("Target: {}", crawler.base_url);

    println!("\nCrawler Configuration:");
    println!("  Request delay: {}ms", crawler.request_delay_ms);
    println!(
        "  Retries: {} (initial backoff {}ms, x{})",
        crawler.max_retries, crawler.initial_backoff_ms, crawler.backoff_multiplier
    );
    println!("  Selection timeout: {}ms", crawler.selection_timeout_ms);
    println!("  Navigation timeout: {}ms", crawler.navigation_timeout_ms);
    println!("  Action timeout: {}ms", crawler.action_timeout_ms);
    match crawler.max_manufacturers {
        Some(max) => println!("  Max manufacturers: {}", max),
        None => println!("  Max manufacturers: all"),
    }
    println!("  Respect robots.txt: {}", crawler.respect_robots_txt);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    let executable = config
        .browser
        .chrome_executable
        .as_ref()
        .map(PathBuf::from)
        .or_else(find_browser_executable);
    match executable {
        Some(path) => println!("  Executable: {}", path.display()),
        None => println!("  Executable: not found, chromiumoxide will try to detect it"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Logs: {}", config.output.log_directory);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    storage.close()?;
    Ok(())
}

/// Handles the --import-parts mode
fn handle_import(config: &Config, path: &Path) -> Result<()> {
    let mut storage = open_database(config)?;
    let summary = import_parts_file(path, &mut storage)
        .with_context(|| format!("Failed to import parts from {}", path.display()))?;

    println!(
        "✓ Imported {} parts ({} rows skipped)",
        summary.imported, summary.skipped
    );

    storage.close()?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<()> {
    let report = run_crawl(config, config_hash)
        .await
        .context("Crawl failed")?;

    for failure in &report.failures {
        tracing::debug!(
            "Skipped {} {}: {}",
            failure.level,
            failure.path_display(),
            failure.error
        );
    }

    Ok(())
}

fn open_database(config: &Config) -> Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}
