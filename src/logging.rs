//! Console and file logging setup
//!
//! Log lines go to stdout and to a daily rolling `crawler.log` under the
//! configured log directory. `RUST_LOG` overrides the verbosity flags.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// File name prefix of the rolling log
pub const LOG_FILE_NAME: &str = "crawler.log";

/// Maps the CLI verbosity flags to a filter directive
pub fn filter_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "repair_price_crawler=info,warn",
        1 => "repair_price_crawler=debug,info",
        2 => "repair_price_crawler=trace,debug",
        _ => "trace",
    }
}

/// Installs the global subscriber
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the lifetime of the process.
pub fn init_logging(log_directory: &Path, verbose: u8, quiet: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            log_directory.display()
        )
    })?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, quiet)));

    let file_appender = rolling::daily(log_directory, LOG_FILE_NAME);
    let (file_writer, guard) = non_blocking(file_appender);

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stdout),
        )
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to install logging subscriber")?;

    Ok(guard)
}
