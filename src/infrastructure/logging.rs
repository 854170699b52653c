//! Logging system configuration and initialization
//!
//! Console output through an env-filterable fmt layer, with optional
//! rolling file output. The non-blocking writer guard lives for the
//! whole process so buffered lines are flushed on exit.

use std::path::Path;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

// Keeps the log file writer alive for the process lifetime.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the computed default filter. When `log_dir` is
/// given, a daily-rolling file output is added next to the console.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<()> {
    let default_filter = if verbose {
        "dibscraper=debug,info"
    } else {
        "dibscraper=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true));

    match log_dir {
        Some(dir) => {
            let appender = rolling::daily(dir, "dibscraper.log");
            let (writer, guard) = non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            registry
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()?;
        }
        None => registry.try_init()?,
    }

    Ok(())
}
