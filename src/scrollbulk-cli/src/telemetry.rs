//! Logging setup for the command line tool
//!
//! - Human-readable console output on stderr (stdout carries exported data)
//! - Optional JSON log file with size-based and daily rotation (10MB per file)

use anyhow::Result;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "scrollbulk=info,scrollbulk_core=info,scrollbulk_rs=info";

/// Initialize logging, optionally also writing JSON lines under `log_dir`.
///
/// Returns a guard that must be kept alive to ensure file logs are flushed
pub fn init_telemetry(log_dir: Option<&str>, verbose: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(DEFAULT_FILTER.replace("=info", "=debug"))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)?;

            // Rotates when file reaches 10MB or daily, whichever comes first
            let file_appender = RollingFileAppender::new(
                log_dir.join("scrollbulk.log"),
                RollingConditionBasic::new()
                    .daily()
                    .max_size(10 * 1024 * 1024),
                9,
            )?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::debug!("File logging to {}", dir);
    }

    Ok(guard)
}
