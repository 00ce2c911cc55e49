//! Logging infrastructure for kspmod.
//!
//! Provides structured logging to the console and, optionally, a daily
//! rolling file:
//! - Console output on stderr, so command output on stdout stays clean
//! - `<log_dir>/kspmod.log.<date>` when a log directory is configured
//! - Level from `RUST_LOG`, falling back to the configured level

use std::fs;
use std::io;
use std::path::Path;

use time::macros::format_description;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name prefix inside the log directory.
pub const LOG_FILE_PREFIX: &str = "kspmod.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes and closes the log file writer.
pub struct LoggingGuard {
    file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    /// Whether a log file is being written.
    pub fn has_file(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// Initialize logging.
///
/// # Arguments
///
/// * `level` - Default filter directive when `RUST_LOG` is not set
/// * `log_dir` - Directory for the daily log file, or `None` for console only
///
/// # Errors
///
/// Returns an error if the log directory cannot be created.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggingGuard, io::Error> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    );

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A second initialization (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(LoggingGuard {
        file_guard,
    })
}
