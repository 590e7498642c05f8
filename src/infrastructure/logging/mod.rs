use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::models::config::{LogFormat, LoggingConfig};

/// Initializes the global `tracing` subscriber. Grounded on
/// `infrastructure/logging/config.rs`: level from config (overridable via
/// `RUST_LOG`), JSON or pretty output, optional file output via
/// `tracing-appender` when `log_dir` is set.
///
/// Returns a [`WorkerGuard`] that must be kept alive for the lifetime of the
/// process when file logging is enabled (dropping it flushes the appender).
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let guard = config.log_dir.as_ref().map(|dir| {
        let file_appender = tracing_appender::rolling::daily(dir, "netlab-controller.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let builder = fmt::Subscriber::builder().with_env_filter(env_filter.clone()).with_writer(non_blocking);
        match config.format {
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
        guard
    });

    if guard.is_none() && config.enable_stdout {
        let builder = fmt::Subscriber::builder().with_env_filter(env_filter);
        match config.format {
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    }

    guard
}
