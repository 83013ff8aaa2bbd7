/// Multi-layer tracing setup: a human-readable text file, a structured JSON
/// file, and compact stdout output, all filtered through `RUST_LOG`.
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the non-blocking log writers alive. Dropping this flushes and
/// stops background logging, so hold it for the life of the process.
pub struct LogGuards {
    _text: WorkerGuard,
    _json: WorkerGuard,
}

/// Initialize the tracing subscriber.
///
/// Writes `frontier.log` (compact text) and `frontier.json.log` (structured
/// JSON) into `log_dir`, rotated daily, plus colored compact output on
/// stdout. `RUST_LOG` controls filtering and defaults to `info`.
///
/// Fails if the directory cannot be created or a subscriber is already set.
pub fn init_logging<P: AsRef<Path>>(log_dir: P) -> Result<LogGuards, Box<dyn std::error::Error>> {
    let log_path = log_dir.as_ref();
    std::fs::create_dir_all(log_path)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let text_appender = tracing_appender::rolling::daily(log_path, "frontier.log");
    let (text_writer, text_guard) = tracing_appender::non_blocking(text_appender);

    let json_appender = tracing_appender::rolling::daily(log_path, "frontier.json.log");
    let (json_writer, json_guard) = tracing_appender::non_blocking(json_appender);

    let text_layer = fmt::layer()
        .with_writer(text_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_filter(env_filter.clone());

    let json_layer = fmt::layer()
        .json()
        .with_writer(json_writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_filter(env_filter.clone());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(text_layer)
        .with(json_layer)
        .with(stdout_layer)
        .try_init()?;

    tracing::info!("logging to {}", log_path.display());
    Ok(LogGuards {
        _text: text_guard,
        _json: json_guard,
    })
}

/// Convenience wrapper writing logs to `<data_dir>/logs/`.
pub fn init_logging_in_data_dir<P: AsRef<Path>>(
    data_dir: P,
) -> Result<LogGuards, Box<dyn std::error::Error>> {
    init_logging(data_dir.as_ref().join("logs"))
}
