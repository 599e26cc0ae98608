//! Tracing configuration for PollFeed
//!
//! ## Behavior / 行为
//!
//! - Human output goes to stderr so it never mixes with the rendered feed
//! - With a log directory, a non-blocking file layer writes `pollfeed.log`
//! - `RUST_LOG` overrides the configured level

use std::path::Path;
use std::sync::OnceLock;
use std::{fs, io};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Build the default filter directives for tracing
///
/// `level` applies to everything; the HTTP stack is held at `warn` unless the
/// level asks for more than `debug`.
fn build_filter_directives(level: &str) -> Vec<String> {
    let noisy = if level.contains("trace") { "debug" } else { "warn" };
    vec![
        level.to_string(),
        format!("hyper={noisy}"),
        format!("hyper_util={noisy}"),
        format!("reqwest={noisy}"),
        format!("rustls={noisy}"),
    ]
}

/// Initialize the tracing subscriber
///
/// Call once from `main` before wiring.
///
/// ## Errors / 错误
///
/// Returns `Err` if a subscriber is already registered or the log directory
/// cannot be created.
pub fn init_tracing_subscriber(level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    let stderr_writer = BoxMakeWriter::new(io::stderr);
    let file_writer = log_dir.map(build_file_writer).transpose()?;

    // "2025-01-15 10:30:45.123 INFO [file.rs:42] [target] message"
    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(stderr_writer);

    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
            .with_level(true)
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
    });

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn build_file_writer(log_dir: &Path) -> anyhow::Result<NonBlocking> {
    fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pollfeed.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}
