use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Create the parent directory of an output file if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map Python log-level names to `tracing` filter directives.
/// Unknown strings are passed through for `EnvFilter` to interpret.
pub fn normalise_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    ensure_parent_dir(path)?;
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialise the global `tracing` subscriber.
///
/// Console output goes to stderr so that a report printed to stdout stays
/// clean. When `log_file` is given, the same events are appended to it
/// without ANSI colours. Falls back to `"info"` if the level string is not
/// recognised.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
