//! Tracing setup: console output plus an optional plain-text file sink

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the log file created inside the reports directory
pub const LOG_FILE_NAME: &str = "run.log";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Force `debug` level regardless of `RUST_LOG`
    pub debug: bool,
    /// Directory receiving `run.log`; console only when `None`
    pub reports_dir: Option<PathBuf>,
}

fn filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn open_log_file(dir: &Path) -> std::io::Result<(std::fs::File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the global subscriber. Returns the log file path when the file
/// sink is active.
pub fn init(config: &LogConfig) -> Option<PathBuf> {
    let console = fmt::layer().with_target(false);

    let file = match config.reports_dir.as_deref().map(open_log_file) {
        Some(Ok(opened)) => Some(opened),
        Some(Err(e)) => {
            eprintln!("Warning: could not open log file: {}", e);
            None
        }
        None => None,
    };

    match file {
        Some((file, path)) => {
            let file_layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true);
            tracing_subscriber::registry()
                .with(filter(config.debug))
                .with(console)
                .with(file_layer)
                .init();
            Some(path)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter(config.debug))
                .with(console)
                .init();
            None
        }
    }
}
