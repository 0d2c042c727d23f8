// src/logging.rs

//! Log output setup for the CLI.
//!
//! Every line carries a timestamp, a label (the pair being polled) and the
//! level: `2026-10-18T09:00:00.000+09:00 [btc_krw] INFO: message`.
//!
//! With a log directory, lines go to files instead of stderr:
//!
//! ```text
//! {log_dir}/
//! ├── debug/app_{label}.log   # Everything at or above the configured level
//! └── error/app_{label}.log   # Errors only
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use log::{Level, LevelFilter};

use crate::error::{AppError, Result};

/// Parse a level name, falling back to `Info` for anything unknown.
pub fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Format a log line.
fn format_line(timestamp: &str, label: &str, level: Level, message: &str) -> String {
    format!("{} [{}] {}: {}", timestamp, label, level, message)
}

/// Paths of the full and error-only log files for `label`.
pub fn log_paths(log_dir: &Path, label: &str) -> (PathBuf, PathBuf) {
    let name = format!("app_{label}.log");
    (log_dir.join("debug").join(&name), log_dir.join("error").join(name))
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Second destination receiving error lines only.
struct ErrorSink(Mutex<File>);

impl ErrorSink {
    fn open(path: &Path) -> Result<Self> {
        Ok(Self(Mutex::new(open_append(path)?)))
    }

    fn record(&self, level: Level, line: &str) -> io::Result<()> {
        if level != Level::Error {
            return Ok(());
        }
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::other("error log lock poisoned"))?;
        writeln!(file, "{}", line)
    }
}

/// Install the global logger.
///
/// `RUST_LOG` directives override `level`. With `log_dir` set, output is
/// appended to the files named by [`log_paths`] instead of stderr.
pub fn init(level: LevelFilter, label: &str, log_dir: Option<&Path>) -> Result<()> {
    let files = log_dir.map(|dir| log_paths(dir, label));
    let errors = match &files {
        Some((_, error_path)) => Some(ErrorSink::open(error_path)?),
        None => None,
    };

    let label = label.to_string();
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| {
            let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string();
            let line = format_line(&timestamp, &label, record.level(), &record.args().to_string());
            if let Some(errors) = &errors {
                errors.record(record.level(), &line)?;
            }
            writeln!(buf, "{}", line)
        });

    if let Some((full_path, _)) = &files {
        builder.target(env_logger::Target::Pipe(Box::new(open_append(full_path)?)));
    }

    builder
        .try_init()
        .map_err(|e| AppError::config(format!("Logger already initialised: {e}")))
}
