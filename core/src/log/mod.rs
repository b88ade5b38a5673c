//! Logging bootstrap for the read-aloud reader.
//!
//! Installs a `tracing` subscriber with two sinks: a rolling file under the data directory and
//! a console writer on stderr. Call [`init`] once at start-up; later calls return the handle
//! installed by the first one.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

const FILTER_VARS: [&str; 2] = ["READALOUD_LOG", "RUST_LOG"];

static LOG_HANDLE: OnceLock<LogHandle> = OnceLock::new();

pub use tracing_subscriber::filter::LevelFilter as LogLevel;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogRolling {
    Hourly,
    Daily,
    Never,
}

impl LogRolling {
    fn rotation(self) -> Rotation {
        match self {
            LogRolling::Hourly => Rotation::HOURLY,
            LogRolling::Daily => Rotation::DAILY,
            LogRolling::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding the rolling log files.
    pub directory: PathBuf,
    pub file_prefix: String,
    /// How many rolled files to keep; `None` keeps everything.
    pub retention: Option<usize>,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
    /// Forward `log` crate records (e.g. from `reqwest` internals) into `tracing`.
    pub capture_log: bool,
    /// Filter directive such as `readaloud_core=debug`.
    pub env_filter: Option<String>,
    pub rolling: LogRolling,
}

impl Default for LogConfig {
    fn default() -> Self {
        let console_level =
            if cfg!(debug_assertions) { LevelFilter::INFO } else { LevelFilter::WARN };

        Self {
            directory: crate::config::ReaderConfig::default().data_dir.join("logs"),
            file_prefix: "readaloud".to_string(),
            retention: Some(7),
            file_level: LevelFilter::DEBUG,
            console_level,
            capture_log: true,
            env_filter: filter_from_env(),
            rolling: LogRolling::Daily,
        }
    }
}

impl LogConfig {
    /// Defaults with the log directory placed under `data_dir/logs`.
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self { directory: data_dir.join("logs"), ..Self::default() }
    }

    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }
}

/// Keeps the non-blocking file writer alive for the lifetime of the process.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Install the global subscriber. The first call wins.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = LOG_HANDLE.get() {
        return Ok(handle);
    }

    let handle = setup(config)?;
    let _ = LOG_HANDLE.set(handle);
    LOG_HANDLE.get().context("log handle missing after initialisation")
}

/// Shorten a secret for log output, keeping only its first and last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn setup(config: LogConfig) -> Result<LogHandle> {
    if config.capture_log {
        let max_level = config.file_level.max(config.console_level);
        let _ = tracing_log::LogTracer::builder().with_max_level(to_log_level(max_level)).init();
    }

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory at {}", config.directory.display()))?;

    if let Some(retention) = config.retention.filter(|keep| *keep > 0) {
        prune_old_logs(&config.directory, &config.file_prefix, retention)
            .context("applying log retention")?;
    }

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(config.rolling.rotation())
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating rolling log appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let directive = config
        .env_filter
        .or_else(filter_from_env)
        .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string());
    let env_filter = EnvFilter::try_new(directive).context("parsing log filter directive")?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_file(true)
        .with_line_number(true)
        .with_filter(config.file_level);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(config.console_level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory: config.directory })
}

fn filter_from_env() -> Option<String> {
    FILTER_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|directive| !directive.trim().is_empty())
}

fn to_log_level(level: LevelFilter) -> log::LevelFilter {
    match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        LevelFilter::TRACE => log::LevelFilter::Trace,
    }
}

fn prune_old_logs(dir: &Path, prefix: &str, retention: usize) -> Result<()> {
    let mut entries: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)
        .with_context(|| format!("reading log directory at {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            let path = entry.path();
            if !meta.is_file() || !has_prefix(&path, prefix) {
                return None;
            }
            Some((path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();

    if entries.len() <= retention {
        return Ok(());
    }

    entries.sort_by_key(|(_, modified)| *modified);
    let excess = entries.len() - retention;
    for (path, _) in entries.into_iter().take(excess) {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

fn has_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name().and_then(OsStr::to_str).map(|name| name.starts_with(prefix)).unwrap_or(false)
}
