use crate::{config::LoggingConfig, paths::AppDirs};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "flicker.log";

/// Keeps the non-blocking file writer flushing; hold it until the process exits.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init_logging(config: &LoggingConfig, dirs: &AppDirs) -> Result<LoggingGuard, LoggingError> {
    let log_dir = dirs.log_dir().to_path_buf();
    fs::create_dir_all(&log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.clone(),
        source,
    })?;

    let env_filter = build_filter(config)?;
    let (file, file_guard) = build_file_writer(config, &log_dir)?;
    let writer = if config.stdout {
        BoxMakeWriter::new(
            std::io::stdout
                .with_max_level(tracing::Level::TRACE)
                .and(file),
        )
    } else {
        BoxMakeWriter::new(file)
    };

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(config.stdout)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// `RUST_LOG` wins over the configured level when it is set and non-empty.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directive = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => config.level.as_filter_directive().to_string(),
    };
    EnvFilter::try_new(&directive).map_err(|source| LoggingError::ParseLevel {
        level: directive,
        source,
    })
}

fn build_file_writer(
    config: &LoggingConfig,
    log_dir: &Path,
) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let file_stem = config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE);
    prune_rolled_logs(log_dir, file_stem, config.max_log_files.max(1))?;

    let appender = tracing_appender::rolling::daily(log_dir, file_stem);
    Ok(tracing_appender::non_blocking(appender))
}

fn prune_rolled_logs(dir: &Path, file_stem: &str, keep: usize) -> Result<(), LoggingError> {
    let mut rolled: Vec<_> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_stem))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), modified))
        })
        .collect();

    if rolled.len() <= keep {
        return Ok(());
    }

    rolled.sort_by_key(|(_, modified)| *modified);
    let excess = rolled.len() - keep;
    for (path, _) in rolled.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::Cleanup { path, source })?;
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse log filter {level}: {source}")]
    ParseLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove old log file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
