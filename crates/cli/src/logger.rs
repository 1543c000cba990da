//! Log output for `dcim-cli`.
//!
//! Every record goes to stderr. With `--log-file` records are also appended
//! to `~/.dcim/logs/{run_id}/log`, one directory per run.

use anyhow::{Context, Result};
use chrono::Local;
use dirs::home_dir;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

pub struct DcimLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
    run_id: String,
    log_path: Option<PathBuf>,
}

impl DcimLogger {
    /// Create a logger. `to_file` also opens the per-run log file.
    pub fn new(level: LevelFilter, to_file: bool) -> Result<Self> {
        let run_id = Self::new_run_id();
        let (file, log_path) = if to_file {
            let log_dir = Self::log_dir(&run_id)?;
            create_dir_all(&log_dir)
                .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
            let log_path = log_dir.join("log");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
            (Some(Mutex::new(file)), Some(log_path))
        } else {
            (None, None)
        };

        Ok(Self {
            level,
            file,
            run_id,
            log_path,
        })
    }

    /// `{timestamp}_{first uuid group}`, e.g. `20260114_093012_1f0c2a7b`.
    fn new_run_id() -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let uuid = Uuid::new_v4().to_string();
        let short = uuid.split('-').next().unwrap_or("unknown");
        format!("{timestamp}_{short}")
    }

    /// Directory holding the log of run `run_id`.
    pub fn log_dir(run_id: &str) -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".dcim").join("logs").join(run_id))
    }

    /// Install the logger as the global `log` backend.
    pub fn init(level: LevelFilter, to_file: bool) -> Result<()> {
        let logger = Self::new(level, to_file)?;
        let run_id = logger.run_id.clone();
        let log_path = logger.log_path.clone();

        log::set_boxed_logger(Box::new(logger))
            .map(|()| log::set_max_level(level))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;

        log::debug!("Run {run_id}");
        if let Some(path) = log_path {
            log::info!("Log file: {}", path.display());
        }
        Ok(())
    }

    /// Level for a `-v` count: warnings by default, then info, debug, trace.
    pub fn level_for(verbosity: u8) -> LevelFilter {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn format(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for DcimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = Self::format(record);
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                // A failed write must not take the command down with it.
                let _ = writeln!(file, "{message}");
            }
        }
        eprintln!("{message}");
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_maps_to_levels() {
        assert_eq!(DcimLogger::level_for(0), LevelFilter::Warn);
        assert_eq!(DcimLogger::level_for(2), LevelFilter::Debug);
        assert_eq!(DcimLogger::level_for(9), LevelFilter::Trace);
    }

    #[test]
    fn test_run_id_starts_with_timestamp() {
        let run_id = DcimLogger::new_run_id();
        let parts: Vec<_> = run_id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_stderr_only_logger_has_no_file() {
        let logger = DcimLogger::new(LevelFilter::Info, false).unwrap();
        assert!(logger.log_path.is_none());
        assert!(logger.enabled(&Metadata::builder().level(log::Level::Warn).build()));
        assert!(!logger.enabled(&Metadata::builder().level(log::Level::Debug).build()));
    }
}
