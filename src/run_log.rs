//! Run-scoped error log.
//!
//! Every non-fatal failure during a run is appended here with a timestamp.
//! The file lives in a predictable location (`brewscout-<timestamp>.log` in the
//! log directory) and is removed if nothing was recorded, also when the run is
//! abandoned early and the log is simply dropped.

use crate::error::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use indicatif::ProgressBar;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub context: String,
    pub message: String,
}

impl LogEntry {
    fn to_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.context,
            self.message
        )
    }
}

/// Append-only error log shared by every component of a run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    entries: Mutex<Vec<LogEntry>>,
    echo: bool,
    progress: Option<ProgressBar>,
}

impl RunLog {
    /// Create the log file in `dir`, readable by everyone.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let name = format!(
            "brewscout-{}-{}.log",
            Local::now().format("%Y%m%d-%H%M%S"),
            std::process::id()
        );
        let path = dir.join(name);
        File::create(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;
        }

        tracing::debug!("run log at {}", path.display());

        Ok(Self {
            path,
            entries: Mutex::new(Vec::new()),
            echo: true,
            progress: None,
        })
    }

    /// Disable the one-line stderr warning printed for each entry.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Print warnings around `progress` instead of through it.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and mirror it to the log file.
    pub fn record(&self, context: &str, message: impl std::fmt::Display) {
        let entry = LogEntry {
            timestamp: Local::now(),
            context: context.to_string(),
            message: message.to_string(),
        };
        let line = entry.to_line();
        tracing::debug!("{}", line);

        // File order must match entry order
        {
            let mut entries = self.lock();
            if let Err(e) = self.append_line(&line) {
                tracing::warn!("failed to write run log {}: {}", self.path.display(), e);
            }
            entries.push(entry);
        }

        if self.echo {
            let warn = || {
                eprintln!(
                    "{} {} (see {})",
                    "⚠".yellow(),
                    context,
                    self.path.display().to_string().dimmed()
                )
            };
            match &self.progress {
                Some(progress) => progress.suspend(warn),
                None => warn(),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    /// Delete the file if no entry was recorded, otherwise return its path.
    pub fn finalize(mut self) -> Result<Option<PathBuf>> {
        // An empty path tells `drop` there is nothing left to clean up
        let path = std::mem::take(&mut self.path);
        if self.is_empty() {
            remove_if_present(&path)?;
            return Ok(None);
        }
        Ok(Some(path))
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", line).as_bytes())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() || !self.is_empty() {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            tracing::debug!("failed to remove empty run log {}: {}", self.path.display(), e);
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
