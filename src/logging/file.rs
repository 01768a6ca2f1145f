//! The shared append target of all log services.

use crate::errors::{ErrorKind, Reportable};
use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Mode of directories created for the log file.
#[cfg(unix)]
const LOG_DIR_MODE: u32 = 0o755;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Cannot create log directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot open log file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot write to log file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Reportable for LogError {
    fn message_key(&self) -> &'static str {
        match self {
            LogError::CreateDir { .. } => "logger.error_create_dir",
            LogError::Open { .. } => "logger.error_open_file",
            LogError::Write { .. } => "logger.error_write_file",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

/// A log file which is opened, appended to and closed for every line.
///
/// Lines are written with a single `write` on a handle opened with `O_APPEND`, so
/// concurrent writers (including other processes) never overwrite or truncate each
/// other. Within the process, writers are additionally serialized so that a line is
/// never split by a partial write.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the given line, creating the parent directories when required.
    pub fn append(&self, line: &str) -> Result<(), LogError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            ensure_dir(dir).map_err(|source| LogError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| LogError::Open {
                path: self.path.clone(),
                source,
            })?;

        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| LogError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(LOG_DIR_MODE);
    }

    builder.create(dir)
}
