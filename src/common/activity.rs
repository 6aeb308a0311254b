//! Append-only activity log
//!
//! Every replica and client keeps a human-readable record of what it did, one
//! line per event, prefixed with the wall-clock time rounded to the second.
//! Records are also emitted through `tracing`.

use chrono::{DurationRound, TimeDelta, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::common::{ClientId, NodeId, Result};

/// Log file name for a replica.
pub fn replica_log_path(dir: &Path, id: NodeId) -> PathBuf {
    dir.join(format!("server_{}_log.txt", id))
}

/// Log file name for a client.
pub fn client_log_path(dir: &Path, id: ClientId) -> PathBuf {
    dir.join(format!("client_{}_log.txt", id))
}

/// Activity log writer.
///
/// The file mutex is a leaf lock: nothing else is acquired while it is held.
pub struct ActivityLog {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
}

impl ActivityLog {
    /// Open (or create) the log at `path` in append mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Some(Mutex::new(file)),
            path: Some(path),
        })
    }

    /// A log that only forwards to `tracing`.
    pub fn disabled() -> Self {
        Self {
            file: None,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one event.
    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{}", message);

        if let Some(file) = &self.file {
            let now = Utc::now();
            let now = now.duration_round(TimeDelta::seconds(1)).unwrap_or(now);
            if let Ok(mut f) = file.lock() {
                if let Err(e) = writeln!(f, "{}: {}", now.format("%Y-%m-%d %H:%M:%S UTC"), message) {
                    tracing::warn!("Failed to write activity log: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_records_are_appended() {
        let dir = TempDir::new().unwrap();
        let path = replica_log_path(dir.path(), 2);

        {
            let log = ActivityLog::open(&path).unwrap();
            log.record("Started server with id 2");
        }
        {
            let log = ActivityLog::open(&path).unwrap();
            log.record("Connected to replica with id: 3");
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": Started server with id 2"));
        assert!(lines[1].ends_with(": Connected to replica with id: 3"));
        assert!(lines[0].contains("UTC"));
    }

    #[test]
    fn test_file_names() {
        let dir = Path::new("/tmp/logs");
        assert_eq!(
            replica_log_path(dir, 4),
            PathBuf::from("/tmp/logs/server_4_log.txt")
        );
        assert_eq!(
            client_log_path(dir, 9),
            PathBuf::from("/tmp/logs/client_9_log.txt")
        );
    }

    #[test]
    fn test_disabled_log_has_no_path() {
        let log = ActivityLog::disabled();
        log.record("nothing on disk");
        assert!(log.path().is_none());
    }
}
