// Two-file rotating NDJSON log of consolidated entries.
//
// Entries are appended to `current`. Before a write, once `current` has reached half the
// size limit it is renamed over `old`, dropping whatever `old` held. Up to half of the
// persisted history is lost on each rotation; that bounds disk use without any compaction.
// Writes are not fsynced: the newest data survives most restarts, not every crash.

use crate::models::{ConsolidatedEntry, Snapshot};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::instrument;

pub const CURRENT_FILE: &str = "history.current.ndjson";
pub const OLD_FILE: &str = "history.old.ndjson";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("create history directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("rotate {path}: {source}")]
    Rotate { path: PathBuf, source: io::Error },
    #[error("serialize history entry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone)]
pub struct PersistenceManager {
    directory: PathBuf,
    size_limit_bytes: u64,
}

impl PersistenceManager {
    pub fn new(directory: impl Into<PathBuf>, size_limit_bytes: u64) -> Self {
        Self {
            directory: directory.into(),
            size_limit_bytes,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn current_path(&self) -> PathBuf {
        self.directory.join(CURRENT_FILE)
    }

    pub fn old_path(&self) -> PathBuf {
        self.directory.join(OLD_FILE)
    }

    /// Size at which `current` is rotated out before the next write.
    pub fn rotation_threshold(&self) -> u64 {
        self.size_limit_bytes / 2
    }

    /// Appends one entry as a single line, rotating `current` first if it is due.
    /// Any failure leaves the files as they are; nothing is rolled back.
    #[instrument(skip(self, entry), fields(operation = "persist", dir = %self.directory.display()))]
    pub fn persist(&self, entry: &ConsolidatedEntry) -> Result<(), PersistError> {
        fs::create_dir_all(&self.directory).map_err(|source| PersistError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;

        let current = self.current_path();
        self.rotate_if_due(&current)?;

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let write_err = |source| PersistError::Write {
            path: current.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current)
            .map_err(write_err)?;
        file.write_all(&line).map_err(write_err)?;
        file.flush().map_err(write_err)?;
        Ok(())
    }

    fn rotate_if_due(&self, current: &Path) -> Result<(), PersistError> {
        let size = match fs::metadata(current) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(PersistError::Rotate {
                    path: current.to_path_buf(),
                    source,
                });
            }
        };
        if size < self.rotation_threshold() {
            return Ok(());
        }
        let old = self.old_path();
        fs::rename(current, &old).map_err(|source| PersistError::Rotate {
            path: current.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            operation = "rotate",
            rotated_bytes = size,
            old = %old.display(),
            "history log rotated"
        );
        Ok(())
    }

    /// Reads `old` then `current` and returns the newest `limit` entries, oldest first.
    /// Missing files count as empty; lines that do not parse (e.g. a torn final write) are skipped.
    #[instrument(skip(self), fields(operation = "load_history", dir = %self.directory.display()))]
    pub fn load_recent(&self, limit: usize) -> Result<Vec<Snapshot>, PersistError> {
        let mut entries: VecDeque<Snapshot> = VecDeque::new();
        let mut skipped = 0usize;
        for path in [self.old_path(), self.current_path()] {
            let file = match fs::File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => return Err(PersistError::Read { path, source }),
            };
            for line in BufReader::new(file).lines() {
                let line = line.map_err(|source| PersistError::Read {
                    path: path.clone(),
                    source,
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Snapshot>(&line) {
                    Ok(entry) => {
                        if limit == 0 {
                            continue;
                        }
                        if entries.len() == limit {
                            entries.pop_front();
                        }
                        entries.push_back(entry);
                    }
                    Err(_) => skipped += 1,
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(
                operation = "load_history",
                skipped_lines = skipped,
                "skipped unreadable history lines"
            );
        }
        Ok(entries.into())
    }
}
