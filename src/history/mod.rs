// In-memory stats history: a fixed-capacity ring of entries whose newest element may be the
// live slot, shared between the single updater (writer) and any number of readers.

pub mod consolidation;
pub mod persistence;

use crate::models::{ConsolidatedEntry, Snapshot};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    /// A writer panicked while holding the lock; the buffer may be half-updated.
    #[error("history lock poisoned; buffer state can no longer be trusted")]
    Poisoned,
}

/// Ring buffer of entries, oldest first. Pushing at capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    capacity: NonZeroUsize,
}

impl History {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Seeds the buffer, keeping only the newest `capacity` entries.
    pub fn with_entries(
        capacity: NonZeroUsize,
        entries: impl IntoIterator<Item = Snapshot>,
    ) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    pub fn push(&mut self, entry: Snapshot) {
        if self.entries.len() == self.capacity.get() {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Overwrites the newest entry in place. Returns `false` (and drops `entry`) when empty.
    pub fn replace_newest(&mut self, entry: Snapshot) -> bool {
        match self.entries.back_mut() {
            Some(newest) => {
                *newest = entry;
                true
            }
            None => false,
        }
    }

    /// Copy of the entries, oldest to newest.
    pub fn snapshot(&self) -> Vec<Snapshot> {
        self.entries.iter().cloned().collect()
    }

    pub fn newest(&self) -> Option<&Snapshot> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

/// Splits a history into its single write side and a cloneable read side.
pub fn shared(history: History) -> (HistoryWriter, SharedHistory) {
    let inner = Arc::new(RwLock::new(history));
    (
        HistoryWriter {
            inner: inner.clone(),
            live: false,
        },
        SharedHistory { inner },
    )
}

/// Read-only handle for request-serving code. Only ever takes the lock shared.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<RwLock<History>>,
}

impl SharedHistory {
    fn read(&self) -> Result<RwLockReadGuard<'_, History>, HistoryError> {
        self.inner.read().map_err(|_| HistoryError::Poisoned)
    }

    /// All entries, oldest to newest, as of one consistent point in time.
    pub fn get_history(&self) -> Result<Vec<Snapshot>, HistoryError> {
        Ok(self.read()?.snapshot())
    }

    /// The newest entry (usually the live slot).
    pub fn latest(&self) -> Result<Option<Snapshot>, HistoryError> {
        Ok(self.read()?.newest().cloned())
    }
}

/// The only write access to the history; owned by the updater and deliberately not `Clone`.
///
/// Tracks whether the newest entry is the live slot. Entries restored from disk are final,
/// so a fresh writer starts without one.
#[derive(Debug)]
pub struct HistoryWriter {
    inner: Arc<RwLock<History>>,
    live: bool,
}

fn write_lock(inner: &RwLock<History>) -> Result<RwLockWriteGuard<'_, History>, HistoryError> {
    inner.write().map_err(|_| HistoryError::Poisoned)
}

impl HistoryWriter {
    pub fn has_live(&self) -> bool {
        self.live
    }

    /// Puts a raw snapshot in the live slot, creating the slot on first use.
    pub fn set_live(&mut self, snapshot: Snapshot) -> Result<(), HistoryError> {
        let mut history = write_lock(&self.inner)?;
        if self.live && !history.is_empty() {
            history.replace_newest(snapshot);
        } else {
            history.push(snapshot);
        }
        self.live = true;
        Ok(())
    }

    /// Finalizes the live slot with `consolidated` and opens a new live slot holding
    /// `next_live`, in one critical section so readers never see one without the other.
    pub fn finalize(
        &mut self,
        consolidated: ConsolidatedEntry,
        next_live: Snapshot,
    ) -> Result<(), HistoryError> {
        let mut history = write_lock(&self.inner)?;
        if self.live && !history.is_empty() {
            history.replace_newest(consolidated);
        } else {
            history.push(consolidated);
        }
        history.push(next_live);
        self.live = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn poisoned_lock_is_reported_to_readers_and_writer() {
        let (mut writer, reader) = shared(History::new(capacity(3)));
        writer.set_live(Snapshot::default()).unwrap();

        let inner = writer.inner.clone();
        let _ = std::thread::spawn(move || {
            let _guard = inner.write().unwrap();
            panic!("writer crashed mid-update");
        })
        .join();

        assert!(matches!(reader.get_history(), Err(HistoryError::Poisoned)));
        assert!(matches!(reader.latest(), Err(HistoryError::Poisoned)));
        assert!(matches!(
            writer.set_live(Snapshot::default()),
            Err(HistoryError::Poisoned)
        ));
    }
}
