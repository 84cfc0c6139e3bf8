// Background updater: sample -> batch -> consolidate -> persist -> commit, once per period.
// Collection and disk writes run on the blocking pool and never under the history lock;
// the lock is held only for the live-slot swap or the finalize+push.

use crate::collector::Collector;
use crate::history::consolidation::consolidate;
use crate::history::persistence::PersistenceManager;
use crate::history::{History, HistoryError, HistoryWriter, SharedHistory, shared};
use crate::models::Snapshot;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::time::Duration;
use tracing::Instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub directory: PathBuf,
    pub size_limit_bytes: u64,
}

/// Engine timing and sizing. Checked by `Updater::new` before anything runs.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub update_period: Duration,
    pub cpu_sample_duration: Duration,
    pub history_capacity: usize,
    pub consolidation_limit: usize,
    /// `None` keeps history in memory only.
    pub persistence: Option<PersistenceConfig>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineConfigError {
    #[error(
        "cpu sample duration ({sample:?}) must be shorter than the update period ({period:?})"
    )]
    SampleNotShorterThanPeriod { sample: Duration, period: Duration },
    #[error("history capacity must be > 0")]
    ZeroCapacity,
    #[error("consolidation limit must be > 0")]
    ZeroConsolidationLimit,
    #[error("persistence size limit must be > 0")]
    ZeroSizeLimit,
    #[error("persistence directory must be non-empty")]
    EmptyPersistenceDirectory,
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.cpu_sample_duration >= self.update_period {
            return Err(EngineConfigError::SampleNotShorterThanPeriod {
                sample: self.cpu_sample_duration,
                period: self.update_period,
            });
        }
        if self.history_capacity == 0 {
            return Err(EngineConfigError::ZeroCapacity);
        }
        if self.consolidation_limit == 0 {
            return Err(EngineConfigError::ZeroConsolidationLimit);
        }
        if let Some(p) = &self.persistence {
            if p.size_limit_bytes == 0 {
                return Err(EngineConfigError::ZeroSizeLimit);
            }
            if p.directory.as_os_str().is_empty() {
                return Err(EngineConfigError::EmptyPersistenceDirectory);
            }
        }
        Ok(())
    }

    /// Time slept between cycles. Gathering overhead beyond the sample window is not subtracted.
    pub fn idle_duration(&self) -> Duration {
        self.update_period.saturating_sub(self.cpu_sample_duration)
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Batch still filling; the live slot now holds the new sample.
    Sampled { batch_len: usize },
    /// Batch was full: consolidated, persisted (if enabled) and committed.
    Consolidated,
    /// The collector task failed; nothing changed.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdaterStats {
    pub cycles: u64,
    pub consolidations: u64,
    pub persist_failures: u64,
}

pub struct Updater<C: Collector> {
    collector: Arc<C>,
    config: UpdaterConfig,
    batch: Vec<Snapshot>,
    writer: HistoryWriter,
    persistence: Option<PersistenceManager>,
    stats: UpdaterStats,
}

impl<C: Collector> Updater<C> {
    /// Validates `config` and builds the engine plus the read handle for request handlers.
    /// With persistence enabled the history is seeded from disk; a failed restore is logged
    /// and the engine starts empty.
    pub fn new(
        collector: Arc<C>,
        config: UpdaterConfig,
    ) -> Result<(Self, SharedHistory), EngineConfigError> {
        config.validate()?;
        let capacity =
            NonZeroUsize::new(config.history_capacity).ok_or(EngineConfigError::ZeroCapacity)?;

        let persistence = config
            .persistence
            .as_ref()
            .map(|p| PersistenceManager::new(&p.directory, p.size_limit_bytes));

        let restored = match &persistence {
            Some(manager) => match manager.load_recent(capacity.get()) {
                Ok(entries) => {
                    tracing::info!(
                        operation = "load_history",
                        entries = entries.len(),
                        dir = %manager.directory().display(),
                        "history restored"
                    );
                    entries
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        operation = "load_history",
                        "failed to restore history; starting empty"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let (writer, reader) = shared(History::with_entries(capacity, restored));
        let batch = Vec::with_capacity(config.consolidation_limit);
        Ok((
            Self {
                collector,
                config,
                batch,
                writer,
                persistence,
                stats: UpdaterStats::default(),
            },
            reader,
        ))
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn stats(&self) -> UpdaterStats {
        self.stats
    }

    /// Raw samples gathered since the last consolidation.
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// One sampling cycle. Only a poisoned history lock is an error; it is fatal to the engine.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, HistoryError> {
        let collector = Arc::clone(&self.collector);
        let sample_duration = self.config.cpu_sample_duration;
        let snapshot =
            match tokio::task::spawn_blocking(move || collector.collect(sample_duration)).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, operation = "collect", "collector task failed");
                    return Ok(CycleOutcome::Skipped);
                }
            };
        self.stats.cycles += 1;
        self.batch.push(snapshot.clone());

        if self.batch.len() < self.config.consolidation_limit {
            self.writer.set_live(snapshot)?;
            return Ok(CycleOutcome::Sampled {
                batch_len: self.batch.len(),
            });
        }

        let Some(entry) = consolidate(&self.batch) else {
            return Ok(CycleOutcome::Skipped);
        };
        if let Some(manager) = self.persistence.clone() {
            self.persist(manager, entry.clone()).await;
        }
        self.writer.finalize(entry, snapshot)?;
        self.batch.clear();
        self.stats.consolidations += 1;
        tracing::debug!(
            operation = "consolidate",
            cycles = self.stats.cycles,
            consolidations = self.stats.consolidations,
            persist_failures = self.stats.persist_failures,
            "history entry consolidated"
        );
        Ok(CycleOutcome::Consolidated)
    }

    /// Best-effort: failures are logged and counted, never propagated.
    async fn persist(&mut self, manager: PersistenceManager, entry: Snapshot) {
        let result = tokio::task::spawn_blocking(move || manager.persist(&entry)).await;
        let err = match result {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("persist task failed: {}", e),
        };
        self.stats.persist_failures += 1;
        tracing::warn!(
            error = %err,
            operation = "persist",
            persist_failures = self.stats.persist_failures,
            "failed to persist history entry"
        );
    }
}

/// Runs the updater until `shutdown_rx` fires (or its sender is dropped).
///
/// The signal is checked at the top of every cycle and interrupts the idle sleep; a cycle
/// already collecting runs to completion. The task ends with `Err` only when the history lock
/// is poisoned, which callers should treat as fatal.
pub fn spawn<C: Collector>(
    mut updater: Updater<C>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<Result<(), HistoryError>> {
    let idle = updater.config.idle_duration();
    let span = tracing::debug_span!(
        "updater",
        update_period_ms = updater.config.update_period.as_millis() as u64,
        consolidation_limit = updater.config.consolidation_limit
    );

    tokio::spawn(
        async move {
            loop {
                if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
                    break;
                }
                if let Err(e) = updater.run_cycle().await {
                    tracing::error!(error = %e, operation = "commit", "updater stopping");
                    return Err(e);
                }
                tokio::select! {
                    _ = tokio::time::sleep(idle) => {}
                    _ = &mut shutdown_rx => break,
                }
            }
            tracing::debug!(stats = ?updater.stats(), "Updater shutting down");
            Ok(())
        }
        .instrument(span),
    )
}
