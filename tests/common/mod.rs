// Shared test helpers: snapshot builders and a scripted collector
#![allow(dead_code)]

use statkeeper::collector::Collector;
use statkeeper::models::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub fn minimal_snapshot(collected_at: u64) -> Snapshot {
    Snapshot {
        general: GeneralStats {
            hostname: "pi".into(),
            os: "Linux".into(),
            uptime_secs: 0,
        },
        cpu: CpuStats {
            model: "Cortex-A72".into(),
            logical_cores: 4,
            usage_percent: 0.0,
            load_one: 0.0,
            load_five: 0.0,
            load_fifteen: 0.0,
        },
        memory: None,
        filesystems: None,
        network: NetworkStats { interfaces: vec![] },
        collected_at,
    }
}

/// Snapshot with memory present and only `used_mb` set.
pub fn used_mb_snapshot(collected_at: u64, used_mb: u64) -> Snapshot {
    Snapshot {
        memory: Some(MemoryStats {
            used_mb: Some(used_mb),
            ..MemoryStats::default()
        }),
        ..minimal_snapshot(collected_at)
    }
}

/// Returns queued snapshots in order without sleeping; once drained, minimal snapshots
/// stamped with a running counter. Records every requested sample duration.
#[derive(Default)]
pub struct ScriptedCollector {
    queue: Mutex<VecDeque<Snapshot>>,
    requested: Mutex<Vec<Duration>>,
    calls: Mutex<u64>,
}

impl ScriptedCollector {
    pub fn new(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            queue: Mutex::new(snapshots.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Collector yielding `used_mb` values, stamped 1000, 2000, ...
    pub fn with_used_mb(values: &[u64]) -> Self {
        Self::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| used_mb_snapshot((i as u64 + 1) * 1000, *v)),
        )
    }

    pub fn requested_durations(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }
}

impl Collector for ScriptedCollector {
    fn collect(&self, sample_duration: Duration) -> Snapshot {
        self.requested.lock().unwrap().push(sample_duration);
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| minimal_snapshot(*calls))
    }
}
