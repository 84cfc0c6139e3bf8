// Snapshot collection. The engine only needs `Collector`; `SysinfoCollector` is the default.

mod linux;

use crate::models::{
    CpuStats, FilesystemStats, GeneralStats, InterfaceStats, MemoryStats, NetworkStats, Snapshot,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Source of snapshots for the updater.
///
/// `collect` blocks for roughly `sample_duration` (CPU load is measured as a rate over that
/// window). A subsystem that cannot be read is left absent in the returned snapshot and
/// reported through `tracing`; it never fails the whole call.
pub trait Collector: Send + Sync + 'static {
    fn collect(&self, sample_duration: Duration) -> Snapshot;
}

/// Truncating byte -> MB conversion.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / BYTES_PER_MB
}

/// Current Unix time in milliseconds; 0 (with a warning) if the clock is before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// sysinfo caches are refreshed on every call, so a poisoned guard holds nothing stale worth refusing.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SysinfoCollector {
    sys: Mutex<System>,
    disks: Mutex<Disks>,
    networks: Mutex<Networks>,
}

impl Default for SysinfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
            disks: Mutex::new(Disks::new_with_refreshed_list()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }

    fn general(&self) -> GeneralStats {
        GeneralStats {
            hostname: System::host_name().unwrap_or_default(),
            os: System::long_os_version()
                .or_else(System::name)
                .unwrap_or_else(|| std::env::consts::OS.into()),
            uptime_secs: System::uptime(),
        }
    }

    fn cpu(&self, sys: &System) -> CpuStats {
        let load = System::load_average();
        let model = linux::read_cpu_model_linux()
            .or_else(|| {
                sys.cpus()
                    .first()
                    .map(|c| c.brand().trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| "Unknown".into());
        CpuStats {
            model,
            logical_cores: sys.cpus().len() as u32,
            usage_percent: (sys.global_cpu_usage() as f64).clamp(0.0, 100.0),
            load_one: load.one,
            load_five: load.five,
            load_fifteen: load.fifteen,
        }
    }

    fn memory(&self, sys: &mut System) -> Option<MemoryStats> {
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            tracing::warn!(
                operation = "get_memory_stats",
                "memory stats unavailable: total memory reported as zero"
            );
            return None;
        }
        let available = sys.available_memory();
        let swap_total = sys.total_swap();
        let (swap_total_mb, swap_used_mb) = if swap_total > 0 {
            (
                Some(bytes_to_mb(swap_total)),
                Some(bytes_to_mb(sys.used_swap())),
            )
        } else {
            (None, None)
        };
        Some(MemoryStats {
            total_mb: Some(bytes_to_mb(total)),
            used_mb: Some(bytes_to_mb(total.saturating_sub(available))),
            available_mb: Some(bytes_to_mb(available)),
            swap_total_mb,
            swap_used_mb,
        })
    }

    fn filesystems(&self) -> Option<Vec<FilesystemStats>> {
        let mut disks = lock(&self.disks);
        disks.refresh(true);
        let list: Vec<FilesystemStats> = disks
            .list()
            .iter()
            .map(|d| {
                let total = d.total_space();
                let available = d.available_space();
                FilesystemStats {
                    mount_point: d.mount_point().to_string_lossy().into_owned(),
                    file_system: d.file_system().to_string_lossy().into_owned(),
                    total_mb: bytes_to_mb(total),
                    used_mb: bytes_to_mb(total.saturating_sub(available)),
                    available_mb: bytes_to_mb(available),
                }
            })
            .collect();
        if list.is_empty() {
            tracing::warn!(
                operation = "get_filesystem_stats",
                "filesystem stats unavailable: no mounted filesystems reported"
            );
            return None;
        }
        Some(list)
    }

    /// Per-interface rates from the counters accumulated since the refresh that opened the window.
    fn network(&self, networks: &mut Networks, window: Duration) -> NetworkStats {
        networks.refresh(true);
        let secs = window.as_secs_f64();
        let mut interfaces: Vec<InterfaceStats> = networks
            .list()
            .iter()
            .map(|(name, data)| InterfaceStats {
                name: name.clone(),
                rx_bytes_per_sec: if secs > 0.0 {
                    data.received() as f64 / secs
                } else {
                    0.0
                },
                tx_bytes_per_sec: if secs > 0.0 {
                    data.transmitted() as f64 / secs
                } else {
                    0.0
                },
                rx_total_bytes: data.total_received(),
                tx_total_bytes: data.total_transmitted(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        NetworkStats { interfaces }
    }
}

impl Collector for SysinfoCollector {
    #[instrument(skip(self), fields(collector = "sysinfo", operation = "collect"))]
    fn collect(&self, sample_duration: Duration) -> Snapshot {
        let window = sample_duration.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        // Open the CPU and network windows together, then sleep through them.
        lock(&self.sys).refresh_cpu_usage();
        lock(&self.networks).refresh(true);
        let started = std::time::Instant::now();
        std::thread::sleep(window);

        let (cpu, memory) = {
            let mut sys = lock(&self.sys);
            sys.refresh_cpu_usage();
            let cpu = self.cpu(&sys);
            (cpu, self.memory(&mut sys))
        };
        let network = {
            let mut networks = lock(&self.networks);
            self.network(&mut networks, started.elapsed())
        };

        Snapshot {
            general: self.general(),
            cpu,
            memory,
            filesystems: self.filesystems(),
            network,
            collected_at: now_millis(),
        }
    }
}
