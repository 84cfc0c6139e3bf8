// Snapshot: general, CPU, memory, filesystems and network at one point in time.
// Optional sub-records model a collector subsystem that could not be read.

use serde::{Deserialize, Serialize};

use super::{FilesystemStats, NetworkStats};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub hostname: String,
    pub os: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub model: String,
    pub logical_cores: u32,
    pub usage_percent: f64,
    pub load_one: f64,
    pub load_five: f64,
    pub load_fifteen: f64,
}

/// Memory in megabytes. Every field is individually optional: swap is absent on
/// hosts without swap, and a partially readable source still reports what it can.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_total_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_used_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub general: GeneralStats,
    pub cpu: CpuStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesystems: Option<Vec<FilesystemStats>>,
    pub network: NetworkStats,
    /// Collection time, Unix milliseconds.
    pub collected_at: u64,
}

/// A snapshot whose numeric fields are averaged over one batch.
pub type ConsolidatedEntry = Snapshot;

impl Snapshot {
    /// Memory used in MB, when the memory sub-record and the field are both present.
    pub fn used_mb(&self) -> Option<u64> {
        self.memory.as_ref().and_then(|m| m.used_mb)
    }
}
