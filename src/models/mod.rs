// Domain models: one raw snapshot of host telemetry, also the shape of a consolidated entry.

mod network;
mod snapshot;
mod storage;

pub use network::{InterfaceStats, NetworkStats};
pub use snapshot::{ConsolidatedEntry, CpuStats, GeneralStats, MemoryStats, Snapshot};
pub use storage::FilesystemStats;
