// Consolidation: reduce one batch of raw snapshots to a single averaged entry.
// Pure; the updater owns the batch and decides when it is full.

use crate::models::{
    ConsolidatedEntry, CpuStats, FilesystemStats, GeneralStats, InterfaceStats, MemoryStats,
    NetworkStats, Snapshot,
};

/// Averages a batch into one entry stamped with the last sample's `collected_at`.
///
/// Floats take the arithmetic mean, integers the mean truncated toward zero. Optional
/// sub-records and fields are averaged over the samples that carry them and stay absent
/// when no sample does. Text takes the newest value. Returns `None` for an empty batch.
pub fn consolidate(batch: &[Snapshot]) -> Option<ConsolidatedEntry> {
    let last = batch.last()?;

    Some(ConsolidatedEntry {
        general: consolidate_general(batch, &last.general),
        cpu: consolidate_cpu(batch, &last.cpu),
        memory: consolidate_memory(batch),
        filesystems: consolidate_filesystems(batch),
        network: consolidate_network(batch),
        collected_at: last.collected_at,
    })
}

fn consolidate_general(batch: &[Snapshot], last: &GeneralStats) -> GeneralStats {
    GeneralStats {
        hostname: last.hostname.clone(),
        os: last.os.clone(),
        uptime_secs: mean_u64(batch.iter().map(|s| s.general.uptime_secs)),
    }
}

fn consolidate_cpu(batch: &[Snapshot], last: &CpuStats) -> CpuStats {
    CpuStats {
        model: last.model.clone(),
        logical_cores: mean_u64(batch.iter().map(|s| u64::from(s.cpu.logical_cores))) as u32,
        usage_percent: mean_f64(batch.iter().map(|s| s.cpu.usage_percent)),
        load_one: mean_f64(batch.iter().map(|s| s.cpu.load_one)),
        load_five: mean_f64(batch.iter().map(|s| s.cpu.load_five)),
        load_fifteen: mean_f64(batch.iter().map(|s| s.cpu.load_fifteen)),
    }
}

fn consolidate_memory(batch: &[Snapshot]) -> Option<MemoryStats> {
    let present: Vec<&MemoryStats> = batch.iter().filter_map(|s| s.memory.as_ref()).collect();
    if present.is_empty() {
        return None;
    }
    let field =
        |get: fn(&MemoryStats) -> Option<u64>| mean_present_u64(present.iter().map(|m| get(m)));
    Some(MemoryStats {
        total_mb: field(|m| m.total_mb),
        used_mb: field(|m| m.used_mb),
        available_mb: field(|m| m.available_mb),
        swap_total_mb: field(|m| m.swap_total_mb),
        swap_used_mb: field(|m| m.swap_used_mb),
    })
}

/// Groups by mount point; each mount is averaged over the samples it appears in.
fn consolidate_filesystems(batch: &[Snapshot]) -> Option<Vec<FilesystemStats>> {
    let lists: Vec<&Vec<FilesystemStats>> =
        batch.iter().filter_map(|s| s.filesystems.as_ref()).collect();
    if lists.is_empty() {
        return None;
    }
    let groups = group_by_key(lists.into_iter().flatten(), |fs| fs.mount_point.as_str());
    Some(
        groups
            .into_iter()
            .map(|refs| {
                let last = refs[refs.len() - 1];
                FilesystemStats {
                    mount_point: last.mount_point.clone(),
                    file_system: last.file_system.clone(),
                    total_mb: mean_u64(refs.iter().map(|f| f.total_mb)),
                    used_mb: mean_u64(refs.iter().map(|f| f.used_mb)),
                    available_mb: mean_u64(refs.iter().map(|f| f.available_mb)),
                }
            })
            .collect(),
    )
}

/// Groups by interface name; each interface is averaged over the samples it appears in.
fn consolidate_network(batch: &[Snapshot]) -> NetworkStats {
    let groups = group_by_key(
        batch.iter().flat_map(|s| s.network.interfaces.iter()),
        |i| i.name.as_str(),
    );
    let interfaces = groups
        .into_iter()
        .map(|refs| InterfaceStats {
            name: refs[0].name.clone(),
            rx_bytes_per_sec: mean_f64(refs.iter().map(|i| i.rx_bytes_per_sec)),
            tx_bytes_per_sec: mean_f64(refs.iter().map(|i| i.tx_bytes_per_sec)),
            rx_total_bytes: mean_u64(refs.iter().map(|i| i.rx_total_bytes)),
            tx_total_bytes: mean_u64(refs.iter().map(|i| i.tx_total_bytes)),
        })
        .collect();
    NetworkStats { interfaces }
}

/// Groups items by key, preserving first-seen key order. Each group is non-empty.
fn group_by_key<'a, T, I, K>(items: I, key: K) -> Vec<Vec<&'a T>>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    K: Fn(&T) -> &str,
{
    let mut keys: Vec<&str> = Vec::new();
    let mut groups: Vec<Vec<&'a T>> = Vec::new();
    for item in items {
        let k = key(item);
        match keys.iter().position(|existing| *existing == k) {
            Some(idx) => groups[idx].push(item),
            None => {
                keys.push(k);
                groups.push(vec![item]);
            }
        }
    }
    groups
}

fn mean_f64(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0u64), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        return 0.0;
    }
    sum / n as f64
}

/// Integer mean, truncated toward zero. Summed in u128 so large byte counters cannot overflow.
fn mean_u64(values: impl Iterator<Item = u64>) -> u64 {
    let (sum, n) = values.fold((0u128, 0u128), |(sum, n), v| (sum + u128::from(v), n + 1));
    if n == 0 {
        return 0;
    }
    (sum / n) as u64
}

fn mean_present_u64(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    let present: Vec<u64> = values.flatten().collect();
    if present.is_empty() {
        return None;
    }
    Some(mean_u64(present.into_iter()))
}
