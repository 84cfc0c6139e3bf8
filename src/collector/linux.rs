// Linux-specific helpers: /proc/cpuinfo model name.

/// First "model name" from /proc/cpuinfo. sysinfo reports "cpu0" or an empty brand on some ARM boards.
pub(super) fn read_cpu_model_linux() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        parse_cpu_model(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Raspberry Pi kernels report "Model" instead of "model name"; accept either.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(super) fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("model name") || line.starts_with("Model"))
        .filter_map(|line| line.split_once(':').map(|(_, v)| v.trim()))
        .find(|v| !v.is_empty() && *v != "cpu0")
        .map(str::to_string)
}
