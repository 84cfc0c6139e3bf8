use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::worker::{PersistenceConfig, UpdaterConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    /// Omit the `[persistence]` table to keep history in memory only.
    #[serde(default)]
    pub persistence: Option<PersistenceSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    pub update_period_ms: u64,
    /// CPU load is measured over this window inside each period; must be shorter than it.
    pub cpu_sample_duration_ms: u64,
    /// Number of entries kept in memory (finalized entries plus the live slot).
    pub capacity: usize,
    /// Raw samples averaged into one history entry.
    pub consolidation_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSection {
    pub directory: String,
    /// Disk budget for both history files together.
    #[serde(default = "default_size_limit_bytes")]
    pub size_limit_bytes: u64,
}

fn default_size_limit_bytes() -> u64 {
    1024 * 1024
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.history.update_period_ms > 0,
            "history.update_period_ms must be > 0, got {}",
            self.history.update_period_ms
        );
        anyhow::ensure!(
            self.history.cpu_sample_duration_ms < self.history.update_period_ms,
            "history.cpu_sample_duration_ms ({}) must be < history.update_period_ms ({})",
            self.history.cpu_sample_duration_ms,
            self.history.update_period_ms
        );
        anyhow::ensure!(
            self.history.capacity > 0,
            "history.capacity must be > 0, got {}",
            self.history.capacity
        );
        anyhow::ensure!(
            self.history.consolidation_limit > 0,
            "history.consolidation_limit must be > 0, got {}",
            self.history.consolidation_limit
        );
        if let Some(p) = &self.persistence {
            anyhow::ensure!(
                !p.directory.is_empty(),
                "persistence.directory must be non-empty"
            );
            anyhow::ensure!(
                p.size_limit_bytes > 0,
                "persistence.size_limit_bytes must be > 0, got {}",
                p.size_limit_bytes
            );
        }
        Ok(())
    }

    pub fn updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            update_period: Duration::from_millis(self.history.update_period_ms),
            cpu_sample_duration: Duration::from_millis(self.history.cpu_sample_duration_ms),
            history_capacity: self.history.capacity,
            consolidation_limit: self.history.consolidation_limit,
            persistence: self.persistence.as_ref().map(|p| PersistenceConfig {
                directory: PathBuf::from(&p.directory),
                size_limit_bytes: p.size_limit_bytes,
            }),
        }
    }
}
