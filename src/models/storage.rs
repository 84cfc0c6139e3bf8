// Mounted filesystem models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesystemStats {
    pub mount_point: String,
    pub file_system: String,
    pub total_mb: u64,
    pub used_mb: u64,
    pub available_mb: u64,
}
