use std::path::{Path, PathBuf};

use catalyst_gate::{GateConfig, PolicyConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Top-level configuration of a deployment service.
///
/// ```toml
/// [gate]
/// max_request_bytes = 10485760
/// verify_signatures = true
/// enforce_access = true
///
/// [policy]
/// parcel_limit = 150
///
/// [[policy.access.scene]]
/// rule = "parcels"
/// grantee = "0x..."
/// min = { x = -10, y = -10 }
/// max = { x = 10, y = 10 }
///
/// [storage]
/// root = "/var/lib/catalyst"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub gate: GateConfig,
    pub policy: PolicyConfig,
    pub storage: StorageConfig,
}

/// Where content is persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Filesystem root. `None` keeps everything in memory.
    pub root: Option<PathBuf>,
}

impl ServiceConfig {
    /// Configuration for local development: signatures and access rules
    /// are not checked, everything else is.
    pub fn permissive() -> Self {
        Self {
            gate: GateConfig::permissive(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> ServiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage.root = Some(root.into());
        self
    }
}
