use serde::{Deserialize, Serialize};

/// Default request ceiling: 10 MiB.
pub const DEFAULT_MAX_REQUEST_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for the deployment gate pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Total uploaded bytes a single deployment may carry.
    pub max_request_bytes: u64,
    /// Whether signatures are verified against the signer address.
    pub verify_signatures: bool,
    /// Whether the access policy is consulted for every claimed pointer.
    pub enforce_access: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            verify_signatures: true,
            enforce_access: true,
        }
    }
}

impl GateConfig {
    /// Configuration for local development and tests.
    ///
    /// Skips signature verification and access control. Integrity,
    /// freshness, structure and content completeness still run: those
    /// protect the store itself, not a particular deployer.
    pub fn permissive() -> Self {
        Self {
            verify_signatures: false,
            enforce_access: false,
            ..Default::default()
        }
    }

    /// Returns `true` if any authorization check is disabled.
    pub fn is_permissive(&self) -> bool {
        !self.verify_signatures || !self.enforce_access
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict() {
        let config = GateConfig::default();
        assert!(config.verify_signatures);
        assert!(config.enforce_access);
        assert!(!config.is_permissive());
        assert_eq!(config.max_request_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn permissive_keeps_size_limit() {
        let config = GateConfig::permissive();
        assert!(config.is_permissive());
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: GateConfig = serde_json::from_str(r#"{"max_request_bytes": 5}"#).unwrap();
        assert_eq!(config.max_request_bytes, 5);
        assert!(config.verify_signatures);
    }
}
