//! Startup configuration: which hosts are pinned, with which pins, in which
//! mode. Loaded once per session from JSON (embedded string or file); the
//! result is an immutable registry snapshot. Reconfiguring at runtime means
//! building a fresh snapshot and swapping the `Arc`, so in-flight
//! validations keep a consistent view.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pin::TrustPin;
use crate::registry::PinRegistry;
use crate::validator::{PinPolicy, ValidationMode};

/// Pins for one host, as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostPins {
    pub host: String,
    /// `sha256/<base64>` pin strings; at least one required.
    pub pins: Vec<String>,
}

/// Session-scoped pinning configuration.
///
/// ```json
/// {
///   "mode": "enforce",
///   "policy": "required",
///   "hosts": [
///     { "host": "api.example.com", "pins": ["sha256/...", "sha256/..."] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningConfig {
    #[serde(default)]
    pub mode: ValidationMode,
    #[serde(default)]
    pub policy: PinPolicy,
    #[serde(default)]
    pub hosts: Vec<HostPins>,
}

impl PinningConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Build the immutable registry snapshot from the configured pins.
    pub fn build_registry(&self) -> Result<Arc<PinRegistry>, ConfigError> {
        let mut builder = PinRegistry::builder();
        for entry in &self.hosts {
            let pins = entry
                .pins
                .iter()
                .map(|p| TrustPin::from_base64(p))
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.add(entry.host.clone(), pins)?;
        }
        let registry = builder.build();
        tracing::info!(
            hosts = registry.host_count(),
            mode = ?self.mode,
            policy = ?self.policy,
            "pinning configuration loaded"
        );
        Ok(Arc::new(registry))
    }
}
