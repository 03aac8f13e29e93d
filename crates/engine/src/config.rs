//! Engine configuration.

use padhost_controller_types::MappingsType;
use serde::{Deserialize, Serialize};

/// Default guard timeout for a device that never becomes ready.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 20_000;

/// Default cooldown applied to Switch-family system button presses.
pub const DEFAULT_MISC_COOLDOWN_MS: u64 = 200;

/// Default per-device outgoing ring capacity.
pub const DEFAULT_OUTGOING_CAPACITY: usize = 8;

/// Tunable engine behavior. Everything has a default, so a partial config
/// file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gamepad remap applied just before snapshots reach the platform.
    pub mappings: MappingsType,
    /// Allow virtual child devices (Sony touchpad mice).
    pub enable_virtual_devices: bool,
    /// Guard timeout for devices stuck before ready.
    pub connection_timeout_ms: u64,
    /// Switch-family system button cooldown.
    pub misc_button_cooldown_ms: u64,
    /// Per-device outgoing ring capacity.
    pub outgoing_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            mappings: MappingsType::default(),
            enable_virtual_devices: true,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            misc_button_cooldown_ms: DEFAULT_MISC_COOLDOWN_MS,
            outgoing_capacity: DEFAULT_OUTGOING_CAPACITY,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "enable_virtual_devices": false }"#).unwrap();
        assert!(!cfg.enable_virtual_devices);
        assert_eq!(cfg.connection_timeout_ms, DEFAULT_CONNECTION_TIMEOUT_MS);
        assert_eq!(cfg.mappings, MappingsType::Xbox);
    }

    #[test]
    fn mappings_use_snake_case_tags() {
        let cfg: EngineConfig = serde_json::from_str(r#"{ "mappings": "switch" }"#).unwrap();
        assert_eq!(cfg.mappings, MappingsType::Switch);
    }
}
