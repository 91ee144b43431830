use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::desktop_client::DesktopClientConfig;
use crate::general::GeneralConfig;
use crate::mobile_client::MobileClientConfig;
use crate::transformation_engine::TransformationEngineConfig;

// ---------------------------------------------------------------------------
// Raw JSON structure (intermediate representation)
// ---------------------------------------------------------------------------

/// Mirrors the on-disk document's top-level keys, which follow the source
/// format rather than Rust naming conventions.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigRaw {
    #[serde(rename = "GeneralSettings")]
    general: GeneralConfig,
    #[serde(rename = "PhoneClient")]
    phone_client: MobileClientConfig,
    #[serde(rename = "PCClient")]
    pc_client: DesktopClientConfig,
    #[serde(rename = "TransformationEngine")]
    transformation_engine: TransformationEngineConfig,
}

impl Default for ConfigRaw {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            phone_client: MobileClientConfig::default(),
            pc_client: DesktopClientConfig::default(),
            transformation_engine: TransformationEngineConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (resolved, validated)
// ---------------------------------------------------------------------------

/// The consolidated configuration document, parsed once and exposed as
/// typed, already-validated sections.
#[derive(Debug, Clone)]
pub struct Config {
    pub general: GeneralConfig,
    pub mobile_client: MobileClientConfig,
    pub desktop_client: DesktopClientConfig,
    pub transformation_engine: TransformationEngineConfig,
}

impl Config {
    /// Read and parse the consolidated config document from `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(json: &str) -> anyhow::Result<Self> {
        let raw: ConfigRaw = serde_json::from_str(json)?;

        raw.general.validate()?;
        raw.phone_client.validate()?;
        raw.pc_client.validate()?;
        raw.transformation_engine.validate()?;

        Ok(Config {
            general: raw.general,
            mobile_client: raw.phone_client,
            desktop_client: raw.pc_client,
            transformation_engine: raw.transformation_engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_JSON: &str = r#"
    {
        "GeneralSettings": {
            "logging": { "level": "debug" },
            "recovery_tick_hz": 5.0
        },
        "PhoneClient": {
            "listen_port": 21412,
            "iphone_ip": "192.168.1.50",
            "iphone_port": 21412,
            "request_interval_seconds": 1.0,
            "send_for_seconds": 5.0,
            "receive_timeout_ms": 500
        },
        "PCClient": {
            "host": "127.0.0.1",
            "port": 21412,
            "discovery_enabled": true,
            "token_file_path": "token.txt"
        },
        "TransformationEngine": {
            "config_path": "rules.json",
            "max_evaluation_iterations": 10
        }
    }
    "#;

    #[test]
    fn loads_full_document() {
        let cfg: Config = FULL_JSON.parse().unwrap();
        assert_eq!(cfg.general.logging.level, "debug");
        assert_eq!(cfg.mobile_client.iphone_ip, "192.168.1.50");
        assert_eq!(cfg.desktop_client.host, "127.0.0.1");
        assert_eq!(cfg.transformation_engine.max_evaluation_iterations, 10);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = "{}".parse().unwrap();
        assert_eq!(cfg.desktop_client.discovery_port, 47779);
        assert_eq!(cfg.transformation_engine.max_evaluation_iterations, 10);
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let json = FULL_JSON.replace(
            "\"GeneralSettings\"",
            "\"SomeFutureSection\": {}, \"GeneralSettings\"",
        );
        let cfg: Config = json.parse().unwrap();
        assert_eq!(cfg.mobile_client.iphone_ip, "192.168.1.50");
    }

    #[test]
    fn rejects_invalid_section() {
        let json = FULL_JSON.replace("\"request_interval_seconds\": 1.0", "\"request_interval_seconds\": 0");
        assert!(json.parse::<Config>().is_err());
    }

    #[test]
    fn malformed_json_fails() {
        assert!("not json".parse::<Config>().is_err());
    }
}
