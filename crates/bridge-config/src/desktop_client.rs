use std::path::PathBuf;

use serde::Deserialize;

/// `PCClient` section: the avatar application's connection, discovery, and
/// authentication parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DesktopClientConfig {
    pub host: String,
    pub port: u16,
    pub discovery_enabled: bool,
    pub discovery_port: u16,
    /// Bounds discovery listen, connect, and auth round-trips.
    pub connection_timeout_ms: u64,
    pub plugin_name: String,
    pub plugin_developer: String,
    pub token_file_path: PathBuf,
    /// Substring a discovery beacon's `windowTitle` must contain to count as
    /// a valid avatar app instance. Spec §9 open question: configurable,
    /// defaults to the product name.
    pub window_title_marker: String,
}

impl Default for DesktopClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 21412,
            discovery_enabled: true,
            discovery_port: 47779,
            connection_timeout_ms: 3_000,
            plugin_name: "bridge-daemon".to_string(),
            plugin_developer: "bridge-daemon".to_string(),
            token_file_path: PathBuf::from("token.txt"),
            window_title_marker: "Desktop Avatar App".to_string(),
        }
    }
}

impl DesktopClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("desktop_client.host must not be empty");
        }
        if self.connection_timeout_ms == 0 {
            anyhow::bail!("desktop_client.connection_timeout_ms must be non-zero");
        }
        if self.plugin_name.trim().is_empty() {
            anyhow::bail!("desktop_client.plugin_name must not be empty");
        }
        if self.window_title_marker.trim().is_empty() {
            anyhow::bail!("desktop_client.window_title_marker must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DesktopClientConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_empty_host() {
        let mut c = DesktopClientConfig::default();
        c.host = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_empty_marker() {
        let mut c = DesktopClientConfig::default();
        c.window_title_marker = String::new();
        assert!(c.validate().is_err());
    }
}
