use serde::Deserialize;

/// `PhoneClient` section: where to listen for frames and how to keep the
/// mobile source streaming.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MobileClientConfig {
    /// Local UDP port the receive loop binds.
    pub listen_port: u16,
    /// Remote mobile source address the heartbeat is sent to.
    pub iphone_ip: String,
    pub iphone_port: u16,
    /// Heartbeat cadence.
    pub request_interval_seconds: f64,
    /// `N` in the "please send for N seconds" heartbeat payload.
    pub send_for_seconds: f64,
    /// Receive-socket timeout.
    pub receive_timeout_ms: u64,
}

impl Default for MobileClientConfig {
    fn default() -> Self {
        Self {
            listen_port: 21412,
            iphone_ip: "0.0.0.0".to_string(),
            iphone_port: 21412,
            request_interval_seconds: 1.0,
            send_for_seconds: 5.0,
            receive_timeout_ms: 500,
        }
    }
}

impl MobileClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.iphone_ip.trim().is_empty() {
            anyhow::bail!("mobile_client.iphone_ip must not be empty");
        }
        if self.request_interval_seconds <= 0.0 {
            anyhow::bail!("mobile_client.request_interval_seconds must be positive");
        }
        if self.send_for_seconds <= 0.0 {
            anyhow::bail!("mobile_client.send_for_seconds must be positive");
        }
        if self.receive_timeout_ms == 0 {
            anyhow::bail!("mobile_client.receive_timeout_ms must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        MobileClientConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_empty_ip() {
        let mut c = MobileClientConfig::default();
        c.iphone_ip = "  ".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_interval() {
        let mut c = MobileClientConfig::default();
        c.request_interval_seconds = 0.0;
        assert!(c.validate().is_err());
    }
}
