use serde::Deserialize;

use crate::logging::LoggingConfig;

/// `GeneralSettings` section: process-wide logging and recovery-loop tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub logging: LoggingConfig,
    /// How long a service may report `is_healthy=false` before the recovery
    /// loop attempts `try_initialize()` on it.
    pub unhealthy_grace_period_ms: u64,
    /// Exponential backoff base for reinit attempts.
    pub backoff_base_ms: u64,
    /// Exponential backoff ceiling for reinit attempts.
    pub backoff_max_ms: u64,
    /// Jitter fraction applied to each backoff delay, e.g. `0.2` for ±20%.
    pub backoff_jitter: f64,
    /// Recovery-loop tick rate in Hz, clamped to `[1,10]` at validation.
    pub recovery_tick_hz: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            unhealthy_grace_period_ms: 2_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            backoff_jitter: 0.2,
            recovery_tick_hz: 5.0,
        }
    }
}

impl GeneralConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backoff_base_ms == 0 {
            anyhow::bail!("general.backoff_base_ms must be non-zero");
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            anyhow::bail!("general.backoff_max_ms must be >= backoff_base_ms");
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            anyhow::bail!("general.backoff_jitter must be in [0,1]");
        }
        if !(1.0..=10.0).contains(&self.recovery_tick_hz) {
            anyhow::bail!("general.recovery_tick_hz must be in [1,10]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GeneralConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_backoff_base() {
        let mut c = GeneralConfig::default();
        c.backoff_base_ms = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_tick_rate_out_of_range() {
        let mut c = GeneralConfig::default();
        c.recovery_tick_hz = 20.0;
        assert!(c.validate().is_err());
    }
}
