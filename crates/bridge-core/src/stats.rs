use std::collections::HashMap;
use std::time::Duration;

/// An immutable snapshot describing a component's health, counters, and
/// last error. Cheap to produce: components sample their own counters
/// under their own exclusion and hand back a plain value.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    pub name: String,
    pub status: String,
    pub is_healthy: bool,
    pub uptime: Duration,
    pub counters: HashMap<String, i64>,
    pub current_entity: Option<String>,
    pub last_error: Option<String>,
}

impl ServiceStats {
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// The Transformation Engine's status values (spec §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Initializing,
    NoRulesLoaded,
    NoValidRules,
    ConfigErrorCached,
    RulesPartiallyValid,
    Ready,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::NoRulesLoaded => "NoRulesLoaded",
            Self::NoValidRules => "NoValidRules",
            Self::ConfigErrorCached => "ConfigErrorCached",
            Self::RulesPartiallyValid => "RulesPartiallyValid",
            Self::Ready => "Ready",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Ready | Self::RulesPartiallyValid)
    }
}
