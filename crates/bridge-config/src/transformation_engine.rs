use std::path::PathBuf;

use serde::Deserialize;

/// `TransformationEngine` section: where the ruleset lives and how many
/// dependency-resolution passes a single frame gets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformationEngineConfig {
    /// Path to the ruleset JSON file. A change to this path (not just its
    /// mtime) also triggers `RulesChanged`.
    pub config_path: PathBuf,
    pub max_evaluation_iterations: u32,
}

impl Default for TransformationEngineConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("rules.json"),
            max_evaluation_iterations: 10,
        }
    }
}

impl TransformationEngineConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_evaluation_iterations == 0 {
            anyhow::bail!("transformation_engine.max_evaluation_iterations must be non-zero");
        }
        Ok(())
    }
}
