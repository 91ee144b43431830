pub mod desktop_frame;
pub mod engine;
pub mod frame;
pub mod interpolation;
pub mod rule;
pub mod ruleset;
pub mod stats;

pub use desktop_frame::DesktopFrame;
pub use engine::{Engine, ParameterDefinition, RulesSource, RulesetLoadReport};
pub use frame::Frame;
pub use rule::{InvalidRule, InvalidRuleKind, Interpolation, Rule};
pub use ruleset::{compile_ruleset, RawInterpolation, RawRuleDef, Ruleset};
pub use stats::{EngineStatus, ServiceStats};
