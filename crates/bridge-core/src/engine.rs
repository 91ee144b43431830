use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::desktop_frame::DesktopFrame;
use crate::frame::Frame;
use crate::interpolation;
use crate::rule::{InvalidRule, Rule};
use crate::ruleset::Ruleset;
use crate::stats::{EngineStatus, ServiceStats};

/// Everything A's `load()` hands back to B (spec §4.A / §4.B). Never
/// constructed to signal failure by throwing — a catastrophic load still
/// produces a report, falling back to the cached ruleset when one exists.
#[derive(Debug, Clone, Default)]
pub struct RulesetLoadReport {
    pub valid_rules: Vec<Rule>,
    pub invalid_rules: Vec<InvalidRule>,
    pub validation_errors: Vec<String>,
    pub loaded_from_cache: bool,
    pub load_error: Option<String>,
}

impl RulesetLoadReport {
    fn into_ruleset(self) -> (Ruleset, Vec<String>, bool, Option<String>) {
        (
            Ruleset {
                rules: self.valid_rules,
                invalid_rules: self.invalid_rules,
            },
            self.validation_errors,
            self.loaded_from_cache,
            self.load_error,
        )
    }
}

/// The contract the Rules Repository (`bridge-rules`) implements. Kept as
/// a trait here, rather than a direct dependency, so `bridge-core` does
/// not depend on the crate that depends on it.
pub trait RulesSource {
    fn load(&self) -> RulesetLoadReport;
}

/// Converts each valid `Frame` into a `DesktopFrame` using the active
/// Ruleset (spec §4.B).
pub struct Engine {
    active: Ruleset,
    extremums: HashMap<String, (f64, f64, bool)>,
    counters: HashMap<String, i64>,
    config_changed: bool,
    has_loaded: bool,
    loaded_from_cache: bool,
    last_load_error: Option<String>,
    created_at: Instant,
    max_evaluation_iterations: u32,
}

impl Engine {
    pub fn new(max_evaluation_iterations: u32) -> Self {
        Self {
            active: Ruleset::default(),
            extremums: HashMap::new(),
            counters: HashMap::new(),
            config_changed: false,
            has_loaded: false,
            loaded_from_cache: false,
            last_load_error: None,
            created_at: Instant::now(),
            max_evaluation_iterations,
        }
    }

    /// Delegates to the Rules Repository, swaps the active Ruleset, resets
    /// per-rule extremums, and bumps `hot_reload_successes` exactly once
    /// per successful load (spec §9: guards the known double-increment
    /// regression).
    pub fn load_rules(&mut self, source: &dyn RulesSource) -> RulesetLoadReport {
        let report = source.load();
        let (ruleset, _validation_errors, loaded_from_cache, load_error) =
            report.clone().into_ruleset();

        self.active = ruleset;
        self.extremums.clear();
        self.has_loaded = true;
        self.loaded_from_cache = loaded_from_cache;
        self.last_load_error = load_error.clone();

        if load_error.is_none() {
            *self.counters.entry("hot_reload_successes".to_string()).or_insert(0) += 1;
            self.config_changed = false;
        }

        report
    }

    pub fn parameter_definitions(&self) -> Vec<ParameterDefinition> {
        self.active
            .rules
            .iter()
            .map(|r| ParameterDefinition {
                name: r.name.clone(),
                min: r.min,
                max: r.max,
                default: r.default_value,
            })
            .collect()
    }

    pub fn mark_config_changed(&mut self) {
        self.config_changed = true;
    }

    pub fn config_changed(&self) -> bool {
        self.config_changed
    }

    /// Convert `frame` into a `DesktopFrame` using the active Ruleset.
    /// Never panics or returns an error: rule-level failures become
    /// per-rule omissions and bump `failed_transformations`.
    pub fn transform(&mut self, frame: &Frame) -> DesktopFrame {
        if !frame.face_present {
            return DesktopFrame::face_lost();
        }

        let rule_names = self.active.rule_names();
        let mut env = frame.variable_bindings();
        let mut resolved: Vec<bool> = vec![false; self.active.rules.len()];
        let mut output = DesktopFrame {
            face_present: true,
            ..Default::default()
        };

        for _pass in 0..self.max_evaluation_iterations {
            let mut progressed = false;

            for (idx, rule) in self.active.rules.iter().enumerate() {
                if resolved[idx] {
                    continue;
                }
                let deps = rule.rule_dependencies(&rule_names);
                let ready = deps.iter().all(|d| env.contains_key(*d));
                if !ready {
                    continue;
                }

                resolved[idx] = true;
                progressed = true;

                match rule.expression.eval(&|name: &str| env.get(name).copied()) {
                    Ok(raw) if raw.is_finite() => {
                        let (value, fallback) = interpolation::apply(
                            raw,
                            rule.min,
                            rule.max,
                            rule.interpolation.as_ref(),
                        );
                        if fallback {
                            *self
                                .counters
                                .entry("interpolation_fallbacks".to_string())
                                .or_insert(0) += 1;
                        }

                        env.insert(rule.name.clone(), value);
                        output.parameters.push((rule.name.clone(), value, 1.0));
                        output
                            .expressions
                            .insert(rule.name.clone(), rule.expression_text.clone());
                        if let Some(interp) = &rule.interpolation {
                            output.interpolations.insert(
                                rule.name.clone(),
                                match interp {
                                    crate::rule::Interpolation::Linear => "Linear".to_string(),
                                    crate::rule::Interpolation::Bezier { .. } => {
                                        "Bezier".to_string()
                                    }
                                },
                            );
                        }

                        let ext = self
                            .extremums
                            .entry(rule.name.clone())
                            .or_insert((value, value, false));
                        ext.0 = ext.0.min(value);
                        ext.1 = ext.1.max(value);
                        ext.2 = true;
                    }
                    _ => {
                        *self
                            .counters
                            .entry("failed_transformations".to_string())
                            .or_insert(0) += 1;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        // Rules that never became ready within the iteration budget (e.g. an
        // unresolvable dependency cycle) are omitted from this frame and
        // retried next frame, but still count as failed transformations
        // (spec §8 scenario 5: "failed_transformations increments by 2 per
        // frame; no exception").
        let unresolved_count = resolved.iter().filter(|r| !**r).count();
        if unresolved_count > 0 {
            *self
                .counters
                .entry("failed_transformations".to_string())
                .or_insert(0) += unresolved_count as i64;
        }

        output.extremums = self.extremums.clone();
        output
    }

    pub fn status(&self) -> EngineStatus {
        if !self.has_loaded {
            return EngineStatus::Initializing;
        }
        if self.last_load_error.is_some() && self.loaded_from_cache {
            return EngineStatus::ConfigErrorCached;
        }
        if self.active.rules.is_empty() && self.active.invalid_rules.is_empty() {
            return EngineStatus::NoRulesLoaded;
        }
        if self.active.rules.is_empty() {
            return EngineStatus::NoValidRules;
        }
        if !self.active.invalid_rules.is_empty() {
            return EngineStatus::RulesPartiallyValid;
        }
        EngineStatus::Ready
    }

    pub fn stats(&self) -> ServiceStats {
        let status = self.status();
        ServiceStats {
            name: "TransformationEngine".to_string(),
            status: status.as_str().to_string(),
            is_healthy: status.is_healthy() && !self.config_changed,
            uptime: self.uptime(),
            counters: self.counters.clone(),
            current_entity: self.active.rules.first().map(|r| r.name.clone()),
            last_error: self.last_load_error.clone(),
        }
    }

    fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    #[cfg(test)]
    pub(crate) fn active_ruleset(&self) -> &Ruleset {
        &self.active
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::{compile_ruleset, RawRuleDef};

    struct StaticSource(RulesetLoadReport);
    impl RulesSource for StaticSource {
        fn load(&self) -> RulesetLoadReport {
            self.0.clone()
        }
    }

    fn report_from(defs: Vec<RawRuleDef>) -> RulesetLoadReport {
        let ruleset = compile_ruleset(defs);
        RulesetLoadReport {
            valid_rules: ruleset.rules,
            invalid_rules: ruleset.invalid_rules,
            validation_errors: vec![],
            loaded_from_cache: false,
            load_error: None,
        }
    }

    fn def(name: &str, expr: &str, min: f64, max: f64) -> RawRuleDef {
        RawRuleDef {
            name: name.to_string(),
            expression_text: expr.to_string(),
            min,
            max,
            default_value: 0.0,
            interpolation: None,
        }
    }

    fn face_frame(head_rot_x: f64) -> Frame {
        Frame {
            timestamp: 0.0,
            face_present: true,
            head_position: (0.0, 0.0, 0.0),
            head_rotation: (head_rot_x, 0.0, 0.0),
            eye_left: (0.0, 0.0),
            eye_right: (0.0, 0.0),
            blend_shapes: HashMap::new(),
        }
    }

    #[test]
    fn face_lost_yields_empty_output_and_no_extremum_update() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![def(
            "FaceAngleX",
            "HeadRotX",
            -30.0,
            30.0,
        )])));

        let mut lost = face_frame(15.0);
        lost.face_present = false;
        let out = engine.transform(&lost);
        assert!(!out.face_present);
        assert!(out.parameters.is_empty());
        assert!(engine.extremums.is_empty());
    }

    #[test]
    fn passthrough_scenario() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![def(
            "FaceAngleX",
            "HeadRotX",
            -30.0,
            30.0,
        )])));
        let out = engine.transform(&face_frame(15.2));
        assert_eq!(out.parameters, vec![("FaceAngleX".to_string(), 15.2, 1.0)]);
    }

    #[test]
    fn clamp_scenario() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![def(
            "FaceAngleX",
            "HeadRotX",
            -30.0,
            30.0,
        )])));
        let out = engine.transform(&face_frame(90.0));
        assert_eq!(out.parameters, vec![("FaceAngleX".to_string(), 30.0, 1.0)]);
    }

    #[test]
    fn two_level_dependency_scenario() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![
            def("A", "HeadRotX * 2", -60.0, 60.0),
            def("B", "A + 1", -100.0, 100.0),
        ])));
        let out = engine.transform(&face_frame(10.0));
        let a = out.parameters.iter().find(|(n, _, _)| n == "A").unwrap();
        let b = out.parameters.iter().find(|(n, _, _)| n == "B").unwrap();
        assert_eq!(a.1, 20.0);
        assert_eq!(b.1, 21.0);
    }

    #[test]
    fn unresolvable_cycle_is_omitted_without_panic() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![
            def("A", "B + 1", -1000.0, 1000.0),
            def("B", "A + 1", -1000.0, 1000.0),
        ])));
        let out = engine.transform(&face_frame(0.0));
        assert!(out.parameters.is_empty());
        assert_eq!(engine.active_ruleset().rules.len(), 2);
        assert_eq!(engine.stats().counter("failed_transformations"), 2);
    }

    #[test]
    fn ruleset_swap_resets_extremums() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![def(
            "RuleA",
            "HeadRotX",
            -100.0,
            100.0,
        )])));
        engine.transform(&face_frame(5.0));
        assert!(engine.extremums.contains_key("RuleA"));

        engine.load_rules(&StaticSource(report_from(vec![def(
            "RuleB",
            "HeadRotX",
            -100.0,
            100.0,
        )])));
        assert!(!engine.extremums.contains_key("RuleA"));
        assert!(!engine.extremums.contains_key("RuleB"));
    }

    #[test]
    fn hot_reload_successes_increments_exactly_once_per_load() {
        let mut engine = Engine::new(10);
        for _ in 0..3 {
            engine.load_rules(&StaticSource(report_from(vec![def(
                "RuleA",
                "HeadRotX",
                -100.0,
                100.0,
            )])));
        }
        assert_eq!(engine.stats().counter("hot_reload_successes"), 3);
    }

    #[test]
    fn parameter_definitions_reflect_active_ruleset() {
        let mut engine = Engine::new(10);
        engine.load_rules(&StaticSource(report_from(vec![def(
            "RuleA", "HeadRotX", -10.0, 10.0,
        )])));
        let defs = engine.parameter_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "RuleA");
        assert_eq!(defs[0].min, -10.0);
        assert_eq!(defs[0].max, 10.0);
    }
}
