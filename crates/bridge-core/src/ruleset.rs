use std::collections::HashSet;

use crate::rule::{
    InvalidRule, InvalidRuleKind, Interpolation, Rule, MAX_BEZIER_POINTS, MAX_NAME_LEN,
    MIN_BEZIER_POINTS, MIN_NAME_LEN,
};

/// A rule definition as read off disk, before compilation/validation.
/// Deliberately decoupled from the on-disk JSON shape so `bridge-rules`
/// owns the wire format and this crate owns validation semantics.
#[derive(Debug, Clone)]
pub struct RawRuleDef {
    pub name: String,
    pub expression_text: String,
    pub min: f64,
    pub max: f64,
    pub default_value: f64,
    pub interpolation: Option<RawInterpolation>,
}

#[derive(Debug, Clone)]
pub enum RawInterpolation {
    Linear,
    Bezier { control_points: Vec<(f64, f64)> },
}

/// The immutable collection of valid rules currently in effect, plus the
/// rejected candidates for reporting.
#[derive(Debug, Clone, Default)]
pub struct Ruleset {
    pub rules: Vec<Rule>,
    pub invalid_rules: Vec<InvalidRule>,
}

impl Ruleset {
    pub fn rule_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

/// Run the load pipeline (spec §4.A) over candidate rule definitions,
/// in order: name, expression, range, interpolation, uniqueness.
pub fn compile_ruleset(defs: Vec<RawRuleDef>) -> Ruleset {
    let mut rules = Vec::new();
    let mut invalid_rules = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for def in defs {
        match validate_one(&def, &seen_names) {
            Ok(rule) => {
                seen_names.insert(rule.name.clone());
                rules.push(rule);
            }
            Err(invalid) => invalid_rules.push(invalid),
        }
    }

    Ruleset {
        rules,
        invalid_rules,
    }
}

fn validate_one(def: &RawRuleDef, seen_names: &HashSet<String>) -> Result<Rule, InvalidRule> {
    let reject = |kind: InvalidRuleKind, error: String| InvalidRule {
        name: def.name.clone(),
        expression_text: def.expression_text.clone(),
        error,
        kind,
    };

    // 1. Name.
    let trimmed_name = def.name.trim();
    if trimmed_name.is_empty() {
        return Err(reject(InvalidRuleKind::NameEmpty, "name empty".to_string()));
    }
    let name_len = trimmed_name.chars().count();
    if name_len < MIN_NAME_LEN {
        return Err(reject(
            InvalidRuleKind::NameTooShort,
            "name too short".to_string(),
        ));
    }
    if name_len > MAX_NAME_LEN {
        return Err(reject(
            InvalidRuleKind::NameTooLong,
            "name too long".to_string(),
        ));
    }

    // 2. Expression text.
    let expr_text = def.expression_text.trim();
    if expr_text.is_empty() {
        return Err(reject(
            InvalidRuleKind::ExpressionError,
            "expression empty".to_string(),
        ));
    }
    let expression = bridge_lang::compile(expr_text)
        .map_err(|e| reject(InvalidRuleKind::ExpressionError, e.to_string()))?;

    // 3. Range.
    if def.min > def.max {
        return Err(reject(
            InvalidRuleKind::RangeInvalid,
            format!("min ({}) > max ({})", def.min, def.max),
        ));
    }

    // 4. Interpolation.
    let interpolation = match &def.interpolation {
        None => None,
        Some(RawInterpolation::Linear) => Some(Interpolation::Linear),
        Some(RawInterpolation::Bezier { control_points }) => {
            let n = control_points.len();
            if !(MIN_BEZIER_POINTS..=MAX_BEZIER_POINTS).contains(&n) {
                return Err(reject(
                    InvalidRuleKind::InterpolationInvalid,
                    format!("bezier control point count {n} out of [2,8]"),
                ));
            }
            if control_points
                .iter()
                .any(|(x, y)| !(0.0..=1.0).contains(x) || !(0.0..=1.0).contains(y))
            {
                return Err(reject(
                    InvalidRuleKind::InterpolationInvalid,
                    "bezier control point coordinate out of [0,1]".to_string(),
                ));
            }
            Some(Interpolation::Bezier {
                control_points: control_points.clone(),
            })
        }
    };

    // 5. Uniqueness.
    if seen_names.contains(trimmed_name) {
        return Err(reject(
            InvalidRuleKind::DuplicateName,
            format!("duplicate rule name {trimmed_name:?}"),
        ));
    }

    // Open question: default_value outside [min,max] is clamped, not rejected.
    let default_value = def.default_value.clamp(def.min, def.max);
    if default_value != def.default_value {
        tracing::warn!(
            domain = "engine",
            rule = trimmed_name,
            original = def.default_value,
            clamped = default_value,
            "default_value outside [min,max], clamped"
        );
    }

    Ok(Rule {
        name: trimmed_name.to_string(),
        expression_text: expr_text.to_string(),
        expression,
        min: def.min,
        max: def.max,
        default_value,
        interpolation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn name_boundaries() {
        // length 3 fails, 4 succeeds
        let rs = compile_ruleset(vec![def("abc", "1", 0.0, 1.0)]);
        assert_eq!(rs.rules.len(), 0);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::NameTooShort);

        let rs = compile_ruleset(vec![def("abcd", "1", 0.0, 1.0)]);
        assert_eq!(rs.rules.len(), 1);

        // length 33 fails, 32 succeeds
        let long33 = "a".repeat(33);
        let long32 = "a".repeat(32);
        let rs = compile_ruleset(vec![def(&long33, "1", 0.0, 1.0)]);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::NameTooLong);
        let rs = compile_ruleset(vec![def(&long32, "1", 0.0, 1.0)]);
        assert_eq!(rs.rules.len(), 1);
    }

    #[test]
    fn range_validation() {
        let rs = compile_ruleset(vec![def("EqualOk", "1", 5.0, 5.0)]);
        assert_eq!(rs.rules.len(), 1);

        let rs = compile_ruleset(vec![def("BadRange", "1", 5.0, 1.0)]);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::RangeInvalid);
    }

    #[test]
    fn bezier_point_count_boundaries() {
        let mk = |n: usize| RawRuleDef {
            interpolation: Some(RawInterpolation::Bezier {
                control_points: vec![(0.5, 0.5); n],
            }),
            ..def("BezierRule", "1", 0.0, 1.0)
        };
        let rs = compile_ruleset(vec![mk(1)]);
        assert_eq!(
            rs.invalid_rules[0].kind,
            InvalidRuleKind::InterpolationInvalid
        );
        let rs = compile_ruleset(vec![mk(2)]);
        assert_eq!(rs.rules.len(), 1);
        let rs = compile_ruleset(vec![mk(8)]);
        assert_eq!(rs.rules.len(), 1);
        let rs = compile_ruleset(vec![mk(9)]);
        assert_eq!(
            rs.invalid_rules[0].kind,
            InvalidRuleKind::InterpolationInvalid
        );
    }

    #[test]
    fn duplicate_name_rejected() {
        let rs = compile_ruleset(vec![
            def("DupName", "1", 0.0, 1.0),
            def("DupName", "2", 0.0, 1.0),
        ]);
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::DuplicateName);
    }

    #[test]
    fn duplicate_name_with_bad_range_reports_the_earlier_failure() {
        // min > max is step 3 of the pipeline; uniqueness is step 5, so the
        // earlier failure wins even though the name also collides.
        let rs = compile_ruleset(vec![
            def("DupName", "1", 0.0, 1.0),
            def("DupName", "2", 5.0, 1.0),
        ]);
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::RangeInvalid);
    }

    #[test]
    fn name_length_is_measured_in_characters_not_bytes() {
        // 20 multibyte characters, under the 32-character cap, but over it
        // in bytes (each 'é' is 2 bytes in UTF-8) — a byte-based length
        // check would wrongly reject this name as too long.
        let name: String = "é".repeat(20);
        assert!(name.len() > MAX_NAME_LEN);
        assert_eq!(name.chars().count(), 20);

        let rs = compile_ruleset(vec![def(&name, "1", 0.0, 1.0)]);
        assert_eq!(rs.rules.len(), 1);
    }

    #[test]
    fn default_value_outside_range_is_clamped_not_rejected() {
        let mut d = def("ClampDefault", "1", 0.0, 10.0);
        d.default_value = 99.0;
        let rs = compile_ruleset(vec![d]);
        assert_eq!(rs.rules.len(), 1);
        assert_eq!(rs.rules[0].default_value, 10.0);
    }

    #[test]
    fn expression_compile_error_is_invalid() {
        let rs = compile_ruleset(vec![def("BadExpr", "1 +", 0.0, 1.0)]);
        assert_eq!(rs.invalid_rules[0].kind, InvalidRuleKind::ExpressionError);
    }
}
