use bridge_core::{RawInterpolation, RawRuleDef};
use serde::Deserialize;

/// Mirrors the on-disk Ruleset file's JSON shape (spec §6): a rule object
/// with `name`, `func`, `min`, `max`, `defaultValue`, and an optional
/// `interpolation`. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct RuleDoc {
    name: String,
    func: String,
    min: f64,
    max: f64,
    #[serde(rename = "defaultValue")]
    default_value: f64,
    #[serde(default)]
    interpolation: Option<InterpolationDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum InterpolationDoc {
    LinearInterpolation,
    BezierInterpolation {
        #[serde(rename = "controlPoints")]
        control_points: Vec<f64>,
    },
}

/// Parse a Ruleset file's JSON array into [`RawRuleDef`]s. A top-level
/// parse failure (not valid JSON, not an array) is the only thing this
/// function reports as an error — per-rule problems are caught later by
/// `bridge_core::compile_ruleset`.
pub fn parse_ruleset_document(json: &str) -> anyhow::Result<Vec<RawRuleDef>> {
    let docs: Vec<RuleDoc> = serde_json::from_str(json)?;
    Ok(docs.into_iter().map(RuleDoc::into_raw_rule_def).collect())
}

impl RuleDoc {
    fn into_raw_rule_def(self) -> RawRuleDef {
        let interpolation = self.interpolation.map(|i| match i {
            InterpolationDoc::LinearInterpolation => RawInterpolation::Linear,
            InterpolationDoc::BezierInterpolation { control_points } => {
                RawInterpolation::Bezier {
                    control_points: control_points
                        .chunks(2)
                        .filter(|c| c.len() == 2)
                        .map(|c| (c[0], c[1]))
                        .collect(),
                }
            }
        });

        RawRuleDef {
            name: self.name,
            expression_text: self.func,
            min: self.min,
            max: self.max,
            default_value: self.default_value,
            interpolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_rule() {
        let json = r#"[
            {"name":"FaceAngleX","func":"HeadRotX","min":-30,"max":30,"defaultValue":0,"interpolation":{"type":"LinearInterpolation"}}
        ]"#;
        let defs = parse_ruleset_document(json).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "FaceAngleX");
        assert_eq!(defs[0].expression_text, "HeadRotX");
        assert!(matches!(
            defs[0].interpolation,
            Some(RawInterpolation::Linear)
        ));
    }

    #[test]
    fn parses_bezier_control_points() {
        let json = r#"[
            {"name":"BezierRule","func":"HeadRotX","min":0,"max":1,"defaultValue":0,
             "interpolation":{"type":"BezierInterpolation","controlPoints":[0,0,0.5,0.8,1,1]}}
        ]"#;
        let defs = parse_ruleset_document(json).unwrap();
        match defs[0].interpolation.as_ref().unwrap() {
            RawInterpolation::Bezier { control_points } => {
                assert_eq!(control_points, &vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)]);
            }
            other => panic!("expected Bezier, got {other:?}"),
        }
    }

    #[test]
    fn rule_without_interpolation_is_none() {
        let json = r#"[{"name":"Plain","func":"HeadRotX","min":0,"max":1,"defaultValue":0}]"#;
        let defs = parse_ruleset_document(json).unwrap();
        assert!(defs[0].interpolation.is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = r#"[{"name":"Plain","func":"HeadRotX","min":0,"max":1,"defaultValue":0,"futureKey":"ignored"}]"#;
        assert!(parse_ruleset_document(json).is_ok());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(parse_ruleset_document("not json").is_err());
        assert!(parse_ruleset_document("{}").is_err());
    }
}
