use bridge_lang::CompiledExpression;

/// The mapping from a rule's clamped input to its clamped output.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolation {
    Linear,
    /// Piecewise-cubic Bezier over `control_points`, each coordinate in
    /// `[0,1]`. `2..=8` points.
    Bezier { control_points: Vec<(f64, f64)> },
}

/// A named, compiled expression that computes one output parameter from
/// frame variables and previously-computed rule outputs. Immutable after
/// compilation.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub expression_text: String,
    pub expression: CompiledExpression,
    pub min: f64,
    pub max: f64,
    pub default_value: f64,
    pub interpolation: Option<Interpolation>,
}

impl Rule {
    /// Free variables that are not the name of any rule in `rule_names`
    /// are frame scalars/blend-shapes; the rest are same-ruleset
    /// dependencies this rule must wait on.
    pub fn rule_dependencies<'a>(&'a self, rule_names: &'a [String]) -> Vec<&'a str> {
        self.expression
            .free_vars
            .iter()
            .map(String::as_str)
            .filter(|v| rule_names.iter().any(|n| n == v))
            .collect()
    }
}

/// Why a candidate rule definition was rejected during load.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidRuleKind {
    NameEmpty,
    NameTooShort,
    NameTooLong,
    ExpressionError,
    RangeInvalid,
    InterpolationInvalid,
    DuplicateName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRule {
    pub name: String,
    pub expression_text: String,
    pub error: String,
    pub kind: InvalidRuleKind,
}

pub const MIN_NAME_LEN: usize = 4;
pub const MAX_NAME_LEN: usize = 32;
pub const MIN_BEZIER_POINTS: usize = 2;
pub const MAX_BEZIER_POINTS: usize = 8;
