//! Compiler and evaluator for the arithmetic rule-expression language used
//! by transformation rules: parse once at load time, evaluate once per
//! frame per rule.

mod ast;
mod eval;
mod parse_utils;
mod parser;

pub use ast::{BinOp, Expr};
pub use eval::{eval, free_vars, Env, EvalError};

use std::collections::HashSet;
use std::fmt;

use winnow::error::ErrMode;
use winnow::Parser;

/// A rule expression that has been parsed and is ready to be evaluated
/// once per frame. Keeps the original source around for error messages
/// and for the Rules Repository's on-disk change detection.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    pub source: String,
    pub ast: Expr,
    pub free_vars: Vec<String>,
}

impl CompiledExpression {
    pub fn eval(&self, env: &dyn Env) -> Result<f64, EvalError> {
        eval(&self.ast, env)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub source: String,
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse expression {:?}: {}", self.source, self.message)
    }
}

impl std::error::Error for CompileError {}

/// Parse `source` into a [`CompiledExpression`]. The entire input must be
/// consumed; trailing garbage after a syntactically valid expression is
/// rejected here rather than silently ignored.
pub fn compile(source: &str) -> Result<CompiledExpression, CompileError> {
    let mut input = source;
    let ast = parser::parse_expr(&mut input).map_err(|e| CompileError {
        source: source.to_string(),
        message: describe_parse_error(e),
    })?;
    parse_utils::ws_skip(&mut input).map_err(|e| CompileError {
        source: source.to_string(),
        message: describe_parse_error(e),
    })?;
    if !input.is_empty() {
        return Err(CompileError {
            source: source.to_string(),
            message: format!("unexpected trailing input: {input:?}"),
        });
    }

    let mut vars = HashSet::new();
    free_vars(&ast, &mut vars);
    let mut free_vars: Vec<String> = vars.into_iter().collect();
    free_vars.sort();

    Ok(CompiledExpression {
        source: source.to_string(),
        ast,
        free_vars,
    })
}

fn describe_parse_error(e: ErrMode<winnow::error::ContextError>) -> String {
    match e {
        ErrMode::Incomplete(_) => "incomplete input".to_string(),
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => {
            let rendered = ctx.to_string();
            if rendered.is_empty() {
                "invalid syntax".to_string()
            } else {
                rendered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_valid_expression() {
        let c = compile("HeadRotX * 2 + 1").unwrap();
        assert_eq!(c.free_vars, vec!["HeadRotX".to_string()]);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = compile("1 + 2 )").unwrap_err();
        assert!(err.message.contains("trailing"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(compile("").is_err());
    }

    #[test]
    fn rejects_unclosed_paren() {
        assert!(compile("(1 + 2").is_err());
    }

    #[test]
    fn dependency_free_vars_dedups_and_sorts() {
        let c = compile("A + A + B").unwrap();
        assert_eq!(c.free_vars, vec!["A".to_string(), "B".to_string()]);
    }
}
