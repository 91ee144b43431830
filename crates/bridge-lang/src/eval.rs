use std::collections::HashSet;

use crate::ast::{BinOp, Expr};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A variable referenced by the expression had no binding in the
    /// environment. The engine treats this the same as any other
    /// evaluation failure (spec §9: "duck-typed rule evaluation").
    #[error("unbound variable: {0}")]
    MissingVariable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function {name} expects {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("evaluation produced a non-finite value")]
    NonFinite,
}

/// A read-only variable environment: frame scalars, blend-shape keys, and
/// already-resolved rule outputs, looked up by name.
pub trait Env {
    fn get(&self, name: &str) -> Option<f64>;
}

impl<F: Fn(&str) -> Option<f64>> Env for F {
    fn get(&self, name: &str) -> Option<f64> {
        self(name)
    }
}

/// Evaluate `expr` against `env`. Never panics; every failure mode is a
/// typed [`EvalError`].
pub fn eval(expr: &Expr, env: &dyn Env) -> Result<f64, EvalError> {
    let v = eval_inner(expr, env)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(EvalError::NonFinite)
    }
}

fn eval_inner(expr: &Expr, env: &dyn Env) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Var(name) => env
            .get(name)
            .ok_or_else(|| EvalError::MissingVariable(name.clone())),
        Expr::Neg(inner) => Ok(-eval_inner(inner, env)?),
        Expr::BinOp { op, left, right } => {
            let l = eval_inner(left, env)?;
            let r = eval_inner(right, env)?;
            apply_binop(*op, l, r)
        }
        Expr::FuncCall { name, args } => {
            let mut vals = Vec::with_capacity(args.len());
            for a in args {
                vals.push(eval_inner(a, env)?);
            }
            apply_func(name, &vals)
        }
    }
}

fn apply_binop(op: BinOp, l: f64, r: f64) -> Result<f64, EvalError> {
    match op {
        BinOp::Add => Ok(l + r),
        BinOp::Sub => Ok(l - r),
        BinOp::Mul => Ok(l * r),
        BinOp::Div => {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(l / r)
            }
        }
        BinOp::Mod => {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(l % r)
            }
        }
    }
}

fn apply_func(name: &str, args: &[f64]) -> Result<f64, EvalError> {
    fn arity(name: &str, args: &[f64], expected: usize) -> Result<(), EvalError> {
        if args.len() != expected {
            Err(EvalError::WrongArity {
                name: name.to_string(),
                expected,
                got: args.len(),
            })
        } else {
            Ok(())
        }
    }

    match name {
        "abs" => {
            arity(name, args, 1)?;
            Ok(args[0].abs())
        }
        "sqrt" => {
            arity(name, args, 1)?;
            Ok(args[0].sqrt())
        }
        "sin" => {
            arity(name, args, 1)?;
            Ok(args[0].sin())
        }
        "cos" => {
            arity(name, args, 1)?;
            Ok(args[0].cos())
        }
        "tan" => {
            arity(name, args, 1)?;
            Ok(args[0].tan())
        }
        "min" => {
            arity(name, args, 2)?;
            Ok(args[0].min(args[1]))
        }
        "max" => {
            arity(name, args, 2)?;
            Ok(args[0].max(args[1]))
        }
        "clamp" => {
            arity(name, args, 3)?;
            let (v, lo, hi) = (args[0], args[1], args[2]);
            Ok(v.max(lo).min(hi))
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

/// Collect the set of free variables referenced by `expr` (function names
/// are not variables).
pub fn free_vars(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Var(name) => {
            out.insert(name.clone());
        }
        Expr::Neg(inner) => free_vars(inner, out),
        Expr::BinOp { left, right, .. } => {
            free_vars(left, out);
            free_vars(right, out);
        }
        Expr::FuncCall { args, .. } => {
            for a in args {
                free_vars(a, out);
            }
        }
    }
}
