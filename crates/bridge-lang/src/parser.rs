//! Recursive-descent / precedence-climbing parser for rule expressions,
//! grounded in the same shape as a hand-written `winnow` DSL parser: one
//! function per precedence level, lowest binding first.

use winnow::combinator::{alt, cut_err, opt, separated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::literal;

use crate::ast::{BinOp, Expr};
use crate::parse_utils::{ident, number_literal, ws_skip};

pub(crate) fn parse_expr(input: &mut &str) -> ModalResult<Expr> {
    add_expr.parse_next(input)
}

/// `add_expr = mul_expr { ("+" | "-") mul_expr }`
fn add_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = mul_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((
            literal("+").value(BinOp::Add),
            literal("-").value(BinOp::Sub),
        )))
        .parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(mul_expr).parse_next(input)?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `mul_expr = unary_expr { ("*" | "/" | "%") unary_expr }`
fn mul_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = unary_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((
            literal("*").value(BinOp::Mul),
            literal("/").value(BinOp::Div),
            literal("%").value(BinOp::Mod),
        )))
        .parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(unary_expr).parse_next(input)?;
            left = Expr::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        } else {
            break;
        }
    }
    Ok(left)
}

/// `unary_expr = ["-"] primary`
fn unary_expr(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    if opt(literal("-")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        let inner = unary_expr.parse_next(input)?;
        Ok(Expr::Neg(Box::new(inner)))
    } else {
        primary.parse_next(input)
    }
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    alt((number_literal.map(Expr::Number), paren_expr, ident_primary))
        .context(StrContext::Expected(StrContextValue::Description(
            "expression",
        )))
        .parse_next(input)
}

fn paren_expr(input: &mut &str) -> ModalResult<Expr> {
    literal("(").parse_next(input)?;
    ws_skip.parse_next(input)?;
    let inner = cut_err(parse_expr).parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal(")")).parse_next(input)?;
    Ok(inner)
}

/// Ident-based primary: either a bare variable reference or a function call.
fn ident_primary(input: &mut &str) -> ModalResult<Expr> {
    let name = ident.parse_next(input)?;
    ws_skip.parse_next(input)?;
    if opt(literal("(")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        if opt(literal(")")).parse_next(input)?.is_some() {
            return Ok(Expr::FuncCall {
                name: name.to_string(),
                args: vec![],
            });
        }
        let args: Vec<Expr> =
            separated(1.., (ws_skip, parse_expr).map(|(_, e)| e), literal(","))
                .parse_next(input)?;
        ws_skip.parse_next(input)?;
        cut_err(literal(")")).parse_next(input)?;
        return Ok(Expr::FuncCall {
            name: name.to_string(),
            args,
        });
    }
    Ok(Expr::Var(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expr {
        let mut input = s;
        let e = parse_expr(&mut input).expect("parse failed");
        ws_skip(&mut input).unwrap();
        assert!(input.is_empty(), "leftover input: {input:?}");
        e
    }

    #[test]
    fn parses_literal() {
        assert_eq!(parse("42"), Expr::Number(42.0));
        assert_eq!(parse("3.5"), Expr::Number(3.5));
    }

    #[test]
    fn parses_var() {
        assert_eq!(parse("HeadRotX"), Expr::Var("HeadRotX".to_string()));
    }

    #[test]
    fn parses_precedence() {
        // 1 + 2 * 3 -> 1 + (2 * 3)
        let e = parse("1 + 2 * 3");
        match e {
            Expr::BinOp {
                op: BinOp::Add,
                left,
                right,
            } => {
                assert_eq!(*left, Expr::Number(1.0));
                match *right {
                    Expr::BinOp { op: BinOp::Mul, .. } => {}
                    other => panic!("expected Mul, got {other:?}"),
                }
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn parses_unary_neg() {
        assert_eq!(
            parse("-HeadRotX"),
            Expr::Neg(Box::new(Expr::Var("HeadRotX".to_string())))
        );
    }

    #[test]
    fn parses_func_call() {
        let e = parse("clamp(A + 1, 0, 1)");
        match e {
            Expr::FuncCall { name, args } => {
                assert_eq!(name, "clamp");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected FuncCall, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_parens() {
        assert_eq!(parse("(((5)))"), Expr::Number(5.0));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let mut input = "1 + 2 )";
        parse_expr(&mut input).unwrap();
        assert_eq!(input.trim(), ")");
    }
}
