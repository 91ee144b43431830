use winnow::ascii::multispace0;
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

pub fn ws_skip(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

// ---------------------------------------------------------------------------
// Number literal
// ---------------------------------------------------------------------------

/// Parse a number literal: integer or float, optional leading `-` is handled
/// by the unary-minus grammar rule, not here.
pub fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let integer_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let has_dot = opt(literal(".")).parse_next(input)?.is_some();
    if has_dot {
        let frac_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        let s = format!("{integer_part}.{frac_part}");
        s.parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))
    } else {
        integer_part
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))
    }
}
