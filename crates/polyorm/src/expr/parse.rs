//! Predicate mini-language.
//!
//! Precedence, lowest first:
//! - `||` `or`
//! - `&&` `and`
//! - `|`
//! - `^`
//! - `&`
//! - `==` `=` `!=` `<>` `<` `<=` `>` `>=` (non-associative)
//! - `+` `-`
//! - `*` `/` `%`
//! - unary `!` `not` `-`
//!
//! Primaries are literals (`42`, `1.5`, `'it''s'`, `true`, `false`, `null`),
//! columns (`age`, `o.total`), calls (`upper(name)`) and parenthesized expressions.

use super::{ColumnRef, Expr, Operator, UnaryOperator};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, none_of, satisfy},
    combinator::{map, not, opt, recognize, value},
    multi::{fold_many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

pub(super) fn parse_expr(input: &str) -> OrmResult<Expr> {
    match parse_or(input) {
        Ok((rest, expr)) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                Ok(expr)
            } else {
                Err(OrmError::validation(format!(
                    "Unexpected input in predicate at '{rest}'"
                )))
            }
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(OrmError::validation(format!(
            "Invalid predicate at '{}'",
            e.input
        ))),
        Err(nom::Err::Incomplete(_)) => Err(OrmError::validation("Incomplete predicate")),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive keyword that is not the prefix of a longer identifier.
fn keyword<'a>(kw: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag_no_case(kw), not(satisfy(is_ident_char)))
}

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    preceded(multispace0, inner)
}

/// Left-associative chain: `operand (op operand)*`.
fn parse_binary_chain<'a, F, O>(input: &'a str, parse_operand: F, mut parse_op: O) -> IResult<&'a str, Expr>
where
    F: Fn(&'a str) -> IResult<&'a str, Expr>,
    O: Parser<&'a str, Output = Operator, Error = nom::error::Error<&'a str>>,
{
    let (mut input, mut left) = parse_operand(input)?;
    loop {
        let (remaining, _) = multispace0(input)?;
        match parse_op.parse(remaining) {
            Ok((after_op, op)) => {
                let (after_right, right) = ws(&parse_operand).parse(after_op)?;
                left = Expr::binary(op, left, right);
                input = after_right;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, left))
}

fn parse_or(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_and,
        value(Operator::OrElse, alt((tag("||"), keyword("or")))),
    )
}

fn parse_and(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_bit_or,
        value(Operator::AndAlso, alt((tag("&&"), keyword("and")))),
    )
}

fn parse_bit_or(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_xor,
        value(Operator::Or, terminated(tag("|"), not(char('|')))),
    )
}

fn parse_xor(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(input, parse_bit_and, value(Operator::ExclusiveOr, tag("^")))
}

fn parse_bit_and(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_comparison,
        value(Operator::And, terminated(tag("&"), not(char('&')))),
    )
}

fn comparison_op(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Equal, tag("==")),
        value(Operator::NotEqual, tag("!=")),
        value(Operator::NotEqual, tag("<>")),
        value(Operator::LessThanOrEqual, tag("<=")),
        value(Operator::GreaterThanOrEqual, tag(">=")),
        value(Operator::Equal, tag("=")),
        value(Operator::LessThan, tag("<")),
        value(Operator::GreaterThan, tag(">")),
    ))
    .parse(input)
}

fn parse_comparison(input: &str) -> IResult<&str, Expr> {
    let (input, left) = parse_additive(input)?;
    let (input, rhs) = opt(pair(ws(comparison_op), ws(parse_additive))).parse(input)?;
    match rhs {
        Some((op, right)) => Ok((input, Expr::binary(op, left, right))),
        None => Ok((input, left)),
    }
}

fn parse_additive(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_multiplicative,
        alt((
            value(Operator::Add, tag("+")),
            value(Operator::Subtract, tag("-")),
        )),
    )
}

fn parse_multiplicative(input: &str) -> IResult<&str, Expr> {
    parse_binary_chain(
        input,
        parse_unary,
        alt((
            value(Operator::Multiply, tag("*")),
            value(Operator::Divide, tag("/")),
            value(Operator::Modulo, tag("%")),
        )),
    )
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        map(
            preceded(alt((terminated(tag("!"), not(char('='))), keyword("not"))), parse_unary),
            |e| Expr::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(e),
            },
        ),
        map(preceded(char('-'), parse_unary), negate),
        parse_primary,
    ))
    .parse(input)
}

/// Fold `-<number>` into the literal.
fn negate(e: Expr) -> Expr {
    match e {
        Expr::Literal(Value::I64(v)) => Expr::Literal(Value::I64(-v)),
        Expr::Literal(Value::F64(v)) => Expr::Literal(Value::F64(-v)),
        other => other.neg(),
    }
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((
        delimited(char('('), parse_or, ws(char(')'))),
        map(parse_literal, Expr::Literal),
        parse_call_or_column,
    ))
    .parse(input)
}

fn parse_literal(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        value(Value::Null, keyword("null")),
        map(parse_string, Value::String),
        parse_number,
    ))
    .parse(input)
}

/// Single-quoted string, `''` escapes a quote.
fn parse_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((value('\'', tag("''")), none_of("'"))),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        char('\''),
    )
    .parse(input)
}

fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, text) =
        terminated(recognize(pair(digit1, opt(pair(char('.'), digit1)))), not(satisfy(is_ident_start)))
            .parse(input)?;
    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().map(Value::F64)
    } else {
        text.parse::<i64>().ok().map(Value::I64)
    };
    match parsed {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))).parse(input)
}

fn parse_call_or_column(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_ident(input)?;

    let (after_args, args) = opt(delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), ws(parse_or)),
        ws(char(')')),
    ))
    .parse(input)?;
    if let Some(args) = args {
        return Ok((
            after_args,
            Expr::Call {
                name: first.to_string(),
                args,
            },
        ));
    }

    let (input, rest) = fold_many0(
        preceded(char('.'), parse_ident),
        Vec::new,
        |mut acc: Vec<&str>, part| {
            acc.push(part);
            acc
        },
    )
    .parse(input)?;

    let mut parts = rest.into_iter();
    let expr = match parts.next() {
        None => Expr::Column(ColumnRef {
            table: None,
            name: first.to_string(),
        }),
        Some(second) => {
            let mut e = Expr::Column(ColumnRef {
                table: Some(first.to_string()),
                name: second.to_string(),
            });
            for member in parts {
                e = Expr::Member {
                    target: Box::new(e),
                    member: member.to_string(),
                };
            }
            e
        }
    };
    Ok((input, expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{call, col, lit, qcol};

    fn p(s: &str) -> Expr {
        parse_expr(s).unwrap()
    }

    #[test]
    fn comparison_and_conjunction() {
        assert_eq!(
            p("age > 18 && active == true"),
            col("age").gt(18i64).and(col("active").eq(true))
        );
        assert_eq!(
            p("age > 18 and active = true"),
            col("age").gt(18i64).and(col("active").eq(true))
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            p("a == 1 || b == 2 && c == 3"),
            col("a").eq(1i64).or(col("b").eq(2i64).and(col("c").eq(3i64)))
        );
    }

    #[test]
    fn arithmetic_precedence_and_parens() {
        assert_eq!(p("a + b * 2"), col("a").add(col("b").mul(2i64)));
        assert_eq!(p("(a + b) * 2"), col("a").add(col("b")).mul(2i64));
        assert_eq!(p("a - b - c"), col("a").sub(col("b")).sub(col("c")));
    }

    #[test]
    fn bitwise_operators_sit_above_comparison() {
        assert_eq!(
            p("a == 1 ^ b == 2"),
            col("a").eq(1i64).xor(col("b").eq(2i64))
        );
        assert_eq!(p("flags & 4 != 0"), col("flags").bit_and(lit(4i64).ne(0i64)));
    }

    #[test]
    fn literals() {
        assert_eq!(p("name == 'it''s'"), col("name").eq("it's"));
        assert_eq!(p("x == 1.5"), col("x").eq(1.5f64));
        assert_eq!(p("x == -3"), col("x").eq(-3i64));
        assert_eq!(p("x == null"), col("x").eq(Value::Null));
        assert_eq!(p("trueish == true"), col("trueish").eq(true));
    }

    #[test]
    fn not_and_keywords() {
        assert_eq!(p("!active"), col("active").not());
        assert_eq!(p("not (a < 1)"), col("a").lt(1i64).not());
        assert_eq!(p("notes != 'x'"), col("notes").ne("x"));
        assert_eq!(p("order_id == 1"), col("order_id").eq(1i64));
    }

    #[test]
    fn calls_and_qualified_columns() {
        assert_eq!(
            p("upper(name) == 'BOB'"),
            call("upper", vec![col("name")]).eq("BOB")
        );
        assert_eq!(p("count()"), call("count", vec![]));
        assert_eq!(p("o.total >= 10"), qcol("o", "total").ge(10i64));
        assert_eq!(
            p("in(id, 1, 2)"),
            call("in", vec![col("id"), lit(1i64), lit(2i64)])
        );
    }

    #[test]
    fn nested_member_access_is_kept_for_the_visitor() {
        assert!(matches!(p("a.b.c"), Expr::Member { ref member, .. } if member == "c"));
    }

    #[test]
    fn errors() {
        assert!(parse_expr("").is_err());
        assert!(parse_expr("a ==").is_err());
        assert!(parse_expr("a == 1 )").is_err());
        assert!(parse_expr("'unterminated").is_err());
        assert!(parse_expr("a < b < c").is_err());
    }
}
