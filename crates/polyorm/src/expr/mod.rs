//! Predicate and projection expressions.
//!
//! [`Expr`] is a closed tree: columns, literals, operators and function calls.
//! Trees are built with the helper constructors or parsed from the predicate
//! mini-language with [`Expr::parse`], then lowered to a
//! [`SqlFragment`](crate::fragment::SqlFragment) by [`ExprVisitor`].
//!
//! ```ignore
//! use polyorm::expr::{col, Expr};
//!
//! let a = col("age").gt(18).and(col("active").eq(true));
//! let b = Expr::parse("age > 18 && active == true")?;
//! assert_eq!(a, b);
//! ```

mod parse;
mod visitor;

pub use visitor::ExprVisitor;

use crate::error::OrmResult;
use crate::value::Value;
use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Short-circuit AND (`&&`, `and`): always logical.
    AndAlso,
    /// Short-circuit OR (`||`, `or`): always logical.
    OrElse,
    /// `&`: logical AND between predicates, bitwise AND otherwise.
    And,
    /// `|`: logical OR between predicates, bitwise OR otherwise.
    Or,
    /// `^`: exclusive or.
    ExclusiveOr,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Operator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Equal
                | Operator::NotEqual
                | Operator::LessThan
                | Operator::LessThanOrEqual
                | Operator::GreaterThan
                | Operator::GreaterThanOrEqual
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Subtract
                | Operator::Multiply
                | Operator::Divide
                | Operator::Modulo
        )
    }

    /// `&&`/`||` and the `&`/`|` pair that may be logical depending on operands.
    pub fn is_conjunction(&self) -> bool {
        matches!(
            self,
            Operator::AndAlso | Operator::OrElse | Operator::And | Operator::Or
        )
    }
}

/// Shared operator table; dialects override individual entries through
/// [`DialectProvider::bind_operand`](crate::dialect::DialectProvider::bind_operand).
pub fn default_operand(op: Operator, is_logical: bool) -> &'static str {
    match op {
        Operator::AndAlso => "AND",
        Operator::OrElse => "OR",
        Operator::And => {
            if is_logical {
                "AND"
            } else {
                "&"
            }
        }
        Operator::Or => {
            if is_logical {
                "OR"
            } else {
                "|"
            }
        }
        Operator::ExclusiveOr => "^",
        Operator::Equal => "=",
        Operator::NotEqual => "<>",
        Operator::LessThan => "<",
        Operator::LessThanOrEqual => "<=",
        Operator::GreaterThan => ">",
        Operator::GreaterThanOrEqual => ">=",
        Operator::Add => "+",
        Operator::Subtract => "-",
        Operator::Multiply => "*",
        Operator::Divide => "/",
        Operator::Modulo => "%",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
}

/// Reference to a model field, optionally qualified by table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// Member access on something other than the root model (`a.b.c`).
    Member {
        target: Box<Expr>,
        member: String,
    },
}

/// Column of the root model.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef {
        table: None,
        name: name.into(),
    })
}

/// Table-qualified column.
pub fn qcol(table: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef {
        table: Some(table.into()),
        name: name.into(),
    })
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::Call {
        name: name.into(),
        args,
    }
}

/// `COUNT(*)`
pub fn count_all() -> Expr {
    call("count", Vec::new())
}

macro_rules! aggregate_fns {
    ($($fn_name:ident => $sql:literal),* $(,)?) => {
        $(
            #[doc = concat!("`", $sql, "(expr)`")]
            pub fn $fn_name(expr: Expr) -> Expr {
                call(stringify!($fn_name), vec![expr])
            }
        )*
    };
}

aggregate_fns! {
    count => "COUNT",
    max => "MAX",
    min => "MIN",
    sum => "SUM",
    avg => "AVG",
}

impl Expr {
    /// Parse the predicate mini-language.
    pub fn parse(input: &str) -> OrmResult<Expr> {
        parse::parse_expr(input)
    }

    pub fn binary(op: Operator, left: Expr, right: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right.into()),
        }
    }

    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Equal, self, rhs)
    }

    pub fn ne(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::NotEqual, self, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::LessThan, self, rhs)
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::LessThanOrEqual, self, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::GreaterThan, self, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::GreaterThanOrEqual, self, rhs)
    }

    pub fn and(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::AndAlso, self, rhs)
    }

    pub fn or(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::OrElse, self, rhs)
    }

    pub fn xor(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::ExclusiveOr, self, rhs)
    }

    pub fn bit_and(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::And, self, rhs)
    }

    pub fn bit_or(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Or, self, rhs)
    }

    pub fn add(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Add, self, rhs)
    }

    pub fn sub(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Subtract, self, rhs)
    }

    pub fn mul(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Multiply, self, rhs)
    }

    pub fn div(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Divide, self, rhs)
    }

    pub fn rem(self, rhs: impl Into<Expr>) -> Expr {
        Expr::binary(Operator::Modulo, self, rhs)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOperator::Not,
            operand: Box::new(self),
        }
    }

    pub fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOperator::Negate,
            operand: Box::new(self),
        }
    }

    pub fn is_null(self) -> Expr {
        self.eq(Value::Null)
    }

    pub fn is_not_null(self) -> Expr {
        self.ne(Value::Null)
    }

    /// `self IN (values...)`; an empty list never matches.
    pub fn in_list<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        let mut args = vec![self];
        args.extend(values.into_iter().map(lit));
        call("in", args)
    }

    pub fn starts_with(self, prefix: &str) -> Expr {
        call("starts_with", vec![self, lit(prefix)])
    }

    pub fn ends_with(self, suffix: &str) -> Expr {
        call("ends_with", vec![self, lit(suffix)])
    }

    pub fn contains(self, needle: &str) -> Expr {
        call("contains", vec![self, lit(needle)])
    }

    pub fn upper(self) -> Expr {
        call("upper", vec![self])
    }

    pub fn lower(self) -> Expr {
        call("lower", vec![self])
    }

    /// `date_part('<part>', self)` in the dialect's syntax.
    pub fn date_part(self, part: &str) -> Expr {
        call("date_part", vec![lit(part), self])
    }

    /// Node kind name used in [`OrmError::UnsupportedExpression`](crate::OrmError).
    pub fn kind_name(&self) -> String {
        match self {
            Expr::Column(_) => "column".to_string(),
            Expr::Literal(_) => "literal".to_string(),
            Expr::Binary { op, .. } => format!("binary {op:?}"),
            Expr::Unary { op, .. } => format!("unary {op:?}"),
            Expr::Call { name, .. } => format!("call {name}"),
            Expr::Member { member, .. } => format!("member access .{member}"),
        }
    }

    /// Whether the expression yields a boolean in SQL (comparison, conjunction, ...).
    pub(crate) fn is_predicate(&self) -> bool {
        match self {
            Expr::Binary { op, left, right } => match op {
                Operator::AndAlso | Operator::OrElse => true,
                Operator::And | Operator::Or => left.is_predicate() || right.is_predicate(),
                op => op.is_comparison(),
            },
            Expr::Unary {
                op: UnaryOperator::Not,
                operand,
            } => operand.is_predicate() || matches!(**operand, Expr::Column(_)),
            Expr::Call { name, .. } => matches!(
                name.to_ascii_lowercase().as_str(),
                "in" | "starts_with" | "ends_with" | "contains"
            ),
            Expr::Literal(Value::Bool(_)) => true,
            _ => false,
        }
    }
}

macro_rules! impl_literal_expr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Literal(Value::from(v))
                }
            }
        )*
    };
}

impl_literal_expr! {
    Value,
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    &str,
    String,
    rust_decimal::Decimal,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{t}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
