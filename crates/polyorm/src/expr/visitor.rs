//! Lowering of [`Expr`] trees into [`SqlFragment`]s.

use super::{ColumnRef, Expr, Operator, UnaryOperator};
use crate::dialect::DialectProvider;
use crate::error::{OrmError, OrmResult};
use crate::fragment::SqlFragment;
use crate::model::ModelDefinition;
use crate::value::Value;

/// Escape character used for `LIKE` patterns built from literals.
const LIKE_ESCAPE: char = '\\';

/// Walks an expression and emits SQL for one dialect.
///
/// Columns resolve against the optional model (field aliases, naming strategy) and are
/// quoted by the provider. Every literal becomes a placeholder, in left-to-right order.
pub struct ExprVisitor<'a> {
    provider: &'a dyn DialectProvider,
    model: Option<&'a ModelDefinition>,
}

/// Binding strength of a rendered node, used to decide on parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Or,
    And,
    /// `NOT x`; binds looser than comparisons and operators.
    Not,
    Comparison,
    Arithmetic(u8),
    Bitwise,
    Atom,
}

impl<'a> ExprVisitor<'a> {
    pub fn new(provider: &'a dyn DialectProvider, model: Option<&'a ModelDefinition>) -> Self {
        Self { provider, model }
    }

    /// Lower a boolean-valued expression (WHERE, HAVING, JOIN ON).
    pub fn predicate(&self, expr: &Expr) -> OrmResult<SqlFragment> {
        let fragment = self.visit_predicate(expr)?;
        tracing::trace!(
            target: "polyorm.render",
            params = fragment.param_count(),
            "compiled predicate"
        );
        Ok(fragment)
    }

    /// Lower a value-producing expression (projection, ORDER BY, SET right-hand side).
    pub fn scalar(&self, expr: &Expr) -> OrmResult<SqlFragment> {
        self.visit(expr)
    }

    /// Resolve and quote a column reference.
    pub fn column(&self, column: &ColumnRef) -> OrmResult<String> {
        let provider = self.provider;
        let naming = provider.naming();

        let targets_model = match (&column.table, self.model) {
            (None, Some(_)) => true,
            (Some(t), Some(def)) => *t == def.name || def.alias.as_deref() == Some(t.as_str()),
            (_, None) => false,
        };

        let physical = match self.model {
            Some(def) if targets_model => {
                let field = def.get_field(&column.name).ok_or_else(|| {
                    OrmError::validation(format!(
                        "Unknown field '{}' on model '{}'",
                        column.name, def.name
                    ))
                })?;
                match &field.alias {
                    Some(alias) => alias.clone(),
                    None => naming.column_name(&field.name),
                }
            }
            _ => naming.column_name(&column.name),
        };

        let quoted = provider.quote_identifier(&physical);
        Ok(match &column.table {
            Some(t) => {
                let table = match self.model {
                    Some(def) if targets_model => provider.model_table_name(def),
                    _ => naming.table_name(t),
                };
                format!("{}.{}", provider.quote_identifier(&table), quoted)
            }
            None => quoted,
        })
    }

    fn visit_predicate(&self, expr: &Expr) -> OrmResult<SqlFragment> {
        match expr {
            // A bare boolean column used as a condition.
            Expr::Column(c) => {
                let mut f = SqlFragment::text(self.column(c)?);
                f.push_str(" = ");
                f.push_param(true);
                Ok(f)
            }
            Expr::Literal(Value::Bool(b)) => Ok(SqlFragment::text(if *b { "1=1" } else { "1=0" })),
            other => self.visit(other),
        }
    }

    fn visit(&self, expr: &Expr) -> OrmResult<SqlFragment> {
        match expr {
            Expr::Column(c) => Ok(SqlFragment::text(self.column(c)?)),
            Expr::Literal(v) => Ok(SqlFragment::param(v.clone())),
            Expr::Binary { op, left, right } => self.visit_binary(*op, left, right),
            Expr::Unary { op, operand } => self.visit_unary(*op, operand),
            Expr::Call { name, args } => self.visit_call(name, args),
            Expr::Member { .. } => Err(OrmError::unsupported(expr.kind_name())),
        }
    }

    fn visit_binary(&self, op: Operator, left: &Expr, right: &Expr) -> OrmResult<SqlFragment> {
        let is_logical = match op {
            Operator::AndAlso | Operator::OrElse => true,
            Operator::And | Operator::Or => left.is_predicate() || right.is_predicate(),
            _ => false,
        };

        if op.is_comparison() {
            if let Some(f) = self.null_comparison(op, left, right)? {
                return Ok(f);
            }
        }

        let parent = classify_op(op, is_logical);
        let lhs = self.operand(left, parent, is_logical, false)?;
        let rhs = self.operand(right, parent, is_logical, true)?;

        let mut f = lhs;
        f.push_str(" ");
        f.push_str(self.provider.bind_operand(op, is_logical));
        f.push_str(" ");
        f.append(rhs);
        Ok(f)
    }

    fn operand(
        &self,
        expr: &Expr,
        parent: Class,
        is_logical: bool,
        right: bool,
    ) -> OrmResult<SqlFragment> {
        let fragment = if is_logical {
            self.visit_predicate(expr)?
        } else {
            self.visit(expr)?
        };
        let child = if is_logical && matches!(expr, Expr::Column(_)) {
            // rendered as `col = true`
            Class::Comparison
        } else {
            classify(expr)
        };
        if needs_parens(parent, child, right) {
            Ok(fragment.wrap_parens())
        } else {
            Ok(fragment)
        }
    }

    /// `x = NULL` / `x <> NULL` become `IS [NOT] NULL`.
    fn null_comparison(
        &self,
        op: Operator,
        left: &Expr,
        right: &Expr,
    ) -> OrmResult<Option<SqlFragment>> {
        let other = match (left, right) {
            (e, Expr::Literal(Value::Null)) | (Expr::Literal(Value::Null), e) => e,
            _ => return Ok(None),
        };
        let suffix = match op {
            Operator::Equal => " IS NULL",
            Operator::NotEqual => " IS NOT NULL",
            _ => return Ok(None),
        };
        let mut f = self.visit(other)?;
        if !matches!(classify(other), Class::Atom) {
            f = f.wrap_parens();
        }
        f.push_str(suffix);
        Ok(Some(f))
    }

    fn visit_unary(&self, op: UnaryOperator, operand: &Expr) -> OrmResult<SqlFragment> {
        match op {
            UnaryOperator::Not => {
                let mut f = SqlFragment::text("NOT ");
                f.append(self.visit_predicate(operand)?.wrap_parens());
                Ok(f)
            }
            UnaryOperator::Negate => {
                let inner = self.visit(operand)?;
                let mut f = SqlFragment::text("-");
                if matches!(classify(operand), Class::Atom) {
                    f.append(inner);
                } else {
                    f.append(inner.wrap_parens());
                }
                Ok(f)
            }
        }
    }

    fn visit_call(&self, name: &str, args: &[Expr]) -> OrmResult<SqlFragment> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "count" if args.is_empty() => Ok(SqlFragment::text("COUNT(*)")),
            "count" | "max" | "min" | "sum" | "avg" | "upper" | "lower" => {
                let [arg] = args else {
                    return Err(arity_error(name, "exactly one argument"));
                };
                self.function(&lower.to_ascii_uppercase(), std::slice::from_ref(arg))
            }
            "coalesce" => {
                if args.is_empty() {
                    return Err(arity_error(name, "at least one argument"));
                }
                self.function("COALESCE", args)
            }
            "in" => self.visit_in(name, args),
            "starts_with" | "ends_with" | "contains" => self.visit_like(&lower, args),
            "date_part" => {
                // The part name is inlined, so only bare words are accepted.
                let [Expr::Literal(Value::String(part)), Expr::Column(column)] = args else {
                    return Err(OrmError::unsupported(format!(
                        "call {name} (expected a literal part name and a column)"
                    )));
                };
                if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(OrmError::validation(format!("Invalid date part '{part}'")));
                }
                let quoted = self.column(column)?;
                Ok(SqlFragment::text(self.provider.date_part(part, &quoted)))
            }
            _ => Err(OrmError::unsupported(format!("call {name}"))),
        }
    }

    fn function(&self, sql_name: &str, args: &[Expr]) -> OrmResult<SqlFragment> {
        let rendered = args
            .iter()
            .map(|a| self.visit(a))
            .collect::<OrmResult<Vec<_>>>()?;
        let mut f = SqlFragment::text(sql_name);
        f.append(SqlFragment::join(rendered, ", ").wrap_parens());
        Ok(f)
    }

    fn visit_in(&self, name: &str, args: &[Expr]) -> OrmResult<SqlFragment> {
        let Some((target, values)) = args.split_first() else {
            return Err(arity_error(name, "a target expression"));
        };
        if values.is_empty() {
            return Ok(SqlFragment::text("1=0"));
        }
        let mut f = self.visit(target)?;
        if !matches!(classify(target), Class::Atom) {
            f = f.wrap_parens();
        }
        f.push_str(" IN ");
        let items = values
            .iter()
            .map(|v| self.visit(v))
            .collect::<OrmResult<Vec<_>>>()?;
        f.append(SqlFragment::join(items, ", ").wrap_parens());
        Ok(f)
    }

    fn visit_like(&self, kind: &str, args: &[Expr]) -> OrmResult<SqlFragment> {
        let [target, Expr::Literal(Value::String(needle))] = args else {
            return Err(OrmError::unsupported(format!(
                "call {kind} (pattern must be a string literal)"
            )));
        };
        let escaped = escape_like(needle);
        let pattern = match kind {
            "starts_with" => format!("{escaped}%"),
            "ends_with" => format!("%{escaped}"),
            _ => format!("%{escaped}%"),
        };
        let mut f = self.visit(target)?;
        f.push_str(" LIKE ");
        f.push_param(pattern);
        f.push_str(&format!(" ESCAPE '{LIKE_ESCAPE}'"));
        Ok(f)
    }
}

fn arity_error(name: &str, expected: &str) -> OrmError {
    OrmError::unsupported(format!("call {name} (expected {expected})"))
}

/// Escape `LIKE` metacharacters so the literal matches itself.
pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '[' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

fn classify_op(op: Operator, is_logical: bool) -> Class {
    match op {
        Operator::AndAlso => Class::And,
        Operator::OrElse => Class::Or,
        Operator::And if is_logical => Class::And,
        Operator::Or if is_logical => Class::Or,
        Operator::And | Operator::Or | Operator::ExclusiveOr => Class::Bitwise,
        Operator::Add | Operator::Subtract => Class::Arithmetic(1),
        Operator::Multiply | Operator::Divide | Operator::Modulo => Class::Arithmetic(2),
        _ => Class::Comparison,
    }
}

fn classify(expr: &Expr) -> Class {
    match expr {
        Expr::Binary { op, left, right } => {
            let is_logical = match op {
                Operator::AndAlso | Operator::OrElse => true,
                Operator::And | Operator::Or => left.is_predicate() || right.is_predicate(),
                _ => false,
            };
            classify_op(*op, is_logical)
        }
        Expr::Unary {
            op: UnaryOperator::Not,
            ..
        } => Class::Not,
        Expr::Call { name, .. } if name.eq_ignore_ascii_case("in") => Class::Comparison,
        Expr::Call { name, .. }
            if matches!(
                name.to_ascii_lowercase().as_str(),
                "starts_with" | "ends_with" | "contains"
            ) =>
        {
            Class::Comparison
        }
        _ => Class::Atom,
    }
}

fn needs_parens(parent: Class, child: Class, right: bool) -> bool {
    match (parent, child) {
        (_, Class::Atom) => false,
        (Class::And, Class::And) | (Class::Or, Class::Or) => false,
        (Class::And | Class::Or, Class::Comparison | Class::Not) => false,
        (Class::Comparison, Class::Arithmetic(_)) => false,
        (Class::Arithmetic(p), Class::Arithmetic(c)) => c < p || (c == p && right),
        _ => true,
    }
}
