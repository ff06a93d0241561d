//! Search expressions and WHERE-clause compilation.
//!
//! A search is an ordered list of predicate expressions. Compilation walks
//! the list left to right, emitting `<column> <operator> ?` fragments
//! joined by each expression's trailing connective.
//!
//! # Evaluation order is a contract
//!
//! There is **no** operator-precedence inference and no parenthesization:
//! `a = ? OR b = ? AND c = ?` means whatever the database's left-to-right
//! clause concatenation makes of it, mirroring direct query-string
//! construction. Callers that need grouping must order their expressions
//! accordingly. This is deliberate and documented behavior, not a bug to
//! fix.

use rowbind_core::Value;
use serde::{Deserialize, Serialize};

/// Predicate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// String containment, rendered as `LIKE ?` with a `%value%` parameter.
    Contains,
}

impl SearchOp {
    /// SQL rendering of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            SearchOp::Eq => "=",
            SearchOp::Ne => "<>",
            SearchOp::Lt => "<",
            SearchOp::Le => "<=",
            SearchOp::Gt => ">",
            SearchOp::Ge => ">=",
            SearchOp::Contains => "LIKE",
        }
    }
}

/// Boolean connective joining an expression with the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    /// `AND` (the default).
    #[default]
    And,
    /// `OR`
    Or,
}

impl Connective {
    /// SQL rendering of the connective.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// One predicate clause: column, operator, value, and the connective to the
/// *next* expression. The final expression's connective is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchExpr {
    /// Column the predicate applies to.
    pub column: String,
    /// Comparison operator.
    pub op: SearchOp,
    /// Bound comparison value.
    pub value: Value,
    /// Connective to the next expression.
    pub connective: Connective,
}

impl SearchExpr {
    /// Create an expression with the default `AND` connective.
    pub fn new(column: impl Into<String>, op: SearchOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
            connective: Connective::And,
        }
    }

    /// Set the connective to the next expression.
    #[must_use]
    pub fn connective(mut self, connective: Connective) -> Self {
        self.connective = connective;
        self
    }

    /// Shorthand for `OR` to the next expression.
    #[must_use]
    pub fn or(self) -> Self {
        self.connective(Connective::Or)
    }
}

/// Compile an expression list into a WHERE fragment and its bound values.
///
/// An empty list yields an empty fragment (no WHERE clause; all rows are
/// visible to the pagination stage). The fragment does not include the
/// `WHERE` keyword.
#[must_use]
pub fn compile(expressions: &[SearchExpr]) -> (String, Vec<Value>) {
    let mut sql = String::new();
    let mut params = Vec::with_capacity(expressions.len());

    for (i, expr) in expressions.iter().enumerate() {
        if i > 0 {
            // The connective belongs to the *previous* expression.
            sql.push(' ');
            sql.push_str(expressions[i - 1].connective.as_sql());
            sql.push(' ');
        }
        sql.push_str(&expr.column);
        sql.push(' ');
        sql.push_str(expr.op.as_sql());
        sql.push_str(" ?");

        let param = match expr.op {
            SearchOp::Contains => {
                let needle = match &expr.value {
                    Value::Text(s) => s.clone(),
                    other => other.to_string(),
                };
                Value::Text(format!("%{needle}%"))
            }
            _ => expr.value.clone(),
        };
        params.push(param);
    }

    (sql, params)
}
