//! Statement builders for the record operations.
//!
//! Every builder produces a [`Statement`]: SQL text with `?` placeholders
//! and the positionally bound values. Values are never interpolated into
//! the text — that is a correctness invariant of the whole workspace, not
//! an optimization. Identifiers (table and column names) come from
//! validated descriptors and are embedded verbatim.

use rowbind_core::descriptor::{ColumnInfo, Descriptor};
use rowbind_core::value::Value;

/// A built statement: parameterized SQL plus bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Values bound positionally to the placeholders.
    pub params: Vec<Value>,
}

impl Statement {
    /// Create a statement.
    #[must_use]
    pub fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }
}

fn value_for<'v>(pairs: &'v [(String, Value)], column: &str) -> Option<&'v Value> {
    pairs
        .iter()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value)
}

/// Build an INSERT.
///
/// The column list is the write-permitted columns that are not automatic
/// and carry an assigned (non-Null) value; DB-generated keys come back
/// through the connection's `insert`. With nothing assigned the statement
/// falls back to `DEFAULT VALUES`, which engines accept where an empty
/// column list is a syntax error.
#[must_use]
pub fn insert(descriptor: &Descriptor, pairs: &[(String, Value)], allowed: &[&ColumnInfo]) -> Statement {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for column in allowed {
        if column.automatic {
            continue;
        }
        match value_for(pairs, &column.column_name) {
            Some(value) if !value.is_null() => {
                columns.push(column.column_name.as_str());
                params.push(value.clone());
            }
            _ => {}
        }
    }

    if columns.is_empty() {
        return Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", descriptor.table()),
            params,
        );
    }

    let placeholders = vec!["?"; params.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        descriptor.table(),
        columns.join(", "),
        placeholders
    );
    Statement::new(sql, params)
}

/// Build an UPDATE by primary key.
///
/// The SET list is the write-permitted, assigned columns excluding the
/// primary key; the WHERE clause is primary-key equality.
#[must_use]
pub fn update(
    descriptor: &Descriptor,
    pairs: &[(String, Value)],
    allowed: &[&ColumnInfo],
    pk_value: Value,
) -> Statement {
    let pk = descriptor.primary_key().column_name.as_str();
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for column in allowed {
        if column.column_name == pk {
            continue;
        }
        match value_for(pairs, &column.column_name) {
            Some(value) if !value.is_null() => {
                assignments.push(format!("{} = ?", column.column_name));
                params.push(value.clone());
            }
            _ => {}
        }
    }
    params.push(pk_value);

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        descriptor.table(),
        assignments.join(", "),
        pk
    );
    Statement::new(sql, params)
}

/// Build a SELECT by primary key. At most one row is expected.
#[must_use]
pub fn select_by_key(descriptor: &Descriptor, select_list: &[String], pk_value: Value) -> Statement {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_list.join(", "),
        descriptor.table(),
        descriptor.primary_key().column_name
    );
    Statement::new(sql, vec![pk_value])
}

/// Build a SELECT by equality on a named column. Zero or more rows.
#[must_use]
pub fn select_by_column(
    descriptor: &Descriptor,
    select_list: &[String],
    column: &str,
    value: Value,
) -> Statement {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_list.join(", "),
        descriptor.table(),
        column
    );
    Statement::new(sql, vec![value])
}

/// Build a batched SELECT for a list of primary keys (`IN` list).
///
/// Used by foreign-key-list resolution. An empty key list produces a
/// statement matching nothing (`WHERE 1 = 0`); callers normally short-cut
/// before that.
#[must_use]
pub fn select_by_keys(descriptor: &Descriptor, select_list: &[String], keys: Vec<Value>) -> Statement {
    let table = descriptor.table();
    let columns = select_list.join(", ");
    if keys.is_empty() {
        return Statement::new(format!("SELECT {columns} FROM {table} WHERE 1 = 0"), Vec::new());
    }
    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        columns,
        table,
        descriptor.primary_key().column_name,
        placeholders
    );
    Statement::new(sql, keys)
}

/// Build a predicate search with pagination.
///
/// `where_fragment` comes from [`crate::search::compile`]; empty means no
/// WHERE clause. `limit == 0` means unpaged (no LIMIT/OFFSET emitted, and
/// `offset` is ignored). Offset and limit are typed integers and appear as
/// literals in the paging clause.
#[must_use]
pub fn search(
    descriptor: &Descriptor,
    select_list: &[String],
    where_fragment: &str,
    where_params: Vec<Value>,
    offset: u64,
    limit: u64,
) -> Statement {
    let mut sql = format!("SELECT {} FROM {}", select_list.join(", "), descriptor.table());
    if !where_fragment.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_fragment);
    }
    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
    }
    tracing::debug!(table = descriptor.table(), sql = %sql, "built search statement");
    Statement::new(sql, where_params)
}

/// Build a DELETE by primary key. Affects at most one row; zero is a
/// normal outcome.
#[must_use]
pub fn delete(descriptor: &Descriptor, pk_value: Value) -> Statement {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        descriptor.table(),
        descriptor.primary_key().column_name
    );
    Statement::new(sql, vec![pk_value])
}
