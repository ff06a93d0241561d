//! Result rows.

use crate::value::Value;

/// One fetched row: ordered column names with their values.
///
/// Column order matches the SELECT list of the statement that produced the
/// row. The execution engine narrows a `Row` to the caller's read-permitted
/// columns before handing it to a record's `load`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from parallel column/value lists.
    ///
    /// Both lists must have the same length.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Create an empty row.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a column/value pair.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Number of columns in this row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at a positional index.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Value for a named column, if present.
    #[must_use]
    pub fn get_named(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Replace the value of a named column, returning the old value.
    pub fn set_named(&mut self, column: &str, value: Value) -> Option<Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        Some(std::mem::replace(&mut self.values[idx], value))
    }

    /// Iterate `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Keep only the columns `keep` approves of, preserving order.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let mut values = std::mem::take(&mut self.values).into_iter();
        let mut kept_columns = Vec::with_capacity(self.columns.len());
        let mut kept_values = Vec::with_capacity(self.columns.len());
        for column in std::mem::take(&mut self.columns) {
            let value = values.next().unwrap_or(Value::Null);
            if keep(&column) {
                kept_columns.push(column);
                kept_values.push(value);
            }
        }
        self.columns = kept_columns;
        self.values = kept_values;
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut row = Row::empty();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}
