//! Composition objects: sub-objects flattened into prefixed parent columns.
//!
//! A composite value never gets its own table. At write time it is
//! decomposed into `prefix_field` columns on the owning record; at read
//! time it is recomposed from those columns. Both directions are pure and
//! round-trip exactly: `compose(decompose(x)) == x` for every valid `x`.
//!
//! Records call [`decompose_into`] from their `to_row` and [`compose_from`]
//! from their `load`, so the engine only ever sees flat columns.

use crate::error::{Error, Result};
use crate::value::Value;

/// A sub-object whose fields flatten into prefixed columns.
pub trait Composite: Sized {
    /// Composite field names, in declaration order. These combine with the
    /// owning record's prefix to form column names.
    const FIELDS: &'static [&'static str];

    /// Dump fields as `(field name, value)` pairs, unprefixed.
    fn decompose(&self) -> Vec<(&'static str, Value)>;

    /// Rebuild from unprefixed field values. `lookup` returns `None` for
    /// columns missing from the fetched row.
    fn compose(lookup: &dyn Fn(&str) -> Option<Value>) -> Result<Self>;
}

/// Column name for a composite field: `prefix_field`.
#[must_use]
pub fn prefixed_column(prefix: &str, field: &str) -> String {
    format!("{prefix}_{field}")
}

/// Decompose a composite into prefixed `(column, value)` pairs.
#[must_use]
pub fn decompose_into<C: Composite>(prefix: &str, composite: &C) -> Vec<(String, Value)> {
    composite
        .decompose()
        .into_iter()
        .map(|(field, value)| (prefixed_column(prefix, field), value))
        .collect()
}

/// Recompose a composite from prefixed columns.
///
/// `lookup` resolves a full column name (prefixed) to its fetched value;
/// the composite itself sees unprefixed field names.
pub fn compose_from<C: Composite>(
    prefix: &str,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<C> {
    let prefix = prefix.to_string();
    C::compose(&move |field| lookup(&prefixed_column(&prefix, field)))
}

/// Helper for `compose` implementations: a required field that must be
/// present and non-null.
pub fn required(lookup: &dyn Fn(&str) -> Option<Value>, field: &str) -> Result<Value> {
    match lookup(field) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(Error::mapping(
            field,
            0,
            "missing required composite field",
        )),
    }
}
