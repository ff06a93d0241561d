//! Execution engine for rowbind.
//!
//! A [`Session`] borrows a connection provider and drives every record
//! operation: it resolves the cached descriptor, applies access-level
//! filtering, renders SQL through `rowbind-query`, executes it on a
//! per-operation scoped connection, and maps result rows back into record
//! instances.
//!
//! # Design Philosophy
//!
//! - **Stateless operations**: the session retains neither connections nor
//!   record references across calls; the descriptor cache is the only
//!   process-wide shared state.
//! - **Injected provider**: no global connection anywhere — the provider is
//!   a constructor argument.
//! - **Synchronous**: every operation blocks at the connection-acquisition
//!   and statement-execution boundary; the host supplies concurrency around
//!   individual operations. There is no built-in retry, timeout, or
//!   cancellation.
//!
//! # Example
//!
//! ```ignore
//! let session = Session::new(&provider);
//!
//! let mut user = User { name: "Alice".into(), ..User::default() };
//! session.insert(&mut user)?;
//!
//! let mut found = User { id: user.id, ..User::default() };
//! if session.select(&mut found, AccessLevel::new(2))? {
//!     session.deep_fetch(&mut found, AccessLevel::new(2), 2)?;
//! }
//! ```

pub mod fetch;

pub use fetch::{relation_many, relation_one};

use indexmap::IndexMap;
use rowbind_core::access::{AccessLevel, Intent, allows, permitted};
use rowbind_core::descriptor::Descriptor;
use rowbind_core::error::{AccessError, Error, IntegrityError, Result, ValidationError};
use rowbind_core::record::{Record, Visited};
use rowbind_core::validate::check_column;
use rowbind_core::{Connection, ConnectionProvider, Row, Value};
use rowbind_query::{builder, search::SearchExpr, search::compile};
use std::any::Any;

/// The record operation engine.
///
/// Cheap to construct; hold it for as long as the borrowed provider lives.
pub struct Session<'a> {
    provider: &'a dyn ConnectionProvider,
}

impl<'a> Session<'a> {
    /// Create a session over a connection provider.
    #[must_use]
    pub fn new(provider: &'a dyn ConnectionProvider) -> Self {
        Self { provider }
    }

    /// The provider this session acquires connections from.
    #[must_use]
    pub fn provider(&self) -> &'a dyn ConnectionProvider {
        self.provider
    }

    /// Insert a record.
    ///
    /// The column list is the assigned, non-automatic columns. When the
    /// primary key is automatic and the engine reports a generated key, the
    /// key is written back into the record. Returns the generated key, if
    /// any.
    pub fn insert<R: Record>(&self, record: &mut R) -> Result<Option<Value>> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let pairs = encode_pairs(&descriptor, record.to_row())?;
        let allowed = permitted(&descriptor, AccessLevel::ROOT, Intent::Write);
        validate_pairs(&pairs, &allowed)?;

        let stmt = builder::insert(&descriptor, &pairs, &allowed);
        tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "insert");
        let key = self.with_connection(&descriptor, |conn| conn.insert(&stmt.sql, &stmt.params))?;

        if let Some(key) = &key {
            let pk = descriptor.primary_key();
            if pk.automatic {
                let row = Row::new(vec![pk.column_name.clone()], vec![key.clone()]);
                record.load(&row)?;
            }
        }
        Ok(key)
    }

    /// Load a record by the primary key already assigned on the instance.
    ///
    /// Returns `false` when no row matches (not an error). More than one
    /// row for a primary key is a data-integrity failure.
    pub fn select<R: Record>(&self, record: &mut R, level: AccessLevel) -> Result<bool> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let pk_value = assigned_primary_key(&descriptor, record)?;
        let select_list = select_list(&descriptor, level);

        let stmt = builder::select_by_key(&descriptor, &select_list, pk_value);
        tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "select");
        let rows = self.with_connection(&descriptor, |conn| conn.query(&stmt.sql, &stmt.params))?;

        match rows.len() {
            0 => Ok(false),
            1 => {
                let row = prepare_row(&descriptor, level, 0, rows.into_iter().next().unwrap_or_default())?;
                record.load(&row)?;
                Ok(true)
            }
            n => Err(Error::Integrity(IntegrityError {
                table: descriptor.table().to_string(),
                rows: n,
            })),
        }
    }

    /// Fetch one record by primary-key value.
    ///
    /// Keyed variant of [`select`](Session::select), used by relationship
    /// resolution and useful on its own.
    pub fn get<R: Record>(&self, level: AccessLevel, pk_value: &Value) -> Result<Option<R>> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let select_list = select_list(&descriptor, level);

        let stmt = builder::select_by_key(&descriptor, &select_list, pk_value.clone());
        let rows = self.with_connection(&descriptor, |conn| conn.query(&stmt.sql, &stmt.params))?;

        match rows.len() {
            0 => Ok(None),
            1 => {
                let row = prepare_row(&descriptor, level, 0, rows.into_iter().next().unwrap_or_default())?;
                let mut record = R::default();
                record.load(&row)?;
                Ok(Some(record))
            }
            n => Err(Error::Integrity(IntegrityError {
                table: descriptor.table().to_string(),
                rows: n,
            })),
        }
    }

    /// Fetch all records matching equality on a named column.
    ///
    /// Results are keyed by primary-key value in result-set order.
    /// Selecting by a column above the caller's read level is an explicit
    /// exposure attempt and fails.
    pub fn select_by<R: Record>(
        &self,
        level: AccessLevel,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<IndexMap<Value, R>> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let info = descriptor.column(column).ok_or_else(|| {
            Error::configuration(descriptor.record(), format!("unknown column {column:?}"))
        })?;
        if !allows(info, level, Intent::Read) {
            return Err(Error::Access(AccessError {
                column: column.to_string(),
                requested: level,
                required: info.min_read_level,
            }));
        }

        let select_list = select_list(&descriptor, level);
        let stmt = builder::select_by_column(&descriptor, &select_list, column, value.into());
        tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "select_by");
        let rows = self.with_connection(&descriptor, |conn| conn.query(&stmt.sql, &stmt.params))?;
        self.map_rows(&descriptor, level, rows)
    }

    /// Update a record by primary key at the caller's write level.
    ///
    /// Columns the caller may not write are silently omitted from the SET
    /// list. Returns the affected-row count; zero means the key matched
    /// nothing (or nothing was writable) and is not an error.
    pub fn update<R: Record>(&self, record: &R, level: AccessLevel) -> Result<u64> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let pk_value = assigned_primary_key(&descriptor, record)?;
        let pairs = encode_pairs(&descriptor, record.to_row())?;
        let allowed = permitted(&descriptor, level, Intent::Write);
        validate_pairs(&pairs, &allowed)?;

        let pk_name = descriptor.primary_key().column_name.as_str();
        let assignable = allowed.iter().any(|c| {
            c.column_name != pk_name
                && pairs
                    .iter()
                    .any(|(name, v)| name == &c.column_name && !v.is_null())
        });
        if !assignable {
            return Ok(0);
        }

        let stmt = builder::update(&descriptor, &pairs, &allowed, pk_value);
        tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "update");
        self.with_connection(&descriptor, |conn| conn.execute(&stmt.sql, &stmt.params))
    }

    /// Delete a record by primary key.
    ///
    /// Affects at most one row; zero affected rows is a normal outcome.
    pub fn delete<R: Record>(&self, record: &R) -> Result<u64> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let pk_value = assigned_primary_key(&descriptor, record)?;
        let stmt = builder::delete(&descriptor, pk_value);
        tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "delete");
        self.with_connection(&descriptor, |conn| conn.execute(&stmt.sql, &stmt.params))
    }

    /// Predicate search with pagination.
    ///
    /// Expressions are compiled strictly left to right (see
    /// `rowbind_query::search`). `limit == 0` means unpaged. Every
    /// referenced column must exist and be readable at the caller's level.
    pub fn search<R: Record>(
        &self,
        level: AccessLevel,
        offset: u64,
        limit: u64,
        expressions: &[SearchExpr],
    ) -> Result<IndexMap<Value, R>> {
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        for expr in expressions {
            let info = descriptor.column(&expr.column).ok_or_else(|| {
                Error::configuration(
                    descriptor.record(),
                    format!("search references unknown column {:?}", expr.column),
                )
            })?;
            if !allows(info, level, Intent::Read) {
                return Err(Error::Access(AccessError {
                    column: expr.column.clone(),
                    requested: level,
                    required: info.min_read_level,
                }));
            }
        }

        let (fragment, params) = compile(expressions);
        let select_list = select_list(&descriptor, level);
        let stmt = builder::search(&descriptor, &select_list, &fragment, params, offset, limit);
        let rows = self.with_connection(&descriptor, |conn| conn.query(&stmt.sql, &stmt.params))?;
        self.map_rows(&descriptor, level, rows)
    }

    /// Resolve the record's relationships recursively, at most `max_depth`
    /// levels deep.
    ///
    /// The call itself is the explicit request, so every declared relation
    /// on `record` is resolved; below the first level only `always_fetch`
    /// relations are followed. Traversal is cycle-safe: a per-call visited
    /// set keyed by `(record type, primary key)` stops a branch that has
    /// already been walked, making partial fetch a normal outcome.
    /// `max_depth == 0` resolves nothing.
    pub fn deep_fetch<R: Record>(
        &self,
        record: &mut R,
        level: AccessLevel,
        max_depth: u32,
    ) -> Result<()> {
        if max_depth == 0 {
            return Ok(());
        }
        let descriptor = rowbind_core::descriptor_for::<R>()?;
        let mut visited = Visited::new();
        let pk_value = record.primary_key_value(&descriptor);
        if !pk_value.is_null() {
            visited.insert::<R>(&pk_value);
        }
        for relation in descriptor.relations() {
            (relation.resolve)(
                relation,
                self.provider,
                record as &mut dyn Any,
                level,
                max_depth,
                &mut visited,
            )?;
        }
        Ok(())
    }

    fn with_connection<T>(
        &self,
        descriptor: &Descriptor,
        op: impl FnOnce(&mut dyn Connection) -> Result<T>,
    ) -> Result<T> {
        // Scoped acquisition: the connection drops on every exit path.
        let mut conn = self.provider.connection(descriptor.database())?;
        op(conn.as_mut())
    }

    fn map_rows<R: Record>(
        &self,
        descriptor: &Descriptor,
        level: AccessLevel,
        rows: Vec<Row>,
    ) -> Result<IndexMap<Value, R>> {
        let pk_name = descriptor.primary_key().column_name.clone();
        let mut out = IndexMap::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let pk_value = row.get_named(&pk_name).cloned().unwrap_or(Value::Null);
            let row = prepare_row(descriptor, level, index, row)?;
            let mut record = R::default();
            record.load(&row)?;
            out.insert(pk_value, record);
        }
        Ok(out)
    }
}

/// SELECT list for a read at `level`: the readable columns, with the
/// primary key prepended when the level may not read it (it is still
/// needed for WHERE clauses and result keying, and gets stripped from the
/// exposed fields afterwards).
pub(crate) fn select_list(descriptor: &Descriptor, level: AccessLevel) -> Vec<String> {
    let readable = permitted(descriptor, level, Intent::Read);
    let pk = &descriptor.primary_key().column_name;
    let mut list: Vec<String> = Vec::with_capacity(readable.len() + 1);
    if !readable.iter().any(|c| &c.column_name == pk) {
        list.push(pk.clone());
    }
    list.extend(readable.iter().map(|c| c.column_name.clone()));
    list
}

/// Narrow a fetched row to the read-permitted columns and decode JSON
/// columns. `index` is the row's position in its result set, reported on
/// mapping failures.
pub(crate) fn prepare_row(
    descriptor: &Descriptor,
    level: AccessLevel,
    index: usize,
    mut row: Row,
) -> Result<Row> {
    row.retain_columns(|name| {
        descriptor
            .column(name)
            .is_some_and(|c| allows(c, level, Intent::Read))
    });

    for column in descriptor.columns() {
        if !column.json {
            continue;
        }
        let Some(value) = row.get_named(&column.column_name) else {
            continue;
        };
        if let Value::Text(text) = value {
            let decoded: serde_json::Value = serde_json::from_str(text).map_err(|e| {
                Error::mapping(&column.column_name, index, format!("invalid json: {e}"))
            })?;
            row.set_named(&column.column_name, Value::Json(decoded));
        }
    }
    Ok(row)
}

/// Encode JSON-typed column values to text for binding.
fn encode_pairs(descriptor: &Descriptor, pairs: Vec<(String, Value)>) -> Result<Vec<(String, Value)>> {
    let mut out = Vec::with_capacity(pairs.len());
    for (name, value) in pairs {
        let json_column = descriptor.column(&name).is_some_and(|c| c.json);
        let value = match value {
            Value::Json(doc) if json_column => Value::Text(doc.to_string()),
            other => other,
        };
        out.push((name, value));
    }
    Ok(out)
}

/// Validate assigned values against the constraints of the columns the
/// caller may actually write. Values on columns outside the allowed set
/// are dropped from SQL anyway, so they are not validated.
fn validate_pairs(
    pairs: &[(String, Value)],
    allowed: &[&rowbind_core::ColumnInfo],
) -> Result<()> {
    for column in allowed {
        if let Some((_, value)) = pairs.iter().find(|(name, _)| name == &column.column_name) {
            check_column(column, value)?;
        }
    }
    Ok(())
}

/// The record's primary-key value, required to be assigned.
fn assigned_primary_key<R: Record>(descriptor: &Descriptor, record: &R) -> Result<Value> {
    let pk_value = record.primary_key_value(descriptor);
    if pk_value.is_null() {
        let pk = descriptor.primary_key();
        return Err(Error::Validation(ValidationError {
            field: pk.source_field.clone(),
            value: "NULL".to_string(),
            constraint: "primary key must be assigned for keyed operations".to_string(),
        }));
    }
    Ok(pk_value)
}
