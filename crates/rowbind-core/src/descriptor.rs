//! Record descriptors: the structural metadata for a record type.
//!
//! A [`Descriptor`] is resolved once per record type (see
//! [`crate::registry`]) and describes how instances bind to table rows:
//! table and database identity, the ordered column list, the single primary
//! key, declared relationships, and embedded composition objects.
//!
//! Descriptors are built through [`DescriptorBuilder`], which validates the
//! declaration and fails with a configuration error on inconsistent
//! metadata — the fail-fast moment for a record type.

use crate::access::AccessLevel;
use crate::connection::ConnectionProvider;
use crate::error::{Error, Result};
use crate::record::Visited;
use crate::validate::is_valid_identifier;
use std::any::Any;

/// Metadata for one mapped column.
///
/// The column name defaults to the source field name; `column()` overrides
/// it. Thresholds default to [`AccessLevel::PUBLIC`] (unrestricted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Field name on the record type.
    pub source_field: String,
    /// Column name used verbatim in generated SQL.
    pub column_name: String,
    /// DB-generated column; excluded from INSERT value lists.
    pub automatic: bool,
    /// Removed from mapping entirely.
    pub excluded: bool,
    /// Exactly one column per record must set this.
    pub primary_key: bool,
    /// Read threshold; a requested level `L` reads the column iff `L` passes.
    pub min_read_level: AccessLevel,
    /// Write threshold; failing writes are silently omitted from SQL.
    pub min_write_level: AccessLevel,
    /// Pseudo-enum: accepted string values. Empty means unconstrained.
    pub accepts: Vec<String>,
    /// Regex the assigned text value must match.
    pub pattern: Option<String>,
    /// Value is a JSON document, encoded to text at the wire boundary.
    pub json: bool,
}

impl ColumnInfo {
    /// Create a column mapped to a column of the same name.
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            column_name: field.clone(),
            source_field: field,
            automatic: false,
            excluded: false,
            primary_key: false,
            min_read_level: AccessLevel::PUBLIC,
            min_write_level: AccessLevel::PUBLIC,
            accepts: Vec::new(),
            pattern: None,
            json: false,
        }
    }

    /// Override the mapped column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self
    }

    /// Mark the column as DB-generated.
    #[must_use]
    pub fn automatic(mut self, value: bool) -> Self {
        self.automatic = value;
        self
    }

    /// Remove the field from mapping entirely.
    #[must_use]
    pub fn excluded(mut self, value: bool) -> Self {
        self.excluded = value;
        self
    }

    /// Mark the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set the read threshold.
    #[must_use]
    pub fn min_read_level(mut self, level: AccessLevel) -> Self {
        self.min_read_level = level;
        self
    }

    /// Set the write threshold.
    #[must_use]
    pub fn min_write_level(mut self, level: AccessLevel) -> Self {
        self.min_write_level = level;
        self
    }

    /// Constrain the column to a set of accepted string values.
    pub fn accepts<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts = values.into_iter().map(Into::into).collect();
        self
    }

    /// Require assigned text values to match a regex.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Mark the column as JSON-typed.
    #[must_use]
    pub fn json(mut self, value: bool) -> Self {
        self.json = value;
        self
    }
}

/// Single- or list-valued foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Local column holds one related primary key.
    One,
    /// Local column holds a JSON array of related primary keys.
    Many,
}

/// Resolver invoked by deep fetch for one relation on one instance.
///
/// Monomorphized per `(parent, child)` type pair and stored in the
/// descriptor, so resolution needs no runtime reflection. The parent is
/// passed type-erased and downcast inside the resolver.
pub type ResolveFn = fn(
    &Relation,
    &dyn ConnectionProvider,
    &mut dyn Any,
    AccessLevel,
    u32,
    &mut Visited,
) -> Result<()>;

/// A declared relationship from one record type to another.
#[derive(Clone)]
pub struct Relation {
    /// Field on the parent that receives the fetched instance(s).
    pub field: String,
    /// Local column holding the related primary key (or key list).
    pub local_column: String,
    /// Single or list-valued.
    pub kind: RelationKind,
    /// Resolve this relation on every deep-fetch level, not only the first.
    pub always_fetch: bool,
    /// The monomorphized fetch-and-assign function.
    pub resolve: ResolveFn,
}

impl Relation {
    /// Declare a relation. Use the `relation_one` / `relation_many` helpers
    /// from the session layer to obtain the resolver.
    pub fn new(
        field: impl Into<String>,
        local_column: impl Into<String>,
        kind: RelationKind,
        resolve: ResolveFn,
    ) -> Self {
        Self {
            field: field.into(),
            local_column: local_column.into(),
            kind,
            always_fetch: false,
            resolve,
        }
    }

    /// Resolve this relation at every recursion level.
    #[must_use]
    pub fn always_fetch(mut self, value: bool) -> Self {
        self.always_fetch = value;
        self
    }
}

impl std::fmt::Debug for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relation")
            .field("field", &self.field)
            .field("local_column", &self.local_column)
            .field("kind", &self.kind)
            .field("always_fetch", &self.always_fetch)
            .finish_non_exhaustive()
    }
}

/// An embedded composition object flattened into prefixed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeInfo {
    /// Field on the record holding the composite value.
    pub field: String,
    /// Column prefix; each composite field maps to `prefix_field`.
    pub prefix: String,
    /// Composite field names, in declaration order.
    pub fields: Vec<String>,
}

impl CompositeInfo {
    /// Declare a composite field.
    pub fn new<I, S>(field: impl Into<String>, prefix: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            prefix: prefix.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// The prefixed column names this composite occupies.
    #[must_use]
    pub fn prefixed_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| crate::composite::prefixed_column(&self.prefix, f))
            .collect()
    }
}

/// Resolved structural metadata for a record type.
///
/// Deterministic and immutable once built; shared process-wide through the
/// registry cache.
#[derive(Debug, Clone)]
pub struct Descriptor {
    record: &'static str,
    database: String,
    table: String,
    columns: Vec<ColumnInfo>,
    primary_key: usize,
    relations: Vec<Relation>,
    composites: Vec<CompositeInfo>,
}

impl Descriptor {
    /// Start building a descriptor.
    pub fn builder(
        database: impl Into<String>,
        table: impl Into<String>,
        record: &'static str,
    ) -> DescriptorBuilder {
        DescriptorBuilder {
            record,
            database: database.into(),
            table: table.into(),
            columns: Vec::new(),
            relations: Vec::new(),
            composites: Vec::new(),
        }
    }

    /// The record type name (for diagnostics).
    #[must_use]
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// Logical database name, used to acquire connections.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Table name, used verbatim in generated SQL.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Mapped columns in declaration order (excluded fields removed).
    #[must_use]
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Look up a column by its mapped name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.column_name == name)
    }

    /// The primary-key column.
    #[must_use]
    pub fn primary_key(&self) -> &ColumnInfo {
        &self.columns[self.primary_key]
    }

    /// Declared relationships.
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Declared composites.
    #[must_use]
    pub fn composites(&self) -> &[CompositeInfo] {
        &self.composites
    }
}

/// Validating builder for [`Descriptor`].
#[derive(Debug)]
pub struct DescriptorBuilder {
    record: &'static str,
    database: String,
    table: String,
    columns: Vec<ColumnInfo>,
    relations: Vec<Relation>,
    composites: Vec<CompositeInfo>,
}

impl DescriptorBuilder {
    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: ColumnInfo) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a relationship.
    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Add a composite. Its prefixed columns are synthesized automatically
    /// unless declared explicitly (declare them to set access thresholds).
    #[must_use]
    pub fn composite(mut self, composite: CompositeInfo) -> Self {
        self.composites.push(composite);
        self
    }

    /// Validate and build the descriptor.
    pub fn build(self) -> Result<Descriptor> {
        let record = self.record;
        let fail = |detail: String| Err(Error::configuration(record, detail));

        if !is_valid_identifier(&self.database) {
            return fail(format!("invalid database name {:?}", self.database));
        }
        if !is_valid_identifier(&self.table) {
            return fail(format!("invalid table name {:?}", self.table));
        }

        let mut columns: Vec<ColumnInfo> = Vec::new();
        for column in self.columns {
            if column.excluded {
                if column.primary_key {
                    return fail(format!(
                        "primary key {} cannot be excluded from mapping",
                        column.source_field
                    ));
                }
                continue;
            }
            columns.push(column);
        }

        // Synthesize prefixed columns for composites that were not declared
        // explicitly.
        for composite in &self.composites {
            if !is_valid_identifier(&composite.prefix) {
                return fail(format!("invalid composite prefix {:?}", composite.prefix));
            }
            if composite.fields.is_empty() {
                return fail(format!("composite {} has no fields", composite.field));
            }
            for name in composite.prefixed_columns() {
                if !columns.iter().any(|c| c.column_name == name) {
                    columns.push(ColumnInfo::new(name));
                }
            }
        }

        if columns.is_empty() {
            return fail("no mapped columns declared".to_string());
        }
        for column in &columns {
            if !is_valid_identifier(&column.column_name) {
                return fail(format!("invalid column name {:?}", column.column_name));
            }
            if !column.accepts.is_empty() && column.json {
                return fail(format!(
                    "column {} cannot combine a pseudo-enum with a json type",
                    column.column_name
                ));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.column_name.as_str()) {
                return fail(format!("duplicate column name {:?}", column.column_name));
            }
        }

        let pk_indexes: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect();
        let primary_key = match pk_indexes.as_slice() {
            [one] => *one,
            [] => return fail("no primary key declared".to_string()),
            many => {
                return fail(format!(
                    "{} primary keys declared, expected exactly one",
                    many.len()
                ));
            }
        };

        for relation in &self.relations {
            if !columns.iter().any(|c| c.column_name == relation.local_column) {
                return fail(format!(
                    "relation {} references unknown local column {:?}",
                    relation.field, relation.local_column
                ));
            }
        }

        Ok(Descriptor {
            record,
            database: self.database,
            table: self.table,
            columns,
            primary_key,
            relations: self.relations,
            composites: self.composites,
        })
    }
}
