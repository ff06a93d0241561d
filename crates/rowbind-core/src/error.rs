//! Error taxonomy for rowbind.
//!
//! Every fallible operation returns [`Result`]. Zero-row outcomes (not
//! found, nothing deleted or updated) are normal return values, never
//! errors. Access-control write misses are silently omitted from generated
//! SQL; only explicit attempts to *expose* a column above the caller's
//! level surface as [`AccessError`].

use crate::access::AccessLevel;
use std::fmt;

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Bad or incomplete record metadata. Non-recoverable; raised at the
    /// first (and only) resolution of a record type.
    Configuration(ConfigurationError),
    /// The connection provider could not supply a usable connection.
    Connection(ConnectionError),
    /// A statement was rejected by the database engine.
    Query(QueryError),
    /// A fetched column could not be coerced into its declared field.
    Mapping(MappingError),
    /// A primary-key select returned more than one row.
    Integrity(IntegrityError),
    /// An assigned value violated a column constraint.
    Validation(ValidationError),
    /// The caller asked the API to expose a column above its level.
    Access(AccessError),
}

/// Metadata problem detected while resolving a record descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// Record type the descriptor was resolved for.
    pub record: &'static str,
    /// What is wrong with the declaration.
    pub detail: String,
}

/// Connection acquisition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    /// Logical database the connection was requested for.
    pub database: String,
    /// Provider-supplied detail.
    pub detail: String,
}

/// Statement execution failure, with the engine detail preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// The generated SQL text.
    pub sql: String,
    /// Underlying engine detail.
    pub detail: String,
}

/// Row-to-field coercion failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingError {
    /// Column that failed to map.
    pub column: String,
    /// Zero-based index of the failing row within its result set.
    pub row_index: usize,
    /// What went wrong.
    pub detail: String,
}

/// More rows than a primary-key lookup may ever return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    /// Table the lookup ran against.
    pub table: String,
    /// Rows the engine returned.
    pub rows: usize,
}

/// Column constraint violation on an assigned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Offending value, rendered for the message.
    pub value: String,
    /// Constraint description (accepted set or pattern).
    pub constraint: String,
}

/// Explicit read-level escalation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessError {
    /// Column the caller asked to expose.
    pub column: String,
    /// The caller's level.
    pub requested: AccessLevel,
    /// The column's read threshold.
    pub required: AccessLevel,
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn configuration(record: &'static str, detail: impl Into<String>) -> Self {
        Error::Configuration(ConfigurationError {
            record,
            detail: detail.into(),
        })
    }

    /// Shorthand for a connection error.
    pub fn connection(database: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            database: database.into(),
            detail: detail.into(),
        })
    }

    /// Shorthand for a query error.
    pub fn query(sql: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Query(QueryError {
            sql: sql.into(),
            detail: detail.into(),
        })
    }

    /// Shorthand for a mapping error.
    pub fn mapping(column: impl Into<String>, row_index: usize, detail: impl Into<String>) -> Self {
        Error::Mapping(MappingError {
            column: column.into(),
            row_index,
            detail: detail.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(e) => {
                write!(f, "configuration error on {}: {}", e.record, e.detail)
            }
            Error::Connection(e) => {
                write!(f, "connection error for database {}: {}", e.database, e.detail)
            }
            Error::Query(e) => write!(f, "query failed: {} (sql: {})", e.detail, e.sql),
            Error::Mapping(e) => write!(
                f,
                "cannot map column {} at row {}: {}",
                e.column, e.row_index, e.detail
            ),
            Error::Integrity(e) => write!(
                f,
                "primary-key select on {} returned {} rows, expected at most one",
                e.table, e.rows
            ),
            Error::Validation(e) => write!(
                f,
                "value {:?} for field {} violates constraint: {}",
                e.value, e.field, e.constraint
            ),
            Error::Access(e) => write!(
                f,
                "column {} requires read level {} but level {} was requested",
                e.column, e.required, e.requested
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<ConnectionError> for Error {
    fn from(e: ConnectionError) -> Self {
        Error::Connection(e)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::Query(e)
    }
}

impl From<MappingError> for Error {
    fn from(e: MappingError) -> Self {
        Error::Mapping(e)
    }
}
