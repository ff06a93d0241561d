//! Core types and traits for rowbind.
//!
//! `rowbind-core` is the foundation layer of the workspace. It defines the
//! contracts everything else builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Record`] is implemented by user record types;
//!   [`Connection`] and [`ConnectionProvider`] by database integrations.
//! - **Data model**: [`Row`] and [`Value`] represent statement inputs and
//!   query outputs across the query and session crates.
//! - **Metadata**: [`Descriptor`] captures a record type's table binding,
//!   columns, access thresholds, relationships, and composites; the
//!   [`registry`] caches one descriptor per type for the process lifetime.
//!
//! # Who Uses This Crate
//!
//! - `rowbind-query` consumes descriptors and `Value` to build SQL.
//! - `rowbind-session` drives operations through `ConnectionProvider` and
//!   maps rows back into records.
//!
//! Most applications should use the `rowbind` facade; reach for
//! `rowbind-core` directly when writing connection integrations.

pub mod access;
pub mod composite;
pub mod connection;
pub mod descriptor;
pub mod error;
pub mod record;
pub mod registry;
pub mod row;
pub mod validate;
pub mod value;

pub use access::{AccessLevel, Intent, allows, permitted};
pub use composite::{Composite, compose_from, decompose_into, prefixed_column, required};
pub use connection::{Connection, ConnectionProvider};
pub use descriptor::{
    ColumnInfo, CompositeInfo, Descriptor, DescriptorBuilder, Relation, RelationKind, ResolveFn,
};
pub use error::{
    AccessError, ConfigurationError, ConnectionError, Error, IntegrityError, MappingError,
    QueryError, Result, ValidationError,
};
pub use record::{Record, Visited};
pub use registry::descriptor_for;
pub use row::Row;
pub use validate::{check_column, is_valid_identifier, matches_pattern};
pub use value::Value;
