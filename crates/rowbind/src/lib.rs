//! Record-to-row binding for SQL databases.
//!
//! `rowbind` maps plain Rust record types onto table rows and drives the
//! standard operations over them: insert, keyed select, equality and
//! predicate search, update, delete, and recursive relationship fetch.
//! Metadata is declared once per type, validated eagerly, and cached for
//! the process lifetime; all generated SQL is parameterized; column-level
//! access thresholds filter what a caller may read or write.
//!
//! This crate is the facade: it re-exports the workspace layers so
//! applications depend on one crate.
//!
//! - `rowbind-core`: values, rows, descriptors, access control, errors, and
//!   the [`Record`] / [`Connection`] contracts.
//! - `rowbind-query`: parameterized statement builders and the ordered
//!   search-expression language.
//! - `rowbind-session`: the execution engine ([`Session`]) and relation
//!   resolvers.
//!
//! # Getting Started
//!
//! ```ignore
//! use rowbind::prelude::*;
//!
//! #[derive(Default)]
//! struct User {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl Record for User {
//!     fn descriptor() -> Result<Descriptor> {
//!         Descriptor::builder("appdb", "users", "User")
//!             .column(ColumnInfo::new("id").primary_key(true).automatic(true))
//!             .column(ColumnInfo::new("name"))
//!             .build()
//!     }
//!
//!     fn to_row(&self) -> Vec<(String, Value)> {
//!         vec![
//!             ("id".into(), Value::from(self.id)),
//!             ("name".into(), Value::from(self.name.clone())),
//!         ]
//!     }
//!
//!     fn load(&mut self, row: &Row) -> Result<()> {
//!         if let Some(v) = row.get_named("id") {
//!             self.id = v.as_i64();
//!         }
//!         if let Some(v) = row.get_named("name") {
//!             self.name = v.as_str().unwrap_or_default().to_string();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let session = Session::new(&provider);
//! let mut user = User { name: "Alice".into(), ..User::default() };
//! session.insert(&mut user)?;
//! ```

pub use rowbind_core::{
    AccessError, AccessLevel, ColumnInfo, Composite, CompositeInfo, ConfigurationError, Connection,
    ConnectionError, ConnectionProvider, Descriptor, DescriptorBuilder, Error, IntegrityError,
    Intent, MappingError, QueryError, Record, Relation, RelationKind, ResolveFn, Result, Row,
    ValidationError, Value, Visited, allows, compose_from, decompose_into, descriptor_for,
    permitted, prefixed_column, required,
};
pub use rowbind_query::{Connective, SearchExpr, SearchOp, Statement};
pub use rowbind_session::{Session, relation_many, relation_one};

/// One-line import for applications.
pub mod prelude {
    pub use rowbind_core::{
        AccessLevel, ColumnInfo, Composite, CompositeInfo, Connection, ConnectionProvider,
        Descriptor, Error, Record, Relation, RelationKind, Result, Row, Value,
    };
    pub use rowbind_query::{Connective, SearchExpr, SearchOp};
    pub use rowbind_session::{Session, relation_many, relation_one};
}
