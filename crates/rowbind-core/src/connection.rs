//! Connection capability traits.
//!
//! The core never opens sockets or pools connections itself; it asks an
//! externally supplied [`ConnectionProvider`] for a connection scoped to a
//! single operation, and releases it (via `Drop`) on every exit path.
//! Providers may pool or open per call — the only contract is a usable,
//! open connection or an error, never an invalid handle.
//!
//! All operations are synchronous and blocking; the host supplies threads
//! around individual record operations.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// One usable database connection.
///
/// Statements are parameterized with `?` placeholders; `params` binds them
/// positionally.
pub trait Connection {
    /// Execute a statement and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and return all result rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute an INSERT and return the generated key, when the engine
    /// produced one.
    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<Option<Value>>;
}

/// Capability to produce connections for named logical databases.
pub trait ConnectionProvider {
    /// Acquire a connection for `database`.
    ///
    /// Fails with a connection error; never returns an unusable handle.
    fn connection(&self, database: &str) -> Result<Box<dyn Connection + '_>>;
}
