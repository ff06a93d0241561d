//! SQL generation for rowbind.
//!
//! Turns a record descriptor plus an operation intent into parameterized
//! SQL text and bound values. Two halves:
//!
//! - [`builder`]: INSERT / UPDATE / SELECT / DELETE / search statements.
//! - [`search`]: the ordered predicate-expression list and its
//!   left-to-right WHERE compilation.
//!
//! Nothing here touches a connection; execution lives in
//! `rowbind-session`.

pub mod builder;
pub mod search;

pub use builder::{
    Statement, delete, insert, search as build_search, select_by_column, select_by_key,
    select_by_keys, update,
};
pub use search::{Connective, SearchExpr, SearchOp, compile};
