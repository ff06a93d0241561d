//! The `Record` capability and deep-fetch bookkeeping.
//!
//! A record is a plain data holder that knows how to describe itself and
//! how to move its fields to and from [`Row`]s through an explicit accessor
//! table — no runtime reflection. Persistence operations live on the
//! session, not on the record.

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::HashSet;

/// A typed entity mapped to exactly one table row.
///
/// Implementations are written by hand (or generated) and consist of three
/// mechanical pieces: the descriptor declaration, a field-to-value dump,
/// and a row-to-field load. Composite fields are decomposed inside
/// [`to_row`](Record::to_row) and recomposed inside [`load`](Record::load),
/// so the engine sees only flat prefixed columns.
pub trait Record: Default + Any + Sized {
    /// Declare the descriptor for this type.
    ///
    /// Called exactly once per process by the registry; user code should go
    /// through [`crate::registry::descriptor_for`] instead.
    fn descriptor() -> Result<Descriptor>;

    /// Dump assigned fields as `(column name, value)` pairs.
    ///
    /// Unassigned fields are reported as [`Value::Null`]. Composite fields
    /// appear decomposed into their prefixed columns.
    fn to_row(&self) -> Vec<(String, Value)>;

    /// Hydrate fields from a fetched row.
    ///
    /// The row may be narrowed to a subset of the mapped columns (read
    /// filtering); absent columns keep their current value. That includes
    /// composite fields: recompose only when the composite's prefixed
    /// columns are present in the row.
    fn load(&mut self, row: &Row) -> Result<()>;

    /// Receive a deep-fetched related instance.
    ///
    /// `related` is a `Box<C>` for single foreign keys and a `Box<Vec<C>>`
    /// for foreign-key lists. The default implementation drops the value;
    /// records with relationships downcast and assign.
    fn set_related(&mut self, field: &str, related: Box<dyn Any>) {
        let _ = (field, related);
    }

    /// This record's primary-key value, or `Null` when unassigned.
    fn primary_key_value(&self, descriptor: &Descriptor) -> Value {
        let pk = &descriptor.primary_key().column_name;
        self.to_row()
            .into_iter()
            .find(|(column, _)| column == pk)
            .map_or(Value::Null, |(_, value)| value)
    }
}

/// Per-call visited set for cycle-safe deep fetch.
///
/// Keys are `(record type, primary key value)`. A hit means the branch has
/// already been traversed in this call; resolution stops there silently.
#[derive(Debug, Default)]
pub struct Visited {
    seen: HashSet<(TypeId, Value)>,
}

impl Visited {
    /// Create an empty visited set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit. Returns `false` if the key was already present.
    pub fn insert<R: Record>(&mut self, pk: &Value) -> bool {
        self.seen.insert((TypeId::of::<R>(), pk.clone()))
    }

    /// True if the key has been visited.
    #[must_use]
    pub fn contains<R: Record>(&self, pk: &Value) -> bool {
        self.seen.contains(&(TypeId::of::<R>(), pk.clone()))
    }

    /// Number of visited keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True if nothing has been visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
