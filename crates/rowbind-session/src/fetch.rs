//! Relationship resolution for deep fetch.
//!
//! Each declared relation carries a resolver function monomorphized for its
//! `(parent, child)` type pair; [`relation_one`] and [`relation_many`]
//! build the [`Relation`] with the right resolver baked in. The session's
//! `deep_fetch` invokes resolvers for every relation at the top level;
//! below that, [`deep_fetch_level`] follows only `always_fetch` relations.
//!
//! Traversal is cycle-safe. The shared [`Visited`] set records every
//! `(type, primary key)` the call has walked; a hit stops the branch before
//! any fetch or assignment, so a cyclic graph yields a partially resolved
//! tree rather than a loop.

use crate::Session;
use crate::select_list;
use rowbind_core::access::AccessLevel;
use rowbind_core::descriptor::{Relation, RelationKind};
use rowbind_core::error::{Error, Result};
use rowbind_core::record::{Record, Visited};
use rowbind_core::{ConnectionProvider, Value};
use rowbind_query::builder;
use std::any::Any;

/// Declare a single-valued relation from `P` to `C`.
///
/// `local_column` on the parent holds the related primary key. The fetched
/// child is delivered to the parent as a `Box<C>` through `set_related`.
pub fn relation_one<P: Record, C: Record>(
    field: impl Into<String>,
    local_column: impl Into<String>,
) -> Relation {
    Relation::new(field, local_column, RelationKind::One, resolve_one::<P, C>)
}

/// Declare a list-valued relation from `P` to `C`.
///
/// `local_column` on the parent holds a JSON array of related primary keys.
/// The fetched children are delivered as a `Box<Vec<C>>`, in key-list order
/// with already-visited and missing keys skipped.
pub fn relation_many<P: Record, C: Record>(
    field: impl Into<String>,
    local_column: impl Into<String>,
) -> Relation {
    Relation::new(field, local_column, RelationKind::Many, resolve_many::<P, C>)
}

/// Resolve the `always_fetch` relations of a record at a recursion level.
///
/// `depth` counts the levels still allowed; zero resolves nothing.
pub(crate) fn deep_fetch_level<R: Record>(
    provider: &dyn ConnectionProvider,
    record: &mut R,
    level: AccessLevel,
    depth: u32,
    visited: &mut Visited,
) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }
    let descriptor = rowbind_core::descriptor_for::<R>()?;
    for relation in descriptor.relations().iter().filter(|r| r.always_fetch) {
        (relation.resolve)(
            relation,
            provider,
            record as &mut dyn Any,
            level,
            depth,
            visited,
        )?;
    }
    Ok(())
}

fn resolve_one<P: Record, C: Record>(
    relation: &Relation,
    provider: &dyn ConnectionProvider,
    parent: &mut dyn Any,
    level: AccessLevel,
    depth: u32,
    visited: &mut Visited,
) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }
    let parent = downcast_parent::<P>(parent)?;
    let Some(key) = local_value(relation, &parent.to_row()) else {
        return Ok(());
    };
    if visited.contains::<C>(&key) {
        return Ok(());
    }
    visited.insert::<C>(&key);

    let Some(mut child) = Session::new(provider).get::<C>(level, &key)? else {
        // Dangling key: the branch simply stays unresolved.
        return Ok(());
    };
    deep_fetch_level(provider, &mut child, level, depth - 1, visited)?;
    parent.set_related(&relation.field, Box::new(child));
    Ok(())
}

fn resolve_many<P: Record, C: Record>(
    relation: &Relation,
    provider: &dyn ConnectionProvider,
    parent: &mut dyn Any,
    level: AccessLevel,
    depth: u32,
    visited: &mut Visited,
) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }
    let parent = downcast_parent::<P>(parent)?;
    let Some(raw) = local_value(relation, &parent.to_row()) else {
        return Ok(());
    };
    let keys = key_list(relation, &raw)?;

    let wanted: Vec<Value> = keys
        .iter()
        .filter(|k| !visited.contains::<C>(k))
        .cloned()
        .collect();

    let mut fetched = fetch_batch::<C>(provider, level, wanted)?;
    let mut children = Vec::with_capacity(fetched.len());
    for key in &keys {
        let Some(mut child) = fetched.shift_remove(key) else {
            continue;
        };
        visited.insert::<C>(key);
        deep_fetch_level(provider, &mut child, level, depth - 1, visited)?;
        children.push(child);
    }
    parent.set_related(&relation.field, Box::new(children));
    Ok(())
}

fn fetch_batch<C: Record>(
    provider: &dyn ConnectionProvider,
    level: AccessLevel,
    keys: Vec<Value>,
) -> Result<indexmap::IndexMap<Value, C>> {
    if keys.is_empty() {
        return Ok(indexmap::IndexMap::new());
    }
    let descriptor = rowbind_core::descriptor_for::<C>()?;
    let select = select_list(&descriptor, level);
    let stmt = builder::select_by_keys(&descriptor, &select, keys);
    tracing::debug!(table = descriptor.table(), sql = %stmt.sql, "resolve relation batch");
    let rows = {
        let mut conn = provider.connection(descriptor.database())?;
        conn.query(&stmt.sql, &stmt.params)?
    };

    let pk_name = descriptor.primary_key().column_name.clone();
    let mut out = indexmap::IndexMap::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let pk_value = row.get_named(&pk_name).cloned().unwrap_or(Value::Null);
        let row = crate::prepare_row(&descriptor, level, index, row)?;
        let mut child = C::default();
        child.load(&row)?;
        out.insert(pk_value, child);
    }
    Ok(out)
}

fn downcast_parent<P: Record>(parent: &mut dyn Any) -> Result<&mut P> {
    parent.downcast_mut::<P>().ok_or_else(|| {
        Error::configuration(
            std::any::type_name::<P>(),
            "relation resolver invoked with a mismatched parent type",
        )
    })
}

/// The parent's assigned value for the relation's local column, if any.
fn local_value(relation: &Relation, pairs: &[(String, Value)]) -> Option<Value> {
    pairs
        .iter()
        .find(|(name, _)| name == &relation.local_column)
        .map(|(_, value)| value.clone())
        .filter(|value| !value.is_null())
}

/// Parse the key list of a list-valued relation: a JSON array of integer or
/// string primary keys, stored either decoded or as text.
///
/// Resolution works on one parent instance at a time, so mapping failures
/// here always report row index 0.
fn key_list(relation: &Relation, value: &Value) -> Result<Vec<Value>> {
    let doc = match value {
        Value::Json(doc) => doc.clone(),
        Value::Text(text) => serde_json::from_str(text).map_err(|e| {
            Error::mapping(&relation.local_column, 0, format!("invalid key list: {e}"))
        })?,
        other => {
            return Err(Error::mapping(
                &relation.local_column,
                0,
                format!("expected a json key array, got {}", other.type_name()),
            ));
        }
    };
    let serde_json::Value::Array(items) = doc else {
        return Err(Error::mapping(
            &relation.local_column,
            0,
            "key list is not a json array",
        ));
    };
    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int).ok_or_else(|| {
                Error::mapping(&relation.local_column, 0, format!("non-integer key {n}"))
            }),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            other => Err(Error::mapping(
                &relation.local_column,
                0,
                format!("unsupported key {other}"),
            )),
        })
        .collect()
}
