//! Process-wide descriptor cache.
//!
//! Resolving a record type's descriptor is deterministic and idempotent, so
//! it happens once per process and the result is shared. The cache is
//! populated lazily and never invalidated — record shapes are static.
//!
//! Concurrent first use is safe: the write lock is held across the single
//! resolution, so racing callers wait and then observe the cached value.
//! Failed resolutions are not cached; every call re-reports the same
//! configuration error.

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::record::Record;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

type Cache = RwLock<HashMap<TypeId, Arc<Descriptor>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve the cached descriptor for `R`, building it on first use.
pub fn descriptor_for<R: Record>() -> Result<Arc<Descriptor>> {
    let key = TypeId::of::<R>();

    // Fast path: read lock only.
    {
        let map = cache().read().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(descriptor) = map.get(&key) {
            return Ok(Arc::clone(descriptor));
        }
    }

    // Slow path: hold the write lock across resolution so exactly one
    // caller builds the descriptor.
    let mut map = cache().write().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(descriptor) = map.get(&key) {
        return Ok(Arc::clone(descriptor));
    }
    let descriptor = Arc::new(R::descriptor()?);
    tracing::debug!(
        record = descriptor.record(),
        table = descriptor.table(),
        columns = descriptor.columns().len(),
        "resolved record descriptor"
    );
    map.insert(key, Arc::clone(&descriptor));
    Ok(descriptor)
}
