//! Access-level filtering of columns.
//!
//! Every column carries a read and a write threshold. Lower numeric levels
//! are *more* privileged: a caller at level `L` passes a threshold `T` iff
//! `L <= T`. Level 0 is root; the default threshold is [`AccessLevel::PUBLIC`]
//! so unannotated columns are unrestricted.
//!
//! Policy (deliberate, not an accident): writes the caller has no right to
//! are silently dropped from generated SQL ("fail open on omission"), reads
//! the caller has no right to are omitted from materialized results, and
//! only explicit attempts to expose a restricted column (select-by or
//! search on it) raise an error ("fail closed on exposure").

use crate::descriptor::{ColumnInfo, Descriptor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer privilege level. Lower means more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccessLevel(i32);

impl AccessLevel {
    /// Most privileged level; passes every threshold.
    pub const ROOT: AccessLevel = AccessLevel(0);
    /// Default column threshold; any level may pass it.
    pub const PUBLIC: AccessLevel = AccessLevel(i32::MAX);

    /// Create a level from its raw integer.
    #[must_use]
    pub const fn new(level: i32) -> Self {
        AccessLevel(level)
    }

    /// The raw integer level.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// True if a caller at this level passes `threshold`.
    #[must_use]
    pub const fn passes(self, threshold: AccessLevel) -> bool {
        self.0 <= threshold.0
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        AccessLevel::PUBLIC
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for AccessLevel {
    fn from(level: i32) -> Self {
        AccessLevel(level)
    }
}

/// Whether a column set is being assembled for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// SELECT lists and materialized results.
    Read,
    /// INSERT column lists and UPDATE set lists.
    Write,
}

/// Columns of `descriptor` that `level` may touch with `intent`.
///
/// Pure function of its inputs; order follows the descriptor's declaration
/// order. The primary key is included like any other column here — callers
/// that need it regardless (WHERE clauses) fetch it separately.
#[must_use]
pub fn permitted(descriptor: &Descriptor, level: AccessLevel, intent: Intent) -> Vec<&ColumnInfo> {
    descriptor
        .columns()
        .iter()
        .filter(|c| level.passes(threshold(c, intent)))
        .collect()
}

/// True if `level` may touch `column` with `intent`.
#[must_use]
pub fn allows(column: &ColumnInfo, level: AccessLevel, intent: Intent) -> bool {
    level.passes(threshold(column, intent))
}

const fn threshold(column: &ColumnInfo, intent: Intent) -> AccessLevel {
    match intent {
        Intent::Read => column.min_read_level,
        Intent::Write => column.min_write_level,
    }
}
