//! Column value validation.
//!
//! Pseudo-enum membership and regex pattern checks run immediately before a
//! value participates in an INSERT or UPDATE. Compiled patterns are cached
//! for the life of the process.

use crate::descriptor::ColumnInfo;
use crate::error::{Error, Result, ValidationError};
use crate::value::Value;
use regex::Regex;
use std::sync::OnceLock;

/// Thread-safe cache of compiled regex patterns.
///
/// Patterns come from column declarations and repeat across calls;
/// compiling them once is enough.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> std::result::Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }
        let regex = Regex::new(pattern)?;
        let mut cache = self.cache.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern.
///
/// Invalid patterns are treated as a non-match and logged, never a panic.
#[must_use]
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid pattern in column declaration, treating as non-match"
            );
            false
        }
    }
}

/// True if `name` is usable verbatim as a SQL identifier.
///
/// Identifiers come from descriptor declarations, never from user input,
/// and are validated once at resolution time; generated SQL can then embed
/// them bare.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let ident = IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"));
    ident.is_match(name)
}

/// Validate an assigned value against a column's constraints.
///
/// `Null` values always pass — unassigned columns are simply omitted from
/// generated SQL. Constraints apply to text values only.
pub fn check_column(column: &ColumnInfo, value: &Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }

    if !column.accepts.is_empty() {
        let text = value.as_str().unwrap_or_default();
        if !column.accepts.iter().any(|a| a == text) {
            return Err(Error::Validation(ValidationError {
                field: column.source_field.clone(),
                value: value.to_string(),
                constraint: format!("accepted values: {}", column.accepts.join(", ")),
            }));
        }
    }

    if let Some(pattern) = &column.pattern {
        let text = value.as_str().unwrap_or_default();
        if !matches_pattern(text, pattern) {
            return Err(Error::Validation(ValidationError {
                field: column.source_field.clone(),
                value: value.to_string(),
                constraint: format!("pattern: {pattern}"),
            }));
        }
    }

    Ok(())
}
