//! Ad-hoc `field == value` filter over a session's `data`.
//!
//! `field` is a dot-separated path relative to `data`. Numeric segments also
//! index into arrays. A document matches when the value at the path equals
//! the filter value, or is an array holding an element equal to it.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::StorageError;

static PATH_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s.$][^\s.]*$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    path: Vec<String>,
    value: Value,
}

impl FieldFilter {
    /// Parse a caller-supplied field path and value.
    ///
    /// The value is read as JSON when it looks like JSON (`{`, `[`, `"`,
    /// a number, `true`, `false`, `null`); anything else is a plain string.
    /// A value that starts like a JSON document but does not parse is rejected.
    pub fn parse(field: &str, value: &str) -> Result<Self, StorageError> {
        let path: Vec<String> = field.split('.').map(str::to_owned).collect();
        if field.is_empty() || !path.iter().all(|segment| PATH_SEGMENT.is_match(segment)) {
            return Err(StorageError::QueryInvalid(format!("malformed field path '{field}'")));
        }
        Ok(Self { path, value: parse_value(value)? })
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluate the filter against a document in process.
    pub fn matches(&self, data: &Value) -> bool {
        match lookup(data, &self.path) {
            Some(found) if found == &self.value => true,
            Some(Value::Array(items)) => items.iter().any(|item| item == &self.value),
            _ => false,
        }
    }
}

fn parse_value(raw: &str) -> Result<Value, StorageError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with(['{', '[', '"']) {
        return serde_json::from_str(raw)
            .map_err(|e| StorageError::QueryInvalid(format!("unparseable value: {e}")));
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(scalar @ (Value::Null | Value::Bool(_) | Value::Number(_))) => Ok(scalar),
        _ => Ok(Value::String(raw.to_owned())),
    }
}

fn lookup<'a>(data: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
