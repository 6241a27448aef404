//! Key normalization and dotted-path helpers over `serde_json::Value`
//!
//! Top-level keys are always stored uppercase. A dotted key such as
//! `DATABASE.host` addresses a nested table: the first segment is uppercased,
//! the rest keep their case and match case-insensitively as a fallback.

use serde_json::{Map, Value};

/// Table type used for the settings mapping and nested tables
pub type Table = Map<String, Value>;

/// Normalize a top-level key (trimmed, uppercase)
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Split a dotted key into its segments, normalizing the first one
///
/// Empty segments are dropped, so `"A..B"` and `"A.B"` address the same value.
pub fn split_key(key: &str) -> Vec<String> {
    let mut segments = key
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let mut out = Vec::new();
    if let Some(first) = segments.next() {
        out.push(first.to_uppercase());
    }
    out.extend(segments);
    out
}

fn lookup_child<'a>(table: &'a Table, segment: &str) -> Option<&'a Value> {
    table.get(segment).or_else(|| {
        table
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(segment))
            .map(|(_, v)| v)
    })
}

/// Resolve a (possibly dotted) key against a table
pub fn get_path<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let segments = split_key(key);
    let (first, rest) = segments.split_first()?;
    let mut current = table.get(first)?;
    for segment in rest {
        current = lookup_child(current.as_object()?, segment)?;
    }
    Some(current)
}

/// Insert a value at a (possibly dotted) key, creating intermediate tables
///
/// A non-table value sitting on the path is replaced by a table. Returns the
/// previous value at that key, if any.
pub fn set_path(table: &mut Table, key: &str, value: Value) -> Option<Value> {
    let segments = split_key(key);
    let Some((last, parents)) = segments.split_last() else {
        return None;
    };

    let mut current = table;
    for segment in parents {
        let existing = existing_key(current, segment).unwrap_or_else(|| segment.clone());
        let slot = current
            .entry(existing)
            .or_insert_with(|| Value::Object(Table::new()));
        if !slot.is_object() {
            *slot = Value::Object(Table::new());
        }
        // Just made sure the slot holds an object
        let Value::Object(next) = slot else {
            return None;
        };
        current = next;
    }

    let target = if parents.is_empty() {
        last.clone()
    } else {
        existing_key(current, last).unwrap_or_else(|| last.clone())
    };
    current.insert(target, value)
}

/// Remove the value at a (possibly dotted) key
pub fn remove_path(table: &mut Table, key: &str) -> Option<Value> {
    let segments = split_key(key);
    let (last, parents) = segments.split_last()?;
    let mut current = table;
    for segment in parents {
        let name = current
            .keys()
            .find(|k| k.as_str() == segment.as_str() || k.eq_ignore_ascii_case(segment))
            .cloned()?;
        current = current.get_mut(&name)?.as_object_mut()?;
    }
    if let Some(v) = current.remove(last) {
        return Some(v);
    }
    if parents.is_empty() {
        return None;
    }
    let name = current
        .keys()
        .find(|k| k.eq_ignore_ascii_case(last))
        .cloned()?;
    current.remove(&name)
}

/// Key already present in `table` that `key` addresses, exact match first
fn existing_key(table: &Table, key: &str) -> Option<String> {
    if table.contains_key(key) {
        return Some(key.to_string());
    }
    table.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned()
}

/// Deep-merge `incoming` into `base`: nested tables merge, everything else is replaced
///
/// Keys are matched ignoring case, so `HOST` from the environment replaces a
/// `host` loaded from a file and keeps the existing spelling.
pub fn merge_into(base: &mut Table, incoming: Table) {
    for (key, value) in incoming {
        let key = existing_key(base, &key).unwrap_or(key);
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_into(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Text form of a value: strings raw, everything else as compact JSON
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Human readable name of a value's type, used in mismatch errors
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

/// Collect the entries whose key starts with `namespace`
///
/// Mirrors the host config's namespace view: `namespace("IMAGE_STORE_")` over
/// `IMAGE_STORE_TYPE` yields `type` when both `lowercase` and `trim` are set.
pub fn namespace<'a, I>(entries: I, namespace: &str, lowercase: bool, trim: bool) -> Table
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut out = Table::new();
    for (key, value) in entries {
        let Some(stripped) = key.strip_prefix(namespace) else {
            continue;
        };
        let name = if trim { stripped } else { key.as_str() };
        let name = if lowercase {
            name.to_lowercase()
        } else {
            name.to_string()
        };
        out.insert(name, value.clone());
    }
    out
}
