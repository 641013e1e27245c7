//! Filter, update, sort and projection evaluation over JSON documents.
//!
//! Field names may be dotted paths (`settings.retries`). Filters support
//! plain equality plus the `$eq`, `$ne`, `$in` and `$exists` operators;
//! updates support `$set` and `$unset`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::ops::{Document, SortOrder};

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_operator_doc(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|ops| !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')))
}

/// Returns `true` if `doc` satisfies every condition in `filter`.
pub fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (field, expected) in filter {
        if field.starts_with('$') {
            return Err(StoreError::Unsupported(format!(
                "top-level query operator {field}"
            )));
        }
        let actual = lookup(doc, field);
        let ok = match expected.as_object() {
            Some(ops) if is_operator_doc(expected) => {
                let mut ok = true;
                for (op, operand) in ops {
                    ok &= match_operator(field, op, operand, actual)?;
                }
                ok
            }
            _ => actual == Some(expected),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_operator(
    field: &str,
    op: &str,
    operand: &Value,
    actual: Option<&Value>,
) -> StoreResult<bool> {
    match op {
        "$eq" => Ok(actual == Some(operand)),
        "$ne" => Ok(actual != Some(operand)),
        "$in" => {
            let candidates = operand.as_array().ok_or_else(|| {
                StoreError::InvalidOperation(format!("$in on {field} needs an array"))
            })?;
            Ok(actual.is_some_and(|value| candidates.contains(value)))
        }
        "$exists" => {
            let wanted = operand.as_bool().ok_or_else(|| {
                StoreError::InvalidOperation(format!("$exists on {field} needs a bool"))
            })?;
            Ok(actual.is_some() == wanted)
        }
        other => Err(StoreError::Unsupported(format!("query operator {other}"))),
    }
}

/// Reject update documents that are empty or contain non-operator keys.
pub fn validate_update(update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::InvalidOperation("update document is empty".into()));
    }
    for (op, fields) in update {
        match op.as_str() {
            "$set" | "$unset" => {
                if !fields.is_object() {
                    return Err(StoreError::InvalidOperation(format!("{op} needs a document")));
                }
            }
            other if other.starts_with('$') => {
                return Err(StoreError::Unsupported(format!("update operator {other}")));
            }
            other => {
                return Err(StoreError::InvalidOperation(format!(
                    "update document must contain only operators, found {other:?}"
                )));
            }
        }
    }
    Ok(())
}

/// Apply a validated update. Returns `true` if the document changed.
pub fn apply_update(doc: &mut Document, update: &Document) -> StoreResult<bool> {
    validate_update(update)?;
    let before = doc.clone();
    for (op, fields) in update {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        for (path, value) in fields {
            match op.as_str() {
                "$set" => set_path(doc, path, value.clone())?,
                _ => remove_path(doc, path),
            }
        }
    }
    Ok(*doc != before)
}

/// Set a dotted path, creating intermediate documents as needed.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> StoreResult<()> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().unwrap_or(path);
    let mut current = doc;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        current = entry.as_object_mut().ok_or_else(|| {
            StoreError::InvalidOperation(format!("cannot set {path}: {segment} is not a document"))
        })?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.rsplit_once('.') {
        None => {
            doc.remove(path);
        }
        Some((parent, last)) => {
            let mut current = doc;
            for segment in parent.split('.') {
                match current.get_mut(segment).and_then(Value::as_object_mut) {
                    Some(next) => current = next,
                    None => return,
                }
            }
            current.remove(last);
        }
    }
}

/// Build the base document for an upsert from the equality conditions of a
/// filter.
pub fn seed_from_filter(filter: &Document) -> StoreResult<Document> {
    let mut doc = Document::new();
    for (field, value) in filter {
        match value.as_object() {
            Some(ops) if is_operator_doc(value) => {
                if let Some(eq) = ops.get("$eq") {
                    set_path(&mut doc, field, eq.clone())?;
                }
            }
            _ => set_path(&mut doc, field, value.clone())?,
        }
    }
    Ok(doc)
}

/// Keep only the listed fields. `_id` is always kept.
pub fn project(doc: &Document, fields: &[String]) -> StoreResult<Document> {
    let mut out = Document::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id".to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = lookup(doc, field) {
            set_path(&mut out, field, value.clone())?;
        }
    }
    Ok(out)
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional values: missing and null first, then numbers,
/// strings, documents, arrays and booleans.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Documents and arrays of the same kind order by their JSON text.
        (Some(x), Some(y))
            if type_rank(a) == type_rank(b) && matches!(x, Value::Object(_) | Value::Array(_)) =>
        {
            x.to_string().cmp(&y.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Stable sort by each key in turn.
pub fn sort_documents(docs: &mut [Document], sort: &[(String, SortOrder)]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in sort {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
