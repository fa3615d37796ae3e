//! # Dotted Field Paths
//!
//! `metadata.labels`-style paths into raw documents. Used by the validator
//! to locate issues and by the migrator to apply field operations.
//! Segments address object keys only; arrays are not traversed.

use serde_json::{Map, Value};

use crate::error::PathError;

/// Split a dotted path, rejecting empty segments.
pub fn segments(path: &str) -> Result<Vec<&str>, PathError> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(parts)
}

/// Look up the value at `path`, if every segment exists.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path.split('.') {
        if seg.is_empty() {
            return None;
        }
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

/// Whether `path` resolves to a value (including `null`).
pub fn exists(root: &Value, path: &str) -> bool {
    lookup(root, path).is_some()
}

/// Resolve the object that holds the last segment of `path`.
///
/// Every intermediate segment must already exist and be an object.
fn parent_mut<'a, 'p>(
    root: &'a mut Value,
    path: &'p str,
) -> Result<(&'a mut Map<String, Value>, &'p str), PathError> {
    let parts = segments(path)?;
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| PathError::EmptySegment(path.to_string()))?;

    let mut cur = root;
    let mut walked = String::new();
    for seg in parents {
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(seg);
        let obj = cur
            .as_object_mut()
            .ok_or_else(|| PathError::NotAnObject(walked.clone()))?;
        cur = obj
            .get_mut(*seg)
            .ok_or_else(|| PathError::MissingParent(path.to_string()))?;
    }
    let obj = cur.as_object_mut().ok_or_else(|| {
        PathError::NotAnObject(if walked.is_empty() {
            "$".to_string()
        } else {
            walked
        })
    })?;
    Ok((obj, last))
}

/// Remove and return the value at `path`.
///
/// A missing leaf is `Ok(None)`; a missing or non-object parent is `Ok(None)`
/// as well, since there is nothing to remove.
pub fn remove(root: &mut Value, path: &str) -> Result<Option<Value>, PathError> {
    match parent_mut(root, path) {
        Ok((obj, last)) => Ok(obj.remove(last)),
        Err(PathError::EmptySegment(p)) => Err(PathError::EmptySegment(p)),
        Err(_) => Ok(None),
    }
}

/// Insert `value` at `path`, returning the previous value.
///
/// Parents are never created implicitly: a missing parent is an error so
/// that a transform cannot fabricate whole sections of a document.
pub fn insert(root: &mut Value, path: &str, value: Value) -> Result<Option<Value>, PathError> {
    let (obj, last) = parent_mut(root, path)?;
    Ok(obj.insert(last.to_string(), value))
}
