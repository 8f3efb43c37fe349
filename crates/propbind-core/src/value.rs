#![forbid(unsafe_code)]

//! Key-path traversal over [`Value`] trees.
//!
//! Objects are indexed by key, arrays by a segment made only of ASCII digits.
//! A `null` met part-way through a read resolves the whole path to `null`,
//! so a binding to `"profile.displayName"` keeps working (and reads `null`)
//! while `profile` is cleared.
//!
//! Writes create missing intermediate objects and turn `null` intermediates
//! into objects. They never grow arrays and never traverse through scalars.

use serde_json::{Map, Value};

use crate::key_path::{KeyPath, KeyPathError};

static NULL: Value = Value::Null;

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Resolve `path` against `root`, returning `None` when it does not resolve.
#[must_use]
pub fn resolve<'a>(root: &'a Value, path: &KeyPath) -> Option<&'a Value> {
    resolve_checked(root, path).ok()
}

/// Resolve `path` against `root`, describing where resolution failed.
///
/// # Errors
///
/// - [`KeyPathError::NotFound`] when an object lacks a key, or an array is
///   indexed by a non-numeric segment.
/// - [`KeyPathError::IndexOutOfBounds`] when an array index is too large.
/// - [`KeyPathError::NotContainer`] when a scalar would need a child.
pub fn resolve_checked<'a>(root: &'a Value, path: &KeyPath) -> Result<&'a Value, KeyPathError> {
    let mut node = root;
    for (depth, segment) in path.segments().enumerate() {
        node = match node {
            Value::Null => return Ok(&NULL),
            Value::Object(map) => map.get(segment).ok_or_else(|| KeyPathError::NotFound {
                path: path.prefix_str(depth + 1),
            })?,
            Value::Array(items) => index_into(items, segment, path, depth)?,
            _ => {
                return Err(KeyPathError::NotContainer {
                    path: path.prefix_str(depth),
                });
            }
        };
    }
    Ok(node)
}

fn index_into<'a>(
    items: &'a [Value],
    segment: &str,
    path: &KeyPath,
    depth: usize,
) -> Result<&'a Value, KeyPathError> {
    let index = parse_index(segment).ok_or_else(|| KeyPathError::NotFound {
        path: path.prefix_str(depth + 1),
    })?;
    items.get(index).ok_or_else(|| KeyPathError::IndexOutOfBounds {
        path: path.prefix_str(depth + 1),
        index,
        len: items.len(),
    })
}

/// Write `value` at `path` inside `root`.
///
/// # Errors
///
/// - [`KeyPathError::NotContainer`] when a scalar lies on the path.
/// - [`KeyPathError::NotFound`] when an array is indexed by a non-numeric
///   segment.
/// - [`KeyPathError::IndexOutOfBounds`] for an index past the end of an array.
pub fn assign(root: &mut Value, path: &KeyPath, value: Value) -> Result<(), KeyPathError> {
    let segments: Vec<&str> = path.segments().collect();
    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(KeyPathError::Empty),
    };

    let mut node = root;
    for (depth, segment) in parents.iter().enumerate() {
        node = child_mut(node, segment, path, depth)?;
    }

    let depth = parents.len();
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert((*leaf).to_owned(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = slot_mut(items, leaf, path, depth)?;
            *slot = value;
            Ok(())
        }
        _ => Err(KeyPathError::NotContainer {
            path: path.prefix_str(depth),
        }),
    }
}

fn child_mut<'a>(
    node: &'a mut Value,
    segment: &str,
    path: &KeyPath,
    depth: usize,
) -> Result<&'a mut Value, KeyPathError> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => slot_mut(items, segment, path, depth),
        _ => Err(KeyPathError::NotContainer {
            path: path.prefix_str(depth),
        }),
    }
}

fn slot_mut<'a>(
    items: &'a mut [Value],
    segment: &str,
    path: &KeyPath,
    depth: usize,
) -> Result<&'a mut Value, KeyPathError> {
    let index = parse_index(segment).ok_or_else(|| KeyPathError::NotFound {
        path: path.prefix_str(depth + 1),
    })?;
    let len = items.len();
    items
        .get_mut(index)
        .ok_or_else(|| KeyPathError::IndexOutOfBounds {
            path: path.prefix_str(depth + 1),
            index,
            len,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kp(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    #[test]
    fn resolve_nested_object() {
        let doc = json!({"profile": {"displayName": "Ada"}});
        assert_eq!(
            resolve(&doc, &kp("profile.displayName")),
            Some(&json!("Ada"))
        );
    }

    #[test]
    fn resolve_array_index() {
        let doc = json!({"items": [{"label": "a"}, {"label": "b"}]});
        assert_eq!(resolve(&doc, &kp("items.1.label")), Some(&json!("b")));
    }

    #[test]
    fn resolve_through_null_is_null() {
        let doc = json!({"profile": null});
        assert_eq!(
            resolve_checked(&doc, &kp("profile.displayName")),
            Ok(&Value::Null)
        );
    }

    #[test]
    fn resolve_reports_missing_key() {
        let doc = json!({"profile": {}});
        assert_eq!(
            resolve_checked(&doc, &kp("profile.displayName")),
            Err(KeyPathError::NotFound {
                path: "profile.displayName".into()
            })
        );
    }

    #[test]
    fn resolve_reports_scalar_traversal() {
        let doc = json!({"name": "Ada"});
        assert_eq!(
            resolve_checked(&doc, &kp("name.first")),
            Err(KeyPathError::NotContainer {
                path: "name".into()
            })
        );
    }

    #[test]
    fn resolve_reports_bad_index() {
        let doc = json!({"items": [1, 2]});
        assert_eq!(
            resolve_checked(&doc, &kp("items.5")),
            Err(KeyPathError::IndexOutOfBounds {
                path: "items.5".into(),
                index: 5,
                len: 2
            })
        );
        assert!(matches!(
            resolve_checked(&doc, &kp("items.first")),
            Err(KeyPathError::NotFound { .. })
        ));
    }

    #[test]
    fn assign_creates_intermediates() {
        let mut doc = json!({});
        assign(&mut doc, &kp("a.b.c"), json!(1)).unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn assign_replaces_null_intermediate() {
        let mut doc = json!({"profile": null});
        assign(&mut doc, &kp("profile.displayName"), json!("Grace")).unwrap();
        assert_eq!(doc, json!({"profile": {"displayName": "Grace"}}));
    }

    #[test]
    fn assign_into_array_slot() {
        let mut doc = json!({"items": [0, 0]});
        assign(&mut doc, &kp("items.1"), json!(7)).unwrap();
        assert_eq!(doc, json!({"items": [0, 7]}));
        assert!(matches!(
            assign(&mut doc, &kp("items.2"), json!(1)),
            Err(KeyPathError::IndexOutOfBounds { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn assign_rejects_scalar_parent() {
        let mut doc = json!({"name": "Ada"});
        assert_eq!(
            assign(&mut doc, &kp("name.first"), json!("x")),
            Err(KeyPathError::NotContainer {
                path: "name".into()
            })
        );
        assert_eq!(doc, json!({"name": "Ada"}));
    }
}
