use serde_json::{Map, Value};

use super::controller::{FormError, FormResult};

pub type FieldValue = Value;
pub type FieldValues = Map<String, Value>;

pub(super) fn path_segments(path: &str) -> FormResult<Vec<&str>> {
    let segments = path.split('.').collect::<Vec<_>>();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(FormError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Reads the value at a dotted path. Numeric segments index into arrays.
pub fn get_path<'a>(root: &'a FieldValues, path: &str) -> Option<&'a FieldValue> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate objects and
/// replacing scalars that sit in the way.
pub fn set_path(root: &mut FieldValues, path: &str, value: FieldValue) -> FormResult<()> {
    let segments = path_segments(path)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| FormError::InvalidPath(path.to_string()))?;

    if parents.is_empty() {
        root.insert((*last).to_string(), value);
        return Ok(());
    }

    let mut current = root
        .entry(parents[0].to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    for segment in &parents[1..] {
        current = child_slot(current, segment, path)?;
    }
    *child_slot(current, last, path)? = value;
    Ok(())
}

/// Slot for `segment` below `parent`. Arrays only accept indexes up to
/// `MAX_ARRAY_GAP` past their end and are never replaced.
fn child_slot<'a>(parent: &'a mut Value, segment: &str, path: &str) -> FormResult<&'a mut Value> {
    let array_index = match &*parent {
        Value::Array(items) => {
            let index = segment
                .parse::<usize>()
                .ok()
                .filter(|index| *index <= items.len() + MAX_ARRAY_GAP)
                .ok_or_else(|| FormError::InvalidPath(path.to_string()))?;
            Some(index)
        }
        _ => None,
    };

    if let Some(index) = array_index {
        return Ok(match parent {
            Value::Array(items) => {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            other => other,
        });
    }

    if !parent.is_object() {
        *parent = Value::Object(Map::new());
    }
    Ok(match parent {
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        other => other,
    })
}

const MAX_ARRAY_GAP: usize = 64;

/// Recursively overlays `source` onto `target`; objects merge key by key,
/// everything else is replaced.
pub(super) fn merge_values(target: &mut FieldValues, source: &FieldValues) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_values(existing, incoming)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Whether a write at `written` is observed by a watcher on `watched`.
///
/// Writes to the watched path or to one of its ancestors always count. Writes
/// below the watched path only count for deep watchers.
pub(super) fn write_affects(watched: &str, written: &str, deep: bool) -> bool {
    if watched == written {
        return true;
    }
    if is_descendant(watched, written) {
        return true;
    }
    deep && is_descendant(written, watched)
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(value: Value) -> FieldValues {
        match value {
            Value::Object(map) => map,
            _ => panic!("test values must be an object"),
        }
    }

    #[test]
    fn set_path_creates_nested_objects() {
        let mut root = FieldValues::new();
        set_path(&mut root, "address.city", json!("Erbil")).expect("set nested");
        assert_eq!(Value::Object(root.clone()), json!({"address": {"city": "Erbil"}}));
        assert_eq!(get_path(&root, "address.city"), Some(&json!("Erbil")));
    }

    #[test]
    fn set_path_replaces_scalars_in_the_way() {
        let mut root = values(json!({"address": "unknown"}));
        set_path(&mut root, "address.zip", json!(44001)).expect("set nested");
        assert_eq!(get_path(&root, "address.zip"), Some(&json!(44001)));
    }

    #[test]
    fn numeric_segments_index_arrays() {
        let mut root = values(json!({"phones": ["a", "b"]}));
        set_path(&mut root, "phones.1", json!("c")).expect("set index");
        assert_eq!(get_path(&root, "phones.1"), Some(&json!("c")));
        assert_eq!(get_path(&root, "phones.7"), None);
    }

    #[test]
    fn far_or_named_indexes_leave_arrays_intact() {
        let mut root = values(json!({"tags": ["a", "b"]}));
        assert_eq!(
            set_path(&mut root, "tags.100", json!("x")),
            Err(FormError::InvalidPath("tags.100".to_string()))
        );
        assert_eq!(
            set_path(&mut root, "tags.first", json!("x")),
            Err(FormError::InvalidPath("tags.first".to_string()))
        );
        assert_eq!(Value::Object(root.clone()), json!({"tags": ["a", "b"]}));

        set_path(&mut root, "tags.4", json!("e")).expect("within the gap");
        assert_eq!(get_path(&root, "tags.0"), Some(&json!("a")));
        assert_eq!(get_path(&root, "tags.3"), Some(&FieldValue::Null));
        assert_eq!(get_path(&root, "tags.4"), Some(&json!("e")));
    }

    #[test]
    fn empty_segments_are_rejected() {
        let mut root = FieldValues::new();
        assert_eq!(
            set_path(&mut root, "address..city", json!(1)),
            Err(FormError::InvalidPath("address..city".to_string()))
        );
    }

    #[test]
    fn merge_overlays_nested_objects() {
        let mut target = values(json!({"address": {"city": "Erbil", "zip": 1}, "name": "a"}));
        let source = values(json!({"address": {"zip": 2}, "age": 3}));
        merge_values(&mut target, &source);
        assert_eq!(
            Value::Object(target),
            json!({"address": {"city": "Erbil", "zip": 2}, "name": "a", "age": 3})
        );
    }

    #[test]
    fn write_affects_respects_depth() {
        assert!(write_affects("address.city", "address.city", false));
        assert!(write_affects("address.city", "address", false));
        assert!(!write_affects("address", "address.city", false));
        assert!(write_affects("address", "address.city", true));
        assert!(!write_affects("address", "addressee", true));
    }
}
