use serde_json::{Map, Value};

use crate::error::{MergeError, MergeResult};

/// Merges `b` into `a`, with values from `b` taking precedence.
///
/// Objects are merged key by key and recursively. An array in `a` is replaced
/// by an array from `b`, while any other value from `b` is appended to it.
/// Primitives and nulls in `a` are replaced outright.
///
/// # Errors
///
/// * [`MergeError::NonObjectIntoObject`] if `a` is an object and `b` is not.
///
/// # Example
///
/// ```
/// use hdx_utils::dict::merge_values;
/// use serde_json::json;
///
/// let mut a = json!({"name": "old", "tags": ["a"], "extras": {"x": 1}});
/// merge_values(&mut a, json!({"name": "new", "tags": ["b"], "extras": {"y": 2}})).unwrap();
/// assert_eq!(a, json!({"name": "new", "tags": ["b"], "extras": {"x": 1, "y": 2}}));
/// ```
pub fn merge_values(a: &mut Value, b: Value) -> MergeResult<()> {
    match a {
        Value::Object(a_map) => match b {
            Value::Object(b_map) => merge_two_dictionaries(a_map, b_map),
            other => Err(MergeError::NonObjectIntoObject {
                from: other.to_string(),
                into: Value::Object(a_map.clone()).to_string(),
            }),
        },
        Value::Array(items) => {
            match b {
                Value::Array(_) => *a = b,
                other => items.push(other),
            }
            Ok(())
        }
        _ => {
            *a = b;
            Ok(())
        }
    }
}

/// Merges the entries of `b` into the map `a`.
///
/// See [`merge_values`] for the rules applied to each entry.
pub fn merge_two_dictionaries(a: &mut Map<String, Value>, b: Map<String, Value>) -> MergeResult<()> {
    for (key, value) in b {
        match a.get_mut(&key) {
            Some(existing) => merge_values(existing, value)?,
            None => {
                a.insert(key, value);
            }
        }
    }
    Ok(())
}

/// Returns true for values that count as empty metadata: null, empty strings,
/// empty arrays and objects, and zero. Booleans are never empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) => false,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_merge_replaces_primitives() {
        let mut a = as_map(json!({"title": "A", "private": true, "count": 3}));
        merge_two_dictionaries(&mut a, as_map(json!({"title": "B", "private": false})))
            .unwrap();
        assert_eq!(Value::Object(a), json!({"title": "B", "private": false, "count": 3}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let mut a = as_map(json!({"site": {"url": "http://a", "username": "u"}}));
        merge_two_dictionaries(&mut a, as_map(json!({"site": {"url": "http://b"}}))).unwrap();
        assert_eq!(
            Value::Object(a),
            json!({"site": {"url": "http://b", "username": "u"}})
        );
    }

    #[test]
    fn test_merge_replaces_lists() {
        let mut a = as_map(json!({"tags": [{"name": "a"}, {"name": "b"}]}));
        merge_two_dictionaries(&mut a, as_map(json!({"tags": [{"name": "c"}]}))).unwrap();
        assert_eq!(Value::Object(a), json!({"tags": [{"name": "c"}]}));
    }

    #[test]
    fn test_merge_appends_scalar_to_list() {
        let mut a = json!(["x"]);
        merge_values(&mut a, json!("y")).unwrap();
        assert_eq!(a, json!(["x", "y"]));
    }

    #[test]
    fn test_merge_non_object_into_object_fails() {
        let mut a = json!({"a": 1});
        assert!(merge_values(&mut a, json!("oops")).is_err());
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!("x")));
        assert!(!is_empty_value(&json!([1])));
    }
}
