//! Store paths and JSON tree operations.
//!
//! A path is a `/`-separated list of keys into one JSON document. The empty
//! path addresses the root. Empty objects and `null` leaves are never kept in
//! the tree: writing `null` deletes, and a parent left empty by a delete is
//! pruned.

use serde_json::{Map, Value};

use super::StoreError;

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// Parsed store path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let mut segments = Vec::new();
        for seg in trimmed.split('/') {
            if seg.is_empty() || seg.contains(FORBIDDEN) {
                return Err(StoreError::InvalidPath(raw.to_string()));
            }
            segments.push(seg.to_string());
        }
        Ok(Self { segments })
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First key, which is also the persistence unit.
    pub fn top(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Enclosing path, `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    pub fn child(&self, rel: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(rel.segments.iter().cloned());
        Self { segments }
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when a change at one path can change the value seen at the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

impl std::fmt::Display for StorePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Value at `path`, or `Null` when absent.
pub fn get(root: &Value, path: &StorePath) -> Value {
    let mut cur = root;
    for seg in path.segments() {
        match cur.get(seg) {
            Some(v) => cur = v,
            None => return Value::Null,
        }
    }
    cur.clone()
}

/// Replace the value at `path`. `Null` removes it.
pub fn set(root: &mut Value, path: &StorePath, value: Value) {
    set_at(root, path.segments(), normalize(value));
    if is_empty(root) {
        *root = Value::Null;
    }
}

fn set_at(node: &mut Value, segs: &[String], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *node = value;
        return;
    };

    if value.is_null() {
        // Deleting below a leaf or a missing key is a no-op.
        if let Value::Object(map) = node {
            if rest.is_empty() {
                map.remove(head);
            } else if let Some(child) = map.get_mut(head) {
                set_at(child, rest, value);
                if is_empty(child) {
                    map.remove(head);
                }
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, value);
    }
}

/// Strip `null` members and empty objects, recursively.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[test]
    fn test_parse_rejects_bad_paths() {
        assert!(StorePath::parse("a//b").is_err());
        assert!(StorePath::parse("a/b.c").is_err());
        assert!(StorePath::parse("a/$b").is_err());
        assert!(StorePath::parse("/").unwrap().is_root());
        assert_eq!(p("/trafficLight/status/").to_string(), "trafficLight/status");
    }

    #[test]
    fn test_overlaps() {
        assert!(p("trafficLight").overlaps(&p("trafficLight/locations/loc1")));
        assert!(p("trafficLight/locations/loc1").overlaps(&p("trafficLight")));
        assert!(!p("trafficLight/system").overlaps(&p("trafficLight/status")));
        assert!(StorePath::root().overlaps(&p("led")));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut root = Value::Null;
        set(&mut root, &p("trafficLight/locations/loc1/name"), json!("Downtown"));
        assert_eq!(get(&root, &p("trafficLight/locations/loc1")), json!({"name": "Downtown"}));
    }

    #[test]
    fn test_delete_prunes_empty_parents() {
        let mut root = json!({"trafficLight": {"locations": {"loc1": {"name": "x"}}}, "led": true});
        set(&mut root, &p("trafficLight/locations/loc1"), Value::Null);
        assert_eq!(root, json!({"led": true}));
        set(&mut root, &p("led"), Value::Null);
        assert!(root.is_null());
    }

    #[test]
    fn test_set_over_leaf_replaces_it() {
        let mut root = json!({"state": "red"});
        set(&mut root, &p("state/color"), json!("green"));
        assert_eq!(root, json!({"state": {"color": "green"}}));
    }

    #[test]
    fn test_normalize_drops_nulls() {
        assert_eq!(normalize(json!({"a": null, "b": {"c": null}})), Value::Null);
        assert_eq!(normalize(json!({"a": 1, "b": null})), json!({"a": 1}));
    }
}
