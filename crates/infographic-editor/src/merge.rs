//! Deep merge-with-delete over option trees.
//!
//! # Overview
//!
//! Every option update in the editor is expressed as an [`UpdateMap`]: an ordered
//! map from key to [`OptionUpdate`]. Applying it to a live options tree follows three
//! rules per key:
//!
//! - [`OptionUpdate::Unset`] deletes the key from the target.
//! - [`OptionUpdate::Merge`] recurses into the existing value. A missing or
//!   non-object value is replaced by an empty object first.
//! - [`OptionUpdate::Set`] assigns the value as an opaque leaf. Arrays and `null`
//!   are never merged element-wise.
//!
//! Only the target map's own entries are ever written, so keys such as `__proto__`
//! are plain keys like any other.
//!
//! # Example
//!
//! ```rust
//! use infographic_editor::merge::{OptionUpdate, UpdateMap, apply_option_updates};
//! use serde_json::{Map, json};
//!
//! let mut target = Map::new();
//! target.insert("padding".into(), json!(10));
//! target.insert("viewBox".into(), json!("0 0 100 100"));
//!
//! let update = UpdateMap::new()
//!     .with("padding", OptionUpdate::Set(json!([4, 8])))
//!     .with("viewBox", OptionUpdate::Unset);
//! apply_option_updates(&mut target, &update);
//!
//! assert_eq!(target.get("padding"), Some(&json!([4, 8])));
//! assert!(target.get("viewBox").is_none());
//! ```

use serde_json::{Map, Value};

/// A single update applied to one key of an options tree.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionUpdate {
    /// Delete the key.
    Unset,
    /// Assign the value as-is.
    Set(Value),
    /// Recursively merge a nested update.
    Merge(UpdateMap),
}

impl OptionUpdate {
    /// Collapse the update into a plain JSON value.
    ///
    /// Returns `None` for [`OptionUpdate::Unset`]; nested unsets are dropped.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            OptionUpdate::Unset => None,
            OptionUpdate::Set(value) => Some(value.clone()),
            OptionUpdate::Merge(map) => Some(map.to_value()),
        }
    }
}

impl From<Value> for OptionUpdate {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => OptionUpdate::Merge(UpdateMap::from(map)),
            other => OptionUpdate::Set(other),
        }
    }
}

/// An ordered set of keyed [`OptionUpdate`]s.
///
/// Inserting an existing key replaces its update in place, keeping the original
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateMap {
    entries: Vec<(String, OptionUpdate)>,
}

impl UpdateMap {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an update from a JSON value. Objects become nested merges.
    ///
    /// Non-object values produce an empty update.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map),
            _ => Self::new(),
        }
    }

    /// Insert or replace the update for `key`.
    pub fn insert(&mut self, key: impl Into<String>, update: OptionUpdate) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = update;
        } else {
            self.entries.push((key, update));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, update: OptionUpdate) -> Self {
        self.insert(key, update);
        self
    }

    /// Builder-style `Set` insertion.
    pub fn set(self, key: impl Into<String>, value: Value) -> Self {
        self.with(key, OptionUpdate::Set(value))
    }

    /// Builder-style `Unset` insertion.
    pub fn unset(self, key: impl Into<String>) -> Self {
        self.with(key, OptionUpdate::Unset)
    }

    /// Builder-style nested merge insertion.
    pub fn merge(self, key: impl Into<String>, nested: UpdateMap) -> Self {
        self.with(key, OptionUpdate::Merge(nested))
    }

    /// Look up the update for `key`.
    pub fn get(&self, key: &str) -> Option<&OptionUpdate> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, u)| u)
    }

    /// Whether `key` is present (including as `Unset`).
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the update has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(key, update)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionUpdate)> {
        self.entries.iter().map(|(k, u)| (k.as_str(), u))
    }

    /// Collapse into a JSON object, dropping `Unset` entries.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(k, u)| u.to_value().map(|v| (k.clone(), v)))
            .collect();
        Value::Object(map)
    }
}

impl From<Map<String, Value>> for UpdateMap {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(k, v)| (k, OptionUpdate::from(v)))
                .collect(),
        }
    }
}

impl FromIterator<(String, OptionUpdate)> for UpdateMap {
    fn from_iter<I: IntoIterator<Item = (String, OptionUpdate)>>(iter: I) -> Self {
        let mut map = UpdateMap::new();
        for (key, update) in iter {
            map.insert(key, update);
        }
        map
    }
}

/// A change observed while applying an update in collector mode.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChange {
    /// Dot-joined path of the changed key.
    pub path: String,
    /// Value after the update (`None` when deleted).
    pub new_value: Option<Value>,
    /// Value before the update (`None` when newly added, and for subtree records).
    pub old_value: Option<Value>,
}

struct Collector<'a> {
    sink: Option<&'a mut dyn FnMut(OptionChange)>,
}

impl Collector<'_> {
    fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    fn emit(&mut self, path: &str, new_value: Option<Value>, old_value: Option<Value>) {
        if let Some(sink) = self.sink.as_mut() {
            sink(OptionChange {
                path: path.to_string(),
                new_value,
                old_value,
            });
        }
    }
}

/// Apply `source` to `target` in place (merge-with-delete).
pub fn apply_option_updates(target: &mut Map<String, Value>, source: &UpdateMap) {
    let mut collector = Collector { sink: None };
    merge_into(target, source, "", &mut collector);
}

/// Apply `source` to `target`, reporting every change to `collector`.
///
/// Leaf records arrive for every key whose value actually changed. After a subtree
/// has been processed, a record for the subtree path follows with a snapshot of the
/// new subtree and no old value, so ancestors are reported deepest-first and the
/// top-level key last.
///
/// Returns `true` if anything changed.
pub fn apply_option_updates_with<F>(
    target: &mut Map<String, Value>,
    source: &UpdateMap,
    mut collector: F,
) -> bool
where
    F: FnMut(OptionChange),
{
    let mut collector = Collector {
        sink: Some(&mut collector),
    };
    merge_into(target, source, "", &mut collector)
}

fn merge_into(
    target: &mut Map<String, Value>,
    source: &UpdateMap,
    base: &str,
    collector: &mut Collector<'_>,
) -> bool {
    let mut changed = false;

    for (key, update) in source.iter() {
        let path = join_path(base, key);
        match update {
            OptionUpdate::Unset => {
                if let Some(old) = target.remove(key) {
                    changed = true;
                    collector.emit(&path, None, Some(old));
                }
            }
            OptionUpdate::Set(value) => {
                let old = target.insert(key.to_string(), value.clone());
                if old.as_ref() != Some(value) {
                    changed = true;
                    collector.emit(&path, Some(value.clone()), old);
                }
            }
            OptionUpdate::Merge(nested) => {
                let created = !matches!(target.get(key), Some(Value::Object(_)));
                if created {
                    target.insert(key.to_string(), Value::Object(Map::new()));
                }
                let Some(Value::Object(child)) = target.get_mut(key) else {
                    continue;
                };
                let nested_changed = merge_into(child, nested, &path, collector);
                if nested_changed || created {
                    changed = true;
                    if collector.is_active() {
                        let snapshot = Value::Object(child.clone());
                        collector.emit(&path, Some(snapshot), None);
                    }
                }
            }
        }
    }

    changed
}

/// Compute the update that reverts `source` once it has been applied to `target`.
///
/// Must be called *before* `source` is applied. Keys that `source` would add are
/// reverted with `Unset`; keys it would overwrite or delete are restored to their
/// current value.
pub fn inverse_updates(target: &Map<String, Value>, source: &UpdateMap) -> UpdateMap {
    let mut inverse = UpdateMap::new();

    for (key, update) in source.iter() {
        let current = target.get(key);
        let revert = match (update, current) {
            (OptionUpdate::Unset, None) => continue,
            (OptionUpdate::Merge(nested), Some(Value::Object(existing))) => {
                OptionUpdate::Merge(inverse_updates(existing, nested))
            }
            (_, Some(old)) => OptionUpdate::Set(old.clone()),
            (_, None) => OptionUpdate::Unset,
        };
        inverse.insert(key, revert);
    }

    inverse
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// One step of an option path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Object key.
    Key(&'a str),
    /// Array index.
    Index(usize),
}

/// Split a path such as `data.items[0].attributes.label` into segments.
///
/// Purely numeric dotted segments are treated as array indexes when walking arrays.
/// Returns `None` for a malformed bracket suffix (`a[0]]`, `a[x]`, `a[0`).
pub fn path_segments(path: &str) -> Option<Vec<PathSegment<'_>>> {
    let mut segments = Vec::new();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }
        while !rest.is_empty() {
            let (index, tail) = rest.strip_prefix('[')?.split_once(']')?;
            segments.push(PathSegment::Index(index.parse().ok()?));
            rest = tail;
        }
    }
    Some(segments)
}

/// Read the value at `path` inside `root`.
pub fn value_at_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path_segments(path)?
        .into_iter()
        .try_fold(root, |node, segment| match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (PathSegment::Index(index), Value::Array(items)) => items.get(index),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_nested_merge_and_delete() {
        let mut target = object(json!({
            "data": { "title": "T", "attributes": { "title": { "fill": "red", "x": 1 } } },
            "padding": 4
        }));
        let update = UpdateMap::new().merge(
            "data",
            UpdateMap::new().merge(
                "attributes",
                UpdateMap::new().merge(
                    "title",
                    UpdateMap::new().unset("x").set("stroke", json!("blue")),
                ),
            ),
        );

        apply_option_updates(&mut target, &update);

        assert_eq!(
            Value::Object(target),
            json!({
                "data": { "title": "T", "attributes": { "title": { "fill": "red", "stroke": "blue" } } },
                "padding": 4
            })
        );
    }

    #[test]
    fn test_primitive_replaced_by_object_and_back() {
        let mut target = object(json!({ "padding": 10, "theme": { "dark": true } }));
        let update = UpdateMap::from_value(json!({ "padding": { "top": 1 }, "theme": null }));
        apply_option_updates(&mut target, &update);
        assert_eq!(
            Value::Object(target),
            json!({ "padding": { "top": 1 }, "theme": null })
        );
    }

    #[test]
    fn test_arrays_are_leaves() {
        let mut target = object(json!({ "padding": [1, 2, 3, 4] }));
        apply_option_updates(&mut target, &UpdateMap::from_value(json!({ "padding": [9] })));
        assert_eq!(target.get("padding"), Some(&json!([9])));
    }

    #[test]
    fn test_empty_source_is_noop() {
        let original = object(json!({ "a": { "b": 1 } }));
        let mut target = original.clone();
        let mut calls = 0;
        let changed = apply_option_updates_with(&mut target, &UpdateMap::new(), |_| calls += 1);
        assert!(!changed);
        assert_eq!(calls, 0);
        assert_eq!(target, original);
    }

    #[test]
    fn test_collector_skips_unchanged_values() {
        let mut target = object(json!({ "a": { "b": 1, "c": 2 } }));
        let mut changes = Vec::new();
        apply_option_updates_with(
            &mut target,
            &UpdateMap::from_value(json!({ "a": { "b": 1 } })),
            |c| changes.push(c),
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_collector_bubbles_deepest_first() {
        let mut target = object(json!({ "a": { "b": { "c": 1 } } }));
        let mut paths = Vec::new();
        apply_option_updates_with(
            &mut target,
            &UpdateMap::from_value(json!({ "a": { "b": { "c": 2 } } })),
            |c| paths.push((c.path, c.old_value)),
        );
        assert_eq!(
            paths,
            vec![
                ("a.b.c".to_string(), Some(json!(1))),
                ("a.b".to_string(), None),
                ("a".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_collector_reports_primitive_to_object_transition() {
        let mut target = object(json!({ "padding": 4 }));
        let mut changes = Vec::new();
        apply_option_updates_with(
            &mut target,
            &UpdateMap::from_value(json!({ "padding": {} })),
            |c| changes.push(c),
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "padding");
        assert_eq!(changes[0].new_value, Some(json!({})));
    }

    #[test]
    fn test_collector_snapshot_is_independent() {
        let mut target = object(json!({ "a": { "b": 1 } }));
        let mut snapshots = Vec::new();
        apply_option_updates_with(
            &mut target,
            &UpdateMap::from_value(json!({ "a": { "b": 2 } })),
            |c| snapshots.push(c),
        );
        let mut bubbled = snapshots.pop().and_then(|c| c.new_value).unwrap();
        bubbled["b"] = json!(99);
        assert_eq!(target["a"]["b"], json!(2));
    }

    #[test]
    fn test_proto_key_is_an_ordinary_key() {
        let source: Value = serde_json::from_str(r#"{"__proto__":{"polluted":true}}"#).unwrap();
        let mut target = Map::new();
        apply_option_updates(&mut target, &UpdateMap::from_value(source));

        assert_eq!(target.len(), 1);
        assert_eq!(target["__proto__"], json!({ "polluted": true }));
        assert!(target.get("polluted").is_none());
        assert!(Map::<String, Value>::new().get("polluted").is_none());
    }

    #[test]
    fn test_inverse_round_trip() {
        let original = object(json!({
            "viewBox": "0 0 10 10",
            "data": { "title": "A", "items": [1, 2] },
            "padding": 3
        }));
        let update = UpdateMap::from_value(json!({
            "viewBox": "5 5 20 20",
            "data": { "title": "B", "desc": "new", "items": [3] },
            "padding": { "top": 2 },
            "fresh": { "nested": true }
        }));

        let mut target = original.clone();
        let inverse = inverse_updates(&target, &update);
        apply_option_updates(&mut target, &update);
        assert_ne!(target, original);
        apply_option_updates(&mut target, &inverse);
        assert_eq!(target, original);
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(
            path_segments("data.items[0].children[2].attributes.label"),
            Some(vec![
                PathSegment::Key("data"),
                PathSegment::Key("items"),
                PathSegment::Index(0),
                PathSegment::Key("children"),
                PathSegment::Index(2),
                PathSegment::Key("attributes"),
                PathSegment::Key("label"),
            ])
        );

        let root = json!({ "data": { "items": [{ "label": "x" }] } });
        assert_eq!(value_at_path(&root, "data.items[0].label"), Some(&json!("x")));
        assert_eq!(value_at_path(&root, "data.items.0.label"), Some(&json!("x")));
        assert_eq!(value_at_path(&root, "data.missing"), None);
    }

    #[test]
    fn test_malformed_paths_resolve_to_nothing() {
        let root = json!({ "a": [1], "é": [2] });
        for path in ["a[0]]", "a[0", "a[x]", "a[0]x", "a[é]", "é[0]]", "[]", "a[-1]"] {
            assert_eq!(path_segments(path), None, "{path}");
            assert_eq!(value_at_path(&root, path), None, "{path}");
        }
        assert_eq!(value_at_path(&root, "é[0]"), Some(&json!(2)));
    }
}
