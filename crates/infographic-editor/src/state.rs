//! Options Model State
//!
//! [`StateManager`] owns the live options/document model of one editor session and is
//! its single writer.
//!
//! # Overview
//!
//! The model is a JSON object:
//!
//! ```text
//! {
//!   "data": {
//!     "title": "...", "desc": "...",
//!     "items": [ { "label": "...", "children": [ ... ], "attributes": { "label": { ... } } } ],
//!     "attributes": { "title": { ... } }
//!   },
//!   "viewBox": "x y width height",
//!   "padding": 8
//! }
//! ```
//!
//! Every mutation runs synchronously in three steps:
//!
//! 1. mutate the model (and bump the version number);
//! 2. emit the semantic event (`options:data:item:add`, `viewBox:change`, ...);
//! 3. emit the generic `options:change` change log.
//!
//! No borrow of the model is held while listeners run, so listeners may read the
//! model (or even mutate it again) from inside their callbacks.
//!
//! # Example
//!
//! ```rust
//! use infographic_editor::{EventBus, StateManager};
//! use serde_json::json;
//!
//! let state = StateManager::new(json!({ "data": { "items": [{ "label": "A" }] } }), EventBus::new());
//! state.add_item_datum(&[1], json!({ "label": "B" })).unwrap();
//! assert_eq!(state.get_options()["data"]["items"][1]["label"], "B");
//! assert_eq!(state.version(), 1);
//! ```

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::events::{ChangeOp, ChangeRecord, EditorEvent, EventBus, OptionsChange, SubscriptionId};
use crate::host::{ElementRef, INDEXES_ATTRIBUTE, ROLE_ATTRIBUTE};
use crate::merge::{
    OptionChange, OptionUpdate, UpdateMap, apply_option_updates_with, value_at_path,
};
use crate::viewport::{Padding, ViewBox};

/// Errors returned by model mutations addressed by index path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// An index path must contain at least one index.
    #[error("index path is empty")]
    EmptyIndexPath,
    /// The index path does not address an existing item or collection.
    #[error("index path {indexes:?} does not resolve to an item")]
    InvalidIndexPath {
        /// The offending index path.
        indexes: Vec<usize>,
    },
    /// A value on the way to the target is not an object.
    #[error("`{path}` is not an object")]
    NotAnObject {
        /// Options path of the value.
        path: String,
    },
    /// A collection on the way to the target is not an array.
    #[error("`{path}` is not an array")]
    NotAnArray {
        /// Options path of the value.
        path: String,
    },
}

/// Semantic role of a rendered element, read from its role marker attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRole {
    /// Document title.
    Title,
    /// Document description.
    Desc,
    /// Document illustration.
    Illus,
    /// Item label.
    ItemLabel,
    /// Item description.
    ItemDesc,
    /// Item icon.
    ItemIcon,
    /// Item value.
    ItemValue,
    /// Item illustration.
    ItemIllus,
}

impl ElementRole {
    /// Parse a role marker (`"title"`, `"item-label"`, ...).
    pub fn from_marker(marker: &str) -> Option<Self> {
        Some(match marker {
            "title" => ElementRole::Title,
            "desc" => ElementRole::Desc,
            "illus" => ElementRole::Illus,
            "item-label" => ElementRole::ItemLabel,
            "item-desc" => ElementRole::ItemDesc,
            "item-icon" => ElementRole::ItemIcon,
            "item-value" => ElementRole::ItemValue,
            "item-illus" => ElementRole::ItemIllus,
            _ => return None,
        })
    }

    /// The role marker string.
    pub fn as_marker(self) -> &'static str {
        match self {
            ElementRole::Title => "title",
            ElementRole::Desc => "desc",
            ElementRole::Illus => "illus",
            ElementRole::ItemLabel => "item-label",
            ElementRole::ItemDesc => "item-desc",
            ElementRole::ItemIcon => "item-icon",
            ElementRole::ItemValue => "item-value",
            ElementRole::ItemIllus => "item-illus",
        }
    }

    /// Key of the role inside an `attributes` map.
    pub fn attribute_key(self) -> &'static str {
        match self {
            ElementRole::Title => "title",
            ElementRole::Desc | ElementRole::ItemDesc => "desc",
            ElementRole::Illus | ElementRole::ItemIllus => "illus",
            ElementRole::ItemLabel => "label",
            ElementRole::ItemIcon => "icon",
            ElementRole::ItemValue => "value",
        }
    }

    /// Whether the role belongs to an item rather than to the document.
    pub fn is_item_scoped(self) -> bool {
        matches!(
            self,
            ElementRole::ItemLabel
                | ElementRole::ItemDesc
                | ElementRole::ItemIcon
                | ElementRole::ItemValue
                | ElementRole::ItemIllus
        )
    }
}

/// Where element-scoped style attributes live in the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementTarget {
    /// Role of the element.
    pub role: ElementRole,
    /// Item index path for item-scoped roles.
    pub indexes: Option<Vec<usize>>,
}

impl ElementTarget {
    /// Target for a document-scoped role.
    pub fn document(role: ElementRole) -> Self {
        Self {
            role,
            indexes: None,
        }
    }

    /// Target for an item-scoped role.
    pub fn item(role: ElementRole, indexes: Vec<usize>) -> Self {
        Self {
            role,
            indexes: Some(indexes),
        }
    }

    /// Classify a rendered element by its role marker and index attribute.
    ///
    /// Returns `None` (with a warning) for unknown roles and for item-scoped roles
    /// without a readable index path.
    pub fn resolve(element: &dyn ElementRef) -> Option<Self> {
        let Some(marker) = element.attribute(ROLE_ATTRIBUTE) else {
            tracing::warn!("element has no role marker");
            return None;
        };
        let Some(role) = ElementRole::from_marker(&marker) else {
            tracing::warn!(marker = %marker, "unsupported element role");
            return None;
        };
        if !role.is_item_scoped() {
            return Some(Self::document(role));
        }

        let raw = element.attribute(INDEXES_ATTRIBUTE).unwrap_or_default();
        match parse_indexes(&raw) {
            Some(indexes) => Some(Self::item(role, indexes)),
            None => {
                tracing::warn!(marker = %marker, indexes = %raw, "item element without a valid index path");
                None
            }
        }
    }

    /// Options path of the attribute object (`data.items[0].attributes.label`).
    pub fn path(&self) -> String {
        match &self.indexes {
            Some(indexes) => format!(
                "{}.attributes.{}",
                item_path(indexes),
                self.role.attribute_key()
            ),
            None => format!("data.attributes.{}", self.role.attribute_key()),
        }
    }
}

/// Parse a dotted index path (`"0.2.1"`).
pub fn parse_indexes(raw: &str) -> Option<Vec<usize>> {
    let indexes: Vec<usize> = raw
        .split('.')
        .map(|part| part.trim().parse::<usize>().ok())
        .collect::<Option<_>>()?;
    (!indexes.is_empty()).then_some(indexes)
}

/// Options path of an item (`data.items[0].children[2]`).
pub fn item_path(indexes: &[usize]) -> String {
    let mut path = String::from("data");
    for (depth, index) in indexes.iter().enumerate() {
        let collection = if depth == 0 { "items" } else { "children" };
        path.push_str(&format!(".{collection}[{index}]"));
    }
    path
}

struct StateInner {
    options: RefCell<Value>,
    version: Cell<u64>,
    events: EventBus,
}

/// Single writer of the options model.
///
/// Cloning yields another handle to the same model.
#[derive(Clone)]
pub struct StateManager {
    inner: Rc<StateInner>,
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("version", &self.inner.version.get())
            .finish_non_exhaustive()
    }
}

impl StateManager {
    /// Create a state manager over `options`, announcing changes on `events`.
    ///
    /// A non-object `options` value is replaced by an empty object.
    pub fn new(options: Value, events: EventBus) -> Self {
        let options = match options {
            Value::Object(_) => options,
            other => {
                tracing::warn!(?other, "options must be an object, starting empty");
                Value::Object(Map::new())
            }
        };
        Self {
            inner: Rc::new(StateInner {
                options: RefCell::new(options),
                version: Cell::new(0),
                events,
            }),
        }
    }

    /// The live model.
    ///
    /// The borrow must be released before calling any mutating method.
    pub fn get_options(&self) -> Ref<'_, Value> {
        self.inner.options.borrow()
    }

    /// A deep copy of the model.
    pub fn options_snapshot(&self) -> Value {
        self.inner.options.borrow().clone()
    }

    /// Copy of the value at a dotted path.
    pub fn value_at(&self, path: &str) -> Option<Value> {
        value_at_path(&self.inner.options.borrow(), path).cloned()
    }

    /// Copy of the item at `indexes`.
    pub fn item(&self, indexes: &[usize]) -> Option<Value> {
        self.value_at(&item_path(indexes))
    }

    /// The `viewBox` option, if set and well-formed.
    pub fn view_box(&self) -> Option<ViewBox> {
        let raw = self.value_at("viewBox")?;
        let raw = raw.as_str()?;
        match raw.parse() {
            Ok(view_box) => Some(view_box),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed viewBox option");
                None
            }
        }
    }

    /// The `padding` option normalized to four sides.
    pub fn padding(&self) -> Option<Padding> {
        self.value_at("padding").as_ref().and_then(Padding::from_value)
    }

    /// The event bus changes are announced on.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to every editor event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    /// Current version number (incremented after each mutation).
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Check if the model has changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version() > version
    }

    /// Insert one or more items at `indexes`.
    ///
    /// All but the last index locate the parent item; the last index is the insert
    /// position inside the parent's `children` (or `data.items` at the top level),
    /// clamped to the collection length. Missing collections are created.
    pub fn add_item_datum(&self, indexes: &[usize], datum: Value) -> Result<(), StateError> {
        let items = match datum {
            Value::Array(items) => items,
            single => vec![single],
        };
        let (&last, parent) = indexes.split_last().ok_or(StateError::EmptyIndexPath)?;

        let indexes = {
            let mut options = self.inner.options.borrow_mut();
            let collection = collection_mut(&mut options, parent, true)?;
            let at = last.min(collection.len());
            collection.splice(at..at, items.iter().cloned());
            let mut resolved = parent.to_vec();
            resolved.push(at);
            resolved
        };
        self.bump_version();

        self.emit(EditorEvent::ItemAdd {
            indexes: indexes.clone(),
            items: items.clone(),
        });
        let value = Value::Array(items);
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Add,
                path: "data.items".to_string(),
                indexes: Some(indexes),
                value: Some(value),
            },
            Vec::new(),
        );
        Ok(())
    }

    /// Shallow-assign fields of the item at `indexes`.
    ///
    /// `Set` and `Merge` entries replace the field wholesale; `Unset` removes it.
    pub fn update_item_datum(&self, indexes: &[usize], patch: &UpdateMap) -> Result<(), StateError> {
        let item = {
            let mut options = self.inner.options.borrow_mut();
            let item = item_mut(&mut options, indexes)?;
            for (key, update) in patch.iter() {
                match update.to_value() {
                    Some(value) => {
                        item.insert(key.to_string(), value);
                    }
                    None => {
                        item.remove(key);
                    }
                }
            }
            Value::Object(item.clone())
        };
        self.bump_version();

        let patch = patch.to_value();
        self.emit(EditorEvent::ItemUpdate {
            indexes: indexes.to_vec(),
            patch: patch.clone(),
            item,
        });
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Update,
                path: "data.items".to_string(),
                indexes: Some(indexes.to_vec()),
                value: Some(patch),
            },
            Vec::new(),
        );
        Ok(())
    }

    /// Remove `count` items starting at `indexes`, returning them.
    pub fn remove_item_datum(&self, indexes: &[usize], count: usize) -> Result<Vec<Value>, StateError> {
        let (&first, parent) = indexes.split_last().ok_or(StateError::EmptyIndexPath)?;

        let removed: Vec<Value> = {
            let mut options = self.inner.options.borrow_mut();
            let collection = collection_mut(&mut options, parent, false)?;
            if first >= collection.len() {
                return Err(StateError::InvalidIndexPath {
                    indexes: indexes.to_vec(),
                });
            }
            let end = first.saturating_add(count).min(collection.len());
            collection.drain(first..end).collect()
        };
        self.bump_version();

        self.emit(EditorEvent::ItemRemove {
            indexes: indexes.to_vec(),
            items: removed.clone(),
        });
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Remove,
                path: "data.items".to_string(),
                indexes: Some(indexes.to_vec()),
                value: Some(Value::Array(removed.clone())),
            },
            Vec::new(),
        );
        Ok(removed)
    }

    /// Set (or with `None`, remove) a top-level data field such as `title`.
    pub fn update_data(&self, key: &str, value: Option<Value>) -> Result<(), StateError> {
        let old_value = {
            let mut options = self.inner.options.borrow_mut();
            let data = data_mut(&mut options)?;
            match &value {
                Some(v) => data.insert(key.to_string(), v.clone()),
                None => data.remove(key),
            }
        };
        self.bump_version();

        let path = format!("data.{key}");
        self.emit(EditorEvent::DataUpdate {
            key: key.to_string(),
            value: value.clone(),
            old_value: old_value.clone(),
        });
        let diff = vec![OptionChange {
            path: path.clone(),
            new_value: value.clone(),
            old_value,
        }];
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Update,
                path,
                indexes: None,
                value,
            },
            diff,
        );
        Ok(())
    }

    /// Merge style attributes into the model for a rendered element.
    ///
    /// `props` carries the update under its `attributes` key. Elements without a
    /// recognizable role are ignored with a warning and `Ok(false)` is returned.
    pub fn update_element(&self, element: &dyn ElementRef, props: &UpdateMap) -> Result<bool, StateError> {
        let Some(target) = ElementTarget::resolve(element) else {
            return Ok(false);
        };
        let attributes = match props.get("attributes") {
            Some(OptionUpdate::Merge(attributes)) => attributes,
            _ => return Ok(false),
        };
        self.update_element_target(&target, attributes)?;
        Ok(true)
    }

    /// Merge `attributes` into the attribute object addressed by `target`.
    pub fn update_element_target(&self, target: &ElementTarget, attributes: &UpdateMap) -> Result<(), StateError> {
        let path = target.path();
        let (merged, diff) = {
            let mut options = self.inner.options.borrow_mut();
            let role_attributes = element_attributes_mut(&mut options, target)?;
            let mut diff = Vec::new();
            apply_option_updates_with(role_attributes, attributes, |mut change| {
                change.path = format!("{path}.{}", change.path);
                diff.push(change);
            });
            (Value::Object(role_attributes.clone()), diff)
        };
        self.bump_version();

        self.emit(EditorEvent::ElementUpdate {
            role: target.role,
            path: path.clone(),
            attributes: merged,
        });
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Update,
                path,
                indexes: target.indexes.clone(),
                value: Some(attributes.to_value()),
            },
            diff,
        );
        Ok(())
    }

    /// Copy of the attribute object addressed by `target` (empty when absent).
    pub fn element_attributes(&self, target: &ElementTarget) -> Map<String, Value> {
        match self.value_at(&target.path()) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Deep merge-with-delete `update` into the whole model.
    pub fn update_options(&self, update: &UpdateMap) {
        let mut diff = Vec::new();
        let view_box = {
            let mut options = self.inner.options.borrow_mut();
            let Some(root) = options.as_object_mut() else {
                return;
            };
            apply_option_updates_with(root, update, |change| diff.push(change));
            root.get("viewBox").map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };
        self.bump_version();

        if update.contains_key("viewBox") {
            self.emit(EditorEvent::ViewBoxChange { view_box });
        }
        self.emit_change(
            ChangeRecord {
                op: ChangeOp::Update,
                path: String::new(),
                indexes: None,
                value: Some(update.to_value()),
            },
            diff,
        );
    }

    fn bump_version(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
    }

    fn emit(&self, event: EditorEvent) {
        self.inner.events.emit(&event);
    }

    fn emit_change(&self, record: ChangeRecord, diff: Vec<OptionChange>) {
        self.emit(EditorEvent::OptionsChange(OptionsChange {
            records: vec![record],
            diff,
        }));
    }
}

fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a mut Map<String, Value>, StateError> {
    map.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| StateError::NotAnObject {
            path: path.to_string(),
        })
}

fn data_mut(options: &mut Value) -> Result<&mut Map<String, Value>, StateError> {
    let root = options.as_object_mut().ok_or_else(|| StateError::NotAnObject {
        path: String::new(),
    })?;
    object_entry(root, "data", "data")
}

/// Resolve `parent` without touching the model.
///
/// With `create`, only the collection the path ends in may be missing.
fn check_collection(options: &Value, parent: &[usize], create: bool) -> Result<(), StateError> {
    let invalid = || StateError::InvalidIndexPath {
        indexes: parent.to_vec(),
    };

    let root = options.as_object().ok_or_else(|| StateError::NotAnObject {
        path: String::new(),
    })?;
    let data = match root.get("data") {
        Some(Value::Object(data)) => data,
        Some(_) => {
            return Err(StateError::NotAnObject {
                path: "data".to_string(),
            });
        }
        None if create && parent.is_empty() => return Ok(()),
        None => return Err(invalid()),
    };
    let mut collection = match data.get("items") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(StateError::NotAnArray {
                path: "data.items".to_string(),
            });
        }
        None if create && parent.is_empty() => return Ok(()),
        None => return Err(invalid()),
    };

    for (depth, &index) in parent.iter().enumerate() {
        let item = collection
            .get(index)
            .and_then(Value::as_object)
            .ok_or_else(invalid)?;
        collection = match item.get("children") {
            Some(Value::Array(children)) => children,
            Some(_) => {
                return Err(StateError::NotAnArray {
                    path: format!("{}.children", item_path(&parent[..=depth])),
                });
            }
            None if create && depth + 1 == parent.len() => return Ok(()),
            None => return Err(invalid()),
        };
    }
    Ok(())
}

fn collection_mut<'a>(
    options: &'a mut Value,
    parent: &[usize],
    create: bool,
) -> Result<&'a mut Vec<Value>, StateError> {
    check_collection(options, parent, create)?;
    let invalid = || StateError::InvalidIndexPath {
        indexes: parent.to_vec(),
    };

    let data = data_mut(options)?;
    if !create && !data.contains_key("items") {
        return Err(invalid());
    }
    let mut collection = match data
        .entry("items")
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => items,
        _ => {
            return Err(StateError::NotAnArray {
                path: "data.items".to_string(),
            });
        }
    };

    for (depth, &index) in parent.iter().enumerate() {
        let item = collection
            .get_mut(index)
            .and_then(Value::as_object_mut)
            .ok_or_else(invalid)?;
        if !create && !item.contains_key("children") {
            return Err(invalid());
        }
        collection = match item
            .entry("children")
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(children) => children,
            _ => {
                return Err(StateError::NotAnArray {
                    path: format!("{}.children", item_path(&parent[..=depth])),
                });
            }
        };
    }

    Ok(collection)
}

fn item_mut<'a>(options: &'a mut Value, indexes: &[usize]) -> Result<&'a mut Map<String, Value>, StateError> {
    let (&last, parent) = indexes.split_last().ok_or(StateError::EmptyIndexPath)?;
    collection_mut(options, parent, false)?
        .get_mut(last)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StateError::InvalidIndexPath {
            indexes: indexes.to_vec(),
        })
}

fn element_attributes_mut<'a>(
    options: &'a mut Value,
    target: &ElementTarget,
) -> Result<&'a mut Map<String, Value>, StateError> {
    let (owner, owner_path) = match &target.indexes {
        Some(indexes) => (item_mut(options, indexes)?, item_path(indexes)),
        None => (data_mut(options)?, "data".to_string()),
    };
    let attributes_path = format!("{owner_path}.attributes");
    let attributes = object_entry(owner, "attributes", &attributes_path)?;
    let key = target.role.attribute_key();
    object_entry(attributes, key, &format!("{attributes_path}.{key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> StateManager {
        StateManager::new(
            json!({ "data": { "items": [{ "label": "A", "children": [{ "label": "A1" }] }] } }),
            EventBus::new(),
        )
    }

    #[test]
    fn test_item_path_formatting() {
        assert_eq!(item_path(&[0]), "data.items[0]");
        assert_eq!(item_path(&[1, 2]), "data.items[1].children[2]");
        assert_eq!(
            ElementTarget::item(ElementRole::ItemIcon, vec![0, 1]).path(),
            "data.items[0].children[1].attributes.icon"
        );
        assert_eq!(
            ElementTarget::document(ElementRole::Title).path(),
            "data.attributes.title"
        );
    }

    #[test]
    fn test_parse_indexes() {
        assert_eq!(parse_indexes("0"), Some(vec![0]));
        assert_eq!(parse_indexes("1.2"), Some(vec![1, 2]));
        assert_eq!(parse_indexes(""), None);
        assert_eq!(parse_indexes("a.1"), None);
    }

    #[test]
    fn test_nested_add_and_remove() {
        let state = state();
        state.add_item_datum(&[0, 0], json!({ "label": "A0" })).unwrap();
        assert_eq!(
            state.item(&[0]).unwrap()["children"],
            json!([{ "label": "A0" }, { "label": "A1" }])
        );

        let removed = state.remove_item_datum(&[0, 1], 5).unwrap();
        assert_eq!(removed, vec![json!({ "label": "A1" })]);
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn test_invalid_paths_are_errors() {
        let state = state();
        assert_eq!(
            state.remove_item_datum(&[], 1),
            Err(StateError::EmptyIndexPath)
        );
        assert_eq!(
            state.update_item_datum(&[3], &UpdateMap::new()),
            Err(StateError::InvalidIndexPath { indexes: vec![3] })
        );
        assert!(state.remove_item_datum(&[0, 0, 0], 1).is_err());
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn test_rejected_paths_leave_model_untouched() {
        let state = StateManager::new(json!({ "data": { "items": [{ "label": "A" }] } }), EventBus::new());
        let before = state.options_snapshot();

        assert_eq!(
            state.add_item_datum(&[0, 5, 0], json!({ "label": "X" })),
            Err(StateError::InvalidIndexPath { indexes: vec![0, 5] })
        );
        assert!(state.update_item_datum(&[0, 0], &UpdateMap::new()).is_err());
        assert_eq!(state.options_snapshot(), before);

        let empty = StateManager::new(json!({}), EventBus::new());
        assert!(empty.remove_item_datum(&[0], 1).is_err());
        assert_eq!(empty.options_snapshot(), json!({}));
        assert_eq!(state.version() + empty.version(), 0);
    }

    #[test]
    fn test_view_box_change_follows_the_view_box_key() {
        let events = EventBus::new();
        let state = StateManager::new(json!({ "viewBox": "0 0 10 10" }), events.clone());
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
        let sink = seen.clone();
        events.subscribe(move |event| {
            if let EditorEvent::ViewBoxChange { view_box } = event {
                sink.borrow_mut().push(view_box.clone());
            }
        });

        state.update_options(&UpdateMap::new().set("viewBox", json!("1 2 3 4")));
        state.update_options(&UpdateMap::new().set("padding", json!(4)));
        state.update_options(&UpdateMap::new().unset("viewBox"));
        state.update_options(&UpdateMap::new().unset("viewBox"));

        assert_eq!(
            *seen.borrow(),
            vec![Some("1 2 3 4".to_string()), None, None]
        );
    }

    #[test]
    fn test_add_creates_missing_collection() {
        let state = StateManager::new(json!({}), EventBus::new());
        state.add_item_datum(&[0], json!({ "label": "A" })).unwrap();
        state.add_item_datum(&[0, 0], json!({ "label": "A1" })).unwrap();
        assert_eq!(
            state.options_snapshot(),
            json!({ "data": { "items": [{ "label": "A", "children": [{ "label": "A1" }] }] } })
        );
    }

    #[test]
    fn test_update_data_removes_with_none() {
        let state = state();
        state.update_data("title", Some(json!("Hello"))).unwrap();
        assert_eq!(state.value_at("data.title"), Some(json!("Hello")));
        state.update_data("title", None).unwrap();
        assert_eq!(state.value_at("data.title"), None);
    }

    #[test]
    fn test_non_object_options_start_empty() {
        let state = StateManager::new(json!([1, 2]), EventBus::new());
        assert_eq!(*state.get_options(), json!({}));
    }
}
