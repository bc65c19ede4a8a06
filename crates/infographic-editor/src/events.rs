//! Typed, synchronous publish/subscribe for editor events.
//!
//! Every mutation of the options model, every selection change and every history
//! change is announced as an [`EditorEvent`]. Delivery is synchronous and in
//! subscription order: by the time a mutating call returns, all listeners have run.
//!
//! # Example
//!
//! ```rust
//! use infographic_editor::{EditorEvent, EventBus};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let bus = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//! let counter = seen.clone();
//! let id = bus.subscribe(move |event| {
//!     if event.topic() == "viewBox:change" {
//!         counter.set(counter.get() + 1);
//!     }
//! });
//!
//! bus.emit(&EditorEvent::ViewBoxChange { view_box: None });
//! bus.unsubscribe(id);
//! bus.emit(&EditorEvent::ViewBoxChange { view_box: None });
//! assert_eq!(seen.get(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::commands::HistoryState;
use crate::interaction::SelectionChange;
use crate::merge::OptionChange;
use crate::state::ElementRole;

/// Kind of structural change recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Something was inserted.
    Add,
    /// Something was modified in place.
    Update,
    /// Something was removed.
    Remove,
}

/// One entry of the generic change log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Kind of change.
    pub op: ChangeOp,
    /// Options path the change applies to (empty for the root).
    pub path: String,
    /// Item index path, for item-level changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<usize>>,
    /// Payload of the change (inserted items, removed items, new value, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Payload of the generic `options:change` event.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsChange {
    /// Structured change log.
    pub records: Vec<ChangeRecord>,
    /// Per-path value changes, deepest-first, used to drive view synchronization.
    pub diff: Vec<OptionChange>,
}

/// Everything the editor announces.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Generic change log entry; fires after every model mutation.
    OptionsChange(OptionsChange),
    /// Items were inserted.
    ItemAdd {
        /// Index path of the first inserted item.
        indexes: Vec<usize>,
        /// Inserted items.
        items: Vec<Value>,
    },
    /// An item was shallow-updated.
    ItemUpdate {
        /// Index path of the item.
        indexes: Vec<usize>,
        /// Fields that were assigned (deleted fields are absent).
        patch: Value,
        /// The item after the update.
        item: Value,
    },
    /// Items were removed.
    ItemRemove {
        /// Index path of the first removed item.
        indexes: Vec<usize>,
        /// Removed items, in order.
        items: Vec<Value>,
    },
    /// A top-level data field changed.
    DataUpdate {
        /// Field name (`title`, `desc`, ...).
        key: String,
        /// New value (`None` when removed).
        value: Option<Value>,
        /// Previous value.
        old_value: Option<Value>,
    },
    /// Element-scoped style attributes were merged.
    ElementUpdate {
        /// Role of the element.
        role: ElementRole,
        /// Options path of the merged attribute object.
        path: String,
        /// The attribute object after the merge.
        attributes: Value,
    },
    /// The `viewBox` option was part of an options update.
    ViewBoxChange {
        /// Resolved viewBox string, `None` when absent (fit to content).
        view_box: Option<String>,
    },
    /// The interaction selection changed.
    SelectionChange(SelectionChange),
    /// The undo/redo stacks changed.
    HistoryChange(HistoryState),
}

impl EditorEvent {
    /// Topic name of the event.
    pub fn topic(&self) -> &'static str {
        match self {
            EditorEvent::OptionsChange(_) => "options:change",
            EditorEvent::ItemAdd { .. } => "options:data:item:add",
            EditorEvent::ItemUpdate { .. } => "options:data:item:update",
            EditorEvent::ItemRemove { .. } => "options:data:item:remove",
            EditorEvent::DataUpdate { .. } => "options:data:update",
            EditorEvent::ElementUpdate { .. } => "options:element:update",
            EditorEvent::ViewBoxChange { .. } => "viewBox:change",
            EditorEvent::SelectionChange(_) => "selection:change",
            EditorEvent::HistoryChange(_) => "history:change",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Event listener type.
pub type EventListener = Box<dyn FnMut(&EditorEvent)>;

#[derive(Clone)]
enum ListenerCell {
    /// Mutable listener; skipped while it is already running.
    Exclusive(Rc<RefCell<EventListener>>),
    /// Shared listener; also receives events emitted from inside its own callback.
    Reentrant(Rc<dyn Fn(&EditorEvent)>),
}

#[derive(Default)]
struct BusInner {
    listeners: RefCell<Vec<(SubscriptionId, ListenerCell)>>,
    next_id: Cell<u64>,
}

/// Synchronous event bus shared by the editor components.
///
/// Cloning the bus yields another handle to the same listener list.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EditorEvent) + 'static,
    {
        let listener: EventListener = Box::new(listener);
        self.push(ListenerCell::Exclusive(Rc::new(RefCell::new(listener))))
    }

    /// Register a listener that stays reachable while it is running.
    ///
    /// Events emitted from inside the callback (for example a model mutation
    /// made by a view sync handler) are delivered to it again, nested.
    pub fn subscribe_reentrant<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&EditorEvent) + 'static,
    {
        self.push(ListenerCell::Reentrant(Rc::new(listener)))
    }

    fn push(&self, listener: ListenerCell) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.listeners.borrow_mut().retain(|(i, _)| *i != id);
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Deliver `event` to every listener, in subscription order.
    ///
    /// A [`subscribe`](Self::subscribe) listener that emits from inside its own
    /// callback does not receive the nested event; the nested delivery to other
    /// listeners still happens. Reentrant listeners always receive it.
    pub fn emit(&self, event: &EditorEvent) {
        let listeners: Vec<ListenerCell> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();

        for listener in listeners {
            match listener {
                ListenerCell::Reentrant(callback) => callback(event),
                ListenerCell::Exclusive(cell) => match cell.try_borrow_mut() {
                    Ok(mut callback) => (*callback)(event),
                    Err(_) => {
                        tracing::warn!(topic = event.topic(), "listener re-entered, event skipped");
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_box(value: &str) -> EditorEvent {
        EditorEvent::ViewBoxChange {
            view_box: Some(value.to_string()),
        }
    }

    #[test]
    fn test_nested_emit_skips_running_listener_only() {
        let bus = EventBus::new();
        let outer = Rc::new(Cell::new(0));
        let other = Rc::new(Cell::new(0));

        let handle = bus.clone();
        let count = outer.clone();
        bus.subscribe(move |event| {
            count.set(count.get() + 1);
            if matches!(event, EditorEvent::ViewBoxChange { view_box: Some(v) } if v == "outer") {
                handle.emit(&view_box("inner"));
            }
        });
        let count = other.clone();
        bus.subscribe(move |_| count.set(count.get() + 1));

        bus.emit(&view_box("outer"));

        assert_eq!(outer.get(), 1);
        assert_eq!(other.get(), 2);
    }

    #[test]
    fn test_reentrant_listener_sees_nested_emit() {
        let bus = EventBus::new();
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();

        let handle = bus.clone();
        let sink = seen.clone();
        let id = bus.subscribe_reentrant(move |event| {
            if let EditorEvent::ViewBoxChange { view_box: value } = event {
                sink.borrow_mut().push(value.clone());
                if value.as_deref() == Some("outer") {
                    handle.emit(&view_box("inner"));
                }
            }
        });

        bus.emit(&view_box("outer"));
        bus.unsubscribe(id);
        bus.emit(&view_box("late"));

        assert_eq!(
            *seen.borrow(),
            vec![Some("outer".to_string()), Some("inner".to_string())]
        );
        assert_eq!(bus.listener_count(), 0);
    }
}
