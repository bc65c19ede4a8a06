//! Path-keyed view synchronization.
//!
//! A [`SyncRegistry`] maps dotted option paths (`"viewBox"`, `"padding"`,
//! `"data.title"`, ...) to side-effecting handlers. The editor fans every options
//! change out to [`SyncRegistry::trigger`], and the handlers update the host surface.
//!
//! Dispatch is exact-path only; ancestor bubbling is done by the caller (the merge
//! collector already reports every ancestor path of a changed leaf).
//!
//! A handler that re-triggers the path currently being dispatched is not run again:
//! the nested trigger is dropped with a warning and the outer dispatch carries on.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

/// Handler invoked with `(new_value, old_value)`.
pub type SyncHandler = Box<dyn FnMut(Option<&Value>, Option<&Value>)>;

/// Reads the current value at a path from the options model.
pub type OptionsGetter = Rc<dyn Fn(&str) -> Option<Value>>;

/// Registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Run the handler once right away with the current value.
    pub immediate: bool,
}

impl SyncOptions {
    /// Options with `immediate` set.
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

type HandlerCell = Rc<RefCell<SyncHandler>>;

struct RegistryInner {
    handlers: RefCell<HashMap<String, Vec<(u64, HandlerCell)>>>,
    dispatching: RefCell<HashSet<String>>,
    next_id: Cell<u64>,
    destroyed: Cell<bool>,
    getter: OptionsGetter,
}

/// Registry of path-keyed synchronization handlers.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct SyncRegistry {
    inner: Rc<RegistryInner>,
}

impl fmt::Debug for SyncRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncRegistry")
            .field("paths", &self.inner.handlers.borrow().len())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

/// Removes one registered handler.
///
/// Calling [`unregister`](SyncHandle::unregister) more than once is harmless.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    registry: Weak<RegistryInner>,
    path: String,
    id: u64,
}

impl SyncHandle {
    /// Remove the handler this handle was returned for.
    pub fn unregister(&self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut handlers = inner.handlers.borrow_mut();
        if let Some(list) = handlers.get_mut(&self.path) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                handlers.remove(&self.path);
            }
        }
    }
}

// Clears the in-flight marker even if a handler panics.
struct DispatchGuard<'a> {
    dispatching: &'a RefCell<HashSet<String>>,
    path: &'a str,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.dispatching.borrow_mut().remove(self.path);
    }
}

impl SyncRegistry {
    /// Create a registry reading current values through `getter`.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + 'static,
    {
        Self {
            inner: Rc::new(RegistryInner {
                handlers: RefCell::new(HashMap::new()),
                dispatching: RefCell::new(HashSet::new()),
                next_id: Cell::new(0),
                destroyed: Cell::new(false),
                getter: Rc::new(getter),
            }),
        }
    }

    /// Register `handler` for `path`.
    pub fn register<F>(&self, path: &str, handler: F, options: SyncOptions) -> SyncHandle
    where
        F: FnMut(Option<&Value>, Option<&Value>) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let handle = SyncHandle {
            registry: Rc::downgrade(&self.inner),
            path: path.to_string(),
            id,
        };
        if self.inner.destroyed.get() {
            tracing::debug!(path, "sync registry destroyed, handler ignored");
            return handle;
        }

        let handler: SyncHandler = Box::new(handler);
        let cell = Rc::new(RefCell::new(handler));
        self.inner
            .handlers
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push((id, cell.clone()));

        if options.immediate {
            let current = (self.inner.getter)(path);
            let mut handler = cell.borrow_mut();
            (*handler)(current.as_ref(), None);
        }

        handle
    }

    /// Invoke every handler registered at exactly `path`.
    pub fn trigger(&self, path: &str, new_value: Option<&Value>, old_value: Option<&Value>) {
        if self.inner.destroyed.get() {
            return;
        }
        if self.inner.dispatching.borrow().contains(path) {
            tracing::warn!(path, "recursive sync trigger dropped");
            return;
        }

        let handlers: Vec<HandlerCell> = match self.inner.handlers.borrow().get(path) {
            Some(list) => list.iter().map(|(_, h)| h.clone()).collect(),
            None => return,
        };

        self.inner.dispatching.borrow_mut().insert(path.to_string());
        let _guard = DispatchGuard {
            dispatching: &self.inner.dispatching,
            path,
        };

        for handler in handlers {
            match handler.try_borrow_mut() {
                Ok(mut handler) => (*handler)(new_value, old_value),
                Err(_) => tracing::warn!(path, "sync handler already running, skipped"),
            }
        }
    }

    /// Number of handlers registered at `path`.
    pub fn handler_count(&self, path: &str) -> usize {
        self.inner.handlers.borrow().get(path).map_or(0, Vec::len)
    }

    /// Drop every handler. Later triggers are no-ops.
    pub fn destroy(&self) {
        self.inner.destroyed.set(true);
        self.inner.handlers.borrow_mut().clear();
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SyncRegistry {
        SyncRegistry::new(|path| (path == "viewBox").then(|| json!("0 0 10 10")))
    }

    #[test]
    fn test_immediate_reads_current_value() {
        let registry = registry();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        registry.register(
            "viewBox",
            move |new, old| sink.borrow_mut().push((new.cloned(), old.cloned())),
            SyncOptions::immediate(),
        );
        assert_eq!(*seen.borrow(), vec![(Some(json!("0 0 10 10")), None)]);
    }

    #[test]
    fn test_trigger_from_immediate_call_skips_running_handler() {
        let registry = registry();
        let calls = Rc::new(Cell::new(0));
        let earlier = Rc::new(Cell::new(0));

        let e = earlier.clone();
        registry.register("viewBox", move |_, _| e.set(e.get() + 1), SyncOptions::default());
        let handle = registry.clone();
        let c = calls.clone();
        registry.register(
            "viewBox",
            move |_, _| {
                c.set(c.get() + 1);
                handle.trigger("viewBox", Some(&json!("1 1 1 1")), None);
            },
            SyncOptions::immediate(),
        );

        assert_eq!(calls.get(), 1);
        assert_eq!(earlier.get(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent_and_scoped() {
        let registry = registry();
        let calls = Rc::new(Cell::new(0));
        let (a, b) = (calls.clone(), calls.clone());
        let first = registry.register("p", move |_, _| a.set(a.get() + 1), SyncOptions::default());
        registry.register("p", move |_, _| b.set(b.get() + 10), SyncOptions::default());

        first.unregister();
        first.unregister();
        registry.trigger("p", None, None);
        assert_eq!(calls.get(), 10);
        assert_eq!(registry.handler_count("p"), 1);
    }

    #[test]
    fn test_unknown_path_and_destroyed_registry_are_noops() {
        let registry = registry();
        registry.trigger("nothing", Some(&json!(1)), None);

        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        registry.register("p", move |_, _| c.set(c.get() + 1), SyncOptions::default());
        registry.destroy();
        registry.trigger("p", None, None);
        assert_eq!(calls.get(), 0);
        assert!(registry.is_destroyed());
    }
}
