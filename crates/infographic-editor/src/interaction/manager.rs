//! Interaction arbitration and selection tracking.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::events::{EditorEvent, EventBus};
use crate::host::{HostSurface, NodeId};

/// How [`InteractionManager::select`] combines the given items with the current
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Selection becomes exactly the given items.
    #[default]
    Replace,
    /// Given items are added.
    Add,
    /// Given items are removed.
    Remove,
    /// Each given item flips membership.
    Toggle,
}

/// Payload of the `selection:change` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    /// Selection before the change.
    pub previous: Vec<NodeId>,
    /// Selection after the change.
    pub next: Vec<NodeId>,
    /// Items that entered the selection.
    pub added: Vec<NodeId>,
    /// Items that left the selection.
    pub removed: Vec<NodeId>,
    /// Mode of the originating call.
    pub mode: SelectMode,
}

struct ManagerInner {
    host: Rc<dyn HostSurface>,
    events: EventBus,
    active: Cell<bool>,
    destroyed: Cell<bool>,
    next_token: Cell<u64>,
    exclusive: RefCell<Option<(u64, &'static str)>>,
    concurrent: RefCell<Vec<(u64, &'static str)>>,
    selection: RefCell<Vec<NodeId>>,
    transients: RefCell<Vec<NodeId>>,
}

impl ManagerInner {
    fn next_token(&self) -> u64 {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        token
    }
}

/// Ownership of the exclusive gesture slot.
///
/// Held for the whole duration of a gesture; dropping it releases the slot.
#[must_use = "the exclusive slot is released as soon as the lock is dropped"]
pub struct ExclusiveLock {
    manager: Weak<ManagerInner>,
    token: u64,
    owner: &'static str,
}

impl ExclusiveLock {
    /// Name of the interaction holding the lock.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Release the slot now.
    pub fn release(self) {}
}

impl fmt::Debug for ExclusiveLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveLock")
            .field("owner", &self.owner)
            .finish()
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        let Some(inner) = self.manager.upgrade() else {
            return;
        };
        let mut slot = inner.exclusive.borrow_mut();
        if matches!(*slot, Some((token, _)) if token == self.token) {
            *slot = None;
            tracing::trace!(owner = self.owner, "exclusive interaction released");
        }
    }
}

/// Registration of a concurrent interaction run. Dropping it ends the run.
#[must_use = "the concurrent run ends as soon as the token is dropped"]
pub struct ConcurrentToken {
    manager: Weak<ManagerInner>,
    token: u64,
    owner: &'static str,
}

impl ConcurrentToken {
    /// Name of the interaction holding the token.
    pub fn owner(&self) -> &'static str {
        self.owner
    }
}

impl fmt::Debug for ConcurrentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentToken")
            .field("owner", &self.owner)
            .finish()
    }
}

impl Drop for ConcurrentToken {
    fn drop(&mut self) {
        if let Some(inner) = self.manager.upgrade() {
            inner.concurrent.borrow_mut().retain(|(token, _)| *token != self.token);
        }
    }
}

/// Arbitrates gesture ownership between interactions and tracks the selection.
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct InteractionManager {
    inner: Rc<ManagerInner>,
}

impl fmt::Debug for InteractionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionManager")
            .field("active", &self.inner.active.get())
            .field("exclusive_owner", &self.exclusive_owner())
            .field("selection", &*self.inner.selection.borrow())
            .finish()
    }
}

impl InteractionManager {
    /// Create an active manager for `host`, announcing selection changes on `events`.
    pub fn new(host: Rc<dyn HostSurface>, events: EventBus) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                host,
                events,
                active: Cell::new(true),
                destroyed: Cell::new(false),
                next_token: Cell::new(0),
                exclusive: RefCell::new(None),
                concurrent: RefCell::new(Vec::new()),
                selection: RefCell::new(Vec::new()),
                transients: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Whether interactions may start.
    pub fn is_active(&self) -> bool {
        self.inner.active.get() && !self.inner.destroyed.get()
    }

    /// Enable or disable every interaction (read-only mode).
    ///
    /// Gestures already holding a lock are not interrupted.
    pub fn set_active(&self, active: bool) {
        self.inner.active.set(active);
    }

    /// Try to take the exclusive gesture slot for `owner`.
    ///
    /// Returns `None` while another exclusive gesture runs or the manager is
    /// inactive. Requests are never queued.
    pub fn acquire_exclusive(&self, owner: &'static str) -> Option<ExclusiveLock> {
        if !self.is_active() {
            return None;
        }
        let mut slot = self.inner.exclusive.borrow_mut();
        if let Some((_, current)) = *slot {
            tracing::debug!(owner, current, "exclusive interaction rejected");
            return None;
        }
        let token = self.inner.next_token();
        *slot = Some((token, owner));
        tracing::trace!(owner, "exclusive interaction acquired");
        Some(ExclusiveLock {
            manager: Rc::downgrade(&self.inner),
            token,
            owner,
        })
    }

    /// Register a concurrent run for `owner`. Not blocked by the exclusive slot.
    pub fn acquire_concurrent(&self, owner: &'static str) -> Option<ConcurrentToken> {
        if !self.is_active() {
            return None;
        }
        let token = self.inner.next_token();
        self.inner.concurrent.borrow_mut().push((token, owner));
        Some(ConcurrentToken {
            manager: Rc::downgrade(&self.inner),
            token,
            owner,
        })
    }

    /// Name of the interaction holding the exclusive slot.
    pub fn exclusive_owner(&self) -> Option<&'static str> {
        self.inner.exclusive.borrow().map(|(_, owner)| owner)
    }

    /// Whether an exclusive gesture is running.
    pub fn is_exclusive_locked(&self) -> bool {
        self.inner.exclusive.borrow().is_some()
    }

    /// Names of the running concurrent interactions.
    pub fn concurrent_owners(&self) -> Vec<&'static str> {
        self.inner
            .concurrent
            .borrow()
            .iter()
            .map(|(_, owner)| *owner)
            .collect()
    }

    /// Update the selection. Emits `selection:change` when it actually changed.
    pub fn select(&self, items: &[NodeId], mode: SelectMode) {
        let previous = self.inner.selection.borrow().clone();
        let mut next = match mode {
            SelectMode::Replace => Vec::with_capacity(items.len()),
            _ => previous.clone(),
        };

        for &item in items {
            let position = next.iter().position(|&selected| selected == item);
            match (mode, position) {
                (SelectMode::Replace | SelectMode::Add, None) => next.push(item),
                (SelectMode::Remove, Some(index)) => {
                    next.remove(index);
                }
                (SelectMode::Toggle, Some(index)) => {
                    next.remove(index);
                }
                (SelectMode::Toggle, None) => next.push(item),
                _ => {}
            }
        }

        let added: Vec<NodeId> = next.iter().copied().filter(|i| !previous.contains(i)).collect();
        let removed: Vec<NodeId> = previous.iter().copied().filter(|i| !next.contains(i)).collect();
        if added.is_empty() && removed.is_empty() {
            return;
        }

        *self.inner.selection.borrow_mut() = next.clone();
        self.inner
            .events
            .emit(&EditorEvent::SelectionChange(SelectionChange {
                previous,
                next,
                added,
                removed,
                mode,
            }));
    }

    /// Whether `item` is selected.
    pub fn is_selected(&self, item: NodeId) -> bool {
        self.inner.selection.borrow().contains(&item)
    }

    /// Deselect everything.
    pub fn clear_selection(&self) {
        let current = self.get_selection();
        self.select(&current, SelectMode::Remove);
    }

    /// Current selection, in selection order.
    pub fn get_selection(&self) -> Vec<NodeId> {
        self.inner.selection.borrow().clone()
    }

    /// Attach a node to the host's transient layer. Removed on [`destroy`](Self::destroy).
    pub fn append_transient_element(&self, node: NodeId) {
        let mut transients = self.inner.transients.borrow_mut();
        if !transients.contains(&node) {
            transients.push(node);
            self.inner.host.append_transient(node);
        }
    }

    /// Detach a transient node early.
    pub fn remove_transient_element(&self, node: NodeId) {
        let mut transients = self.inner.transients.borrow_mut();
        if let Some(index) = transients.iter().position(|&n| n == node) {
            transients.remove(index);
            self.inner.host.remove_transient(node);
        }
    }

    /// Tear down: detach transient nodes, drop the selection, refuse new gestures.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        let transients = std::mem::take(&mut *self.inner.transients.borrow_mut());
        for node in transients {
            self.inner.host.remove_transient(node);
        }
        self.inner.selection.borrow_mut().clear();
        self.inner.exclusive.borrow_mut().take();
        self.inner.concurrent.borrow_mut().clear();
    }
}
