//! Undoable commands and the undo/redo history.
//!
//! # Overview
//!
//! A [`Command`] is a self-contained, reversible unit of model mutation. Every
//! concrete command captures both its forward delta and the delta that reverts it
//! when it is constructed, so undo and redo stay correct no matter what else changed
//! the model in between.
//!
//! [`CommandManager`] keeps a linear undo stack and a linear redo stack:
//!
//! - [`execute`](CommandManager::execute) applies a command, pushes it onto the undo
//!   stack and clears the redo stack;
//! - [`undo`](CommandManager::undo) reverts the newest command and moves it to the
//!   redo stack;
//! - [`redo`](CommandManager::redo) re-applies it and moves it back.
//!
//! # Example
//!
//! ```rust
//! use infographic_editor::{CommandManager, EventBus, StateManager, UpdateOptionsCommand};
//! use infographic_editor::merge::UpdateMap;
//! use serde_json::json;
//!
//! let state = StateManager::new(json!({ "viewBox": "0 0 100 100" }), EventBus::new());
//! let commander = CommandManager::new(state.clone());
//!
//! let update = UpdateMap::new().set("viewBox", json!("10 10 50 50"));
//! commander
//!     .execute(Box::new(UpdateOptionsCommand::capture(&state, update)))
//!     .unwrap();
//! assert_eq!(state.value_at("viewBox"), Some(json!("10 10 50 50")));
//!
//! commander.undo().unwrap();
//! assert_eq!(state.value_at("viewBox"), Some(json!("0 0 100 100")));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::events::EditorEvent;
use crate::merge::{OptionUpdate, UpdateMap, inverse_updates};
use crate::state::{ElementTarget, StateError, StateManager};

/// Default number of commands kept on the undo stack.
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Command error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A command was executed while another one was still running.
    #[error("a command is already executing")]
    Busy,
    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
    /// The model rejected the mutation.
    #[error(transparent)]
    State(#[from] StateError),
}

/// A reversible unit of model mutation.
pub trait Command: fmt::Debug {
    /// Short type name (`"update-options"`, ...).
    fn name(&self) -> &'static str;

    /// Apply the forward mutation.
    fn apply(&self, state: &StateManager) -> Result<(), CommandError>;

    /// Apply the reverse mutation.
    fn undo(&self, state: &StateManager) -> Result<(), CommandError>;

    /// Describe the command as JSON (type plus forward payload).
    fn serialize(&self) -> Value;
}

/// Deep-merges an options update; reverts with the captured prior values.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptionsCommand {
    options: UpdateMap,
    previous: UpdateMap,
}

impl UpdateOptionsCommand {
    /// Create from an explicit forward and reverse update.
    pub fn new(options: UpdateMap, previous: UpdateMap) -> Self {
        Self { options, previous }
    }

    /// Create from a forward update, capturing the reverse from the current model.
    pub fn capture(state: &StateManager, options: UpdateMap) -> Self {
        let previous = match &*state.get_options() {
            Value::Object(root) => inverse_updates(root, &options),
            _ => UpdateMap::new(),
        };
        Self { options, previous }
    }

    /// Forward update.
    pub fn options(&self) -> &UpdateMap {
        &self.options
    }

    /// Reverse update.
    pub fn previous(&self) -> &UpdateMap {
        &self.previous
    }
}

impl Command for UpdateOptionsCommand {
    fn name(&self) -> &'static str {
        "update-options"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        state.update_options(&self.options);
        Ok(())
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        state.update_options(&self.previous);
        Ok(())
    }

    fn serialize(&self) -> Value {
        json!({
            "type": self.name(),
            "options": self.options.to_value(),
            "previous": self.previous.to_value(),
        })
    }
}

/// Sets or removes a top-level data field.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDataCommand {
    key: String,
    value: Option<Value>,
    previous: Option<Value>,
}

impl UpdateDataCommand {
    /// Capture the current value of `data.<key>` as the reverse.
    pub fn capture(state: &StateManager, key: impl Into<String>, value: Option<Value>) -> Self {
        let key = key.into();
        let previous = state.value_at(&format!("data.{key}"));
        Self {
            key,
            value,
            previous,
        }
    }
}

impl Command for UpdateDataCommand {
    fn name(&self) -> &'static str {
        "update-data"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_data(&self.key, self.value.clone())?)
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_data(&self.key, self.previous.clone())?)
    }

    fn serialize(&self) -> Value {
        json!({ "type": self.name(), "key": self.key, "value": self.value })
    }
}

/// Inserts items at an index path.
#[derive(Debug, Clone, PartialEq)]
pub struct AddItemCommand {
    indexes: Vec<usize>,
    items: Vec<Value>,
}

impl AddItemCommand {
    /// Insert `items` at `indexes`.
    pub fn new(indexes: Vec<usize>, items: Vec<Value>) -> Self {
        Self { indexes, items }
    }
}

impl Command for AddItemCommand {
    fn name(&self) -> &'static str {
        "add-item"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.add_item_datum(&self.indexes, Value::Array(self.items.clone()))?)
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        state.remove_item_datum(&self.indexes, self.items.len())?;
        Ok(())
    }

    fn serialize(&self) -> Value {
        json!({ "type": self.name(), "indexes": self.indexes, "items": self.items })
    }
}

/// Shallow-updates one item.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateItemCommand {
    indexes: Vec<usize>,
    patch: UpdateMap,
    previous: UpdateMap,
}

impl UpdateItemCommand {
    /// Capture the current values of the patched fields as the reverse.
    pub fn capture(state: &StateManager, indexes: Vec<usize>, patch: UpdateMap) -> Result<Self, CommandError> {
        let item = state
            .item(&indexes)
            .and_then(|item| item.as_object().cloned())
            .ok_or_else(|| StateError::InvalidIndexPath {
                indexes: indexes.clone(),
            })?;
        let previous = patch
            .iter()
            .map(|(key, _)| {
                let revert = match item.get(key) {
                    Some(old) => OptionUpdate::Set(old.clone()),
                    None => OptionUpdate::Unset,
                };
                (key.to_string(), revert)
            })
            .collect();
        Ok(Self {
            indexes,
            patch,
            previous,
        })
    }
}

impl Command for UpdateItemCommand {
    fn name(&self) -> &'static str {
        "update-item"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_item_datum(&self.indexes, &self.patch)?)
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_item_datum(&self.indexes, &self.previous)?)
    }

    fn serialize(&self) -> Value {
        json!({ "type": self.name(), "indexes": self.indexes, "patch": self.patch.to_value() })
    }
}

/// Removes a run of sibling items.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveItemCommand {
    indexes: Vec<usize>,
    removed: Vec<Value>,
}

impl RemoveItemCommand {
    /// Capture the items about to be removed so undo can restore them.
    pub fn capture(state: &StateManager, indexes: Vec<usize>, count: usize) -> Result<Self, CommandError> {
        let (&first, parent) = indexes.split_last().ok_or(StateError::EmptyIndexPath)?;
        let removed: Vec<Value> = (first..first.saturating_add(count))
            .map_while(|index| {
                let mut path = parent.to_vec();
                path.push(index);
                state.item(&path)
            })
            .collect();
        if removed.is_empty() {
            return Err(StateError::InvalidIndexPath { indexes }.into());
        }
        Ok(Self { indexes, removed })
    }

    /// Items captured at construction.
    pub fn removed(&self) -> &[Value] {
        &self.removed
    }
}

impl Command for RemoveItemCommand {
    fn name(&self) -> &'static str {
        "remove-item"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        state.remove_item_datum(&self.indexes, self.removed.len())?;
        Ok(())
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.add_item_datum(&self.indexes, Value::Array(self.removed.clone()))?)
    }

    fn serialize(&self) -> Value {
        json!({ "type": self.name(), "indexes": self.indexes, "count": self.removed.len() })
    }
}

/// Merges element-scoped style attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateElementCommand {
    target: ElementTarget,
    attributes: UpdateMap,
    previous: UpdateMap,
}

impl UpdateElementCommand {
    /// Capture the current attribute values as the reverse.
    pub fn capture(state: &StateManager, target: ElementTarget, attributes: UpdateMap) -> Self {
        let previous = inverse_updates(&state.element_attributes(&target), &attributes);
        Self {
            target,
            attributes,
            previous,
        }
    }
}

impl Command for UpdateElementCommand {
    fn name(&self) -> &'static str {
        "update-element"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_element_target(&self.target, &self.attributes)?)
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        Ok(state.update_element_target(&self.target, &self.previous)?)
    }

    fn serialize(&self) -> Value {
        json!({
            "type": self.name(),
            "path": self.target.path(),
            "attributes": self.attributes.to_value(),
        })
    }
}

/// Several commands recorded as one history entry.
///
/// Sub-commands apply in order and undo in reverse order. If one of them fails,
/// the ones already applied are reverted before the error is returned.
#[derive(Debug, Default)]
pub struct BatchCommand {
    commands: Vec<Box<dyn Command>>,
}

impl BatchCommand {
    /// Create a batch from `commands`.
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        Self { commands }
    }

    /// Append a command.
    pub fn push(&mut self, command: Box<dyn Command>) {
        self.commands.push(command);
    }

    /// Number of sub-commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for BatchCommand {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn apply(&self, state: &StateManager) -> Result<(), CommandError> {
        for (applied, command) in self.commands.iter().enumerate() {
            if let Err(err) = command.apply(state) {
                for done in self.commands[..applied].iter().rev() {
                    if let Err(rollback) = done.undo(state) {
                        tracing::warn!(%rollback, command = done.name(), "batch rollback failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo(&self, state: &StateManager) -> Result<(), CommandError> {
        for command in self.commands.iter().rev() {
            command.undo(state)?;
        }
        Ok(())
    }

    fn serialize(&self) -> Value {
        let commands: Vec<Value> = self.commands.iter().map(|c| c.serialize()).collect();
        json!({ "type": self.name(), "commands": commands })
    }
}

/// Undo/redo stack state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    /// Can undo
    pub can_undo: bool,
    /// Can redo
    pub can_redo: bool,
    /// Undo stack depth
    pub undo_depth: usize,
    /// Redo stack depth
    pub redo_depth: usize,
    /// Whether the history is at the last clean point
    pub is_clean: bool,
}

type SharedCommand = Rc<dyn Command>;

#[derive(Debug)]
struct UndoRedoStacks {
    undo_stack: Vec<SharedCommand>,
    redo_stack: Vec<SharedCommand>,
    max_history: usize,
    /// Undo depth at the last clean point; above `undo_stack.len()` while the clean
    /// point sits in the redo area, `None` once it is unreachable.
    clean_index: Option<usize>,
}

impl UndoRedoStacks {
    fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: max_history.max(1),
            clean_index: Some(0),
        }
    }

    fn is_clean(&self) -> bool {
        self.clean_index == Some(self.undo_stack.len())
    }

    fn clear_redo_and_adjust_clean(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }

        // A clean point in the redo area is lost with the redo stack.
        if let Some(clean_index) = self.clean_index
            && clean_index > self.undo_stack.len()
        {
            self.clean_index = None;
        }

        self.redo_stack.clear();
    }

    fn push(&mut self, command: SharedCommand) {
        self.clear_redo_and_adjust_clean();

        if self.undo_stack.len() >= self.max_history {
            self.undo_stack.remove(0);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(index) => Some(index - 1),
            };
        }

        self.undo_stack.push(command);
    }

    fn snapshot(&self) -> HistoryState {
        HistoryState {
            can_undo: !self.undo_stack.is_empty(),
            can_redo: !self.redo_stack.is_empty(),
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
            is_clean: self.is_clean(),
        }
    }
}

struct CommanderInner {
    state: StateManager,
    history: RefCell<UndoRedoStacks>,
    executing: Cell<bool>,
}

// Returns the manager to idle even if a command panics.
struct ExecutingGuard<'a>(&'a Cell<bool>);

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Executes commands against a [`StateManager`] and keeps the undo/redo history.
///
/// Cloning yields another handle to the same history.
#[derive(Clone)]
pub struct CommandManager {
    inner: Rc<CommanderInner>,
}

impl fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandManager")
            .field("history", &self.history_state())
            .field("executing", &self.inner.executing.get())
            .finish()
    }
}

impl CommandManager {
    /// Create a manager with the default history bound.
    pub fn new(state: StateManager) -> Self {
        Self::with_max_history(state, DEFAULT_MAX_HISTORY)
    }

    /// Create a manager keeping at most `max_history` undo entries.
    pub fn with_max_history(state: StateManager, max_history: usize) -> Self {
        Self {
            inner: Rc::new(CommanderInner {
                state,
                history: RefCell::new(UndoRedoStacks::new(max_history)),
                executing: Cell::new(false),
            }),
        }
    }

    /// The state manager commands run against.
    pub fn state(&self) -> &StateManager {
        &self.inner.state
    }

    /// Whether a command is currently running.
    pub fn is_executing(&self) -> bool {
        self.inner.executing.get()
    }

    fn begin(&self) -> Result<ExecutingGuard<'_>, CommandError> {
        if self.inner.executing.replace(true) {
            tracing::warn!("command executed while another command is running");
            return Err(CommandError::Busy);
        }
        Ok(ExecutingGuard(&self.inner.executing))
    }

    /// Apply `command` and record it. Clears the redo stack.
    ///
    /// A command that fails is not recorded.
    pub fn execute(&self, command: Box<dyn Command>) -> Result<(), CommandError> {
        {
            let _guard = self.begin()?;
            command.apply(&self.inner.state)?;
            self.inner.history.borrow_mut().push(Rc::from(command));
        }
        self.notify();
        Ok(())
    }

    /// Revert the newest command.
    pub fn undo(&self) -> Result<(), CommandError> {
        {
            let _guard = self.begin()?;
            let command = self
                .inner
                .history
                .borrow_mut()
                .undo_stack
                .pop()
                .ok_or(CommandError::NothingToUndo)?;
            if let Err(err) = command.undo(&self.inner.state) {
                self.inner.history.borrow_mut().undo_stack.push(command);
                return Err(err);
            }
            self.inner.history.borrow_mut().redo_stack.push(command);
        }
        self.notify();
        Ok(())
    }

    /// Re-apply the newest undone command.
    pub fn redo(&self) -> Result<(), CommandError> {
        {
            let _guard = self.begin()?;
            let command = self
                .inner
                .history
                .borrow_mut()
                .redo_stack
                .pop()
                .ok_or(CommandError::NothingToRedo)?;
            if let Err(err) = command.apply(&self.inner.state) {
                self.inner.history.borrow_mut().redo_stack.push(command);
                return Err(err);
            }
            self.inner.history.borrow_mut().undo_stack.push(command);
        }
        self.notify();
        Ok(())
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        !self.inner.history.borrow().undo_stack.is_empty()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        !self.inner.history.borrow().redo_stack.is_empty()
    }

    /// Undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.inner.history.borrow().undo_stack.len()
    }

    /// Redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.inner.history.borrow().redo_stack.len()
    }

    /// Whether the history is at the last clean point.
    pub fn is_clean(&self) -> bool {
        self.inner.history.borrow().is_clean()
    }

    /// Mark the current position as clean (e.g. after saving).
    pub fn mark_clean(&self) {
        let mut history = self.inner.history.borrow_mut();
        history.clean_index = Some(history.undo_stack.len());
    }

    /// Serialized form of the newest undoable command.
    pub fn peek_undo(&self) -> Option<Value> {
        self.inner
            .history
            .borrow()
            .undo_stack
            .last()
            .map(|c| c.serialize())
    }

    /// Serialized undo stack, oldest first.
    pub fn undo_entries(&self) -> Vec<Value> {
        self.inner
            .history
            .borrow()
            .undo_stack
            .iter()
            .map(|c| c.serialize())
            .collect()
    }

    /// Get undo/redo state
    pub fn history_state(&self) -> HistoryState {
        self.inner.history.borrow().snapshot()
    }

    /// Drop the whole history.
    pub fn clear(&self) {
        {
            let mut history = self.inner.history.borrow_mut();
            history.undo_stack.clear();
            history.redo_stack.clear();
            history.clean_index = Some(0);
        }
        self.notify();
    }

    fn notify(&self) {
        let state = self.history_state();
        self.inner
            .state
            .events()
            .emit(&EditorEvent::HistoryChange(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    fn setup() -> (StateManager, CommandManager) {
        let state = StateManager::new(json!({ "data": { "title": "T", "items": [] } }), EventBus::new());
        let commander = CommandManager::with_max_history(state.clone(), 3);
        (state, commander)
    }

    fn set_title(state: &StateManager, title: &str) -> Box<dyn Command> {
        Box::new(UpdateDataCommand::capture(state, "title", Some(json!(title))))
    }

    #[test]
    fn test_new_command_clears_redo() {
        let (state, commander) = setup();
        commander.execute(set_title(&state, "A")).unwrap();
        commander.undo().unwrap();
        assert!(commander.can_redo());

        commander.execute(set_title(&state, "B")).unwrap();
        assert!(!commander.can_redo());
        assert_eq!(commander.redo(), Err(CommandError::NothingToRedo));
    }

    #[test]
    fn test_history_is_bounded() {
        let (state, commander) = setup();
        for title in ["1", "2", "3", "4"] {
            commander.execute(set_title(&state, title)).unwrap();
        }
        assert_eq!(commander.undo_depth(), 3);
        while commander.undo().is_ok() {}
        assert_eq!(state.value_at("data.title"), Some(json!("1")));
    }

    #[test]
    fn test_clean_point_tracking() {
        let (state, commander) = setup();
        assert!(commander.is_clean());
        commander.execute(set_title(&state, "A")).unwrap();
        assert!(!commander.is_clean());
        commander.mark_clean();
        commander.execute(set_title(&state, "B")).unwrap();
        commander.undo().unwrap();
        assert!(commander.is_clean());

        commander.undo().unwrap();
        commander.execute(set_title(&state, "C")).unwrap();
        assert!(!commander.is_clean());
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let (state, commander) = setup();
        let err = commander
            .execute(Box::new(AddItemCommand::new(vec![2, 0], vec![json!({})])))
            .unwrap_err();
        assert!(matches!(err, CommandError::State(StateError::InvalidIndexPath { .. })));
        assert_eq!(commander.undo_depth(), 0);
        assert!(!commander.is_executing());
        assert_eq!(state.version(), 0);
    }
}
